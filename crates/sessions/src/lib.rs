//! In-memory session state and the cancellation fabric that backs the
//! Barge-in Controller (spec §4.2, §4.7).

pub mod cancel;
pub mod echo;
pub mod session;
pub mod store;

pub use cancel::{BargeController, CancelToken};
pub use echo::{EchoGate, InterimDecision};
pub use session::Session;
pub use store::{SessionHandle, SessionRegistry};
