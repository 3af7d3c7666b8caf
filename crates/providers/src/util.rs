use tutor_domain::error::Error;

/// Convert a `reqwest::Error` into our shared error type, preserving the
/// timeout/transport distinction the caller might care about.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
