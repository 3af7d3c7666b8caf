//! System prompt assembly for the Turn Orchestrator's single LLM call.

use tutor_domain::session::Mode;

const SCHEMA: &str = r#"Respond with a single JSON object and nothing else, matching:
{
  "speech": string,               // what you say out loud this turn; "" if you have nothing to say
  "boardActions": [                // zero or more, processed in list order
    {"type":"write","content":string,"format":"text"|"latex","position":{"x":int,"y":int},"color":string},
    {"type":"underline","area":{"x":int,"y":int,"w":int,"h":int},"color":string},
    {"type":"clear"}
  ],
  "mode": "listening"|"guiding"|"demonstrating"|"evaluating",
  "waitForStudent": boolean
}
Positions are relative to a fixed origin; the board layout system will shift them below existing content."#;

pub fn build_system_prompt(subject: Option<&str>, mode: Mode, board_cursor_y: i64) -> String {
    let subject_line = subject
        .map(|s| format!("The lesson subject is \"{s}\".\n"))
        .unwrap_or_default();

    format!(
        "You are a patient voice tutor sharing an infinite whiteboard with a student.\n\
         {subject_line}Your current pedagogical mode is \"{mode:?}\". The board's next free \
         writing line is at y={board_cursor_y} in your own coordinate space; write starting \
         there or below.\n\n{SCHEMA}",
    )
}
