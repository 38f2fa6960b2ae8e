// ABOUTME: defines the shared request vocabulary used by cosh and copilotd.
// ABOUTME: provides the pure classifier that maps a request line to a task.

pub const PING_REQUEST: &str = "PING";
pub const EXECUTE_PREFIX: &str = "EXECUTE:";
pub const LLM_PREFIX: &str = "LLM:";

pub const PONG_REPLY: &str = "PONG";
pub const UNKNOWN_REPLY: &str = "Unknown command";
pub const LLM_NO_RESPONSE_REPLY: &str = "Error: Failed to get a response from the LLM.";
pub const LLM_BAD_FORMAT_REPLY: &str = "Error: Invalid response format from LLM.";

/// Intent derived from one request line. `Unknown` is a normal outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Ping,
    Execute { command: String },
    LlmQuery { user_input: String },
    Unknown { raw: String },
}

/// Classifies a trimmed request line. First match wins, case-sensitive.
/// The payload after the first colon is taken verbatim, embedded colons
/// included, and may be empty.
pub fn classify(request: &str) -> Task {
    if request == PING_REQUEST {
        return Task::Ping;
    }
    if let Some(command) = request.strip_prefix(EXECUTE_PREFIX) {
        return Task::Execute {
            command: command.to_string(),
        };
    }
    if let Some(user_input) = request.strip_prefix(LLM_PREFIX) {
        return Task::LlmQuery {
            user_input: user_input.to_string(),
        };
    }
    Task::Unknown {
        raw: request.to_string(),
    }
}

pub fn ping_request() -> String {
    PING_REQUEST.to_string()
}

pub fn execute_request(command: &str) -> String {
    format!("{EXECUTE_PREFIX}{command}")
}

pub fn llm_request(user_input: &str) -> String {
    format!("{LLM_PREFIX}{user_input}")
}
