// ABOUTME: routes classified request lines to the ping, exec, and llm handlers.
// ABOUTME: turns every failure into reply text so the caller always hears back.

use copilot_common::{
    classify, Task, LLM_BAD_FORMAT_REPLY, LLM_NO_RESPONSE_REPLY, PONG_REPLY, UNKNOWN_REPLY,
};
use tracing::{debug, error, info, warn};

use crate::exec::CommandRunner;
use crate::llm::CompletionBackend;
use crate::sessions::SessionStore;

const SUGGESTION_PROMPT: &str = r#"You will be given the raw input of a shell command.
Your task is to either complete the command or provide a new command that you think the user is trying to type.
If you return a completely new command for the user, prefix it with an equal sign (=).
If you return a completion for the user's command, prefix it with a plus sign (+).
Only respond with either a completion or a new command, never both, so your response starts with exactly one of the two markers.
You may explain the command by writing a short note after the comment symbol (#).
Do not ask for more information, you won't receive it.
Your response will be run in the user's shell, so escape the input correctly where needed.
Here are two examples:
 * User input: 'list files in current directory'; Your response: '=ls # ls is the builtin command for listing files'
 * User input: 'cd /tm'; Your response: '+p # /tmp is the standard temp folder on linux and mac'

User: {user_input}
Please provide a single command suggestion, prefixed with "=" for a new command or "+" for a completion."#;

/// Owns one request/reply cycle after the connection handler has produced a
/// trimmed, non-empty request line.
pub struct Dispatcher {
    backend: Box<dyn CompletionBackend>,
    runner: Box<dyn CommandRunner>,
    sessions: Option<SessionStore>,
}

impl Dispatcher {
    pub fn new(backend: Box<dyn CompletionBackend>, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            backend,
            runner,
            sessions: None,
        }
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub async fn handle(&self, request: &str) -> String {
        match classify(request) {
            Task::Ping => PONG_REPLY.to_string(),
            Task::Execute { command } => self.execute(&command).await,
            Task::LlmQuery { user_input } => self.suggest(&user_input).await,
            Task::Unknown { raw } => {
                warn!(request = %raw, "unrecognized request");
                UNKNOWN_REPLY.to_string()
            }
        }
    }

    async fn execute(&self, command: &str) -> String {
        info!(command = %command, "executing command");
        match self.runner.run(command).await {
            Ok(output) if output.success => output.stdout,
            Ok(output) => {
                error!(command = %command, "command exited with failure");
                format!("Error: {}", output.stderr)
            }
            Err(err) => {
                error!(command = %command, error = %err, "command could not be run");
                format!("Error: {err}")
            }
        }
    }

    async fn suggest(&self, user_input: &str) -> String {
        info!(input = %user_input, "requesting suggestion");
        let prompt = build_prompt(user_input);

        let Some(completion) = self.backend.complete(&prompt).await else {
            return LLM_NO_RESPONSE_REPLY.to_string();
        };
        if completion.text.is_empty() {
            return LLM_NO_RESPONSE_REPLY.to_string();
        }

        if let (Some(store), Some(session_id)) =
            (&self.sessions, completion.session_id.as_deref())
        {
            match store.record(session_id).await {
                Ok(task_id) => debug!(task_id = %task_id, "recorded completed exchange"),
                Err(err) => error!(error = %err, "failed to update session ledger"),
            }
        }

        match parse_suggestion(&completion.text) {
            Some(command) => command,
            None => {
                warn!(text = %completion.text, "suggestion carried no =/+ marker");
                LLM_BAD_FORMAT_REPLY.to_string()
            }
        }
    }
}

fn build_prompt(user_input: &str) -> String {
    SUGGESTION_PROMPT.replace("{user_input}", user_input)
}

/// A suggestion must lead with `=` (new command) or `+` (completion); an
/// optional trailing `# note` is split off and dropped.
fn parse_suggestion(text: &str) -> Option<String> {
    if !(text.starts_with('=') || text.starts_with('+')) {
        return None;
    }
    let command = match text.split_once('#') {
        Some((command, _note)) => command,
        None => text,
    };
    Some(command.trim().to_string())
}
