// ABOUTME: builds and checks protocol request lines before they reach the socket.
// ABOUTME: refuses requests the daemon would silently drop, so callers see errors instead.

use copilot_common::{execute_request, llm_request, ping_request, PONG_REPLY};

pub fn ping_line() -> String {
    ping_request()
}

pub fn exec_line(parts: &[String]) -> anyhow::Result<String> {
    let command = parts.join(" ");
    if command.trim().is_empty() {
        return Err(anyhow::anyhow!("refusing to send an empty command"));
    }
    Ok(execute_request(&command))
}

pub fn suggest_line(parts: &[String]) -> anyhow::Result<String> {
    let input = parts.join(" ");
    if input.trim().is_empty() {
        return Err(anyhow::anyhow!("refusing to send an empty query"));
    }
    Ok(llm_request(&input))
}

/// The daemon closes whitespace-only requests without a reply; refuse them
/// here so the caller gets an error instead of silence.
pub fn raw_line(input: &str) -> anyhow::Result<String> {
    let line = input.trim();
    if line.is_empty() {
        return Err(anyhow::anyhow!("refusing to send an empty request line"));
    }
    Ok(line.to_string())
}

pub fn is_pong(reply: &str) -> bool {
    reply == PONG_REPLY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_line_joins_words() {
        let line = exec_line(&["ls".to_string(), "-la".to_string()]).unwrap();
        assert_eq!(line, "EXECUTE:ls -la");
    }

    #[test]
    fn exec_line_refuses_empty_commands() {
        assert!(exec_line(&[]).is_err());
        assert!(exec_line(&["   ".to_string()]).is_err());
    }

    #[test]
    fn suggest_line_prefixes_the_query() {
        let line = suggest_line(&["list".to_string(), "files".to_string()]).unwrap();
        assert_eq!(line, "LLM:list files");
    }

    #[test]
    fn raw_line_trims_surrounding_whitespace() {
        assert_eq!(raw_line("  PING\n").unwrap(), "PING");
    }

    #[test]
    fn raw_line_refuses_blank_input() {
        assert!(raw_line("   \n").is_err());
    }

    #[test]
    fn pong_detection_is_exact() {
        assert!(is_pong("PONG"));
        assert!(!is_pong("PONG\n"));
        assert!(!is_pong("Unknown command"));
    }
}
