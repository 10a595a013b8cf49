//! Slash-command handling for the chat loop.

use crate::core::app::App;

const HELP_TEXT: &str = "Commands:\n\
  /clear            Clear the conversation (all sessions)\n\
  /session          Show the active session identifier\n\
  /session <id>     Switch to another session\n\
  /log <filename>   Enable transcript logging to a file\n\
  /log              Toggle logging pause/resume\n\
  /help             Show this help";

pub enum CommandResult {
    /// Input was handled as a command; nothing to send.
    Continue,
    /// Not a command; submit as a chat message.
    ProcessAsMessage(String),
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();
    match parts[0] {
        "/clear" => {
            app.clear_conversation();
            app.push_info("Conversation cleared.");
        }
        "/session" => match parts.len() {
            1 => {
                let message = format!("Current session: {}", app.session_id);
                app.push_info(message);
            }
            2 => {
                app.switch_session(parts[1]);
                let message = format!("Switched to session: {}", parts[1]);
                app.push_info(message);
            }
            _ => {
                app.push_error("Usage: /session [id]");
            }
        },
        "/log" => match parts.len() {
            1 => match app.logging.toggle_logging() {
                Ok(message) => app.push_info(message),
                Err(e) => app.push_error(format!("Error: {e}")),
            },
            2 => match app.logging.set_log_file(parts[1].to_string()) {
                Ok(message) => app.push_info(message),
                Err(e) => app.push_error(format!("Error setting log file: {e}")),
            },
            _ => {
                app.push_error("Usage: /log [filename]");
            }
        },
        "/help" => {
            app.push_info(HELP_TEXT);
        }
        other => {
            app.push_error(format!("Unknown command: {other} (try /help)"));
        }
    }
    CommandResult::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::test_app;
    use crate::core::message::{Message, Role};

    #[test]
    fn plain_text_passes_through() {
        let mut app = test_app();
        match process_input(&mut app, "hello there") {
            CommandResult::ProcessAsMessage(text) => assert_eq!(text, "hello there"),
            CommandResult::Continue => panic!("expected message passthrough"),
        }
        assert!(app.transcript.is_empty());
    }

    #[test]
    fn clear_drops_every_session() {
        let mut app = test_app();
        app.store.get_or_create("abc123").push(Message::user("Hi"));
        app.store.get_or_create("other").push(Message::user("Yo"));
        app.transcript.push(Message::user("Hi"));

        assert!(matches!(
            process_input(&mut app, "/clear"),
            CommandResult::Continue
        ));

        assert!(app.store.is_empty());
        assert_eq!(app.transcript.len(), 1);
        assert_eq!(app.transcript.messages()[0].role, Role::AppInfo);
    }

    #[test]
    fn session_switch_reloads_the_display() {
        let mut app = test_app();
        app.store.get_or_create("work").push(Message::user("Hi"));
        app.store
            .get_or_create("work")
            .push(Message::assistant("Hello!"));

        process_input(&mut app, "/session work");

        assert_eq!(app.session_id, "work");
        // Two reloaded messages plus the confirmation line.
        assert_eq!(app.transcript.len(), 3);
        assert_eq!(app.transcript.messages()[0].content, "Hi");
    }

    #[test]
    fn bare_session_shows_the_active_id() {
        let mut app = test_app();
        process_input(&mut app, "/session");
        assert_eq!(app.transcript.len(), 1);
        assert!(app.transcript.messages()[0]
            .content
            .contains("abc123"));
    }

    #[test]
    fn unknown_commands_report_an_error() {
        let mut app = test_app();
        process_input(&mut app, "/frobnicate");
        assert_eq!(app.transcript.messages()[0].role, Role::AppError);
    }

    #[test]
    fn log_without_file_reports_an_error() {
        let mut app = test_app();
        process_input(&mut app, "/log");
        assert_eq!(app.transcript.messages()[0].role, Role::AppError);
    }
}
