//! Runtime state shared by the chat loop and the slash commands.

use crate::core::config::Config;
use crate::core::conversation::Conversation;
use crate::core::message::{Message, Transcript};
use crate::core::session::SessionStore;
use crate::logging::LoggingState;

/// Everything resolved at startup from flags, config, and environment.
pub struct AppInit {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub system_prompt: String,
    pub session_id: String,
    pub log_file: Option<String>,
}

pub struct App {
    pub transcript: Transcript,
    pub store: SessionStore,
    pub session_id: String,
    pub conversation: Conversation,
    pub logging: LoggingState,
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: String,
    pub input: String,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
}

impl App {
    pub fn new(init: AppInit) -> Self {
        App {
            transcript: Transcript::new(),
            store: SessionStore::new(),
            session_id: init.session_id,
            conversation: Conversation::new(init.model, init.system_prompt),
            logging: LoggingState::new(init.log_file),
            client: reqwest::Client::new(),
            base_url: init.base_url,
            api_key: init.api_key,
            input: String::new(),
            scroll_offset: 0,
            auto_scroll: true,
        }
    }

    pub fn push_info(&mut self, content: impl Into<String>) {
        self.transcript.push(Message::app_info(content));
    }

    pub fn push_error(&mut self, content: impl Into<String>) {
        self.transcript.push(Message::app_error(content));
    }

    /// Makes `session_id` the active session and rebuilds the displayed
    /// transcript from its history, so display and history stay consistent
    /// across switches.
    pub fn switch_session(&mut self, session_id: &str) {
        self.session_id = session_id.to_string();
        let history = self
            .store
            .get(session_id)
            .map(|h| h.messages().to_vec())
            .unwrap_or_default();
        self.transcript.reload_from(&history);
        self.auto_scroll = true;
    }

    /// The clear action: every session is dropped and the display is reset.
    pub fn clear_conversation(&mut self) {
        self.store.clear_all();
        self.transcript.clear();
        self.scroll_offset = 0;
        self.auto_scroll = true;
    }
}

/// Builds the startup state from the configuration plus flag overrides.
/// Flags win over config values, config values win over built-in defaults.
pub fn init_from(
    config: &Config,
    api_key: String,
    base_url: String,
    model_flag: Option<String>,
    session_flag: Option<String>,
    log_flag: Option<String>,
) -> AppInit {
    use crate::core::config::DEFAULT_MODEL;
    use crate::core::conversation::DEFAULT_SYSTEM_PROMPT;
    use crate::core::session::DEFAULT_SESSION_ID;

    AppInit {
        model: model_flag
            .or_else(|| config.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        base_url,
        api_key,
        system_prompt: config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        session_id: session_flag
            .or_else(|| config.session_id.clone())
            .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
        log_file: log_flag.or_else(|| config.log_file.clone()),
    }
}

#[cfg(test)]
pub(crate) fn test_app() -> App {
    App::new(AppInit {
        model: "test-model".to_string(),
        base_url: "http://localhost:9/v1".to_string(),
        api_key: "test-key".to_string(),
        system_prompt: crate::core::conversation::DEFAULT_SYSTEM_PROMPT.to_string(),
        session_id: "abc123".to_string(),
        log_file: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_session_rebuilds_the_transcript() {
        let mut app = test_app();
        app.store.get_or_create("abc123").push(Message::user("Hi"));
        app.store
            .get_or_create("abc123")
            .push(Message::assistant("Hello!"));
        app.transcript
            .reload_from(app.store.get("abc123").unwrap().messages());

        app.switch_session("fresh");
        assert_eq!(app.session_id, "fresh");
        assert!(app.transcript.is_empty());

        app.switch_session("abc123");
        assert_eq!(app.transcript.len(), 2);
        assert_eq!(app.transcript.messages()[1].content, "Hello!");
    }

    #[test]
    fn clear_conversation_resets_store_and_display() {
        let mut app = test_app();
        app.store.get_or_create("abc123").push(Message::user("Hi"));
        app.store.get_or_create("other").push(Message::user("Yo"));
        app.transcript.push(Message::user("Hi"));

        app.clear_conversation();
        assert!(app.store.is_empty());
        assert!(app.transcript.is_empty());
    }

    #[test]
    fn flags_override_config_values() {
        let mut config = Config::default();
        config.default_model = Some("config-model".to_string());
        config.session_id = Some("config-session".to_string());

        let init = init_from(
            &config,
            "key".to_string(),
            "http://localhost/v1".to_string(),
            Some("flag-model".to_string()),
            None,
            None,
        );

        assert_eq!(init.model, "flag-model");
        assert_eq!(init.session_id, "config-session");
    }
}
