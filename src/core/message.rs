use serde::{Deserialize, Serialize};

/// Role of a transcript entry.
///
/// `User` and `Assistant` are the conversational roles; they are the only
/// roles ever written to a session history or transmitted to the remote API.
/// The `App*` roles are display-only lines authored by the client itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    AppInfo,
    AppError,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::AppInfo => "app/info",
            Role::AppError => "app/error",
        }
    }

    /// The wire role, or `None` for display-only roles.
    pub fn to_api_role(self) -> Option<&'static str> {
        match self {
            Role::User => Some("user"),
            Role::Assistant => Some("assistant"),
            _ => None,
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }

    pub fn is_app(self) -> bool {
        matches!(self, Role::AppInfo | Role::AppError)
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, String> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "app/info" => Ok(Role::AppInfo),
            "app/error" => Ok(Role::AppError),
            _ => Err(format!("invalid role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn app_info(content: impl Into<String>) -> Self {
        Self::new(Role::AppInfo, content)
    }

    pub fn app_error(content: impl Into<String>) -> Self {
        Self::new(Role::AppError, content)
    }
}

/// The message list currently shown in the UI.
///
/// Conversational entries mirror the active session's history; app-authored
/// entries are interleaved for display but never stored or transmitted.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Replaces the displayed conversation with another session's history.
    /// App-authored lines belong to the display, not the session, so they are
    /// not carried over.
    pub fn reload_from(&mut self, history: &[Message]) {
        self.messages.clear();
        self.messages.extend_from_slice(history);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_roles_have_no_api_role() {
        assert_eq!(Role::User.to_api_role(), Some("user"));
        assert_eq!(Role::Assistant.to_api_role(), Some("assistant"));
        assert_eq!(Role::AppInfo.to_api_role(), None);
        assert_eq!(Role::AppError.to_api_role(), None);
    }

    #[test]
    fn invalid_role_strings_are_rejected() {
        assert!(Role::try_from("system").is_err());
        assert!(Role::try_from("app/unknown").is_err());
    }

    #[test]
    fn reload_replaces_displayed_messages() {
        let mut transcript = Transcript::new();
        transcript.push(Message::app_info("Welcome"));
        transcript.push(Message::user("old"));

        let history = vec![Message::user("Hi"), Message::assistant("Hello!")];
        transcript.reload_from(&history);

        assert_eq!(transcript.messages(), history.as_slice());
    }
}
