//! One user/assistant exchange from input to committed reply.

use std::fmt;
use std::io;

use tokio::sync::mpsc;

use crate::api::ChatMessage;
use crate::core::chat_stream::StreamEvent;
use crate::core::message::{Message, Transcript};
use crate::core::session::SessionStore;
use crate::core::sink::{DisplaySurface, StreamingSink};

/// Instruction sent as the first message of every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Answer the following questions short and concisely.";

#[derive(Debug)]
pub enum TurnError {
    /// The remote call failed (network error or API error payload).
    Api(String),
    /// The display surface rejected an update mid-stream.
    Display(io::Error),
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::Api(message) => write!(f, "{message}"),
            TurnError::Display(e) => write!(f, "display update failed: {e}"),
        }
    }
}

impl std::error::Error for TurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TurnError::Api(_) => None,
            TurnError::Display(e) => Some(e),
        }
    }
}

/// Turn orchestration over a dependency-injected session store.
///
/// A turn is split in two so the caller can start the remote request between
/// the halves: [`begin_turn`] records the user's message and produces the
/// request payload, [`complete_turn`] drains the stream and commits the
/// reply. History is only appended after the full stream returns, so a
/// failed call never leaves a partial assistant message behind.
///
/// [`begin_turn`]: Conversation::begin_turn
/// [`complete_turn`]: Conversation::complete_turn
pub struct Conversation {
    model: String,
    system_prompt: String,
}

impl Conversation {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Wire messages for one request: the fixed system instruction, the
    /// prior conversational turns, then `input` as the final user turn.
    pub fn request_messages(&self, history: &[Message], input: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new("system", &self.system_prompt));
        for message in history {
            if let Some(role) = message.role.to_api_role() {
                messages.push(ChatMessage::new(role, &message.content));
            }
        }
        messages.push(ChatMessage::new("user", input));
        messages
    }

    /// Records the user's side of a turn and returns the request to send.
    ///
    /// Whitespace-only input produces no turn and leaves everything
    /// untouched. The request is built from the session history as it stood
    /// before this turn's user message.
    pub fn begin_turn(
        &self,
        transcript: &mut Transcript,
        store: &mut SessionStore,
        session_id: &str,
        input: &str,
    ) -> Option<Vec<ChatMessage>> {
        if input.trim().is_empty() {
            return None;
        }

        let history = store.get_or_create(session_id);
        let request = self.request_messages(history.messages(), input);

        let message = Message::user(input);
        history.push(message.clone());
        transcript.push(message);

        Some(request)
    }

    /// Drains stream events into the sink, then commits the accumulated text
    /// as the assistant's reply to both the transcript and the session
    /// history.
    ///
    /// An API error or a display failure aborts the turn before the commit.
    /// A stream that closes without a terminal event is treated as finished.
    pub async fn complete_turn<S: DisplaySurface>(
        &self,
        transcript: &mut Transcript,
        store: &mut SessionStore,
        session_id: &str,
        sink: &mut StreamingSink<'_, S>,
        events: &mut mpsc::UnboundedReceiver<StreamEvent>,
    ) -> Result<String, TurnError> {
        loop {
            match events.recv().await {
                Some(StreamEvent::Fragment(fragment)) => {
                    sink.push_fragment(&fragment).map_err(TurnError::Display)?;
                }
                Some(StreamEvent::Error(message)) => return Err(TurnError::Api(message)),
                Some(StreamEvent::Done) | None => break,
            }
        }

        let reply = sink.text().to_string();
        let message = Message::assistant(reply.clone());
        store.get_or_create(session_id).push(message.clone());
        transcript.push(message);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;

    #[derive(Default)]
    struct RecordingSurface {
        renders: Vec<String>,
    }

    impl DisplaySurface for RecordingSurface {
        fn set_text(&mut self, text: &str) -> io::Result<()> {
            self.renders.push(text.to_string());
            Ok(())
        }
    }

    fn conversation() -> Conversation {
        Conversation::new("test-model", DEFAULT_SYSTEM_PROMPT)
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut transcript = Transcript::new();
        let mut store = SessionStore::new();

        let convo = conversation();
        assert!(convo
            .begin_turn(&mut transcript, &mut store, "abc123", "")
            .is_none());
        assert!(convo
            .begin_turn(&mut transcript, &mut store, "abc123", "   \n")
            .is_none());

        assert!(transcript.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn begin_turn_appends_to_both_and_builds_from_prior_history() {
        let mut transcript = Transcript::new();
        let mut store = SessionStore::new();
        let history = store.get_or_create("abc123");
        history.push(Message::user("earlier question"));
        history.push(Message::assistant("earlier answer"));

        let convo = conversation();
        let request = convo
            .begin_turn(&mut transcript, &mut store, "abc123", "Hi")
            .unwrap();

        // System instruction, the two prior turns, then the new input; the
        // just-appended user message is not doubled.
        assert_eq!(request.len(), 4);
        assert_eq!(request[0], ChatMessage::new("system", DEFAULT_SYSTEM_PROMPT));
        assert_eq!(request[1], ChatMessage::new("user", "earlier question"));
        assert_eq!(request[2], ChatMessage::new("assistant", "earlier answer"));
        assert_eq!(request[3], ChatMessage::new("user", "Hi"));

        assert_eq!(store.get("abc123").unwrap().len(), 3);
        assert_eq!(transcript.messages().last().unwrap().content, "Hi");
    }

    #[test]
    fn app_lines_are_never_sent_to_the_api() {
        let convo = conversation();
        let history = vec![
            Message::user("Hi"),
            Message::app_info("Logging enabled"),
            Message::assistant("Hello!"),
        ];

        let request = convo.request_messages(&history, "next");
        let roles: Vec<&str> = request.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn successful_turn_commits_exactly_one_exchange() {
        let mut transcript = Transcript::new();
        let mut store = SessionStore::new();
        let mut surface = RecordingSurface::default();

        let convo = conversation();
        convo
            .begin_turn(&mut transcript, &mut store, "abc123", "Hi")
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Fragment("Hel".to_string())).unwrap();
        tx.send(StreamEvent::Fragment("lo!".to_string())).unwrap();
        tx.send(StreamEvent::Done).unwrap();

        let mut sink = StreamingSink::new(&mut surface);
        let reply = convo
            .complete_turn(&mut transcript, &mut store, "abc123", &mut sink, &mut rx)
            .await
            .unwrap();

        assert_eq!(reply, "Hello!");
        assert_eq!(surface.renders, vec!["Hel", "Hello!"]);

        let history = store.get("abc123").unwrap().messages();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], Message::user("Hi"));
        assert_eq!(history[1], Message::assistant("Hello!"));
        assert_eq!(transcript.messages(), history);
    }

    #[tokio::test]
    async fn failed_stream_commits_nothing_beyond_the_user_message() {
        let mut transcript = Transcript::new();
        let mut store = SessionStore::new();
        let mut surface = RecordingSurface::default();

        let convo = conversation();
        convo
            .begin_turn(&mut transcript, &mut store, "abc123", "Hi")
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Fragment("partial".to_string()))
            .unwrap();
        tx.send(StreamEvent::Error("API error: overloaded".to_string()))
            .unwrap();

        let mut sink = StreamingSink::new(&mut surface);
        let err = convo
            .complete_turn(&mut transcript, &mut store, "abc123", &mut sink, &mut rx)
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Api(_)));

        let history = store.get("abc123").unwrap().messages();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn closed_channel_without_done_still_commits() {
        let mut transcript = Transcript::new();
        let mut store = SessionStore::new();
        let mut surface = RecordingSurface::default();

        let convo = conversation();
        convo
            .begin_turn(&mut transcript, &mut store, "abc123", "Hi")
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Fragment("Hello!".to_string())).unwrap();
        drop(tx);

        let mut sink = StreamingSink::new(&mut surface);
        let reply = convo
            .complete_turn(&mut transcript, &mut store, "abc123", &mut sink, &mut rx)
            .await
            .unwrap();

        assert_eq!(reply, "Hello!");
        assert_eq!(store.get("abc123").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn display_failure_aborts_the_commit() {
        struct BrokenSurface;

        impl DisplaySurface for BrokenSurface {
            fn set_text(&mut self, _text: &str) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "surface gone"))
            }
        }

        let mut transcript = Transcript::new();
        let mut store = SessionStore::new();
        let mut surface = BrokenSurface;

        let convo = conversation();
        convo
            .begin_turn(&mut transcript, &mut store, "abc123", "Hi")
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(StreamEvent::Fragment("Hello!".to_string())).unwrap();
        tx.send(StreamEvent::Done).unwrap();

        let mut sink = StreamingSink::new(&mut surface);
        let err = convo
            .complete_turn(&mut transcript, &mut store, "abc123", &mut sink, &mut rx)
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::Display(_)));
        assert_eq!(store.get("abc123").unwrap().len(), 1);
    }
}
