//! TUI-less one-shot mode: stream a single reply to stdout.

use std::error::Error;
use std::io::{self, Write};

use crate::core::app::AppInit;
use crate::core::chat_stream::{ChatStreamService, StreamEvent, StreamParams};
use crate::core::conversation::Conversation;
use crate::core::sink::{DisplaySurface, StreamingSink};

/// Writes the running text to a terminal that can only append. Each call
/// emits the not-yet-written suffix, so what is visible always equals the
/// latest cumulative text.
struct PlainSurface<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> PlainSurface<W> {
    fn new(out: W) -> Self {
        Self { out, written: 0 }
    }
}

impl<W: Write> DisplaySurface for PlainSurface<W> {
    fn set_text(&mut self, text: &str) -> io::Result<()> {
        if let Some(suffix) = text.get(self.written..) {
            self.out.write_all(suffix.as_bytes())?;
            self.written = text.len();
            self.out.flush()?;
        }
        Ok(())
    }
}

pub async fn run_say(prompt: Vec<String>, init: AppInit) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: causette say <prompt>");
        std::process::exit(1);
    }

    let conversation = Conversation::new(init.model, init.system_prompt);
    let messages = conversation.request_messages(&[], &prompt);

    let (service, mut events) = ChatStreamService::new();
    service.spawn_stream(StreamParams {
        client: reqwest::Client::new(),
        base_url: init.base_url,
        api_key: init.api_key,
        model: conversation.model().to_string(),
        messages,
    });

    let mut surface = PlainSurface::new(io::stdout());
    let mut sink = StreamingSink::new(&mut surface);

    loop {
        match events.recv().await {
            Some(StreamEvent::Fragment(fragment)) => {
                sink.push_fragment(&fragment)?;
            }
            Some(StreamEvent::Error(message)) => {
                eprintln!();
                eprintln!("{message}");
                std::process::exit(1);
            }
            Some(StreamEvent::Done) | None => break,
        }
    }
    println!();

    Ok(())
}
