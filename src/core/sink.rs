//! Incremental accumulation of streamed response fragments.

use std::io;

/// A render target that can be told "the current text is now X".
///
/// Calls are idempotent and last-write-wins: the surface shows whatever the
/// most recent call carried. Implementations live with their rendering code
/// (the chat loop's streaming view, the `say` command's stdout writer).
pub trait DisplaySurface {
    fn set_text(&mut self, text: &str) -> io::Result<()>;
}

/// Accumulates fragments in arrival order and republishes the running
/// concatenation to a display surface after every fragment.
///
/// There is no finish step: once fragment delivery ends, [`text`] is the
/// full response.
///
/// [`text`]: StreamingSink::text
pub struct StreamingSink<'a, S: DisplaySurface> {
    surface: &'a mut S,
    text: String,
}

impl<'a, S: DisplaySurface> StreamingSink<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        Self::with_initial(surface, String::new())
    }

    pub fn with_initial(surface: &'a mut S, initial: impl Into<String>) -> Self {
        Self {
            surface,
            text: initial.into(),
        }
    }

    /// Appends `fragment` and re-renders the entire accumulated text.
    ///
    /// A surface failure propagates to the caller; the fragment is still
    /// recorded so the accumulated text never loses data.
    pub fn push_fragment(&mut self, fragment: &str) -> io::Result<()> {
        self.text.push_str(fragment);
        self.surface.set_text(&self.text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    struct BrokenSurface;

    impl DisplaySurface for BrokenSurface {
        fn set_text(&mut self, _text: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "surface gone"))
        }
    }

    #[test]
    fn fragments_render_as_cumulative_prefixes() {
        let mut surface = RecordingSurface::default();
        let mut sink = StreamingSink::new(&mut surface);

        for fragment in ["The", " answer", " is", " 4."] {
            sink.push_fragment(fragment).unwrap();
        }
        assert_eq!(sink.text(), "The answer is 4.");

        assert_eq!(
            surface.renders,
            vec!["The", "The answer", "The answer is", "The answer is 4."]
        );
    }

    #[test]
    fn initial_text_is_prepended() {
        let mut surface = RecordingSurface::default();
        let mut sink = StreamingSink::with_initial(&mut surface, "Hel");
        sink.push_fragment("lo").unwrap();

        assert_eq!(sink.text(), "Hello");
        assert_eq!(surface.renders, vec!["Hello"]);
    }

    #[test]
    fn surface_errors_propagate_without_losing_text() {
        let mut surface = BrokenSurface;
        let mut sink = StreamingSink::new(&mut surface);

        assert!(sink.push_fragment("Hi").is_err());
        assert_eq!(sink.text(), "Hi");
    }
}
