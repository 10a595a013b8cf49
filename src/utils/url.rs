//! Endpoint URL construction.

/// Joins a base URL and the chat completions endpoint without producing
/// double slashes.
///
/// # Examples
///
/// ```
/// use causette::utils::url::chat_completions_url;
///
/// assert_eq!(
///     chat_completions_url("https://api.openai.com/v1"),
///     "https://api.openai.com/v1/chat/completions"
/// );
/// assert_eq!(
///     chat_completions_url("https://api.openai.com/v1/"),
///     "https://api.openai.com/v1/chat/completions"
/// );
/// ```
pub fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_do_not_double_up() {
        assert_eq!(
            chat_completions_url("http://localhost:8080/v1///"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn plain_base_is_joined() {
        assert_eq!(
            chat_completions_url("https://example.test/v1"),
            "https://example.test/v1/chat/completions"
        );
    }
}
