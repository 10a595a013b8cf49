//! Opt-in transcript logging to a plain-text file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::core::message::{Message, Role};

pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Self {
        let is_active = log_file.is_some();
        LoggingState {
            file_path: log_file,
            is_active,
        }
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;
        self.file_path = Some(path.clone());
        self.is_active = true;
        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                self.is_active = !self.is_active;
                if self.is_active {
                    Ok(format!("Logging resumed to: {path}"))
                } else {
                    Ok(format!("Logging paused (file: {path})"))
                }
            }
            None => {
                Err("No log file specified. Use /log <filename> to enable logging first.".into())
            }
        }
    }

    /// Appends one displayed message, formatted the way the screen shows it.
    /// Display-only app lines are not logged.
    pub fn log_message(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = self.file_path.as_ref().filter(|_| self.is_active) else {
            return Ok(());
        };
        if message.role.is_app() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        match message.role {
            Role::User => writeln!(file, "You: {}", message.content)?,
            _ => {
                for line in message.content.lines() {
                    writeln!(file, "{line}")?;
                }
            }
        }
        writeln!(file)?;
        file.flush()?;
        Ok(())
    }

    pub fn status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
            (Some(path), false) => format!(
                "paused ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn inactive_logger_writes_nothing() {
        let logging = LoggingState::new(None);
        assert!(logging.log_message(&Message::user("Hi")).is_ok());
        assert_eq!(logging.status_string(), "disabled");
    }

    #[test]
    fn messages_are_appended_in_display_form() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.log");
        let mut logging = LoggingState::new(None);
        logging
            .set_log_file(path.to_string_lossy().into_owned())
            .unwrap();

        logging.log_message(&Message::user("Hi")).unwrap();
        logging.log_message(&Message::assistant("Hello!")).unwrap();
        logging.log_message(&Message::app_info("not logged")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "You: Hi\n\nHello!\n\n");
    }

    #[test]
    fn toggle_requires_a_file() {
        let mut logging = LoggingState::new(None);
        assert!(logging.toggle_logging().is_err());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.log");
        logging
            .set_log_file(path.to_string_lossy().into_owned())
            .unwrap();

        let paused = logging.toggle_logging().unwrap();
        assert!(paused.contains("paused"));
        logging.log_message(&Message::user("dropped")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
