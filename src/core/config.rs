use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Model used when no `-m` flag is given
    pub default_model: Option<String>,
    /// API base URL; `OPENAI_BASE_URL` takes precedence
    pub base_url: Option<String>,
    /// System instruction prepended to every request
    pub system_prompt: Option<String>,
    /// Session identifier selected at startup
    pub session_id: Option<String>,
    /// Transcript log file enabled at startup
    pub log_file: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "causette")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "default-model" => self.default_model = Some(value.to_string()),
            "base-url" => self.base_url = Some(value.to_string()),
            "system-prompt" => self.system_prompt = Some(value.to_string()),
            "session-id" => self.session_id = Some(value.to_string()),
            "log-file" => self.log_file = Some(value.to_string()),
            _ => return Err(format!("unknown configuration key: {key}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "default-model" => self.default_model = None,
            "base-url" => self.base_url = None,
            "system-prompt" => self.system_prompt = None,
            "session-id" => self.session_id = None,
            "log-file" => self.log_file = None,
            _ => return Err(format!("unknown configuration key: {key}")),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        let entries = [
            ("default-model", &self.default_model),
            ("base-url", &self.base_url),
            ("system-prompt", &self.system_prompt),
            ("session-id", &self.session_id),
            ("log-file", &self.log_file),
        ];
        for (key, value) in entries {
            match value {
                Some(value) => println!("  {key}: {value}"),
                None => println!("  {key}: (unset)"),
            }
        }
    }
}
