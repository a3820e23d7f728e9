use std::time::Duration;

use crate::rate_limit::DEFAULT_DISPATCH_DELAY;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub image_model: String,
    pub text_model: String,
    pub dispatch_delay: Duration,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            dispatch_delay: DEFAULT_DISPATCH_DELAY,
            port: 8080,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("NEXT_PUBLIC_GEMINI_API_KEY")),
            api_base: non_empty("GEMINI_API_BASE").unwrap_or(defaults.api_base),
            image_model: non_empty("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            text_model: non_empty("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
            dispatch_delay: non_empty("RATE_LIMIT_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.dispatch_delay),
            port: non_empty("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.api_key, None);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.dispatch_delay, Duration::from_secs(8));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn reads_overrides_and_falls_back_to_public_key() {
        let config = config_from(&[
            ("NEXT_PUBLIC_GEMINI_API_KEY", " AIzaPublicKey123 "),
            ("GEMINI_API_KEY", "   "),
            ("RATE_LIMIT_DELAY_MS", "250"),
            ("PORT", "not-a-port"),
        ]);
        assert_eq!(config.api_key.as_deref(), Some("AIzaPublicKey123"));
        assert_eq!(config.dispatch_delay, Duration::from_millis(250));
        assert_eq!(config.port, 8080);
    }
}
