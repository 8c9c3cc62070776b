use std::{env, net::SocketAddr, str::FromStr};

use crate::model::OpenAiSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_bind: SocketAddr,
    pub model_provider: String,
    pub openai_api_key: Option<String>,
    pub openai: OpenAiSettings,
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("PORT").unwrap_or_else(|| "8080".to_owned());
        let http_bind = lookup("HTTP_BIND").unwrap_or_else(|| format!("0.0.0.0:{port}"));
        let http_bind = http_bind.parse()?;

        let defaults = OpenAiSettings::default();
        let openai = OpenAiSettings {
            base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            model: lookup("OPENAI_MODEL").unwrap_or(defaults.model),
            temperature: parse_or(lookup("OPENAI_TEMPERATURE"), defaults.temperature),
            max_tokens: parse_or(lookup("OPENAI_MAX_TOKENS"), defaults.max_tokens),
        };

        Ok(Self {
            http_bind,
            model_provider: lookup("MODEL_PROVIDER").unwrap_or_else(|| "auto".to_owned()),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()),
            openai,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).expect("config");
        assert_eq!(config.http_bind.to_string(), "0.0.0.0:8080");
        assert_eq!(config.model_provider, "auto");
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.openai.max_tokens, 1000);
        assert!((config.openai.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.openai_api_key.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("PORT", "9090"),
            ("OPENAI_API_KEY", "sk-live"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_TEMPERATURE", " 0.2 "),
            ("OPENAI_MAX_TOKENS", "256"),
            ("DATABASE_URL", "postgres://localhost/teamdash"),
        ])
        .expect("config");
        assert_eq!(config.http_bind.port(), 9090);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-live"));
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert!((config.openai.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.openai.max_tokens, 256);
        assert!(config.database_url.is_some());
    }

    #[test]
    fn malformed_numbers_fall_back_and_bad_bind_fails() {
        let config = config(&[("OPENAI_MAX_TOKENS", "lots")]).expect("config");
        assert_eq!(config.openai.max_tokens, 1000);

        assert!(self::config(&[("HTTP_BIND", "not-an-address")]).is_err());
    }
}
