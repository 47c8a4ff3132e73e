// Server configuration.
//
// Centralizes environment variable parsing with defaults for local
// development. The DB pool and CORS layer read their own variables; this
// module covers the core server and generation settings.

use std::net::SocketAddr;

/// Owner id used when no `x-gpulaw-owner` header is supplied.
pub const DEFAULT_OWNER_ID: &str = "demo-user";
pub const DEFAULT_CHAT_TOKEN_BUDGET: usize = 150_000;
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_ANTHROPIC_CHECK_MODEL: &str = "claude-3-haiku-20240307";

/// Core server configuration.
///
/// Constructed via [`ServerConfig::from_env`] which reads environment
/// variables and falls back to development defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (host:port).
    pub listen_addr: SocketAddr,
    /// PostgreSQL connection string. Unset means every store call degrades.
    pub database_url: Option<String>,
    /// Comma-separated CORS origins (or `"*"` for any).
    pub cors_origins: Option<String>,
    /// Log filter directive (e.g. `info`, `gpulaw_server=debug`).
    pub log_filter: String,
    /// Placeholder identity that owns cases and documents.
    pub owner_id: String,
    /// Upsert the demo cases at startup.
    pub seed_demo: bool,
    /// Token count above which chat prompts are logged as oversized.
    pub chat_token_budget: usize,
    pub anthropic: AnthropicSettings,
}

#[derive(Clone)]
pub struct AnthropicSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub check_model: String,
}

impl std::fmt::Debug for AnthropicSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("check_model", &self.check_model)
            .finish()
    }
}

impl ServerConfig {
    /// Parse configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `GPULAW_SERVER_HOST` | `0.0.0.0` |
    /// | `GPULAW_SERVER_PORT` | `8080` |
    /// | `GPULAW_SERVER_DATABASE_URL` | *(none)* |
    /// | `GPULAW_SERVER_CORS_ORIGINS` | *(none, cors.rs uses dev defaults)* |
    /// | `GPULAW_SERVER_LOG_FILTER` | `info` |
    /// | `GPULAW_SERVER_OWNER_ID` | `demo-user` |
    /// | `GPULAW_SERVER_SEED_DEMO` | `false` |
    /// | `GPULAW_SERVER_CHAT_TOKEN_BUDGET` | `150000` |
    /// | `ANTHROPIC_API_KEY` | *(none)* |
    /// | `GPULAW_SERVER_ANTHROPIC_BASE_URL` | `https://api.anthropic.com` |
    /// | `GPULAW_SERVER_ANTHROPIC_MODEL` | `claude-3-5-sonnet-20241022` |
    /// | `GPULAW_SERVER_ANTHROPIC_CHECK_MODEL` | `claude-3-haiku-20240307` |
    pub fn from_env() -> Self {
        Self::from_env_fn(|key| std::env::var(key))
    }

    /// Testable constructor that accepts an environment lookup function.
    fn from_env_fn<F>(env: F) -> Self
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let host = env("GPULAW_SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 =
            env("GPULAW_SERVER_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
        let listen_addr = format!("{host}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

        let database_url = non_empty(env("GPULAW_SERVER_DATABASE_URL").ok());
        let cors_origins = env("GPULAW_SERVER_CORS_ORIGINS").ok();
        let log_filter = env("GPULAW_SERVER_LOG_FILTER").unwrap_or_else(|_| "info".into());

        let owner_id = non_empty(env("GPULAW_SERVER_OWNER_ID").ok())
            .unwrap_or_else(|| DEFAULT_OWNER_ID.into());
        let seed_demo = env("GPULAW_SERVER_SEED_DEMO").map(|v| parse_flag(&v)).unwrap_or(false);
        let chat_token_budget = env("GPULAW_SERVER_CHAT_TOKEN_BUDGET")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CHAT_TOKEN_BUDGET);

        let anthropic = AnthropicSettings {
            api_key: non_empty(env("ANTHROPIC_API_KEY").ok()),
            base_url: env("GPULAW_SERVER_ANTHROPIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.into()),
            model: env("GPULAW_SERVER_ANTHROPIC_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.into()),
            check_model: env("GPULAW_SERVER_ANTHROPIC_CHECK_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_CHECK_MODEL.into()),
        };

        Self {
            listen_addr,
            database_url,
            cors_origins,
            log_filter,
            owner_id,
            seed_demo,
            chat_token_budget,
            anthropic,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from_map(
        map: HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Result<String, std::env::VarError> {
        move |key: &str| map.get(key).map(|v| v.to_string()).ok_or(std::env::VarError::NotPresent)
    }

    #[test]
    fn defaults_when_no_env_vars() {
        let cfg = ServerConfig::from_env_fn(env_from_map(HashMap::new()));
        assert_eq!(cfg.listen_addr.port(), 8080);
        assert_eq!(cfg.listen_addr.ip().to_string(), "0.0.0.0");
        assert!(cfg.database_url.is_none());
        assert!(cfg.cors_origins.is_none());
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.owner_id, "demo-user");
        assert!(!cfg.seed_demo);
        assert_eq!(cfg.chat_token_budget, 150_000);
        assert!(cfg.anthropic.api_key.is_none());
        assert_eq!(cfg.anthropic.base_url, "https://api.anthropic.com");
        assert_eq!(cfg.anthropic.model, "claude-3-5-sonnet-20241022");
        assert_eq!(cfg.anthropic.check_model, "claude-3-haiku-20240307");
    }

    #[test]
    fn custom_host_and_port() {
        let mut m = HashMap::new();
        m.insert("GPULAW_SERVER_HOST", "127.0.0.1");
        m.insert("GPULAW_SERVER_PORT", "3000");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn invalid_port_uses_default() {
        let mut m = HashMap::new();
        m.insert("GPULAW_SERVER_PORT", "not_a_number");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        assert_eq!(cfg.listen_addr.port(), 8080);
    }

    #[test]
    fn blank_database_url_means_detached() {
        let mut m = HashMap::new();
        m.insert("GPULAW_SERVER_DATABASE_URL", "   ");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn database_url_from_env() {
        let mut m = HashMap::new();
        m.insert("GPULAW_SERVER_DATABASE_URL", "postgres://u:p@host/gpulaw");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://u:p@host/gpulaw"));
    }

    #[test]
    fn owner_and_seed_flags() {
        let mut m = HashMap::new();
        m.insert("GPULAW_SERVER_OWNER_ID", "firm-admin");
        m.insert("GPULAW_SERVER_SEED_DEMO", "TRUE");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        assert_eq!(cfg.owner_id, "firm-admin");
        assert!(cfg.seed_demo);
    }

    #[test]
    fn chat_budget_override() {
        let mut m = HashMap::new();
        m.insert("GPULAW_SERVER_CHAT_TOKEN_BUDGET", "4096");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        assert_eq!(cfg.chat_token_budget, 4096);
    }

    #[test]
    fn anthropic_overrides_trim_trailing_slash() {
        let mut m = HashMap::new();
        m.insert("ANTHROPIC_API_KEY", "sk-ant-test");
        m.insert("GPULAW_SERVER_ANTHROPIC_BASE_URL", "http://127.0.0.1:9999/");
        m.insert("GPULAW_SERVER_ANTHROPIC_MODEL", "claude-test");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        assert_eq!(cfg.anthropic.api_key.as_deref(), Some("sk-ant-test"));
        assert_eq!(cfg.anthropic.base_url, "http://127.0.0.1:9999");
        assert_eq!(cfg.anthropic.model, "claude-test");
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut m = HashMap::new();
        m.insert("ANTHROPIC_API_KEY", "sk-ant-secret-value");
        let cfg = ServerConfig::from_env_fn(env_from_map(m));
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-ant-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }
}
