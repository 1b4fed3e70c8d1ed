use std::env;

/// HTTP listener settings. Pipeline settings live in
/// `chain_chat_core::models::settings::Settings`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: String,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }
}
