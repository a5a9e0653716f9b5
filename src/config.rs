use std::num::ParseIntError;

use axum::http::HeaderValue;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CLIENT_URL: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS. `None` when `CLIENT_URL` is `*`.
    pub client_origin: Option<HeaderValue>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT {value:?}: {source}")]
    Port {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid CLIENT_URL {0:?}")]
    ClientUrl(String),
}

impl Config {
    /// Reads `HOST`, `PORT` and `CLIENT_URL`, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::Port { value, source })?,
            None => DEFAULT_PORT,
        };

        let client_url = lookup("CLIENT_URL").unwrap_or_else(|| DEFAULT_CLIENT_URL.to_owned());
        let client_origin = if client_url == "*" {
            None
        } else {
            Some(
                HeaderValue::from_str(client_url.trim_end_matches('/'))
                    .map_err(|_| ConfigError::ClientUrl(client_url.clone()))?,
            )
        };

        Ok(Self { host, port, client_origin })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT,
            client_origin: Some(HeaderValue::from_static(DEFAULT_CLIENT_URL)),
        }
    }
}
