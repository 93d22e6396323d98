use std::net::{IpAddr, SocketAddr};

use crate::config::helpers::{optional_env, parse_csv, parse_optional_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::Settings;

/// HTTP API bind and request-limit settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Extra origins allowed by CORS besides the bound address itself.
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub max_photo_bytes: usize,
}

impl GatewayConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let host_raw = parse_string_env("GATEWAY_HOST", settings.gateway.host.clone())?;
        let host = host_raw
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                key: "GATEWAY_HOST".to_string(),
                message: e.to_string(),
            })?;

        let allowed_origins = match optional_env("GATEWAY_ALLOWED_ORIGINS")? {
            Some(raw) => parse_csv(&raw),
            None => settings.gateway.allowed_origins.clone(),
        };

        let max_body_bytes =
            parse_optional_env("GATEWAY_MAX_BODY_BYTES", settings.gateway.max_body_bytes)?;
        let max_photo_bytes =
            parse_optional_env("GATEWAY_MAX_PHOTO_BYTES", settings.gateway.max_photo_bytes)?;
        if max_photo_bytes > max_body_bytes {
            return Err(ConfigError::InvalidValue {
                key: "GATEWAY_MAX_PHOTO_BYTES".to_string(),
                message: "photo limit must not exceed the request body limit".to_string(),
            });
        }

        Ok(Self {
            host,
            port: parse_optional_env("GATEWAY_PORT", settings.gateway.port)?,
            allowed_origins,
            max_body_bytes,
            max_photo_bytes,
        })
    }
}
