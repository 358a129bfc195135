//! Server settings and configuration errors

use std::net::{
    IpAddr,
    Ipv4Addr,
    SocketAddr,
};
use std::path::PathBuf;

use axum::http::HeaderValue;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// Environment variable the error refers to (e.g., "PORT")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
    /// The single browser origin allowed to open a socket.
    pub client_origin: String,
    /// Dictionary source, read once at startup.
    pub translations_path: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3002,
            client_origin: "http://localhost:5173".to_string(),
            translations_path: PathBuf::from("data/translations.json"),
        }
    }
}

impl ServerSettings {
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(message) = validate_origin(&self.client_origin) {
            errors.push(ValidationError::new("CLIENT_ORIGIN", message));
        }

        if self.translations_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "TRANSLATIONS_PATH",
                "The path cannot be empty. Example: \"data/translations.json\"",
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// An origin is `scheme://host[:port]` with no path and no trailing slash.
fn validate_origin(origin: &str) -> Result<(), String> {
    if origin.is_empty() {
        return Err("The origin cannot be empty. Example: \"http://localhost:5173\"".to_string());
    }

    let Some(rest) = origin.strip_prefix("http://").or_else(|| origin.strip_prefix("https://"))
    else {
        return Err(format!("Origin '{origin}' must start with http:// or https://"));
    };

    if rest.is_empty() {
        return Err(format!("Origin '{origin}' has no host"));
    }
    if rest.contains('/') {
        return Err(format!("Origin '{origin}' must not contain a path or trailing slash"));
    }
    if HeaderValue::from_str(origin).is_err() {
        return Err(format!("Origin '{origin}' is not a valid header value"));
    }

    Ok(())
}
