use std::net::SocketAddr;

use axum::http::header::InvalidHeaderValue;
use thiserror::Error;

use crate::config::ConfigError;
use crate::dictionary::LoadError;

/// Errors that stop the server
///
/// Everything except `Serve` happens before the first connection is accepted.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The dictionary could not be loaded
    #[error(transparent)]
    Dictionary(#[from] LoadError),
    /// The allowed origin cannot be used as a header value
    #[error("Invalid client origin: {0}")]
    InvalidOrigin(#[from] InvalidHeaderValue),
    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The server stopped with an I/O error
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}
