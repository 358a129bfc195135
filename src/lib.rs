//! phrase-relay
//!
//! WebSocket 上で短いフレーズを辞書引きして翻訳を返すサーバー

pub mod app;
pub mod backend;
pub mod config;
pub mod dictionary;
mod error;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod transport;

// Backend を再エクスポート
pub use backend::Backend;
pub use error::ServerError;
