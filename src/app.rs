//! サーバーの組み立てと起動

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::Backend;
use crate::config::ServerSettings;
use crate::dictionary::{
    self,
    DictionaryIndex,
};
use crate::error::ServerError;
use crate::handler::TranslationHandler;
use crate::transport::websocket::{
    self,
    WebSocketTransport,
};

/// 設定に従ってサーバーを起動し、Ctrl-C まで待ち受ける
///
/// 辞書の読み込みに失敗した場合は一切待ち受けずにエラーを返す。
///
/// # Errors
/// - 辞書の読み込みエラー
/// - ポートのバインドエラー
/// - サーバーの I/O エラー
pub async fn run(settings: ServerSettings) -> Result<(), ServerError> {
    let dictionary = dictionary::load(&settings.translations_path)?;
    tracing::info!(
        phrases = dictionary.len(),
        "Dictionary loaded from {}",
        settings.translations_path.display()
    );

    let addr = settings.socket_addr();
    let listener =
        TcpListener::bind(addr).await.map_err(|source| ServerError::Bind { addr, source })?;

    serve(listener, Arc::new(dictionary), &settings.client_origin, shutdown_signal()).await
}

/// バインド済みのリスナーでサーバーを動かす
///
/// イベントループを起動し、`shutdown` が完了するまで接続を受け付ける。
///
/// # Errors
/// - オリジンがヘッダー値として不正
/// - サーバーの I/O エラー
pub async fn serve(
    listener: TcpListener,
    dictionary: Arc<DictionaryIndex>,
    client_origin: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let transport = WebSocketTransport::new(events_tx, client_origin)?;

    let backend = Backend::new(TranslationHandler::new(dictionary));
    let event_loop = tokio::spawn(backend.run(events_rx));

    let result = websocket::serve(listener, transport, shutdown).await;
    event_loop.abort();

    result.map_err(ServerError::Serve)
}

/// Ctrl-C を待つ
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(error) => tracing::error!("Failed to listen for shutdown signal: {}", error),
    }
}
