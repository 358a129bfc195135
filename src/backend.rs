//! サーバーのイベントループ
//!
//! トランスポートから届く [`TransportEvent`] を一つずつ順番に処理する。
//! 処理中に待機点はないため、ある接続が他の接続を待たせることはない。

use tokio::sync::mpsc;

use crate::handler::TranslationHandler;
use crate::protocol::ClientEvent;
use crate::registry::{
    ConnectionRegistry,
    LifecycleEvent,
};
use crate::transport::{
    Outboxes,
    TransportEvent,
};

/// イベントループの状態
///
/// 辞書は `TranslationHandler` が読み取り専用で共有する。
/// レジストリと送信キューはこのループだけが変更する。
#[derive(Debug)]
pub struct Backend {
    /// 翻訳ハンドラー
    handler: TranslationHandler,
    /// 接続レジストリ
    registry: ConnectionRegistry,
    /// 接続ごとの送信キュー
    outboxes: Outboxes,
}

impl Backend {
    /// 新しい `Backend` を作成
    #[must_use]
    pub fn new(handler: TranslationHandler) -> Self {
        Self { handler, registry: ConnectionRegistry::new(), outboxes: Outboxes::default() }
    }

    /// 接続レジストリ
    #[must_use]
    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// イベントを一つ処理する
    pub fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { connection, outbox } => {
                self.outboxes.insert(connection, outbox);
                self.registry.apply(LifecycleEvent::Connected(connection));
            }
            TransportEvent::Received { connection, event } => match event {
                ClientEvent::Translate(request) => {
                    self.handler.handle_translate(connection, &request, &self.outboxes);
                }
            },
            TransportEvent::Disconnected { connection } => {
                // 送信キューを破棄すると、以降の emit は no-op になる
                self.outboxes.remove(connection);
                self.registry.apply(LifecycleEvent::Disconnected(connection));
            }
        }
    }

    /// 送信側がすべて閉じるまでイベントを処理し続ける
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        tracing::debug!("Event loop started");
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        tracing::debug!(active = self.registry.len(), "Event loop stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use googletest::prelude::*;

    use super::*;
    use crate::dictionary::test_support::sample_index;
    use crate::protocol::{
        ServerEvent,
        TargetLanguage,
        TranslationRequest,
        TranslationResult,
        TranslationStatus,
    };
    use crate::registry::ConnectionId;
    use crate::transport::Outbox;

    fn backend() -> Backend {
        Backend::new(TranslationHandler::new(Arc::new(sample_index())))
    }

    fn connect(
        backend: &mut Backend,
        raw: u64,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let connection = ConnectionId::new(raw);
        let (outbox, receiver) = Outbox::channel();
        backend.dispatch(TransportEvent::Connected { connection, outbox });
        (connection, receiver)
    }

    fn translate(connection: ConnectionId, text: &str, language: TargetLanguage) -> TransportEvent {
        TransportEvent::Received {
            connection,
            event: ClientEvent::Translate(TranslationRequest::new(text, language)),
        }
    }

    fn translated(event: ServerEvent) -> TranslationResult {
        let ServerEvent::Translation(result) = event;
        result
    }

    #[googletest::test]
    fn lifecycle_updates_registry() {
        let mut backend = backend();

        let (a, _a_rx) = connect(&mut backend, 1);
        let (b, _b_rx) = connect(&mut backend, 2);
        expect_that!(backend.registry().len(), eq(2));

        backend.dispatch(TransportEvent::Disconnected { connection: a });
        expect_that!(backend.registry().contains(a), eq(false));
        expect_that!(backend.registry().contains(b), eq(true));
    }

    #[googletest::test]
    fn each_connection_receives_only_its_own_result() {
        let mut backend = backend();
        let (a, mut a_rx) = connect(&mut backend, 1);
        let (b, mut b_rx) = connect(&mut backend, 2);

        backend.dispatch(translate(a, "Hello", TargetLanguage::Spanish));
        backend.dispatch(translate(b, "Hello", TargetLanguage::Spanish));

        let a_result = translated(a_rx.try_recv().unwrap());
        let b_result = translated(b_rx.try_recv().unwrap());
        expect_that!(a_result.status, eq(TranslationStatus::Success));
        expect_that!(b_result.status, eq(TranslationStatus::Success));
        expect_that!(a_result.translated, eq("Hola"));
        expect_that!(a_rx.try_recv().is_err(), eq(true));
        expect_that!(b_rx.try_recv().is_err(), eq(true));
    }

    #[googletest::test]
    fn results_follow_request_order() {
        let mut backend = backend();
        let (a, mut a_rx) = connect(&mut backend, 1);

        backend.dispatch(translate(a, "Hello", TargetLanguage::German));
        backend.dispatch(translate(a, "Goodbye", TargetLanguage::German));
        backend.dispatch(translate(a, "Thank you", TargetLanguage::Spanish));

        let originals: Vec<String> =
            std::iter::from_fn(|| a_rx.try_recv().ok()).map(|e| translated(e).original).collect();
        assert_that!(originals, elements_are![eq("Hello"), eq("Goodbye"), eq("Thank you")]);
    }

    #[googletest::test]
    fn request_after_disconnect_is_dropped() {
        let mut backend = backend();
        let (a, mut a_rx) = connect(&mut backend, 1);

        backend.dispatch(TransportEvent::Disconnected { connection: a });
        backend.dispatch(translate(a, "Hello", TargetLanguage::Spanish));

        expect_that!(a_rx.try_recv().is_err(), eq(true));
        expect_that!(backend.registry().is_empty(), eq(true));
    }

    #[googletest::test]
    fn writer_gone_before_reply_is_tolerated() {
        let mut backend = backend();
        let (a, a_rx) = connect(&mut backend, 1);
        drop(a_rx);

        backend.dispatch(translate(a, "Hello", TargetLanguage::Spanish));

        expect_that!(backend.registry().contains(a), eq(true));
    }

    #[googletest::test]
    fn run_returns_once_queue_is_closed() {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbox, mut replies) = Outbox::channel();
        let connection = ConnectionId::new(9);
        events_tx.send(TransportEvent::Connected { connection, outbox }).unwrap();
        events_tx.send(translate(connection, "Hello", TargetLanguage::German)).unwrap();
        drop(events_tx);

        tokio_test::block_on(backend().run(events_rx));

        expect_that!(translated(replies.try_recv().unwrap()).translated, eq("Hallo"));
        expect_that!(replies.try_recv().is_err(), eq(true));
    }

    #[tokio::test]
    async fn run_drains_queue_until_senders_close() {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(backend().run(events_rx));

        let connection = ConnectionId::new(5);
        let (outbox, mut replies) = Outbox::channel();
        events_tx.send(TransportEvent::Connected { connection, outbox }).unwrap();
        events_tx.send(translate(connection, "good morning", TargetLanguage::German)).unwrap();

        let result = translated(replies.recv().await.unwrap());
        assert_eq!(result.translated, "Guten Morgen");

        events_tx.send(TransportEvent::Disconnected { connection }).unwrap();
        drop(events_tx);
        task.await.unwrap();

        assert!(replies.recv().await.is_none());
    }
}
