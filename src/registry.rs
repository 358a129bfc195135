//! 接続レジストリ
//!
//! 接続のライフサイクル（接続・切断）だけを記録する。翻訳結果には影響しない。

use std::collections::HashMap;
use std::fmt;
use std::time::{
    Duration,
    Instant,
};

/// トランスポートが割り当てる接続 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// 数値から ID を作成
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 数値表現
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// ライフサイクルイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// 接続された
    Connected(ConnectionId),
    /// 切断された
    Disconnected(ConnectionId),
}

/// 生存中の接続を管理する
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// 接続 ID → 接続時刻
    connections: HashMap<ConnectionId, Instant>,
}

impl ConnectionRegistry {
    /// 空のレジストリを作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ライフサイクルイベントを適用する
    pub fn apply(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Connected(id) => self.on_connect(id),
            LifecycleEvent::Disconnected(id) => {
                self.on_disconnect(id);
            }
        }
    }

    /// 接続を登録する
    ///
    /// 既に登録済みの ID は無視する（最初の接続時刻を保持）。
    pub fn on_connect(&mut self, id: ConnectionId) {
        if self.connections.contains_key(&id) {
            tracing::warn!(connection = %id, "Connection already registered");
            return;
        }
        self.connections.insert(id, Instant::now());
        tracing::info!(connection = %id, active = self.connections.len(), "User connected");
    }

    /// 接続を削除する
    ///
    /// # Returns
    /// 接続していた時間。未登録の ID の場合は `None`
    pub fn on_disconnect(&mut self, id: ConnectionId) -> Option<Duration> {
        let Some(connected_at) = self.connections.remove(&id) else {
            tracing::debug!(connection = %id, "Disconnect for unknown connection");
            return None;
        };
        let session = connected_at.elapsed();
        tracing::info!(
            connection = %id,
            active = self.connections.len(),
            session_ms = u64::try_from(session.as_millis()).unwrap_or(u64::MAX),
            "User disconnected"
        );
        Some(session)
    }

    /// 接続が登録されているか
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// 生存中の接続数
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// 接続が一つもないか
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
