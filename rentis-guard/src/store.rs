use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ban::Ban;

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A window counter read-back: how many hits this window, and how long
/// until the window resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub count: u32,
    pub ms_remaining: i64,
}

/// Persisted guard state. The guard holds no in-process counters of its
/// own, so any number of processes sharing a store reach the same decision.
#[async_trait]
pub trait GuardStore: Send + Sync {
    /// Count a request against the identity's rate-limit window.
    async fn incr_request(&self, key: &str, window_sec: u64) -> Result<WindowCount, StoreError>;

    /// Count an identical-payload submission in the abuse window.
    async fn incr_payload(
        &self,
        key: &str,
        payload_hash: &str,
        window_sec: u64,
    ) -> Result<u32, StoreError>;

    /// Count a failed/conflicting attempt in the abuse window.
    async fn incr_failure(&self, key: &str, window_sec: u64) -> Result<u32, StoreError>;

    async fn save_ban(&self, ban: &Ban) -> Result<(), StoreError>;

    /// All bans touching either identity field, expired ones included;
    /// activity is judged lazily by the caller.
    async fn bans_for_identity(
        &self,
        ip: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<Vec<Ban>, StoreError>;

    async fn remove_ban(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// In-process store for tests and single-node setups.
pub struct MemoryGuardStore {
    inner: std::sync::Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    windows: std::collections::HashMap<String, (u32, DateTime<Utc>)>,
    bans: Vec<Ban>,
}

impl MemoryGuardStore {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Mutex::new(MemoryInner::default()),
        }
    }

    fn bump(&self, key: String, window_sec: u64) -> WindowCount {
        let mut inner = self.inner.lock().expect("guard store poisoned");
        let now = Utc::now();
        let entry = inner
            .windows
            .entry(key)
            .or_insert((0, now + chrono::Duration::seconds(window_sec as i64)));
        if entry.1 <= now {
            // Window elapsed; start a fresh one.
            *entry = (0, now + chrono::Duration::seconds(window_sec as i64));
        }
        entry.0 += 1;
        WindowCount {
            count: entry.0,
            ms_remaining: (entry.1 - now).num_milliseconds().max(0),
        }
    }
}

impl Default for MemoryGuardStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GuardStore for MemoryGuardStore {
    async fn incr_request(&self, key: &str, window_sec: u64) -> Result<WindowCount, StoreError> {
        Ok(self.bump(format!("req:{key}"), window_sec))
    }

    async fn incr_payload(
        &self,
        key: &str,
        payload_hash: &str,
        window_sec: u64,
    ) -> Result<u32, StoreError> {
        Ok(self.bump(format!("payload:{key}:{payload_hash}"), window_sec).count)
    }

    async fn incr_failure(&self, key: &str, window_sec: u64) -> Result<u32, StoreError> {
        Ok(self.bump(format!("fail:{key}"), window_sec).count)
    }

    async fn save_ban(&self, ban: &Ban) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("guard store poisoned");
        inner.bans.push(ban.clone());
        Ok(())
    }

    async fn bans_for_identity(
        &self,
        ip: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<Vec<Ban>, StoreError> {
        let inner = self.inner.lock().expect("guard store poisoned");
        Ok(inner
            .bans
            .iter()
            .filter(|ban| ban.matches_identity(ip, fingerprint))
            .cloned()
            .collect())
    }

    async fn remove_ban(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().expect("guard store poisoned");
        let before = inner.bans.len();
        inner.bans.retain(|ban| ban.id != id);
        Ok(inner.bans.len() < before)
    }
}
