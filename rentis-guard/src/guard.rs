//! The per-identity gate in front of public order creation.
//!
//! Clean -> Throttled -> Banned. Every decision is recomputed from the
//! persisted store state; nothing is cached in-process, so concurrent
//! workers sharing the store agree.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use rentis_shared::events::BanIssuedEvent;

use crate::ban::Ban;
use crate::config::GuardConfig;
use crate::store::GuardStore;
use crate::GuardResult;

/// Request identity: fingerprint preferred when present, IP otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKey {
    pub ip: Option<String>,
    pub fingerprint: Option<String>,
}

impl IdentityKey {
    pub fn new(ip: Option<String>, fingerprint: Option<String>) -> Self {
        Self { ip, fingerprint }
    }

    /// The counter key. Fingerprints survive NAT and proxy churn, so they
    /// win over IPs when both are known.
    pub fn key(&self) -> &str {
        self.fingerprint
            .as_deref()
            .or(self.ip.as_deref())
            .unwrap_or("anonymous")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum GuardDecision {
    /// Proceed to business logic.
    Allow,
    /// Retryable after `ms_before_next`; no ban record is created.
    #[serde(rename_all = "camelCase")]
    RateLimited { ms_before_next: i64 },
    /// Non-retryable until ban expiry.
    Banned { reason: String },
}

/// Stable hash of a submission body, used to spot identical-payload floods.
pub fn payload_fingerprint(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

pub struct AbuseGuard {
    store: Arc<dyn GuardStore>,
    config: GuardConfig,
}

impl AbuseGuard {
    pub fn new(store: Arc<dyn GuardStore>, config: GuardConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// The persisted state, shared with the admin ban-management surface.
    pub fn store(&self) -> &Arc<dyn GuardStore> {
        &self.store
    }

    /// Any non-expired ban on either identity field.
    pub async fn is_banned(&self, ip: Option<&str>, fingerprint: Option<&str>) -> GuardResult<bool> {
        let bans = self.store.bans_for_identity(ip, fingerprint).await?;
        let now = chrono::Utc::now();
        Ok(bans.iter().any(|ban| ban.is_active(now)))
    }

    /// Rate-limit window only: `Some(ms_before_next)` when throttled.
    /// Exhausting tokens never creates a ban record.
    pub async fn check_rate(&self, identity: &IdentityKey) -> GuardResult<Option<i64>> {
        let window = self
            .store
            .incr_request(identity.key(), self.config.rate_limit_window_sec)
            .await?;

        if window.count > self.config.rate_limit_max {
            tracing::warn!(key = identity.key(), count = window.count, "rate limit hit");
            return Ok(Some(window.ms_remaining));
        }
        Ok(None)
    }

    /// The gate run before business logic: ban lookup first, then the
    /// rate-limit window.
    pub async fn check_request(&self, identity: &IdentityKey) -> GuardResult<GuardDecision> {
        if self
            .is_banned(identity.ip.as_deref(), identity.fingerprint.as_deref())
            .await?
        {
            return Ok(GuardDecision::Banned {
                reason: "identity is banned".into(),
            });
        }

        match self.check_rate(identity).await? {
            Some(ms_before_next) => Ok(GuardDecision::RateLimited { ms_before_next }),
            None => Ok(GuardDecision::Allow),
        }
    }

    /// Record a submission body; crossing the identical-payload threshold
    /// escalates to an auto-ban.
    pub async fn note_submission(
        &self,
        identity: &IdentityKey,
        payload: &[u8],
    ) -> GuardResult<Option<Ban>> {
        let hash = payload_fingerprint(payload);
        let count = self
            .store
            .incr_payload(identity.key(), &hash, self.config.abuse_window_sec)
            .await?;

        if count >= self.config.abuse_identical_payload_max {
            return self
                .escalate(identity, "repeated identical booking payloads")
                .await
                .map(Some);
        }
        Ok(None)
    }

    /// Record a failed/conflicting attempt; crossing the threshold
    /// escalates to an auto-ban.
    pub async fn note_failure(&self, identity: &IdentityKey) -> GuardResult<Option<Ban>> {
        let count = self
            .store
            .incr_failure(identity.key(), self.config.abuse_window_sec)
            .await?;

        if count >= self.config.abuse_failed_attempts_max {
            return self
                .escalate(identity, "repeated failed booking attempts")
                .await
                .map(Some);
        }
        Ok(None)
    }

    async fn escalate(&self, identity: &IdentityKey, reason: &str) -> GuardResult<Ban> {
        let ban = Ban::auto(
            identity.ip.clone(),
            identity.fingerprint.clone(),
            reason,
            self.config.auto_ban_duration_sec,
        )?;
        self.store.save_ban(&ban).await?;
        tracing::warn!(key = identity.key(), reason, ban_id = %ban.id, "auto-ban issued");
        rentis_shared::events::emit(
            "ban.issued",
            &BanIssuedEvent {
                ban_id: ban.id,
                reason: ban.reason.clone(),
                auto: true,
                expires_at: ban.expires_at.map(|at| at.timestamp()),
                timestamp: ban.created_at.timestamp(),
            },
        );
        Ok(ban)
    }
}
