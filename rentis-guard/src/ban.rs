use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{GuardError, GuardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BanType {
    Manual,
    Auto,
}

/// A ban record. At least one of `ip` / `fingerprint` is always set.
///
/// Expiry is lazy: a ban past its `expires_at` is simply inactive at read
/// time; sweeping stale rows is the datastore's business. Manual bans may
/// carry `expires_at: None`, meaning permanent until explicitly removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ban {
    pub id: Uuid,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub reason: String,
    #[serde(rename = "type")]
    pub ban_type: BanType,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ban {
    fn build(
        ip: Option<String>,
        fingerprint: Option<String>,
        reason: String,
        ban_type: BanType,
        expires_at: Option<DateTime<Utc>>,
    ) -> GuardResult<Self> {
        if ip.is_none() && fingerprint.is_none() {
            return Err(GuardError::Validation(
                "a ban needs an ip or a fingerprint".into(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            ip,
            fingerprint,
            reason,
            ban_type,
            expires_at,
            created_at: Utc::now(),
        })
    }

    pub fn manual(
        ip: Option<String>,
        fingerprint: Option<String>,
        reason: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> GuardResult<Self> {
        Self::build(ip, fingerprint, reason.into(), BanType::Manual, expires_at)
    }

    pub fn auto(
        ip: Option<String>,
        fingerprint: Option<String>,
        reason: impl Into<String>,
        duration_sec: u64,
    ) -> GuardResult<Self> {
        let expires_at = Utc::now() + chrono::Duration::seconds(duration_sec as i64);
        Self::build(ip, fingerprint, reason.into(), BanType::Auto, Some(expires_at))
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }

    /// Does this ban hit either identity field of a request?
    pub fn matches_identity(&self, ip: Option<&str>, fingerprint: Option<&str>) -> bool {
        let ip_hit = matches!((self.ip.as_deref(), ip), (Some(a), Some(b)) if a == b);
        let fp_hit =
            matches!((self.fingerprint.as_deref(), fingerprint), (Some(a), Some(b)) if a == b);
        ip_hit || fp_hit
    }
}
