//! Free/pro usage metering.
//!
//! Free identities get a fixed number of generations per UTC day; pro
//! identities are unlimited and never metered. Counters live behind the
//! [`UsageStore`] trait so a deployment can back them with something that
//! survives restarts and is shared between instances.

use crate::error::UsageError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Mutex;
use tracing::{debug, info};

/// Generations counted for one identity on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub count: u32,
}

impl UsageRecord {
    /// The count to use on `today`; a record from another day counts as zero.
    pub fn count_on(&self, today: NaiveDate) -> u32 {
        if self.date == today { self.count } else { 0 }
    }
}

/// A gate's answer about one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStatus {
    pub allowed: bool,
    pub is_pro: bool,
    /// Generations left today; `None` for unlimited
    pub remaining: Option<u32>,
    pub limit: u32,
}

/// Backing storage for usage counters.
///
/// `try_consume` and `refund` must each be atomic per identity: concurrent
/// requests from one identity are only limited correctly if the day rollover,
/// the limit check and the increment happen as a single step.
#[async_trait]
pub trait UsageStore: Send + Sync + Debug {
    async fn record(&self, identity: &str) -> Result<Option<UsageRecord>, UsageError>;
    async fn save(&self, identity: &str, record: UsageRecord) -> Result<(), UsageError>;
    async fn is_pro(&self, identity: &str) -> Result<bool, UsageError>;
    async fn set_pro(&self, identity: &str, pro: bool) -> Result<(), UsageError>;

    /// Count one use on `today` unless that would exceed `limit`.
    ///
    /// Returns the updated record, or `None` when the limit is already reached.
    async fn try_consume(
        &self,
        identity: &str,
        today: NaiveDate,
        limit: u32,
    ) -> Result<Option<UsageRecord>, UsageError>;

    /// Give back one use counted on `today`. A record from another day is left alone.
    async fn refund(&self, identity: &str, today: NaiveDate) -> Result<(), UsageError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    records: HashMap<String, UsageRecord>,
    pro: HashSet<String>,
}

/// Process-local store; counters are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    state: Mutex<MemoryState>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, UsageError> {
        self.state.lock().map_err(|e| UsageError::Store(e.to_string()))
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn record(&self, identity: &str) -> Result<Option<UsageRecord>, UsageError> {
        Ok(self.lock()?.records.get(identity).copied())
    }

    async fn save(&self, identity: &str, record: UsageRecord) -> Result<(), UsageError> {
        self.lock()?.records.insert(identity.to_string(), record);
        Ok(())
    }

    async fn is_pro(&self, identity: &str) -> Result<bool, UsageError> {
        Ok(self.lock()?.pro.contains(identity))
    }

    async fn set_pro(&self, identity: &str, pro: bool) -> Result<(), UsageError> {
        let mut state = self.lock()?;
        if pro {
            state.pro.insert(identity.to_string());
        } else {
            state.pro.remove(identity);
        }
        Ok(())
    }

    async fn try_consume(
        &self,
        identity: &str,
        today: NaiveDate,
        limit: u32,
    ) -> Result<Option<UsageRecord>, UsageError> {
        let mut state = self.lock()?;
        let used = state.records.get(identity).map_or(0, |record| record.count_on(today));
        if used >= limit {
            return Ok(None);
        }
        let record = UsageRecord { date: today, count: used + 1 };
        state.records.insert(identity.to_string(), record);
        Ok(Some(record))
    }

    async fn refund(&self, identity: &str, today: NaiveDate) -> Result<(), UsageError> {
        let mut state = self.lock()?;
        if let Some(record) = state.records.get_mut(identity) {
            if record.date == today {
                record.count = record.count.saturating_sub(1);
            }
        }
        Ok(())
    }
}

/// Daily quota check and metering over a [`UsageStore`].
#[derive(Debug)]
pub struct UsageGate<S: UsageStore> {
    store: S,
    daily_limit: u32,
}

impl<S: UsageStore> UsageGate<S> {
    pub fn new(store: S, daily_limit: u32) -> Self {
        Self { store, daily_limit }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub async fn check(&self, identity: &str) -> Result<UsageStatus, UsageError> {
        self.check_on(identity, today()).await
    }

    /// Status of `identity` as of `today`.
    pub async fn check_on(&self, identity: &str, today: NaiveDate) -> Result<UsageStatus, UsageError> {
        if self.store.is_pro(identity).await? {
            return Ok(UsageStatus { allowed: true, is_pro: true, remaining: None, limit: self.daily_limit });
        }

        let used = self
            .store
            .record(identity)
            .await?
            .map_or(0, |record| record.count_on(today));
        let remaining = self.daily_limit.saturating_sub(used);

        Ok(UsageStatus {
            allowed: remaining > 0,
            is_pro: false,
            remaining: Some(remaining),
            limit: self.daily_limit,
        })
    }

    pub async fn admit(&self, identity: &str) -> Result<UsageStatus, UsageError> {
        self.admit_on(identity, today()).await
    }

    /// Like [`check_on`](Self::check_on) but fails with `LimitReached` when not allowed.
    pub async fn admit_on(&self, identity: &str, today: NaiveDate) -> Result<UsageStatus, UsageError> {
        let status = self.check_on(identity, today).await?;
        if !status.allowed {
            info!(identity, limit = self.daily_limit, "Daily limit reached");
            return Err(UsageError::LimitReached { limit: self.daily_limit });
        }
        Ok(status)
    }

    pub async fn record_generation(&self, identity: &str) -> Result<(), UsageError> {
        self.record_generation_on(identity, today()).await
    }

    /// Count one generation for `identity` on `today`. Pro identities are not metered.
    pub async fn record_generation_on(&self, identity: &str, today: NaiveDate) -> Result<(), UsageError> {
        if self.store.is_pro(identity).await? {
            return Ok(());
        }
        if let Some(record) = self.store.try_consume(identity, today, u32::MAX).await? {
            debug!(identity, count = record.count, "Recorded generation");
        }
        Ok(())
    }

    /// Admit `identity` and count the generation in one atomic step.
    ///
    /// Returns the status after counting. Pair with [`release_on`](Self::release_on)
    /// when the generation then fails.
    pub async fn reserve_on(&self, identity: &str, today: NaiveDate) -> Result<UsageStatus, UsageError> {
        if self.store.is_pro(identity).await? {
            return Ok(UsageStatus { allowed: true, is_pro: true, remaining: None, limit: self.daily_limit });
        }
        let Some(record) = self.store.try_consume(identity, today, self.daily_limit).await? else {
            info!(identity, limit = self.daily_limit, "Daily limit reached");
            return Err(UsageError::LimitReached { limit: self.daily_limit });
        };
        let remaining = self.daily_limit.saturating_sub(record.count);
        debug!(identity, count = record.count, "Reserved generation");
        Ok(UsageStatus { allowed: remaining > 0, is_pro: false, remaining: Some(remaining), limit: self.daily_limit })
    }

    /// Undo a [`reserve_on`](Self::reserve_on) made on `today`.
    pub async fn release_on(&self, identity: &str, today: NaiveDate) -> Result<(), UsageError> {
        debug!(identity, "Releasing reserved generation");
        self.store.refund(identity, today).await
    }

    /// Mark `identity` as pro, e.g. after a verified payment.
    pub async fn upgrade(&self, identity: &str) -> Result<(), UsageError> {
        info!(identity, "Upgrading identity to pro");
        self.store.set_pro(identity, true).await
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Identity a request is metered under: the first `X-Forwarded-For` entry, else the peer address.
pub fn client_identity(forwarded_for: Option<&str>, peer: &str) -> String {
    forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .unwrap_or(peer)
        .to_string()
}
