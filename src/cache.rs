// =============================================================================
// REPORT CACHE MODULE
// =============================================================================
// Caches computed reports in Redis.
//
// A report is fully determined by its input snapshot and the pinned "now",
// so the cache key is a SHA-256 fingerprint of exactly those two things.
// Identical input always maps to the same key; any change to a record maps
// to a new key, so nothing ever needs explicit invalidation. Entries expire
// after the configured TTL.
// =============================================================================

use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::AppResult;
use crate::metrics;
use crate::models::{AnalyticsReport, Snapshot};

const KEY_PREFIX: &str = "analytics:report";

/// Fingerprint of a snapshot at an instant, as lowercase hex
pub fn fingerprint(snapshot: &Snapshot, now: DateTime<Utc>) -> AppResult<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(snapshot).map_err(anyhow::Error::from)?);
    hasher.update(b"|");
    hasher.update(now.to_rfc3339_opts(SecondsFormat::Micros, true).as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// -----------------------------------------------------------------------------
// REPORT CACHE
// -----------------------------------------------------------------------------
#[derive(Clone)]
pub struct ReportCache {
    redis: redis::aio::ConnectionManager,
    ttl_secs: u64,
}

impl ReportCache {
    pub fn new(redis: redis::aio::ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    /// Connect to Redis. ConnectionManager reconnects on its own afterwards.
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self::new(redis, ttl_secs))
    }

    fn key(fingerprint: &str) -> String {
        format!("{}:{}", KEY_PREFIX, fingerprint)
    }

    /// Look up a cached report. An entry that no longer parses is a miss.
    pub async fn get(&self, fingerprint: &str) -> AppResult<Option<AnalyticsReport>> {
        let start = Instant::now();
        let cached: Option<String> = redis::cmd("GET")
            .arg(Self::key(fingerprint))
            .query_async(&mut self.redis.clone())
            .await?;
        metrics::record_redis_operation("get", start.elapsed().as_secs_f64());

        Ok(cached.and_then(|json| match serde_json::from_str(&json) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(fingerprint, error = %e, "Discarding unreadable cached report");
                None
            }
        }))
    }

    pub async fn put(&self, fingerprint: &str, report: &AnalyticsReport) -> AppResult<()> {
        let start = Instant::now();
        let json = serde_json::to_string(report).map_err(anyhow::Error::from)?;
        redis::cmd("SETEX")
            .arg(Self::key(fingerprint))
            .arg(self.ttl_secs)
            .arg(json)
            .query_async::<_, ()>(&mut self.redis.clone())
            .await?;
        metrics::record_redis_operation("set", start.elapsed().as_secs_f64());
        Ok(())
    }

    pub async fn ping(&self) -> bool {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.redis.clone())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::Coupon;

    #[test]
    fn test_fingerprint_is_stable_and_input_sensitive() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let mut snapshot = Snapshot::default();

        let first = fingerprint(&snapshot, now).unwrap();
        assert_eq!(first, fingerprint(&snapshot, now).unwrap());
        assert_eq!(first.len(), 64);

        let later = fingerprint(&snapshot, now + chrono::Duration::seconds(1)).unwrap();
        assert_ne!(first, later);

        snapshot.coupons.push(Coupon {
            code: "VIP".to_string(),
            discount_percent: Some(10.0),
            is_active: true,
            usage_count: None,
        });
        assert_ne!(first, fingerprint(&snapshot, now).unwrap());
    }

    #[test]
    fn test_key_is_prefixed() {
        assert_eq!(ReportCache::key("abc"), "analytics:report:abc");
    }
}
