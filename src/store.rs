use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{TripPatch, TripRecord};
use crate::redis::RedisManager;

/// Single-slot home of the current [`TripRecord`]. Last writer wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn get(&self) -> Result<Option<TripRecord>>;

    /// Replace the stored record wholesale.
    async fn set(&self, record: &TripRecord) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Shallow-merge `patch` into the stored record and persist the result.
    /// Returns `None` without writing when nothing is stored.
    async fn merge(&self, patch: &TripPatch) -> Result<Option<TripRecord>> {
        let Some(current) = self.get().await? else {
            return Ok(None);
        };
        let merged = current.apply(patch)?;
        self.set(&merged).await?;
        Ok(Some(merged))
    }
}

/// In-process store, used by tests and the default memory backend.
#[derive(Default)]
pub struct MemoryTripStore {
    slot: RwLock<Option<TripRecord>>,
}

impl MemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn get(&self) -> Result<Option<TripRecord>> {
        Ok(self.slot.read().await.clone())
    }

    async fn set(&self, record: &TripRecord) -> Result<()> {
        *self.slot.write().await = Some(record.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

pub struct RedisTripStore {
    redis: Arc<RedisManager>,
    key: String,
}

impl RedisTripStore {
    pub fn new(redis: Arc<RedisManager>, key: String) -> Self {
        Self { redis, key }
    }
}

#[async_trait]
impl TripStore for RedisTripStore {
    async fn get(&self) -> Result<Option<TripRecord>> {
        let Some(raw) = self.redis.get_string(&self.key).await? else {
            return Ok(None);
        };
        Ok(decode_slot(&self.key, &raw))
    }

    async fn set(&self, record: &TripRecord) -> Result<()> {
        self.redis.set_json(&self.key, record).await
    }

    async fn clear(&self) -> Result<()> {
        self.redis.delete(&self.key).await
    }
}

/// Slots may hold records written by older clients with optional fields
/// missing, or garbage; unusable contents read as an empty slot.
fn decode_slot(key: &str, raw: &str) -> Option<TripRecord> {
    match TripRecord::from_reply(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("Ignoring unusable trip record stored at {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TripRelayError;

    fn sample() -> TripRecord {
        TripRecord {
            destination: "Dubai, UAE".to_string(),
            origin: "Hyderabad, India".to_string(),
            travelers: 4,
            duration: "7 days".to_string(),
            start_date: "2024-10-10".to_string(),
            end_date: "2024-10-17".to_string(),
            budget: "Not specified".to_string(),
            interests: vec![],
            travel_mode: "Flight".to_string(),
        }
    }

    #[test]
    fn test_decode_slot_fills_optional_fields() {
        let record = decode_slot(
            "tripData",
            r#"{"destination": "Dubai, UAE", "origin": "Not specified", "travelers": 4, "duration": "7 days", "startDate": "2024-10-10", "endDate": "2024-10-17"}"#,
        )
        .expect("older record shape should load");
        assert_eq!(record.budget, "Not specified");
        assert!(record.interests.is_empty());
        assert_eq!(record.travel_mode, "Flight");
    }

    #[test]
    fn test_decode_slot_treats_garbage_as_empty() {
        assert!(decode_slot("tripData", "{not json").is_none());
        assert!(decode_slot("tripData", r#"{"destination": "Dubai, UAE"}"#).is_none());
    }

    #[test]
    fn test_decode_slot_reads_back_serialized_record() {
        let raw = serde_json::to_string(&sample()).unwrap();
        assert_eq!(decode_slot("tripData", &raw), Some(sample()));
    }

    #[tokio::test]
    async fn test_set_get_clear() {
        let store = MemoryTripStore::new();
        assert!(store.get().await.unwrap().is_none());

        store.set(&sample()).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(sample()));

        store.clear().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_on_empty_slot_is_noop() {
        let store = MemoryTripStore::new();
        let patch = TripPatch {
            budget: Some("$2000".to_string()),
            ..Default::default()
        };
        assert!(store.merge(&patch).await.unwrap().is_none());
        assert!(store.get().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_persists_the_merged_record() {
        let store = MemoryTripStore::new();
        store.set(&sample()).await.unwrap();

        let patch = TripPatch {
            budget: Some("$2000".to_string()),
            ..Default::default()
        };
        let merged = store.merge(&patch).await.unwrap().unwrap();
        assert_eq!(merged.budget, "$2000");
        assert_eq!(merged.destination, "Dubai, UAE");
        assert_eq!(store.get().await.unwrap(), Some(merged));
    }

    #[tokio::test]
    async fn test_invalid_merge_leaves_slot_untouched() {
        let store = MemoryTripStore::new();
        store.set(&sample()).await.unwrap();

        let patch = TripPatch {
            travelers: Some(0),
            ..Default::default()
        };
        let err = store.merge(&patch).await.unwrap_err();
        assert!(matches!(err, TripRelayError::Extraction(_)));
        assert_eq!(store.get().await.unwrap(), Some(sample()));
    }
}
