//! Domain models for the offline track cache
//!
//! This module contains the cached-entry model with validation and the
//! payload-free summary used for listings and eviction snapshots.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

/// Identifier of a cached track.
///
/// Opaque to the cache: whatever the streaming backend uses as a stable track
/// key. Only an empty or whitespace-only id is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse an id, rejecting empty values
    pub fn from_string(s: &str) -> Result<Self, String> {
        if s.trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Track Metadata
// =============================================================================

/// Caller-supplied descriptive fields for a cached track.
///
/// Stored and returned verbatim. The typed accessors read the fields the
/// player UI conventionally supplies; any other keys round-trip untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackMetadata(Map<String, Value>);

impl TrackMetadata {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert of an arbitrary field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }

    pub fn artist(&self) -> Option<&str> {
        self.0.get("artist").and_then(Value::as_str)
    }

    /// Duration in seconds, when the caller supplied a numeric `duration`
    pub fn duration(&self) -> Option<f64> {
        self.0.get("duration").and_then(Value::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode for storage
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    /// Decode from storage. Anything other than a JSON object is rejected.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<Map<String, Value>>(raw).map(Self)
    }
}

impl From<Map<String, Value>> for TrackMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// =============================================================================
// Cache Entry
// =============================================================================

/// A cached track: metadata, the media payload and its access accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: TrackId,
    pub metadata: TrackMetadata,
    pub payload: Bytes,
    /// Length of `payload` at admission time
    pub byte_size: u64,
    /// Unix millis of first admission
    pub cached_at: i64,
    /// Unix millis of the most recent successful read
    pub last_accessed_at: Option<i64>,
    pub access_count: u64,
}

impl CacheEntry {
    /// Build a fresh, never-read entry. `byte_size` is derived from the payload.
    pub fn new(id: TrackId, metadata: TrackMetadata, payload: Bytes, cached_at: i64) -> Self {
        let byte_size = payload.len() as u64;
        Self {
            id,
            metadata,
            payload,
            byte_size,
            cached_at,
            last_accessed_at: None,
            access_count: 0,
        }
    }

    /// Validate entry data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.as_str().trim().is_empty() {
            return Err("Track id cannot be empty".to_string());
        }

        if self.byte_size != self.payload.len() as u64 {
            return Err(format!(
                "Byte size {} does not match payload length {}",
                self.byte_size,
                self.payload.len()
            ));
        }

        if self.cached_at < 0 {
            return Err("Cached timestamp cannot be negative".to_string());
        }

        Ok(())
    }

    /// Apply the effect of one successful read
    pub fn record_access(&mut self, accessed_at: i64) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = Some(accessed_at);
    }
}

/// Payload-free view of a cached track.
///
/// Returned by listings and used as the eviction snapshot. `sequence` is the
/// store's insertion order and breaks ties between entries cached in the same
/// millisecond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTrackSummary {
    pub id: TrackId,
    pub metadata: TrackMetadata,
    pub byte_size: u64,
    pub cached_at: i64,
    pub last_accessed_at: Option<i64>,
    pub access_count: u64,
    pub sequence: i64,
}

impl CachedTrackSummary {
    /// Eviction order key: least used first, then oldest, then first inserted
    pub fn eviction_key(&self) -> (u64, i64, i64) {
        (self.access_count, self.cached_at, self.sequence)
    }
}

/// What a full wipe removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearOutcome {
    pub entries: u64,
    pub bytes: u64,
}
