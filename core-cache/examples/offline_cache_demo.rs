//! # Offline Cache Example
//!
//! Admits a few synthetic tracks into a small file-backed cache, plays some of
//! them, and shows which tracks the eviction policy keeps once space runs out.
//!
//! Run with: `cargo run --example offline_cache_demo --package core-cache`

use bridge_traits::database::{DatabaseAdapter, DatabaseConfig};
use bridge_traits::time::LogLevel;
use bytes::Bytes;
use core_cache::{CacheConfig, OfflineCache};
use core_library::adapters::SqliteAdapter;
use core_library::{TrackId, TrackMetadata};
use core_runtime::events::{CoreEvent, EventStream};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::sync::Arc;

const KIB: usize = 1024;

fn synthetic_track(n: usize, size: usize) -> (TrackId, TrackMetadata, Bytes) {
    let id = TrackId::new(format!("track-{:02}", n));
    let metadata = TrackMetadata::new()
        .with("title", format!("Demo Song {}", n))
        .with("artist", "Offline Demo")
        .with("duration", 30.0 * n as f64);
    let payload = Bytes::from(vec![n as u8; size]);
    (id, metadata, payload)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    let dir = std::env::temp_dir().join("offline-cache-demo");
    std::fs::create_dir_all(&dir)?;
    let db: Arc<dyn DatabaseAdapter> =
        Arc::new(SqliteAdapter::new(DatabaseConfig::new(dir.join("offline.db"))).await?);

    let cache = Arc::new(OfflineCache::new(
        CacheConfig::new().with_max_size(256 * KIB as u64),
        db.clone(),
    ));
    cache.initialize().await?;
    cache.clear_all().await?;

    let mut events = EventStream::new(cache.event_bus().subscribe());

    println!("\n=== Admitting tracks ===");
    for n in 1..=4 {
        let (id, metadata, payload) = synthetic_track(n, 60 * KIB);
        cache.admit(id, metadata, payload).await?;
    }

    println!("\n=== Playing track-01 three times and track-03 once ===");
    for _ in 0..3 {
        cache.fetch(&TrackId::new("track-01")).await?;
    }
    cache.fetch(&TrackId::new("track-03")).await?;

    println!("\n=== Admitting two more tracks into a full cache ===");
    for n in 5..=6 {
        let (id, metadata, payload) = synthetic_track(n, 60 * KIB);
        cache.admit(id, metadata, payload).await?;
    }

    println!("\n=== Cached tracks ===");
    for track in cache.list_cached_tracks().await? {
        println!(
            "  {:<10} {:<14} {:>7} bytes  played {} times",
            track.id,
            track.metadata.title().unwrap_or("?"),
            track.byte_size,
            track.access_count
        );
    }

    let stats = cache.stats().await?;
    println!(
        "\n{} tracks, {} of {} bytes ({:.1}% used)",
        stats.entry_count, stats.current_bytes, stats.max_bytes, stats.percent_used
    );

    let mut changes = 0;
    while let Some(Ok(CoreEvent::Cache(_))) = events.try_recv() {
        changes += 1;
    }
    println!("{} cache change notifications", changes);

    db.close().await?;
    Ok(())
}
