//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the offline cache crates:
//! - Logging and tracing bootstrap, with optional forwarding to a host `LoggerSink`
//! - Event bus carrying cache change notifications
//!
//! ## Overview
//!
//! Hosts call [`logging::init_logging`] once at startup and hand an
//! [`events::EventBus`] to the cache so UI surfaces can subscribe to
//! [`events::CacheEvent`]s.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
