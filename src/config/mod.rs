// src/config/mod.rs
//! Immutable configuration loaded once at startup: the trigger taxonomy
//! (`config/triggers.toml`) and the remote classifier (`config/remote.json`).

pub mod remote;
pub mod triggers;

pub use remote::RemoteConfig;
pub use triggers::{MatchMode, Tone, ToneMap, TriggerConfig, TriggerConfigBuilder, TriggerDef};
