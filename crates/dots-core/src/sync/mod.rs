//! Reconciliation between tracked files and the remote
//!
//! This module provides:
//! - **classify**: the pure drift-state function
//! - **engine**: listing, classification, transfer batches, and conflict resolution
//! - **report**: batch reports and the published engine snapshot

mod classify;
mod engine;
mod report;

pub use classify::{Fingerprint, classify};
pub use engine::SyncEngine;
pub use report::{EngineSnapshot, ResolutionOutcome, SyncOptions, SyncReport};
