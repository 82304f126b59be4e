pub mod controllers;
pub mod models;
pub mod services;

pub use controllers::configure;
pub use models::{ItemOutcome, SyncError, SyncReport, TargetedSyncResult};
pub use services::{ForceSyncService, SyncSettings};
