pub mod force_sync;

pub use force_sync::{ForceSyncService, SyncSettings};
