pub mod sync_report;

pub use sync_report::{ItemOutcome, SyncError, SyncReport, TargetedSyncResult};
