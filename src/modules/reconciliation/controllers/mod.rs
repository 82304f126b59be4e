pub mod force_sync_controller;

pub use force_sync_controller::configure;
