pub mod charges;
pub mod gateways;
pub mod health;
pub mod ledger;
pub mod reconciliation;
pub mod splits;
pub mod webhooks;
