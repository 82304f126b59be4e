//! PIX billing for traffic-ticket disputes.
//!
//! Creates split charges on Asaas, ingests its webhooks and reconciles the
//! local payment and service-order ledgers against the gateway.

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

pub use modules::charges;
pub use modules::gateways;
pub use modules::ledger;
pub use modules::reconciliation;
pub use modules::splits;
pub use modules::webhooks;
