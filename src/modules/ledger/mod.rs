pub mod models;
pub mod repositories;
pub mod services;

pub use models::{
    ChargeState, ChargeStatus, ChargeUpdate, Client, ClientSeed, Company, MergeOutcome, NewClient,
    NewPayment, NewServiceOrder, NewWebhookEvent, Payment, PixData, ServiceOrder,
    ServiceOrderStatus, ServicePricing, SeverityTier, SplitMetadata, Subaccount, UpdateSource,
    WebhookEvent,
};
pub use repositories::{LedgerStore, MySqlLedgerStore, Upserted};
pub use services::{ChargeProjector, ProjectionResult, SideResult};
