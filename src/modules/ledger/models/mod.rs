pub mod charge;
pub mod party;
pub mod payment;
pub mod pricing;
pub mod service_order;
pub mod status;
pub mod webhook_event;

pub use charge::{ChargeState, ChargeUpdate, MergeOutcome, PixData, UpdateSource};
pub use party::{normalize_tax_id, Client, ClientSeed, Company, NewClient, Subaccount};
pub use payment::{NewPayment, Payment};
pub use pricing::{ServicePricing, SeverityTier};
pub use service_order::{NewServiceOrder, ServiceOrder, SplitMetadata};
pub use status::{ChargeStatus, ServiceOrderStatus};
pub use webhook_event::{NewWebhookEvent, WebhookEvent};
