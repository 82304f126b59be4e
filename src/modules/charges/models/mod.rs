pub mod charge_view;
pub mod requests;

pub use charge_view::{ChargeDescriptor, ChargeView};
pub use requests::{CreateServiceOrderRequest, ManualPaymentRequest};
