pub mod models;
pub mod services;

pub use models::{CostModel, Split, SplitPlan};
pub use services::{SplitCalculator, SplitInput};
