pub mod cost_model;
pub mod split;

pub use cost_model::CostModel;
pub use split::{Split, SplitPlan};
