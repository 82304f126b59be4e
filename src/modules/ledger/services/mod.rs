pub mod projector;

pub use projector::{ChargeProjector, ProjectionResult, SideResult};
