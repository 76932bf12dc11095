pub mod client;
pub mod error;
pub mod schema;

pub use client::{AdjustmentConfig, HttpAdjustmentSource};
pub use error::{AdjustmentError, AdjustmentResult};
pub use schema::{parse_signals, validate_signals};
