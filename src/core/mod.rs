pub mod aggregate;
pub mod period;
pub mod render;
pub mod report;

pub use crate::domain::model::{AggregationResult, EmailMessage, Order, OrderItem, ReportingWindow};
pub use crate::domain::ports::{EmailDispatcher, OrderStore};
pub use crate::utils::error::Result;
