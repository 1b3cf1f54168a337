use crate::domain::model::{DispatchReceipt, EmailMessage, Order, OrderStatus, ReportingWindow};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Read side of the ordering database.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders with `status` placed inside `window`, newest first.
    async fn fetch_orders(&self, status: OrderStatus, window: &ReportingWindow)
        -> Result<Vec<Order>>;
}

#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<DispatchReceipt>;
}
