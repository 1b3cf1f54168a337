use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Sent,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Sent => "sent",
            OrderStatus::Other => "other",
        }
    }

    pub fn is_reportable(self) -> bool {
        self == OrderStatus::Sent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub quantity: u32,
    pub food_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_time: DateTime<Utc>,
    pub status: OrderStatus,
    pub company_name: Option<String>,
    pub items: Vec<OrderItem>,
}

/// Half-open `[start, end)` interval in absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl ReportingWindow {
    pub fn local_start(&self) -> DateTime<FixedOffset> {
        self.start.with_timezone(&self.offset)
    }

    pub fn local_end(&self) -> DateTime<FixedOffset> {
        self.end.with_timezone(&self.offset)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemTotal {
    pub name: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyTotals {
    pub name: String,
    pub items: Vec<ItemTotal>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationResult {
    pub header_company: String,
    pub companies: Vec<CompanyTotals>,
    /// Totals per food across every company, in first-seen order.
    pub items: Vec<ItemTotal>,
    pub total: u64,
    pub order_count: usize,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchReceipt {
    pub message_id: Option<String>,
}
