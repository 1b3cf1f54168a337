use crate::core::{Order, OrderItem, OrderStore, ReportingWindow};
use crate::domain::model::OrderStatus;
use crate::utils::error::{ReportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const ORDER_SELECT: &str = "id,order_time,status,companies(name),order_items(quantity,foods(name))";

#[derive(Debug, Deserialize)]
struct NamedRow {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderItemRow {
    quantity: u32,
    foods: Option<NamedRow>,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    id: serde_json::Value,
    order_time: DateTime<Utc>,
    status: Option<OrderStatus>,
    companies: Option<NamedRow>,
    #[serde(default)]
    order_items: Option<Vec<OrderItemRow>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        let id = match row.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Order {
            id,
            order_time: row.order_time,
            status: row.status.unwrap_or(OrderStatus::Other),
            company_name: row.companies.and_then(|c| c.name),
            items: row
                .order_items
                .unwrap_or_default()
                .into_iter()
                .map(|item| OrderItem {
                    quantity: item.quantity,
                    food_name: item.foods.and_then(|f| f.name),
                })
                .collect(),
        }
    }
}

/// Reads orders through Supabase's PostgREST endpoint.
#[derive(Debug, Clone)]
pub struct PostgrestOrderStore {
    client: Client,
    orders_url: Url,
    api_key: String,
}

impl PostgrestOrderStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            orders_url: base.join("rest/v1/orders")?,
            api_key: api_key.to_string(),
        })
    }

    fn fetch_error(message: impl Into<String>) -> ReportError {
        ReportError::FetchError {
            message: message.into(),
        }
    }
}

#[async_trait]
impl OrderStore for PostgrestOrderStore {
    async fn fetch_orders(
        &self,
        status: OrderStatus,
        window: &ReportingWindow,
    ) -> Result<Vec<Order>> {
        let status_filter = format!("eq.{}", status.as_str());
        let lower = format!("gte.{}", window.start.to_rfc3339_opts(SecondsFormat::Millis, true));
        let upper = format!("lt.{}", window.end.to_rfc3339_opts(SecondsFormat::Millis, true));

        tracing::debug!(url = %self.orders_url, %lower, %upper, "Querying orders");
        let response = self
            .client
            .get(self.orders_url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[
                ("select", ORDER_SELECT),
                ("status", status_filter.as_str()),
                ("order_time", lower.as_str()),
                ("order_time", upper.as_str()),
                ("order", "order_time.desc"),
            ])
            .send()
            .await
            .map_err(|e| Self::fetch_error(format!("request failed: {}", e)))?;

        let http_status = response.status();
        tracing::debug!(status = %http_status, "Order query response");
        if !http_status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::fetch_error(format!(
                "order query returned {}: {}",
                http_status, body
            )));
        }

        let rows: Vec<OrderRow> = response
            .json()
            .await
            .map_err(|e| Self::fetch_error(format!("could not decode orders: {}", e)))?;

        Ok(rows.into_iter().map(Order::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_missing_relations() {
        let row: OrderRow = serde_json::from_value(serde_json::json!({
            "id": 42,
            "order_time": "2024-06-05T13:00:00+00:00",
            "status": "sent",
            "companies": null,
            "order_items": [
                {"quantity": 2, "foods": null},
                {"quantity": 1, "foods": {"name": "Rice"}}
            ]
        }))
        .unwrap();

        let order = Order::from(row);
        assert_eq!(order.id, "42");
        assert_eq!(order.status, OrderStatus::Sent);
        assert_eq!(order.company_name, None);
        assert_eq!(order.items[0].food_name, None);
        assert_eq!(order.items[1].food_name.as_deref(), Some("Rice"));
    }

    #[test]
    fn test_unknown_status_and_absent_items() {
        let row: OrderRow = serde_json::from_value(serde_json::json!({
            "id": "b7c1",
            "order_time": "2024-06-05T13:00:00Z",
            "status": "pending",
            "companies": {"name": "Acme"}
        }))
        .unwrap();

        let order = Order::from(row);
        assert_eq!(order.id, "b7c1");
        assert_eq!(order.status, OrderStatus::Other);
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_orders_url_tolerates_trailing_slash() {
        let store =
            PostgrestOrderStore::new("https://abc.supabase.co/", "key", Duration::from_secs(5))
                .unwrap();
        assert_eq!(store.orders_url.as_str(), "https://abc.supabase.co/rest/v1/orders");
    }
}
