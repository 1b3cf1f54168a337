use crate::domain::model::{AggregationResult, CompanyTotals, ItemTotal, Order};
use std::collections::BTreeSet;

pub const UNKNOWN_FOOD: &str = "Unknown Item";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const MULTIPLE_COMPANIES: &str = "Multiple Companies";
pub const NO_COMPANY: &str = "N/A";

fn non_empty(name: Option<&str>) -> Option<&str> {
    name.filter(|n| !n.is_empty())
}

fn add_quantity(items: &mut Vec<ItemTotal>, name: &str, quantity: u64) {
    match items.iter_mut().find(|item| item.name == name) {
        Some(item) => item.quantity += quantity,
        None => items.push(ItemTotal {
            name: name.to_string(),
            quantity,
        }),
    }
}

/// Picks the company shown in the summary header.
///
/// `orders` must already be in canonical order; "first" refers to that order.
pub fn header_company(orders: &[&Order]) -> String {
    let Some(first) = orders.first() else {
        return NO_COMPANY.to_string();
    };

    match non_empty(first.company_name.as_deref()) {
        Some(first_name) => {
            if orders
                .iter()
                .all(|o| o.company_name.as_deref() == Some(first_name))
            {
                first_name.to_string()
            } else {
                MULTIPLE_COMPANIES.to_string()
            }
        }
        None => {
            let distinct: BTreeSet<&str> = orders
                .iter()
                .filter_map(|o| non_empty(o.company_name.as_deref()))
                .collect();
            if distinct.len() > 1 {
                MULTIPLE_COMPANIES.to_string()
            } else {
                NO_COMPANY.to_string()
            }
        }
    }
}

/// Sums order-line quantities per company and per food.
///
/// Orders are first sorted newest first (ties broken by id), so any permutation of the
/// same input produces the same result, first-seen ordering included. The header
/// depends on this direction: the most recent order is the "first" one.
pub fn aggregate_orders(orders: &[Order]) -> AggregationResult {
    let mut sorted: Vec<&Order> = orders.iter().collect();
    sorted.sort_by(|a, b| b.order_time.cmp(&a.order_time).then_with(|| a.id.cmp(&b.id)));

    let mut companies: Vec<CompanyTotals> = Vec::new();
    let mut items: Vec<ItemTotal> = Vec::new();
    let mut total: u64 = 0;

    for order in &sorted {
        let company_name = non_empty(order.company_name.as_deref()).unwrap_or(UNKNOWN_COMPANY);
        let index = match companies.iter().position(|c| c.name == company_name) {
            Some(index) => index,
            None => {
                companies.push(CompanyTotals {
                    name: company_name.to_string(),
                    items: Vec::new(),
                    total: 0,
                });
                companies.len() - 1
            }
        };

        for item in &order.items {
            let food_name = non_empty(item.food_name.as_deref()).unwrap_or(UNKNOWN_FOOD);
            let quantity = u64::from(item.quantity);

            let company = &mut companies[index];
            add_quantity(&mut company.items, food_name, quantity);
            company.total += quantity;

            add_quantity(&mut items, food_name, quantity);
            total += quantity;
        }
    }

    tracing::debug!(
        orders = sorted.len(),
        companies = companies.len(),
        items = items.len(),
        total,
        "Aggregated orders"
    );

    AggregationResult {
        header_company: header_company(&sorted),
        companies,
        items,
        total,
        order_count: sorted.len(),
    }
}
