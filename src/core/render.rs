use crate::domain::model::{AggregationResult, ReportingWindow};
use chrono::{DateTime, FixedOffset};

pub const DEFAULT_TITLE: &str = "Daily Order Summary";
pub const DEFAULT_FLOOR_NUMBER: &str = "06";
pub const DEFAULT_ZONE_LABEL: &str = "EAT";
pub const SEPARATOR: &str = "------------------------------------";
pub const NO_ORDERS_LINE: &str = "No 'sent' orders for this period.";
pub const TOTAL_LABEL: &str = "Jumla";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub title: String,
    pub floor_number: String,
    pub zone_label: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            floor_number: DEFAULT_FLOOR_NUMBER.to_string(),
            zone_label: DEFAULT_ZONE_LABEL.to_string(),
        }
    }
}

/// Zero-pads to two digits; wider numbers are left intact.
pub fn format_quantity(quantity: u64) -> String {
    format!("{:02}", quantity)
}

/// `Jun 5 (03:31 PM)`
pub fn format_local(instant: DateTime<FixedOffset>) -> String {
    instant.format("%b %-d (%I:%M %p)").to_string()
}

pub fn render_subject(window: &ReportingWindow, options: &RenderOptions) -> String {
    format!(
        "{} - {}",
        options.title,
        window.local_start().format("%Y-%m-%d")
    )
}

pub fn render_summary(
    result: &AggregationResult,
    window: &ReportingWindow,
    options: &RenderOptions,
) -> String {
    let mut lines: Vec<String> = vec![
        options.title.clone(),
        format!(
            "Period ({}): {} - {}",
            options.zone_label,
            format_local(window.local_start()),
            format_local(window.local_end())
        ),
        SEPARATOR.to_string(),
        format!("{} - floors ya {}", result.header_company, options.floor_number),
        String::new(),
    ];

    if result.is_empty() {
        lines.push(NO_ORDERS_LINE.to_string());
        lines.push(format!("{}: {}", TOTAL_LABEL, format_quantity(0)));
        return lines.join("\n");
    }

    for item in &result.items {
        lines.push(format!("- {} - {}", item.name, format_quantity(item.quantity)));
    }
    lines.push(format!("{}: {}", TOTAL_LABEL, format_quantity(result.total)));

    lines.join("\n")
}
