use crate::core::aggregate::aggregate_orders;
use crate::core::period::CycleSchedule;
use crate::core::render::{render_subject, render_summary, RenderOptions};
use crate::domain::model::{CompanyTotals, EmailMessage, OrderStatus, ReportingWindow};
use crate::domain::ports::{EmailDispatcher, OrderStore};
use crate::utils::error::ReportError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

/// Steps of one report run, in the order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Start,
    WindowComputed,
    OrdersFetched,
    EmptyExit,
    Aggregated,
    Rendered,
    Dispatched,
    Done,
}

impl ReportState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportState::Start => "start",
            ReportState::WindowComputed => "window_computed",
            ReportState::OrdersFetched => "orders_fetched",
            ReportState::EmptyExit => "empty_exit",
            ReportState::Aggregated => "aggregated",
            ReportState::Rendered => "rendered",
            ReportState::Dispatched => "dispatched",
            ReportState::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Sent,
    EmptyResult,
    FetchError,
    DispatchError,
    ConfigurationError,
    UnexpectedError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Sent {
        window: ReportingWindow,
        summary: String,
        companies: Vec<CompanyTotals>,
        message_id: Option<String>,
    },
    NothingToReport {
        window: ReportingWindow,
    },
    FetchFailed {
        window: ReportingWindow,
        message: String,
    },
    /// Delivery failed after the summary was built; the text is kept for manual recovery.
    DispatchFailed {
        window: ReportingWindow,
        summary: String,
        companies: Vec<CompanyTotals>,
        reason: String,
    },
    ConfigurationFailed {
        message: String,
    },
    Unexpected {
        message: String,
    },
}

fn period_json(window: &ReportingWindow) -> serde_json::Value {
    json!({
        "start": window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
        "end": window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

impl ReportOutcome {
    /// Errors raised outside the run itself: configuration loading, client construction.
    pub fn from_error(error: &ReportError) -> Self {
        if error.is_configuration() {
            ReportOutcome::ConfigurationFailed {
                message: error.to_string(),
            }
        } else {
            ReportOutcome::Unexpected {
                message: error.to_string(),
            }
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            ReportOutcome::Sent { .. } => OutcomeKind::Sent,
            ReportOutcome::NothingToReport { .. } => OutcomeKind::EmptyResult,
            ReportOutcome::FetchFailed { .. } => OutcomeKind::FetchError,
            ReportOutcome::DispatchFailed { .. } => OutcomeKind::DispatchError,
            ReportOutcome::ConfigurationFailed { .. } => OutcomeKind::ConfigurationError,
            ReportOutcome::Unexpected { .. } => OutcomeKind::UnexpectedError,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self.kind() {
            OutcomeKind::Sent | OutcomeKind::EmptyResult => 200,
            _ => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code() < 400
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            ReportOutcome::Sent { summary, .. } | ReportOutcome::DispatchFailed { summary, .. } => {
                Some(summary)
            }
            _ => None,
        }
    }

    pub fn window(&self) -> Option<&ReportingWindow> {
        match self {
            ReportOutcome::Sent { window, .. }
            | ReportOutcome::NothingToReport { window }
            | ReportOutcome::FetchFailed { window, .. }
            | ReportOutcome::DispatchFailed { window, .. } => Some(window),
            _ => None,
        }
    }

    pub fn to_body(&self) -> serde_json::Value {
        let mut body = match self {
            ReportOutcome::Sent {
                summary,
                companies,
                message_id,
                ..
            } => json!({
                "message": "Summary processed and email sent.",
                "summary": summary,
                "companies": companies,
                "message_id": message_id,
            }),
            ReportOutcome::NothingToReport { .. } => json!({
                "message": "No orders to summarize. Email not sent.",
            }),
            ReportOutcome::FetchFailed { message, .. } => json!({ "error": message }),
            ReportOutcome::DispatchFailed {
                summary,
                companies,
                reason,
                ..
            } => json!({
                "message": "Summary processed, but email sending failed.",
                "error": reason,
                "summary": summary,
                "companies": companies,
            }),
            ReportOutcome::ConfigurationFailed { message }
            | ReportOutcome::Unexpected { message } => json!({ "error": message }),
        };

        body["kind"] = json!(self.kind());
        if let Some(window) = self.window() {
            body["period"] = period_json(window);
        }
        body
    }
}

/// Outcome of one invocation plus the states it passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRun {
    pub outcome: ReportOutcome,
    pub transitions: Vec<ReportState>,
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub schedule: CycleSchedule,
    pub render: RenderOptions,
    pub from_address: String,
    pub recipients: Vec<String>,
}

struct Trail {
    states: Vec<ReportState>,
}

impl Trail {
    fn new() -> Self {
        let mut trail = Self { states: Vec::new() };
        trail.enter(ReportState::Start);
        trail
    }

    fn enter(&mut self, state: ReportState) {
        tracing::debug!(state = state.as_str(), "Report state transition");
        self.states.push(state);
    }

    fn finish(mut self, outcome: ReportOutcome) -> ReportRun {
        self.enter(ReportState::Done);
        tracing::info!(
            outcome = ?outcome.kind(),
            status = outcome.status_code(),
            "Report run finished"
        );
        ReportRun {
            outcome,
            transitions: self.states,
        }
    }
}

pub struct ReportEngine<S: OrderStore, D: EmailDispatcher> {
    store: S,
    dispatcher: D,
    settings: ReportSettings,
}

impl<S: OrderStore, D: EmailDispatcher> ReportEngine<S, D> {
    pub fn new(store: S, dispatcher: D, settings: ReportSettings) -> Self {
        Self {
            store,
            dispatcher,
            settings,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub async fn run(&self) -> ReportRun {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> ReportRun {
        let mut trail = Trail::new();

        let window = self.settings.schedule.window_at(now);
        trail.enter(ReportState::WindowComputed);
        tracing::info!(
            now = %now.to_rfc3339_opts(SecondsFormat::Secs, true),
            start = %window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end = %window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            local_start = %window.local_start(),
            local_end = %window.local_end(),
            "Computed reporting window"
        );

        let mut orders = match self.store.fetch_orders(OrderStatus::Sent, &window).await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch orders");
                return trail.finish(ReportOutcome::FetchFailed {
                    window,
                    message: e.to_string(),
                });
            }
        };
        trail.enter(ReportState::OrdersFetched);

        let fetched = orders.len();
        orders.retain(|o| o.status.is_reportable() && window.contains(o.order_time));
        if orders.len() != fetched {
            tracing::warn!(
                dropped = fetched - orders.len(),
                "Store returned orders outside the reportable set"
            );
        }
        tracing::info!(orders = orders.len(), "Fetched orders");

        if orders.is_empty() {
            trail.enter(ReportState::EmptyExit);
            tracing::info!("No 'sent' orders found for the period; nothing will be dispatched");
            return trail.finish(ReportOutcome::NothingToReport { window });
        }

        let result = aggregate_orders(&orders);
        trail.enter(ReportState::Aggregated);

        let summary = render_summary(&result, &window, &self.settings.render);
        trail.enter(ReportState::Rendered);
        tracing::debug!(summary = %summary, "Rendered summary");

        let message = EmailMessage {
            from: self.settings.from_address.clone(),
            to: self.settings.recipients.clone(),
            subject: render_subject(&window, &self.settings.render),
            text: summary,
        };

        let dispatched = self.dispatcher.send(&message).await;
        match dispatched {
            Ok(receipt) => {
                trail.enter(ReportState::Dispatched);
                tracing::info!(
                    message_id = receipt.message_id.as_deref().unwrap_or("-"),
                    recipients = message.to.len(),
                    "Summary dispatched"
                );
                trail.finish(ReportOutcome::Sent {
                    window,
                    summary: message.text,
                    companies: result.companies,
                    message_id: receipt.message_id,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to dispatch summary");
                trail.finish(ReportOutcome::DispatchFailed {
                    window,
                    summary: message.text,
                    companies: result.companies,
                    reason: e.to_string(),
                })
            }
        }
    }
}
