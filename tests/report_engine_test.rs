use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use order_report::core::render::RenderOptions;
use order_report::domain::model::{
    DispatchReceipt, EmailMessage, Order, OrderItem, OrderStatus, ReportingWindow,
};
use order_report::domain::ports::{EmailDispatcher, OrderStore};
use order_report::{
    CycleSchedule, OutcomeKind, ReportEngine, ReportError, ReportOutcome, ReportSettings,
    ReportState, Result,
};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
struct MockStore {
    orders: Vec<Order>,
    fail_with: Option<String>,
    queries: Arc<Mutex<Vec<(OrderStatus, ReportingWindow)>>>,
}

impl MockStore {
    fn with_orders(orders: Vec<Order>) -> Self {
        Self {
            orders,
            ..Self::default()
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

#[async_trait]
impl OrderStore for MockStore {
    async fn fetch_orders(
        &self,
        status: OrderStatus,
        window: &ReportingWindow,
    ) -> Result<Vec<Order>> {
        self.queries.lock().await.push((status, *window));
        match &self.fail_with {
            Some(message) => Err(ReportError::FetchError {
                message: message.clone(),
            }),
            None => Ok(self.orders.clone()),
        }
    }
}

#[derive(Clone, Default)]
struct MockDispatcher {
    fail_with: Option<String>,
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MockDispatcher {
    fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Self::default()
        }
    }

    async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailDispatcher for MockDispatcher {
    async fn send(&self, message: &EmailMessage) -> Result<DispatchReceipt> {
        self.sent.lock().await.push(message.clone());
        match &self.fail_with {
            Some(reason) => Err(ReportError::DispatchError {
                message: reason.clone(),
            }),
            None => Ok(DispatchReceipt {
                message_id: Some("re_msg_1".to_string()),
            }),
        }
    }
}

fn settings() -> ReportSettings {
    ReportSettings {
        schedule: CycleSchedule::default(),
        render: RenderOptions::default(),
        from_address: "summary@example.com".to_string(),
        recipients: vec!["kitchen@example.com".to_string(), "ops@example.com".to_string()],
    }
}

/// 10:00 local on Jun 5: reports the Jun 4 15:31 → Jun 5 15:29 cycle.
fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-06-05T10:00:00+03:00")
        .unwrap()
        .with_timezone(&Utc)
}

fn order(id: &str, minutes_after_open: i64, company: &str, items: &[(&str, u32)]) -> Order {
    let opened = DateTime::parse_from_rfc3339("2024-06-04T12:31:00Z")
        .unwrap()
        .with_timezone(&Utc);
    Order {
        id: id.to_string(),
        order_time: opened + Duration::minutes(minutes_after_open),
        status: OrderStatus::Sent,
        company_name: Some(company.to_string()),
        items: items
            .iter()
            .map(|(food, quantity)| OrderItem {
                quantity: *quantity,
                food_name: Some(food.to_string()),
            })
            .collect(),
    }
}

fn jumla(summary: &str) -> u64 {
    summary
        .lines()
        .find_map(|line| line.strip_prefix("Jumla: "))
        .and_then(|n| n.parse().ok())
        .unwrap()
}

#[tokio::test]
async fn test_empty_result_skips_dispatch() {
    let store = MockStore::default();
    let dispatcher = MockDispatcher::default();
    let engine = ReportEngine::new(store.clone(), dispatcher.clone(), settings());

    let run = engine.run_at(now()).await;

    assert_eq!(run.outcome.kind(), OutcomeKind::EmptyResult);
    assert_eq!(run.outcome.status_code(), 200);
    assert_eq!(
        run.transitions,
        vec![
            ReportState::Start,
            ReportState::WindowComputed,
            ReportState::OrdersFetched,
            ReportState::EmptyExit,
            ReportState::Done,
        ]
    );
    assert!(dispatcher.sent().await.is_empty());
}

#[tokio::test]
async fn test_queries_sent_orders_for_computed_window() {
    let store = MockStore::default();
    let engine = ReportEngine::new(store.clone(), MockDispatcher::default(), settings());

    engine.run_at(now()).await;

    let queries = store.queries.lock().await;
    assert_eq!(queries.len(), 1);
    let (status, window) = queries[0];
    assert_eq!(status, OrderStatus::Sent);
    assert_eq!(window.start.to_rfc3339(), "2024-06-04T12:31:00+00:00");
    assert_eq!(window.end.to_rfc3339(), "2024-06-05T12:29:00+00:00");
}

#[tokio::test]
async fn test_single_item_report_is_sent() {
    let store = MockStore::with_orders(vec![order("1", 30, "Acme", &[("Rice", 3)])]);
    let dispatcher = MockDispatcher::default();
    let engine = ReportEngine::new(store, dispatcher.clone(), settings());

    let run = engine.run_at(now()).await;

    let expected = "Daily Order Summary\n\
                    Period (EAT): Jun 4 (03:31 PM) - Jun 5 (03:29 PM)\n\
                    ------------------------------------\n\
                    Acme - floors ya 06\n\
                    \n\
                    - Rice - 03\n\
                    Jumla: 03";

    match &run.outcome {
        ReportOutcome::Sent {
            summary,
            message_id,
            ..
        } => {
            assert_eq!(summary, expected);
            assert_eq!(message_id.as_deref(), Some("re_msg_1"));
        }
        other => panic!("expected Sent, got {:?}", other),
    }
    assert_eq!(
        run.transitions,
        vec![
            ReportState::Start,
            ReportState::WindowComputed,
            ReportState::OrdersFetched,
            ReportState::Aggregated,
            ReportState::Rendered,
            ReportState::Dispatched,
            ReportState::Done,
        ]
    );

    let sent = dispatcher.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Daily Order Summary - 2024-06-04");
    assert_eq!(sent[0].from, "summary@example.com");
    assert_eq!(sent[0].to, vec!["kitchen@example.com", "ops@example.com"]);
    assert_eq!(sent[0].text, expected);
}

#[tokio::test]
async fn test_fetch_failure_never_dispatches() {
    let dispatcher = MockDispatcher::default();
    let engine = ReportEngine::new(
        MockStore::failing("connection reset"),
        dispatcher.clone(),
        settings(),
    );

    let run = engine.run_at(now()).await;

    match &run.outcome {
        ReportOutcome::FetchFailed { message, .. } => {
            assert!(message.contains("connection reset"))
        }
        other => panic!("expected FetchFailed, got {:?}", other),
    }
    assert_eq!(run.outcome.status_code(), 500);
    assert_eq!(
        run.transitions,
        vec![ReportState::Start, ReportState::WindowComputed, ReportState::Done]
    );
    assert!(dispatcher.sent().await.is_empty());
}

#[tokio::test]
async fn test_dispatch_failure_keeps_rendered_text() {
    let store = MockStore::with_orders(vec![
        order("1", 10, "Acme", &[("Rice", 2), ("Beans", 1)]),
        order("2", 20, "Acme", &[("Rice", 5)]),
    ]);
    let dispatcher = MockDispatcher::failing("domain not verified");
    let engine = ReportEngine::new(store, dispatcher.clone(), settings());

    let run = engine.run_at(now()).await;

    let attempted = dispatcher.sent().await;
    assert_eq!(attempted.len(), 1);
    match &run.outcome {
        ReportOutcome::DispatchFailed {
            summary, reason, ..
        } => {
            assert_eq!(summary, &attempted[0].text);
            assert!(summary.contains("- Rice - 07"));
            assert!(reason.contains("domain not verified"));
        }
        other => panic!("expected DispatchFailed, got {:?}", other),
    }
    assert_eq!(run.outcome.status_code(), 500);
    assert_eq!(run.outcome.to_body()["summary"], attempted[0].text.as_str());
    assert!(!run.transitions.contains(&ReportState::Dispatched));
    assert_eq!(run.transitions.last(), Some(&ReportState::Done));
}

#[tokio::test]
async fn test_multi_company_header() {
    let orders = vec![
        order("1", 10, "Acme", &[("Rice", 1)]),
        order("2", 20, "Globex", &[("Rice", 1)]),
    ];

    for ordering in [orders.clone(), orders.into_iter().rev().collect()] {
        let engine = ReportEngine::new(
            MockStore::with_orders(ordering),
            MockDispatcher::default(),
            settings(),
        );
        let run = engine.run_at(now()).await;
        let summary = run.outcome.summary().unwrap();
        assert!(summary.contains("Multiple Companies - floors ya 06"));
    }
}

#[tokio::test]
async fn test_company_breakdown_in_outcome() {
    let orders = vec![
        order("1", 10, "Acme", &[("Rice", 2), ("Beans", 1)]),
        order("2", 20, "Globex", &[("Rice", 4)]),
        order("3", 30, "Acme", &[("Rice", 1)]),
    ];

    let sent = ReportEngine::new(
        MockStore::with_orders(orders.clone()),
        MockDispatcher::default(),
        settings(),
    )
    .run_at(now())
    .await;
    match &sent.outcome {
        ReportOutcome::Sent { companies, .. } => {
            assert_eq!(companies.len(), 2);
            assert_eq!(companies[0].name, "Acme");
            assert_eq!(companies[0].total, 4);
            assert_eq!(companies[1].name, "Globex");
            assert_eq!(companies[1].total, 4);
        }
        other => panic!("expected Sent, got {:?}", other),
    }
    let body = sent.outcome.to_body();
    assert_eq!(body["companies"][0]["name"], "Acme");
    assert_eq!(body["companies"][0]["items"][0]["name"], "Rice");
    assert_eq!(body["companies"][0]["items"][0]["quantity"], 3);
    assert_eq!(body["companies"][1]["total"], 4);

    let failed = ReportEngine::new(
        MockStore::with_orders(orders),
        MockDispatcher::failing("rate limited"),
        settings(),
    )
    .run_at(now())
    .await;
    assert_eq!(failed.outcome.kind(), OutcomeKind::DispatchError);
    assert_eq!(failed.outcome.to_body()["companies"], body["companies"]);
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let orders = vec![
        order("1", 10, "Acme", &[("Pilau", 2), ("Chapati", 4)]),
        order("2", 700, "Acme", &[("Chapati", 1)]),
        order("3", 5, "Acme", &[("Ugali", 9)]),
    ];
    let expected_total: u64 = orders
        .iter()
        .flat_map(|o| o.items.iter())
        .map(|i| u64::from(i.quantity))
        .sum();

    let first = ReportEngine::new(
        MockStore::with_orders(orders.clone()),
        MockDispatcher::default(),
        settings(),
    )
    .run_at(now())
    .await;
    let reversed: Vec<Order> = orders.into_iter().rev().collect();
    let second = ReportEngine::new(
        MockStore::with_orders(reversed),
        MockDispatcher::default(),
        settings(),
    )
    .run_at(now() + Duration::minutes(30))
    .await;

    assert_eq!(first, second);
    let summary = first.outcome.summary().unwrap();
    assert_eq!(jumla(summary), expected_total);
    assert!(summary.contains("- Chapati - 05\n- Pilau - 02\n- Ugali - 09"));
}

#[tokio::test]
async fn test_custom_floor_number() {
    let mut settings = settings();
    settings.render.floor_number = "12".to_string();
    let engine = ReportEngine::new(
        MockStore::with_orders(vec![order("1", 0, "Acme", &[("Rice", 1)])]),
        MockDispatcher::default(),
        settings,
    );

    let run = engine.run_at(now()).await;
    assert!(run.outcome.summary().unwrap().contains("Acme - floors ya 12"));
}
