//! Registry and dispatcher behaviour across handler shapes.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use hookline_core::{
    DispatchError, DispatchResult, Event, EventDispatcher, EventHandler, EventRegistry,
    HandlerOutcome, HandlerRegistration, IngestionStats, RegistryError,
};
use proptest::prelude::*;

#[derive(Debug, Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl EventHandler for CountingHandler {
    async fn handle(&self, _event: &Event) -> HandlerOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        HandlerOutcome::ok()
    }
}

fn dispatcher(registry: EventRegistry) -> (EventDispatcher, Arc<IngestionStats>) {
    let stats = Arc::new(IngestionStats::default());
    (EventDispatcher::new(Arc::new(registry), stats.clone()), stats)
}

#[tokio::test]
async fn inline_and_module_handlers_coexist() {
    let module = Arc::new(CountingHandler::default());
    let registry = EventRegistry::builder()
        .inline("invoice.paid", |event| {
            if event.data["amount"].as_u64().unwrap_or(0) > 0 {
                HandlerOutcome::ok()
            } else {
                HandlerOutcome::error("amount must be positive")
            }
        })
        .module("customer.created", module.clone())
        .build()
        .unwrap();
    let (dispatcher, stats) = dispatcher(registry);

    let paid = Event::new("evt_1", "invoice.paid").with_data(serde_json::json!({ "amount": 10 }));
    let free = Event::new("evt_2", "invoice.paid").with_data(serde_json::json!({ "amount": 0 }));
    let created = Event::new("evt_3", "customer.created");

    assert_eq!(dispatcher.dispatch(&paid).await, DispatchResult::Ok);
    assert_eq!(
        dispatcher.dispatch(&free).await,
        DispatchResult::Error(DispatchError::Rejected { reason: "amount must be positive".into() })
    );
    assert_eq!(dispatcher.dispatch(&created).await, DispatchResult::Ok);
    assert_eq!(module.calls.load(Ordering::SeqCst), 1);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.dispatched_ok, 2);
    assert_eq!(snapshot.handler_errors, 1);
}

#[tokio::test]
async fn lookup_is_exact_and_case_sensitive() {
    let module = Arc::new(CountingHandler::default());
    let registry = EventRegistry::builder().module("customer.created", module.clone()).build().unwrap();
    let (dispatcher, _) = dispatcher(registry);

    for event_type in ["Customer.Created", "customer", "customer.created.v2"] {
        let result = dispatcher.dispatch(&Event::new("evt_1", event_type)).await;
        assert_eq!(result, DispatchResult::Unhandled, "{event_type}");
    }
    assert_eq!(module.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handler_fault_does_not_poison_the_dispatcher() {
    let registry = EventRegistry::builder()
        .inline("boom", |_| panic!("exploded"))
        .inline("fine", |_| HandlerOutcome::ok())
        .build()
        .unwrap();
    let (dispatcher, stats) = dispatcher(registry);

    let fault = dispatcher.dispatch(&Event::new("evt_1", "boom")).await;
    let ok = dispatcher.dispatch(&Event::new("evt_2", "fine")).await;

    assert!(matches!(fault, DispatchResult::Error(DispatchError::HandlerFault { .. })));
    assert_eq!(ok, DispatchResult::Ok);
    assert_eq!(stats.snapshot().handler_faults, 1);
}

#[test]
fn invalid_event_types_are_rejected_at_registration() {
    for event_type in ["", "customer created", "customer..created", "customer.*", ".created"] {
        let result =
            EventRegistry::from_registrations([HandlerRegistration::inline(event_type, |_| {
                HandlerOutcome::ok()
            })]);
        assert!(
            matches!(result, Err(RegistryError::InvalidEventType(_))),
            "{event_type:?} should be rejected"
        );
    }
}

proptest! {
    #[test]
    fn registry_builds_only_without_duplicates(
        types in prop::collection::vec("[a-c]{1,2}(\\.[a-c]{1,2})?", 1..12),
    ) {
        let registrations = types
            .iter()
            .map(|t| HandlerRegistration::inline(t.as_str(), |_| HandlerOutcome::ok()));
        let result = EventRegistry::from_registrations(registrations);

        let mut seen = HashSet::new();
        let first_duplicate = types.iter().find(|t| !seen.insert(t.as_str()));

        match (result, first_duplicate) {
            (Ok(registry), None) => {
                prop_assert_eq!(registry.len(), types.len());
                let order: Vec<&str> = registry.event_types().map(|t| t.as_str()).collect();
                let expected: Vec<&str> = types.iter().map(String::as_str).collect();
                prop_assert_eq!(order, expected);
            },
            (Err(RegistryError::DuplicateRegistration { event_type }), Some(duplicate)) => {
                prop_assert_eq!(&event_type, duplicate);
            },
            (other, duplicate) => {
                prop_assert!(false, "unexpected {:?} for duplicate {:?}", other, duplicate);
            },
        }
    }
}
