//! Full rebalancing cycles against the mock venue.

use pairbalance::{
    BookSnapshot, Fee, Order, OrderStatus, PairConfig, PairSymbol, Side, StickState,
};
use pairbalance_broker::mock::{MockBroker, MockMarket, MockOp};
use pairbalance_rebalancer::engine::{Engine, EngineOptions};
use pairbalance_rebalancer::execution::ExecutionOutcome;
use pairbalance_rebalancer::gateway::Venue;
use pairbalance_rebalancer::notify::Notice;
use pairbalance_rebalancer::reconcile::ReconcileAction;
use pairbalance_rebalancer::store::{MemoryStore, StickStore};

type TestEngine = Engine<MockBroker, MemoryStore, Vec<Notice>>;

fn eth() -> PairSymbol {
    "ETH/USDT".parse().unwrap()
}

/// 1 ETH and 1000 USDT, ETH last traded at 1400.
fn broker(book: BookSnapshot) -> MockBroker {
    MockBroker::builder()
        .with_market(&eth(), MockMarket::new(1400.0).with_book(book))
        .with_balance("ETH", 1.0, 0.0)
        .with_balance("USDT", 1000.0, 0.0)
        .build()
}

fn engine(broker: MockBroker, store: MemoryStore) -> TestEngine {
    let mut engine = Engine::new(
        Venue::new(broker),
        store,
        Vec::new(),
        EngineOptions::default(),
    );
    engine.connect().unwrap();
    engine
}

fn open_stick(id: &str) -> StickState {
    StickState {
        amount: Some(0.5),
        actual_amount: Some(0.5),
        price: Some(1390.0),
        order_id: Some(id.into()),
        order_side: Some(Side::Buy),
        order_status: Some(OrderStatus::Open),
    }
}

fn venue_order(id: &str, status: OrderStatus, filled: f64) -> Order {
    Order {
        id: id.into(),
        side: Side::Buy,
        amount: 0.5,
        price: 1390.0,
        status,
        fee: Some(Fee {
            cost: 0.001,
            currency: "ETH".into(),
        }),
        filled,
        datetime: None,
        post_only: true,
    }
}

#[test]
fn drift_above_threshold_places_buy() {
    let book = BookSnapshot::from_pairs(&[[1399.0, 2.0]], &[[1401.0, 2.0]]);
    let mut engine = engine(broker(book), MemoryStore::new());
    let pair = PairConfig::fixed(eth(), 2000.0, 2.0);

    let report = engine.run_pair(&pair).unwrap();
    assert_eq!(report.reconcile, ReconcileAction::Idle);
    assert_eq!(report.evaluation.value_diff, 1400.0);
    assert_eq!(report.evaluation.total_diff_value, 600.0);
    assert!(report.evaluation.should_execute);

    let Some(ExecutionOutcome::Placed { order, stick, rejections }) = report.outcome else {
        panic!("expected placement, got {:?}", report.outcome);
    };
    assert_eq!(rejections, 0);
    assert_eq!(order.side, Side::Buy);
    // 600 / 1400 = 0.428571.. truncated to the 0.0001 step
    assert_eq!(order.amount, 0.4285);
    assert_eq!(order.price, 1400.0);
    assert!(order.post_only);

    assert_eq!(stick.order_id.as_deref(), Some("1"));
    assert_eq!(engine.store().get(&eth()), stick);
    assert!(matches!(engine.notifier()[..], [Notice::Executed { .. }]));
}

#[test]
fn on_target_leaves_stick_untouched() {
    let mut engine = engine(broker(BookSnapshot::default()), MemoryStore::new());
    let pair = PairConfig::fixed(eth(), 1400.0, 2.0);

    let report = engine.run_pair(&pair).unwrap();
    assert_eq!(report.evaluation.total_diff_value, 0.0);
    assert!(!report.evaluation.should_execute);
    assert!(report.outcome.is_none());

    assert!(engine.broker().submitted_orders().is_empty());
    assert_eq!(engine.store().writes(), 0);
    assert!(engine.notifier().is_empty());
}

#[test]
fn post_only_rejection_reprices_at_best_bid() {
    // The ask sits at the last price: a buy at 1400 would take it.
    let book = BookSnapshot::from_pairs(&[[1398.5, 2.0]], &[[1400.0, 2.0]]);
    let mut engine = engine(broker(book), MemoryStore::new());
    let pair = PairConfig::fixed(eth(), 2000.0, 2.0);

    let report = engine.run_pair(&pair).unwrap();
    let Some(ExecutionOutcome::Placed { order, rejections, .. }) = report.outcome else {
        panic!("expected placement, got {:?}", report.outcome);
    };
    assert_eq!(rejections, 1);
    assert_eq!(order.price, 1398.5);

    let submitted = engine.broker().submitted_orders();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].price, 1400.0);
    assert_eq!(submitted[1].price, 1398.5);
    // Re-sized at the new price: 601.5 / 1398.5 truncated
    assert_eq!(submitted[1].amount, 0.4301);
}

#[test]
fn closed_order_is_reconciled_to_empty_stick() {
    let broker = broker(BookSnapshot::default());
    broker.insert_order(venue_order("42", OrderStatus::Closed, 0.5));
    let store = MemoryStore::new().with_stick(&eth(), open_stick("42"));
    let mut engine = engine(broker, store);

    let reconciled = engine.reconcile_pair(&PairConfig::fixed(eth(), 1400.0, 2.0)).unwrap();
    assert_eq!(reconciled.action, ReconcileAction::Completed);
    assert!(reconciled.stick.is_empty());
    assert_eq!(engine.store().read(&eth()).unwrap(), StickState::empty());
    assert_eq!(engine.store().writes(), 1);
}

#[test]
fn stale_open_order_is_cancelled_before_resizing() {
    let book = BookSnapshot::from_pairs(&[[1399.0, 2.0]], &[[1401.0, 2.0]]);
    let broker = broker(book);
    broker.insert_order(venue_order("42", OrderStatus::Open, 0.0));
    let store = MemoryStore::new().with_stick(&eth(), open_stick("42"));
    let mut engine = engine(broker, store);

    let report = engine.run_pair(&PairConfig::fixed(eth(), 2000.0, 2.0)).unwrap();
    assert_eq!(report.reconcile, ReconcileAction::StillOpen);
    assert_eq!(report.cancelled.as_deref(), Some("42"));
    assert!(matches!(report.outcome, Some(ExecutionOutcome::Placed { .. })));

    assert_eq!(engine.broker().cancelled_orders(), vec!["42".to_string()]);
    assert_eq!(
        engine.broker().order("42").map(|o| o.status),
        Some(OrderStatus::Canceled)
    );
    let stick = engine.store().get(&eth());
    assert_eq!(stick.order_id.as_deref(), Some("1"));

    let events: Vec<_> = engine.notifier().iter().map(Notice::event).collect();
    assert_eq!(events, ["canceled", "executed"]);
}

#[test]
fn open_order_survives_when_on_target() {
    let broker = broker(BookSnapshot::default());
    broker.insert_order(venue_order("42", OrderStatus::Open, 0.0));
    let store = MemoryStore::new().with_stick(&eth(), open_stick("42"));
    let mut engine = engine(broker, store);

    let report = engine.run_pair(&PairConfig::fixed(eth(), 1400.0, 2.0)).unwrap();
    assert_eq!(report.reconcile, ReconcileAction::StillOpen);
    assert!(report.cancelled.is_none());
    assert!(engine.broker().cancelled_orders().is_empty());
    assert_eq!(engine.store().get(&eth()), open_stick("42"));
}

#[test]
fn venue_failure_is_fatal_and_writes_nothing() {
    let broker = broker(BookSnapshot::default());
    broker.fail_on(MockOp::LastPrice);
    let mut engine = engine(broker, MemoryStore::new());

    let err = engine
        .run_pair(&PairConfig::fixed(eth(), 2000.0, 2.0))
        .unwrap_err();
    assert!(err.to_string().contains("getLastPrice"), "{err}");
    assert!(engine.broker().submitted_orders().is_empty());
    assert_eq!(engine.store().writes(), 0);
}

#[test]
fn standalone_sell_steps_away_from_book() {
    let book = BookSnapshot::from_pairs(&[[1399.0, 2.0]], &[[1401.0, 2.0]]);
    let mut engine = engine(broker(book), MemoryStore::new());
    let pair = PairConfig::fixed(eth(), 1400.0, 2.0).with_tick_percentage(0.1);

    let outcome = engine.place(&pair, Side::Sell, 0.1, 1398.0).unwrap();
    let ExecutionOutcome::Placed { order, rejections, .. } = outcome else {
        panic!("expected placement, got {outcome:?}");
    };
    assert_eq!(rejections, 1);
    assert_eq!(order.price, 1399.4);
    assert_eq!(engine.store().get(&eth()).order_side, Some(Side::Sell));
}

#[test]
fn standalone_place_replaces_tracked_open_order() {
    let book = BookSnapshot::from_pairs(&[[1399.0, 2.0]], &[[1401.0, 2.0]]);
    let broker = broker(book);
    broker.insert_order(venue_order("42", OrderStatus::Open, 0.0));
    let store = MemoryStore::new().with_stick(&eth(), open_stick("42"));
    let mut engine = engine(broker, store);
    let pair = PairConfig::fixed(eth(), 1400.0, 2.0);

    let outcome = engine.place(&pair, Side::Buy, 0.1, 1398.0).unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Placed { .. }));

    assert_eq!(engine.broker().cancelled_orders(), vec!["42".to_string()]);
    assert_eq!(
        engine.broker().order("42").map(|o| o.status),
        Some(OrderStatus::Canceled)
    );
    let stick = engine.store().get(&eth());
    assert_eq!(stick.order_id.as_deref(), Some("1"));
    assert!(stick.is_open());

    let events: Vec<_> = engine.notifier().iter().map(Notice::event).collect();
    assert_eq!(events, ["canceled", "executed"]);
}

#[test]
fn fill_between_cycles_is_reconciled_then_on_target() {
    let book = BookSnapshot::from_pairs(&[[1399.0, 2.0]], &[[1401.0, 2.0]]);
    let mut engine = engine(broker(book), MemoryStore::new());
    let pair = PairConfig::fixed(eth(), 2000.0, 2.0);

    let first = engine.run_pair(&pair).unwrap();
    assert!(matches!(first.outcome, Some(ExecutionOutcome::Placed { .. })));
    assert!(engine.store().get(&eth()).is_open());

    // The buy fills on the venue and settles into the balances.
    engine.broker().set_order_status("1", OrderStatus::Closed, 0.4285);
    engine.broker().set_balance("ETH", 1.4285, 0.0);
    engine.broker().set_balance("USDT", 400.1, 0.0);

    let second = engine.run_pair(&pair).unwrap();
    assert_eq!(second.reconcile, ReconcileAction::Completed);
    assert!(!second.evaluation.should_execute);
    assert!(second.outcome.is_none());
    assert!(engine.store().get(&eth()).is_empty());
    assert_eq!(engine.broker().submitted_orders().len(), 1);
}
