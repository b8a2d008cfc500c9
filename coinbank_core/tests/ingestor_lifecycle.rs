//! Ingestion thread lifecycle: events flow, stop joins, drop does not leak.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use coinbank_core::mocks::{MemoryStore, RecordingDispatcher, ScriptedLink};
use coinbank_core::{Engine, IngestCfg, Ingestor};

fn fast_cfg() -> IngestCfg {
    IngestCfg {
        read_timeout_ms: 5,
        poll_ms: 1,
        retry_backoff_ms: 1,
        reconnect_after: 3,
    }
}

fn engine() -> Arc<Engine> {
    Arc::new(
        Engine::builder()
            .with_store(MemoryStore::default())
            .with_dispatcher(RecordingDispatcher::default())
            .try_build()
            .unwrap(),
    )
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn lines_reach_engine_and_events_channel() {
    let e = engine();
    let link = ScriptedLink::lines(["1.000g", "1.0005g", "2.500g"]);
    let mut ing = Ingestor::spawn(link, e.clone(), fast_cfg()).unwrap();

    assert!(wait_until(|| e.current_weight() == 2.5));
    let stats = ing.stop().expect("thread stats");
    assert_eq!(stats.lines, 3);
    assert_eq!(stats.changes, 2);

    let events: Vec<_> = ing.events().collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event().map(|ev| ev.next_g), Some(2.5));
    assert!(!ing.is_running());
}

#[test]
fn stop_closes_link_and_keeps_last_weight() {
    let e = engine();
    let link = ScriptedLink::lines(["4.200g"]);
    let closes = link.close_count();
    let mut ing = Ingestor::spawn(link, e.clone(), fast_cfg()).unwrap();

    assert!(wait_until(|| e.current_weight() == 4.2));
    ing.stop();
    assert_eq!(closes.load(Ordering::Relaxed), 1);
    assert_eq!(e.current_weight(), 4.2);
    assert!(ing.stop().is_none());
}

#[test]
fn dropping_many_ingestors_does_not_hang() {
    let e = engine();
    for _ in 0..10 {
        let ing = Ingestor::spawn(ScriptedLink::lines(["0.500g"]), e.clone(), fast_cfg()).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        drop(ing);
    }
    assert!(Arc::strong_count(&e) == 1);
}
