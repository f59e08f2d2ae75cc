use std::sync::Arc;
use std::time::Duration;

use vigil::kernel::clock::{remaining_seconds, WatchdogClock};
use vigil::kernel::countdown::{format_mm_ss, minute_badge, CountdownTicker};
use vigil::store::{MemoryStateStore, StateStore, StatusFanout, WatchdogEvent};

#[test]
fn remaining_time_is_clamped_at_zero_once_overdue() {
    let interval = Duration::from_millis(900_000);

    assert_eq!(remaining_seconds(Duration::ZERO, interval), 900);
    assert_eq!(remaining_seconds(Duration::from_millis(870_000), interval), 30);
    assert_eq!(remaining_seconds(Duration::from_millis(900_000), interval), 0);

    // Arbitrarily overdue still reads zero, never negative.
    for overdue_ms in [900_001u64, 905_000, 10_000_000] {
        assert_eq!(
            remaining_seconds(Duration::from_millis(overdue_ms), interval),
            0,
            "elapsed {}ms must clamp to zero",
            overdue_ms
        );
    }
}

#[tokio::test(start_paused = true)]
async fn countdown_follows_the_schedule_scenario() {
    // refresh interval 900 000 ms; a refresh completes at t=0.
    let clock = WatchdogClock::starting_now();
    let store = Arc::new(MemoryStateStore::new());
    let fanout = StatusFanout::new(store.clone(), clock.clone());
    let ticker = CountdownTicker::new(clock, fanout, Duration::from_millis(900_000));

    // 1. t = 870 000: thirty seconds left.
    tokio::time::advance(Duration::from_millis(870_000)).await;
    assert_eq!(ticker.tick(), 30);
    assert_eq!(store.load().unwrap().countdown_seconds, 30);

    // 2. t = 905 000: overdue, published as zero.
    tokio::time::advance(Duration::from_millis(35_000)).await;
    assert_eq!(ticker.tick(), 0);
    assert_eq!(store.load().unwrap().countdown_seconds, 0);
}

#[tokio::test(start_paused = true)]
async fn each_tick_persists_and_broadcasts_the_same_sample() {
    let clock = WatchdogClock::starting_now();
    let store = Arc::new(MemoryStateStore::new());
    let fanout = StatusFanout::new(store.clone(), clock.clone());
    fanout.publish_status("Refresh completed");
    let mut events = fanout.subscribe();
    let ticker = CountdownTicker::new(clock, fanout, Duration::from_secs(600));

    tokio::time::advance(Duration::from_secs(45)).await;
    let remaining = ticker.tick();
    assert_eq!(remaining, 555);

    match events.try_recv().unwrap() {
        WatchdogEvent::Countdown { seconds, status, .. } => {
            assert_eq!(seconds, 555);
            assert_eq!(status, "Refresh completed", "carries the last status line");
        }
        other => panic!("expected a countdown event, got {:?}", other),
    }
    assert_eq!(store.load().unwrap().countdown_seconds, 555);
}

#[test]
fn minute_badge_encodes_whole_minutes() {
    assert_eq!(minute_badge(900), "[15m]");
    assert_eq!(minute_badge(870), "[14m]");
    assert_eq!(minute_badge(59), "[0m]");
    assert_eq!(minute_badge(0), "[0m]");
}

#[test]
fn mm_ss_rendering() {
    assert_eq!(format_mm_ss(870), "14:30");
    assert_eq!(format_mm_ss(90), "01:30");
    assert_eq!(format_mm_ss(5), "00:05");
    assert_eq!(format_mm_ss(0), "00:00");
}
