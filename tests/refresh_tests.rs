use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use vigil::kernel::clock::WatchdogClock;
use vigil::kernel::refresh::{advance, RefreshCause, RefreshSequencer, RefreshStep};
use vigil::kernel::session::{PlaybackStateKind, TransportCommand};
use vigil::platform::scripted::ScriptedHost;
use vigil::store::{MemoryStateStore, StatusFanout, WatchdogEvent};

const PLAYER: &str = "com.example.player";

fn sequencer(host: Arc<ScriptedHost>) -> (RefreshSequencer, StatusFanout) {
    let store = Arc::new(MemoryStateStore::new());
    let clock = WatchdogClock::starting_now();
    let fanout = StatusFanout::new(store, clock.clone());
    (
        RefreshSequencer::new(host, PLAYER, fanout.clone(), clock),
        fanout,
    )
}

#[test]
fn transition_table_covers_both_branches() {
    use RefreshStep::*;

    // Present session walks the pause/skip/resume path.
    assert_eq!(advance(&Searching, true), Pausing);
    assert_eq!(advance(&Pausing, true), SkippingNext);
    assert_eq!(advance(&SkippingNext, true), Resuming);
    assert_eq!(advance(&Resuming, true), Completed);

    // Absent session goes straight to launch.
    assert_eq!(advance(&Searching, false), Launching);
    assert_eq!(advance(&Launching, false), Completed);

    // Terminal states stay terminal.
    assert_eq!(advance(&Completed, true), Completed);
    assert!(matches!(
        advance(&Failed("x".to_string()), true),
        Failed(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn present_session_runs_the_full_sequence_with_settle_gaps() {
    use RefreshStep::*;

    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Playing));
    let (sequencer, fanout) = sequencer(host.clone());
    let mut events = fanout.subscribe();

    // Collect (virtual time, status) pairs as the run publishes them.
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while seen.len() < 5 {
            match events.recv().await {
                Ok(WatchdogEvent::Status { message, .. }) => seen.push((Instant::now(), message)),
                Ok(_) => {}
                Err(_) => break,
            }
        }
        seen
    });

    let started = Instant::now();
    let outcome = sequencer.run(RefreshCause::Scheduled).await;

    assert_eq!(
        outcome.steps,
        vec![Searching, Pausing, SkippingNext, Resuming, Completed],
        "step log must be exactly the present-session path"
    );
    assert_eq!(
        started.elapsed(),
        Duration::from_millis(2500),
        "1000ms pause settle + 1500ms skip settle"
    );
    assert_eq!(
        host.issued(),
        vec![
            TransportCommand::Pause,
            TransportCommand::SkipNext,
            TransportCommand::Play
        ]
    );
    assert!(host.launches().is_empty());

    let seen = collector.await.unwrap();
    assert_eq!(seen.len(), 5, "one status per step");
    assert!(seen[0].1.starts_with("Searching"));
    assert_eq!(seen[1].1, "Pausing playback...");
    assert_eq!(seen[2].1, "Skipping to the next track...");
    assert_eq!(seen[3].1, "Resuming playback...");
    assert_eq!(seen[4].1, "Refresh completed");

    // Settle gaps sit between the pause/skip/resume publications.
    assert_eq!(seen[2].0 - seen[1].0, Duration::from_millis(1000));
    assert_eq!(seen[3].0 - seen[2].0, Duration::from_millis(1500));
    assert_eq!(seen[4].0, seen[3].0, "no delay after resuming");
}

#[tokio::test(start_paused = true)]
async fn absent_session_launches_instead() {
    use RefreshStep::*;

    let host = Arc::new(ScriptedHost::absent());
    let (sequencer, _fanout) = sequencer(host.clone());

    let started = Instant::now();
    let outcome = sequencer.run(RefreshCause::Scheduled).await;

    assert_eq!(outcome.steps, vec![Searching, Launching, Completed]);
    assert!(
        host.issued().is_empty(),
        "no pause/skip/resume against a missing session"
    );
    assert_eq!(host.launches(), vec![PLAYER.to_string()]);
    assert_eq!(
        started.elapsed(),
        Duration::from_millis(2000),
        "launch settle before completion"
    );
}

#[tokio::test(start_paused = true)]
async fn step_failure_aborts_the_rest_of_the_run() {
    use RefreshStep::*;

    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Playing));
    host.fail_command(TransportCommand::Pause, "session revoked");
    let (sequencer, _fanout) = sequencer(host.clone());

    let outcome = sequencer.run(RefreshCause::Scheduled).await;

    assert!(outcome.failed());
    assert_eq!(outcome.steps.len(), 3, "Searching, Pausing, Failed");
    assert_eq!(outcome.steps[0], Searching);
    assert_eq!(outcome.steps[1], Pausing);
    match &outcome.steps[2] {
        Failed(reason) => assert!(reason.contains("session revoked")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(
        host.issued().is_empty(),
        "skip and resume are never attempted after the failure"
    );
}

#[tokio::test(start_paused = true)]
async fn failed_run_still_resets_the_refresh_clock() {
    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Playing));
    host.fail_command(TransportCommand::Pause, "session revoked");

    let store = Arc::new(MemoryStateStore::new());
    let clock = WatchdogClock::starting_now();
    let fanout = StatusFanout::new(store, clock.clone());
    let sequencer = RefreshSequencer::new(host, PLAYER, fanout, clock.clone());

    // Age the clock, then fail a run: the countdown reference must still
    // advance so the display does not stall.
    tokio::time::advance(Duration::from_secs(600)).await;
    let outcome = sequencer.run(RefreshCause::Manual).await;

    assert!(outcome.failed());
    assert_eq!(
        clock.lock().unwrap().last_refresh_at.elapsed(),
        Duration::ZERO
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_launch_completes_with_a_warning_status() {
    use RefreshStep::*;

    let host = Arc::new(ScriptedHost::absent());
    host.set_launch_ok(false);
    let (sequencer, fanout) = sequencer(host.clone());
    let mut events = fanout.subscribe();

    let outcome = sequencer.run(RefreshCause::Scheduled).await;

    // Not installed is a warning, not a sequence failure.
    assert!(!outcome.failed());
    assert_eq!(outcome.steps.last(), Some(&Completed));

    let mut messages = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let WatchdogEvent::Status { message, .. } = event {
            messages.push(message);
        }
    }
    assert!(
        messages.iter().any(|m| m.contains("Launch rejected")),
        "warning surfaced in the status line: {:?}",
        messages
    );
}
