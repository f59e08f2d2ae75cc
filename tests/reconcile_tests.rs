use std::sync::Arc;

use vigil::kernel::policy::CorrectiveAction;
use vigil::kernel::reconcile::Reconciler;
use vigil::kernel::session::{PlaybackStateKind, TransportCommand};
use vigil::platform::scripted::ScriptedHost;

const PLAYER: &str = "com.example.player";

#[test]
fn paused_player_gets_a_play_command() {
    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Paused));
    let reconciler = Reconciler::new(host.clone(), PLAYER);

    let action = reconciler.tick();

    assert_eq!(action, CorrectiveAction::Resume);
    assert_eq!(host.issued(), vec![TransportCommand::Play]);
    assert!(host.launches().is_empty(), "no launch for a present session");
}

#[test]
fn playing_player_is_left_alone() {
    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Playing));
    let reconciler = Reconciler::new(host.clone(), PLAYER);

    assert_eq!(reconciler.tick(), CorrectiveAction::None);
    assert!(host.issued().is_empty());
    assert!(host.launches().is_empty());
}

#[test]
fn absent_session_requests_a_launch() {
    let host = Arc::new(ScriptedHost::absent());
    let reconciler = Reconciler::new(host.clone(), PLAYER);

    assert_eq!(reconciler.tick(), CorrectiveAction::Launch);
    assert_eq!(host.launches(), vec![PLAYER.to_string()]);
    assert!(host.issued().is_empty());
}

#[test]
fn query_failure_is_treated_as_absent() {
    use vigil::platform::scripted::ScriptedSession;

    let host = Arc::new(ScriptedHost::new(ScriptedSession::QueryFails(
        "binder died".to_string(),
    )));
    let reconciler = Reconciler::new(host.clone(), PLAYER);

    // The loop cannot distinguish "not running" from "query failed"; the
    // corrective action is the same either way.
    assert_eq!(reconciler.tick(), CorrectiveAction::Launch);
    assert_eq!(host.launches(), vec![PLAYER.to_string()]);
}

#[test]
fn command_failure_is_swallowed_and_retried_next_tick() {
    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Paused));
    host.fail_command(TransportCommand::Play, "session revoked");
    let reconciler = Reconciler::new(host.clone(), PLAYER);

    // 1. The failing tick still decides Resume and does not panic.
    assert_eq!(reconciler.tick(), CorrectiveAction::Resume);
    assert!(host.issued().is_empty(), "the failing command never lands");

    // 2. Next tick retries naturally once the platform recovers.
    host.fail_command(TransportCommand::Pause, "unrelated");
    assert_eq!(reconciler.tick(), CorrectiveAction::Resume);
    assert_eq!(host.issued(), vec![TransportCommand::Play]);
}

#[test]
fn resume_is_a_harmless_repeat_against_a_playing_session() {
    // Paused twice in a row: both ticks send Play, the player accepts the
    // repeat as a no-op. Nothing else is observable.
    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Paused));
    let reconciler = Reconciler::new(host.clone(), PLAYER);

    reconciler.tick();
    reconciler.tick();

    assert_eq!(
        host.issued(),
        vec![TransportCommand::Play, TransportCommand::Play]
    );
}

#[test]
fn launch_rejection_is_logged_not_fatal() {
    let host = Arc::new(ScriptedHost::absent());
    host.set_launch_ok(false);
    let reconciler = Reconciler::new(host.clone(), PLAYER);

    assert_eq!(reconciler.tick(), CorrectiveAction::Launch);
    assert_eq!(host.launches().len(), 1);
}
