use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vigil::kernel::config::WatchdogConfig;
use vigil::kernel::session::PlaybackStateKind;
use vigil::platform::scripted::{ScriptedHost, ScriptedSession};
use vigil::platform::WorkUnit;
use vigil::store::{FileStateStore, WatchdogEvent};
use vigil::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 2. Load Config (optional path as first arg)
    let config = match std::env::args().nth(1) {
        Some(path) => WatchdogConfig::from_file(PathBuf::from(path).as_path())?,
        None => WatchdogConfig::default(),
    };
    tracing::info!(player = %config.target_id, "Starting vigil watchdog...");

    // 3. Scripted host standing in for the live platform. Starts with a
    // paused player so the first reconciliation has something to correct.
    let host = Arc::new(ScriptedHost::steady(PlaybackStateKind::Paused));
    host.set_background_work(vec![
        WorkUnit::new("com.example.idle_sync", 50),
        WorkUnit::new("com.android.systemui", 10),
        WorkUnit::new(config.target_id.clone(), 10),
    ]);

    let store = Arc::new(FileStateStore::open(PathBuf::from("vigil-state.json"))?);

    let supervisor = Arc::new(Supervisor::new(config, host.clone(), host.clone(), store));

    // 4. Broadcast printer: what an external display would render.
    let mut events = supervisor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                WatchdogEvent::Status { message, .. } => println!("[STATUS] {}", message),
                WatchdogEvent::Countdown { seconds, status, .. } => {
                    println!("[NEXT REFRESH] {:>4}s  {}", seconds, status)
                }
            }
        }
    });

    supervisor.connect();

    // 5. Console commands driving the scripted player.
    let stdin_supervisor = supervisor.clone();
    let stdin_host = host.clone();
    let stdin_task = tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        println!("Commands: refresh | pause | play | absent | stop | start | quit");

        while let Ok(Some(line)) = lines.next_line().await {
            match line.trim() {
                "" => continue,
                "refresh" => {
                    if let Err(e) = stdin_supervisor.trigger_refresh() {
                        println!("refresh rejected: {}", e);
                    }
                }
                "pause" => {
                    stdin_host.set_steady(ScriptedSession::State(PlaybackStateKind::Paused))
                }
                "play" => {
                    stdin_host.set_steady(ScriptedSession::State(PlaybackStateKind::Playing))
                }
                "absent" => stdin_host.set_steady(ScriptedSession::Absent),
                "stop" => stdin_supervisor.disconnect(),
                "start" => stdin_supervisor.connect(),
                "quit" => break,
                other => println!("unknown command: {}", other),
            }
        }
    });

    // 6. Run until quit or Ctrl+C.
    tokio::select! {
        _ = stdin_task => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    supervisor.disconnect();
    tracing::info!("vigil stopped");
    Ok(())
}
