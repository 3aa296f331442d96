//! Daemon runtime: scheduler + socket server + notice fan-out.
//!
//! Single-threaded cooperative execution: the runtime is a current-thread
//! tokio scheduler, so sync logic never runs in parallel — concurrency is
//! interleaving at suspension points (subprocess awaits and timers) only.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use quill_core::{config, TriggerSource};
use quill_git::GitGateway;
use quill_sync::{Notice, Notifier, SyncAttempt, SyncEngine};

use crate::error::{io_err, DaemonError};
use crate::paths::{log_path, logs_dir, run_dir, socket_path};
use crate::protocol::{DaemonRequest, DaemonResponse};
use crate::scheduler::{HostEvent, Scheduler};

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path) -> Result<(), DaemonError> {
    init_tracing(home);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf()))
}

/// Run the daemon runtime.
pub async fn run(home: PathBuf) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let settings = config::load_at(&home)?;
    tracing::info!(repo = %settings.repo.display(), "daemon starting");

    let (notice_tx, _) = broadcast::channel::<Notice>(64);
    let notifier: Arc<dyn Notifier> = Arc::new(BroadcastNotifier::new(notice_tx.clone()));
    let gateway = Arc::new(GitGateway::new(&settings.repo));
    let engine = Arc::new(SyncEngine::new(gateway, Arc::clone(&notifier)));
    let scheduler = Arc::new(Scheduler::new(engine, settings, notifier));
    let started_at_unix = unix_seconds_now();

    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    // Startup: one automatic sequence plus a debounced indicator refresh,
    // without delaying the socket bind.
    if scheduler.settings().auto_sync {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            scheduler.sync_files(TriggerSource::Auto).await;
        });
    }
    scheduler.on_route_change();

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let scheduler = Arc::clone(&scheduler);
        let notice_tx = notice_tx.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                scheduler,
                notice_tx,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let rotation_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        tokio::spawn(async move {
            let result = log_rotation_task(home, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (socket_result, rotation_result, signal_result) =
        tokio::join!(socket_handle, rotation_handle, signal_handle);

    handle_join("socket_server", socket_result)?;
    handle_join("log_rotation", rotation_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Notice fan-out
// ---------------------------------------------------------------------------

/// Notifier that logs every notice and fans it out to subscribed host
/// clients over the broadcast channel.
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notice>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<Notice>) -> Self {
        Self { tx }
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            quill_core::Severity::Warning => tracing::warn!(message = %notice.text, "notice"),
            _ => tracing::info!(message = %notice.text, "notice"),
        }
        // No subscriber is fine; the log line above is the fallback channel.
        let _ = self.tx.send(notice);
    }
}

// ---------------------------------------------------------------------------
// Socket server
// ---------------------------------------------------------------------------

async fn socket_server_task(
    home: PathBuf,
    scheduler: Arc<Scheduler>,
    notice_tx: broadcast::Sender<Notice>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let run = run_dir(&home);
    if !run.exists() {
        fs::create_dir_all(&run).map_err(|e| io_err(&run, e))?;
    }

    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let home = home.clone();
                let scheduler = Arc::clone(&scheduler);
                let notice_tx = notice_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        home,
                        scheduler,
                        notice_tx,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    home: PathBuf,
    scheduler: Arc<Scheduler>,
    notice_tx: broadcast::Sender<Notice>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: Result<DaemonRequest, _> = serde_json::from_str(&line);
        let request = match request {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(format!("invalid request JSON: {err}")),
                )
                .await?;
                continue;
            }
        };

        let cmd = request.cmd.clone();
        let response = match cmd.as_str() {
            "status" => {
                DaemonResponse::ok(build_status_payload(&home, &scheduler, started_at_unix))
            }
            "sync" => {
                let attempt = scheduler.sync_files(TriggerSource::Click).await;
                DaemonResponse::ok(attempt_payload(attempt))
            }
            "event" => match request.event.as_deref().unwrap_or_default().parse::<HostEvent>() {
                Ok(event) => {
                    dispatch_event(&scheduler, event).await;
                    DaemonResponse::ok(json!({ "handled": format!("{event:?}") }))
                }
                Err(err) => DaemonResponse::error(err),
            },
            "subscribe" => {
                write_response(&mut writer, &DaemonResponse::ok(json!({ "subscribed": true })))
                    .await?;
                stream_notices(&mut writer, notice_tx.subscribe(), shutdown_tx.subscribe()).await;
                break;
            }
            "stop" => {
                let _ = shutdown_tx.send(());
                DaemonResponse::ok(json!({ "stopping": true }))
            }
            other => DaemonResponse::error(format!("unknown command '{other}'")),
        };

        write_response(&mut writer, &response).await?;
        if cmd == "stop" {
            break;
        }
    }

    Ok(())
}

async fn dispatch_event(scheduler: &Arc<Scheduler>, event: HostEvent) {
    match event {
        HostEvent::Focus => scheduler.on_focus(),
        HostEvent::Blur => scheduler.on_blur(),
        HostEvent::RouteChange => scheduler.on_route_change(),
        HostEvent::DataChange => scheduler.on_data_change(),
        HostEvent::Hide => scheduler.on_hide().await,
    }
}

/// Forward notices to a subscribed client until it disconnects or the
/// daemon shuts down.
async fn stream_notices(
    writer: &mut OwnedWriteHalf,
    mut notices: broadcast::Receiver<Notice>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            notice = notices.recv() => match notice {
                Ok(notice) => {
                    let Ok(payload) = serde_json::to_string(&notice) else {
                        continue;
                    };
                    if write_line(writer, &payload).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notice subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

fn attempt_payload(attempt: SyncAttempt) -> Value {
    match attempt {
        SyncAttempt::Skipped => json!({ "skipped": true }),
        SyncAttempt::Aborted(outcome) => json!({ "aborted": true, "outcome": outcome }),
        SyncAttempt::Completed(outcome) => json!({ "outcome": outcome }),
    }
}

fn build_status_payload(home: &Path, scheduler: &Scheduler, started_at_unix: u64) -> Value {
    let engine = scheduler.engine();
    json!({
        "running": true,
        "repo": scheduler.settings().repo.display().to_string(),
        "indicator": engine.indicator().current(),
        "guard_held": engine.guard().is_held(),
        "auto_sync": scheduler.settings().auto_sync,
        "last_sync_at_unix": scheduler.last_sync_at_unix(),
        "started_at_unix": started_at_unix,
        "socket": socket_path(home).display().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Housekeeping tasks and helpers
// ---------------------------------------------------------------------------

async fn log_rotation_task(
    home: PathBuf,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(Duration::from_secs(5));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // consume the first immediate tick

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                crate::log_rotation::rotate_logs(&home);
            }
        }
    }
    Ok(())
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [run_dir(home), logs_dir(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(response)?;
    write_line(writer, &payload)
        .await
        .map_err(|e| io_err("daemon socket write", e))
}

async fn write_line(writer: &mut OwnedWriteHalf, payload: &str) -> std::io::Result<()> {
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn init_tracing(home: &Path) {
    use tracing_subscriber::fmt::writer::MakeWriterExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_writer = ReopeningLogWriter {
        path: log_path(home),
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_writer.and(std::io::stderr))
        .try_init();
}

/// Reopens the log file per event so rotation can rename it out from under
/// the subscriber without losing subsequent lines.
struct ReopeningLogWriter {
    path: PathBuf,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ReopeningLogWriter {
    type Writer = Box<dyn std::io::Write>;

    fn make_writer(&'a self) -> Self::Writer {
        match fs::OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => Box::new(file),
            Err(_) => Box::new(std::io::sink()),
        }
    }
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use quill_core::Settings;
    use quill_sync::testing::{RecordingNotifier, ScriptedGateway};

    fn test_scheduler() -> Arc<Scheduler> {
        let gateway = Arc::new(ScriptedGateway::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = Arc::new(SyncEngine::new(
            gateway as Arc<dyn quill_git::Gateway>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        ));
        Arc::new(Scheduler::new(
            engine,
            Settings::for_repo(std::path::PathBuf::from("/notes/garden")),
            notifier as Arc<dyn Notifier>,
        ))
    }

    #[tokio::test]
    async fn status_payload_before_any_sync() {
        let home = TempDir::new().expect("home");
        let scheduler = test_scheduler();

        let payload = build_status_payload(home.path(), &scheduler, 1_000_000);

        assert_eq!(payload["running"], json!(true));
        assert_eq!(payload["started_at_unix"], json!(1_000_000u64));
        assert_eq!(
            payload["last_sync_at_unix"],
            json!(0u64),
            "should be 0 before any sync"
        );
        assert_eq!(payload["indicator"], json!("inactive"));
        assert_eq!(payload["guard_held"], json!(false));
        assert_eq!(payload["auto_sync"], json!(true));
    }

    #[tokio::test]
    async fn status_payload_reflects_completed_sync() {
        let home = TempDir::new().expect("home");
        let scheduler = test_scheduler();

        let attempt = scheduler.sync_files(TriggerSource::Click).await;
        assert!(matches!(attempt, SyncAttempt::Completed(_)));

        let payload = build_status_payload(home.path(), &scheduler, 1_000_000);
        let last = payload["last_sync_at_unix"].as_u64().expect("timestamp");
        assert!(last > 0, "timestamp recorded after a successful sync");
    }

    #[tokio::test]
    async fn attempt_payload_shapes() {
        let skipped = attempt_payload(SyncAttempt::Skipped);
        assert_eq!(skipped["skipped"], json!(true));

        let completed = attempt_payload(SyncAttempt::Completed(quill_core::SyncOutcome {
            message: "Remote changes pulled to local".into(),
            was_error: false,
            was_pulled: true,
        }));
        assert_eq!(
            completed["outcome"]["message"],
            json!("Remote changes pulled to local")
        );
        assert_eq!(completed["outcome"]["was_pulled"], json!(true));
    }

    #[tokio::test]
    async fn socket_protocol_status_and_stop_over_in_memory_channels() {
        let (request_tx, mut request_rx) = mpsc::channel::<Vec<u8>>(8);
        let (response_tx, mut response_rx) = mpsc::channel::<Vec<u8>>(8);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

        tokio::spawn(async move {
            while let Some(bytes) = request_rx.recv().await {
                let line = String::from_utf8(bytes).expect("utf8");
                let request: DaemonRequest = serde_json::from_str(line.trim()).expect("request");
                let response = match request.cmd.as_str() {
                    "status" => DaemonResponse::ok(json!({"running": true})),
                    "stop" => {
                        let _ = shutdown_tx.send(());
                        DaemonResponse::ok(json!({"stopping": true}))
                    }
                    other => DaemonResponse::error(format!("unknown command '{other}'")),
                };
                let encoded = serde_json::to_vec(&response).expect("encode response");
                if response_tx.send(encoded).await.is_err() {
                    break;
                }
            }
        });

        request_tx
            .send(br#"{"cmd":"status"}"#.to_vec())
            .await
            .expect("send status request");
        let status_response = response_rx.recv().await.expect("status response");
        let status_json: serde_json::Value =
            serde_json::from_slice(&status_response).expect("decode status");
        assert_eq!(status_json["ok"], serde_json::Value::Bool(true));

        request_tx
            .send(br#"{"cmd":"stop"}"#.to_vec())
            .await
            .expect("send stop request");
        let stop_response = response_rx.recv().await.expect("stop response");
        let stop_json: serde_json::Value =
            serde_json::from_slice(&stop_response).expect("decode stop");
        assert_eq!(stop_json["ok"], serde_json::Value::Bool(true));

        shutdown_rx.recv().await.expect("shutdown signal");
    }
}
