//! Composition orchestration: validation, probing, planning, encoding.
//!
//! One invocation owns one child process and one progress state; there
//! is no shared mutable state across concurrent compositions.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{ChildStderr, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clipstack_common::{ClipstackError, ClipstackResult};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::invocation::{build_ffmpeg_args, EncodeSettings};
use crate::plan::{build_plan, LayoutConfig};
use crate::probe::{probe_media_with, DEFAULT_FFPROBE_BIN};
use crate::progress::{parse_status_line, ProgressState, StatusEvent};

/// Progress callback for composition runs.
pub type ProgressCallback = Box<dyn Fn(ComposeProgress) + Send>;

/// One composition request: two inputs, one output.
#[derive(Debug, Clone)]
pub struct ComposeJob {
    /// Main clip (top of the stack, audio source).
    pub main_path: PathBuf,

    /// Overlay clip (bottom of the stack).
    pub overlay_path: PathBuf,

    /// Output file path.
    pub output_path: PathBuf,
}

/// Options for a composition run.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Vertical split layout.
    pub layout: LayoutConfig,

    /// Encoder parameters.
    pub encode: EncodeSettings,

    /// Prober binary (default: ffprobe).
    pub ffprobe_bin: String,

    /// Hard wall-clock limit for the encoder run. `None` (the default)
    /// lets the encoder run unbounded.
    pub timeout: Option<Duration>,

    /// Cooperative cancellation flag; when set, the encoder is killed
    /// and the run fails promptly.
    pub cancel: Option<Arc<AtomicBool>>,

    /// Seed for the overlay offset draw. `None` uses entropy.
    pub seed: Option<u64>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            encode: EncodeSettings::default(),
            ffprobe_bin: DEFAULT_FFPROBE_BIN.to_string(),
            timeout: None,
            cancel: None,
            seed: None,
        }
    }
}

/// Progress report delivered while the encoder runs.
#[derive(Debug, Clone)]
pub struct ComposeProgress {
    /// Percent complete, monotonically non-decreasing in [0, 100].
    pub percent: f64,

    /// Media time processed so far (seconds).
    pub out_time_secs: f64,

    /// Total media duration as announced by the encoder (seconds).
    pub total_secs: f64,

    /// Wall-clock seconds since the encoder started.
    pub elapsed_secs: f64,
}

/// Summary of a finished composition.
#[derive(Debug, Clone)]
pub struct ComposeReport {
    /// The written output file.
    pub output_path: PathBuf,

    /// Output media duration in seconds.
    pub total_secs: f64,

    /// Offset into the overlay clip chosen by the planner.
    pub overlay_start_secs: f64,

    /// Wall-clock seconds the whole run took.
    pub elapsed_secs: f64,
}

/// Lifecycle of one encoder run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComposeState {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

/// Compose two clips into a stacked output.
///
/// Validates inputs before any process is launched, probes both clips,
/// plans the geometry and overlay offset, then runs the encoder while
/// forwarding progress to the optional callback. Returns a report on
/// success and a specific [`ClipstackError`] on any failure.
pub async fn compose_job(
    job: ComposeJob,
    opts: ComposeOptions,
    progress: Option<ProgressCallback>,
) -> ClipstackResult<ComposeReport> {
    let started = Instant::now();
    opts.layout.validate()?;

    for path in [&job.main_path, &job.overlay_path] {
        if !path.exists() {
            return Err(ClipstackError::FileNotFound { path: path.clone() });
        }
    }

    if let Some(parent) = job.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let main = probe_media_with(&opts.ffprobe_bin, &job.main_path)?;
    let overlay = probe_media_with(&opts.ffprobe_bin, &job.overlay_path)?;
    tracing::info!(
        width = main.width,
        height = main.height,
        main_secs = main.duration_secs,
        overlay_secs = overlay.duration_secs,
        "Probed inputs"
    );

    let mut rng: StdRng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let plan = build_plan(&job, &opts.layout, &main, &overlay, &mut rng)?;
    tracing::info!(
        overlay_start_secs = plan.overlay_start_secs,
        main_height = plan.main_height,
        overlay_height = plan.overlay_height,
        output = %plan.output_path.display(),
        "Composition plan built"
    );

    if !command_exists(&opts.encode.ffmpeg_bin) {
        return Err(ClipstackError::launch(format!(
            "{} not found in PATH",
            opts.encode.ffmpeg_bin
        )));
    }

    let args = build_ffmpeg_args(&plan, &opts.encode);
    let total_secs = run_encoder(
        &opts.encode.ffmpeg_bin,
        &args,
        opts.timeout,
        opts.cancel.clone(),
        progress.as_ref(),
    )?;

    let report = ComposeReport {
        output_path: plan.output_path,
        total_secs: if total_secs > 0.0 {
            total_secs
        } else {
            plan.main_duration_secs
        },
        overlay_start_secs: plan.overlay_start_secs,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    tracing::info!(
        elapsed_secs = report.elapsed_secs,
        output = %report.output_path.display(),
        "Composition finished"
    );
    Ok(report)
}

/// Boolean surface for casual callers: defaults for everything, every
/// error logged, never raised.
pub async fn compose(
    main_path: impl Into<PathBuf>,
    overlay_path: impl Into<PathBuf>,
    output_path: impl Into<PathBuf>,
) -> bool {
    let job = ComposeJob {
        main_path: main_path.into(),
        overlay_path: overlay_path.into(),
        output_path: output_path.into(),
    };
    match compose_job(job, ComposeOptions::default(), None).await {
        Ok(_) => true,
        Err(ClipstackError::Encode { message, log }) => {
            tracing::error!(%message, "Composition failed");
            if !log.trim().is_empty() {
                tracing::error!(log = %log.trim(), "Encoder diagnostics");
            }
            false
        }
        Err(err) => {
            tracing::error!(error = %err, "Composition failed");
            false
        }
    }
}

enum StreamEvent {
    /// Parsed from the stderr diagnostic stream.
    Status(StatusEvent),

    /// One `key=value` record from the stdout progress stream.
    Progress { key: String, value: String },
}

/// Launch the encoder and drain both output streams until it exits.
///
/// Each stream gets a dedicated reader thread feeding a shared queue, so
/// neither pipe can fill up and block the child while the other is being
/// read. The orchestrating loop waits on the queue with a bounded
/// timeout, checking the cancel flag and deadline between waits.
///
/// Returns the total media duration announced on stderr (0.0 when the
/// encoder never announced one).
fn run_encoder(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<&ProgressCallback>,
) -> ClipstackResult<f64> {
    let mut state = ComposeState::NotStarted;
    tracing::debug!(program, ?args, ?state, "Launching encoder");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ClipstackError::launch(format!("Failed to start {program}: {e}")))?;
    state = ComposeState::Running;

    let encode_started = Instant::now();
    let deadline = timeout.map(|t| encode_started + t);
    tracing::info!(pid = child.id(), ?state, "Encoder process started");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ClipstackError::launch("Failed to capture encoder stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ClipstackError::launch("Failed to capture encoder stderr"))?;

    let (tx, rx) = mpsc::channel();
    let stderr_tx = tx.clone();
    let stderr_task = std::thread::spawn(move || drain_diagnostics(stderr, stderr_tx));
    let stdout_task = std::thread::spawn(move || drain_progress_stream(stdout, tx));

    let mut progress_state = ProgressState::default();
    let mut kill_reason: Option<&'static str> = None;
    loop {
        if kill_reason.is_none() {
            if cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
            {
                kill_reason = Some("cancelled");
            } else if deadline.is_some_and(|d| Instant::now() >= d) {
                kill_reason = Some("timed out");
            }
            if kill_reason.is_some() {
                let _ = child.kill();
            }
        }

        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(StreamEvent::Status(event)) => {
                progress_state.apply(event);
                if matches!(event, StatusEvent::TimeUpdate(_)) {
                    emit_progress(progress, &mut progress_state, encode_started);
                }
            }
            Ok(StreamEvent::Progress { key, value }) => {
                progress_state.update(&key, &value);
                if key == "progress" {
                    emit_progress(progress, &mut progress_state, encode_started);
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let status = child
        .wait()
        .map_err(|e| ClipstackError::launch(format!("Failed to wait on {program}: {e}")))?;
    let log = stderr_task
        .join()
        .unwrap_or_else(|_| "<failed to join diagnostics reader>".to_string());
    let _ = stdout_task.join();

    state = if status.success() && kill_reason.is_none() {
        ComposeState::Succeeded
    } else {
        ComposeState::Failed
    };
    tracing::info!(?state, status = %status, "Encoder process finished");

    if let Some(reason) = kill_reason {
        return Err(ClipstackError::encode(
            format!(
                "Encoder {reason} after {:.1}s",
                encode_started.elapsed().as_secs_f64()
            ),
            log,
        ));
    }
    if !status.success() {
        return Err(ClipstackError::encode(
            format!("{program} exited with {status}"),
            log,
        ));
    }

    if let Some(cb) = progress {
        cb(ComposeProgress {
            percent: 100.0,
            out_time_secs: progress_state.out_time_secs(),
            total_secs: progress_state.total_secs().unwrap_or(0.0),
            elapsed_secs: encode_started.elapsed().as_secs_f64(),
        });
    }

    Ok(progress_state.total_secs().unwrap_or(0.0))
}

fn emit_progress(
    progress: Option<&ProgressCallback>,
    state: &mut ProgressState,
    encode_started: Instant,
) {
    let Some(cb) = progress else {
        return;
    };
    // Quiet until the encoder has announced a total duration.
    let Some(percent) = state.percent() else {
        return;
    };
    cb(ComposeProgress {
        percent,
        out_time_secs: state.out_time_secs(),
        total_secs: state.total_secs().unwrap_or(0.0),
        elapsed_secs: encode_started.elapsed().as_secs_f64(),
    });
}

/// Drain the stderr diagnostic stream, forwarding recognized status
/// events and returning the full captured text.
///
/// Live status lines are carriage-return separated, so chunks are read
/// up to `\r` and split on both terminators.
fn drain_diagnostics(stderr: ChildStderr, tx: mpsc::Sender<StreamEvent>) -> String {
    let mut reader = BufReader::new(stderr);
    let mut full = String::new();
    let mut buf: Vec<u8> = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\r', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf);
                for line in chunk.split(['\r', '\n']) {
                    if let Some(event) = parse_status_line(line) {
                        let _ = tx.send(StreamEvent::Status(event));
                    }
                }
                full.push_str(&chunk);
            }
            Err(err) => {
                full.push_str(&format!("<failed to read encoder diagnostics: {err}>"));
                break;
            }
        }
    }
    full
}

/// Drain the stdout machine progress stream into `key=value` events.
fn drain_progress_stream(stdout: ChildStdout, tx: mpsc::Sender<StreamEvent>) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if let Some((key, value)) = line.trim().split_once('=') {
                    let _ = tx.send(StreamEvent::Progress {
                        key: key.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
    }
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
