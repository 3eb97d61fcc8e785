//! Runs the real yt-dlp invoker against a shell script standing in for yt-dlp
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use mediafetch::downloader::{DownloadError, MediaDownloader, YtDlp};
use mediafetch::jobs::{DownloadJob, JobEnvelope, JobState, MediaFormat};
use mediafetch::observability::Metrics;
use mediafetch::progress::ProgressHub;
use mediafetch::queue::JobQueue;
use mediafetch::worker::{WorkerContext, run_job};

/// Behaviour is picked from the last path segment of the url
const FAKE_YT_DLP: &str = r#"#!/bin/sh
all="$*"
out=""
url=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --) url="$2"; shift 2 ;;
    *) shift ;;
  esac
done

case "$url" in
  */ok)
    echo "[download] Destination: $out"
    echo "[download]  12.5% of 3.00MiB at 1.00MiB/s ETA 00:02"
    echo "[download]  45.3% of 3.00MiB at 1.00MiB/s ETA 00:01"
    echo "[download] 100.0% of 3.00MiB"
    echo "$all" > "$out"
    ;;
  */fail)
    echo "[download]  10.0% of 3.00MiB"
    echo "ERROR: [generic] Unsupported URL: $url" >&2
    exit 1
    ;;
  */latin1)
    printf 'Destination: caf\351.webm\n' >&2
    echo "[download]  50.0% of 3.00MiB"
    echo "$all" > "$out"
    ;;
  */nofile)
    echo "[download] 100.0% of 3.00MiB"
    ;;
  */slow)
    exec sleep 30
    ;;
esac
"#;

/// Written once per test binary so no test forks while the script is still open for writing
fn fake_program() -> &'static Path {
    static SCRIPT: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_dir, path) = SCRIPT.get_or_init(|| {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("yt-dlp");
        std::fs::write(&path, FAKE_YT_DLP).expect("Failed to write fake yt-dlp");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to mark fake yt-dlp executable");
        (dir, path)
    });
    path
}

fn envelope(scenario: &str, format: MediaFormat) -> JobEnvelope {
    JobEnvelope::new(DownloadJob {
        url: format!("https://example.com/{scenario}"),
        title: "My Song (Live)!!".to_string(),
        format,
    })
}

async fn run_download(
    downloader: &YtDlp,
    envelope: &JobEnvelope,
) -> (PathBuf, Vec<f64>, Result<(), DownloadError>) {
    let output = downloader.prepare(envelope).await.unwrap();
    let readings = Mutex::new(Vec::new());
    let result = downloader
        .download(envelope, &output, &|percent| readings.lock().unwrap().push(percent))
        .await;
    (output, readings.into_inner().unwrap(), result)
}

#[tokio::test]
async fn successful_download_reports_progress_and_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let downloader = YtDlp::new(fake_program(), temp_dir.path().join("downloads"));
    let env = envelope("ok", MediaFormat::Audio);

    let (output, readings, result) = run_download(&downloader, &env).await;

    result.unwrap();
    assert_eq!(output, temp_dir.path().join("downloads").join("My_Song_Live.mp3"));
    assert_eq!(readings, vec![12.5, 45.3, 100.0]);

    // The script records its arguments in the output file
    let args = std::fs::read_to_string(&output).unwrap();
    assert!(args.contains("-x --audio-format mp3 --audio-quality 0"));
    assert!(args.contains("--newline"));
    assert!(args.trim_end().ends_with("-- https://example.com/ok"));
}

#[tokio::test]
async fn video_download_uses_combined_format_selection() {
    let temp_dir = TempDir::new().unwrap();
    let downloader = YtDlp::new(fake_program(), temp_dir.path());
    let env = envelope("ok", MediaFormat::Video);

    let (output, _readings, result) = run_download(&downloader, &env).await;

    result.unwrap();
    assert_eq!(output.extension().unwrap(), "mp4");
    let args = std::fs::read_to_string(&output).unwrap();
    assert!(args.contains(mediafetch::downloader::VIDEO_FORMAT_SELECTOR));
    assert!(!args.contains("--audio-format"));
}

#[tokio::test]
async fn non_zero_exit_carries_error_line() {
    let temp_dir = TempDir::new().unwrap();
    let downloader = YtDlp::new(fake_program(), temp_dir.path());
    let env = envelope("fail", MediaFormat::Audio);

    let (_output, readings, result) = run_download(&downloader, &env).await;

    assert_eq!(readings, vec![10.0]);
    match result.unwrap_err() {
        DownloadError::Exited { detail, .. } => {
            let detail = detail.expect("missing error detail");
            assert!(detail.starts_with("ERROR: [generic] Unsupported URL"));
        }
        other => panic!("expected Exited, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_output_is_a_failure() {
    let temp_dir = TempDir::new().unwrap();
    let downloader = YtDlp::new(fake_program(), temp_dir.path());
    let env = envelope("nofile", MediaFormat::Video);

    let (output, _readings, result) = run_download(&downloader, &env).await;

    match result.unwrap_err() {
        DownloadError::MissingOutput(path) => assert_eq!(path, output),
        other => panic!("expected MissingOutput, got {other:?}"),
    }
}

#[tokio::test]
async fn non_utf8_output_lines_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let downloader = YtDlp::new(fake_program(), temp_dir.path());
    let env = envelope("latin1", MediaFormat::Video);

    let (output, readings, result) = run_download(&downloader, &env).await;

    result.unwrap();
    assert_eq!(readings, vec![50.0]);
    assert!(output.exists());
}

#[tokio::test]
async fn unreadable_output_path_reports_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let downloader = YtDlp::new(fake_program(), temp_dir.path());
    let env = envelope("nofile", MediaFormat::Video);

    // A regular file where a directory is expected makes the stat fail
    let plain = temp_dir.path().join("plain");
    std::fs::write(&plain, b"").unwrap();
    let output = plain.join("out.mp4");

    let result = downloader.download(&env, &output, &|_| {}).await;

    match result.unwrap_err() {
        DownloadError::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::NotADirectory),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_download_times_out_as_failed_job() {
    let temp_dir = TempDir::new().unwrap();
    let metrics = Arc::new(Metrics::new());
    let ctx = WorkerContext {
        queue: JobQueue::new(1),
        hub: ProgressHub::new(16, Arc::clone(&metrics)),
        downloader: Arc::new(YtDlp::new(fake_program(), temp_dir.path())),
        metrics,
        job_timeout: Duration::from_millis(300),
        cancel: CancellationToken::new(),
    };
    let mut subscription = ctx.hub.subscribe();

    let started = Instant::now();
    let state = run_job(&ctx, envelope("slow", MediaFormat::Audio)).await;

    assert_eq!(state, JobState::Failed);
    assert!(started.elapsed() < Duration::from_secs(10));

    let mut terminal = None;
    while let Some(event) = subscription.recv().await {
        if event.state.is_terminal() {
            terminal = Some(event);
            break;
        }
    }
    let terminal = terminal.unwrap();
    assert_eq!(terminal.state, JobState::Failed);
    assert!(terminal.error.unwrap().contains("timed out"));
    assert_eq!(ctx.metrics.snapshot().jobs_failed, 1);
}
