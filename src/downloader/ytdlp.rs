use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, trace};

use super::{DownloadError, MediaDownloader, ProgressSink, build_args, output_path, parse_percent};
use crate::config::DownloaderConfig;
use crate::jobs::JobEnvelope;

/// Runs the `yt-dlp` command-line tool, one child process per job
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    output_dir: PathBuf,
    extra_args: Vec<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &DownloaderConfig) -> Self {
        Self::new(&config.program, &config.output_dir).with_extra_args(config.extra_args.clone())
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn command(&self, envelope: &JobEnvelope, output: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(build_args(
            envelope.job.format,
            &self.extra_args,
            output,
            &envelope.job.url,
        ))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Timeouts and shutdown stop a job by dropping its future
        .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl MediaDownloader for YtDlp {
    async fn prepare(&self, envelope: &JobEnvelope) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| DownloadError::CreateDir {
                path: self.output_dir.clone(),
                source,
            })?;

        Ok(output_path(&self.output_dir, envelope))
    }

    async fn download(
        &self,
        envelope: &JobEnvelope,
        output: &Path,
        progress: ProgressSink<'_>,
    ) -> Result<(), DownloadError> {
        let mut child = self
            .command(envelope, output)
            .spawn()
            .map_err(|source| DownloadError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        info!(
            job_id = %envelope.id,
            pid = child.id(),
            url = %envelope.job.url,
            output = %output.display(),
            "Downloader started"
        );

        let mut stdout = OutputLines::new(child.stdout.take());
        let mut stderr = OutputLines::new(child.stderr.take());
        let mut last_error: Option<String> = None;

        // yt-dlp writes progress to stdout and diagnostics to stderr; watch both
        loop {
            let line = tokio::select! {
                line = stdout.next_line(), if stdout.is_open() => line,
                line = stderr.next_line(), if stderr.is_open() => line,
                else => break,
            };

            let Some(line) = line? else { continue };
            trace!(job_id = %envelope.id, line = %line, "Downloader output");

            if let Some(percent) = parse_percent(&line) {
                progress(percent);
            } else if line.starts_with("ERROR") {
                last_error = Some(line.trim().to_string());
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(DownloadError::Exited {
                status: status.to_string(),
                detail: last_error,
            });
        }

        if !tokio::fs::try_exists(output).await? {
            return Err(DownloadError::MissingOutput(output.to_path_buf()));
        }

        debug!(job_id = %envelope.id, output = %output.display(), "Downloader finished");
        Ok(())
    }
}

/// Line reader over a child's output pipe
///
/// Lines are split on raw bytes and decoded lossily, so output in a non
/// UTF-8 locale never fails the read. Partial lines survive a cancelled
/// `next_line` inside `select!`.
struct OutputLines<R> {
    reader: Option<BufReader<R>>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OutputLines<R> {
    fn new(pipe: Option<R>) -> Self {
        Self {
            reader: pipe.map(BufReader::new),
            buf: Vec::new(),
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Next line without its terminator; `None` once the pipe is exhausted
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        if reader.read_until(b'\n', &mut self.buf).await? == 0 {
            self.reader = None;
            if self.buf.is_empty() {
                return Ok(None);
            }
        }

        let line = String::from_utf8_lossy(&self.buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.buf.clear();
        Ok(Some(line))
    }
}
