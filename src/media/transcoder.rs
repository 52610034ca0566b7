use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Audio, AudioFormat};

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("Failed to start {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("Transcoder pipe failed")]
    Io(#[from] io::Error),

    #[error("Transcoding to {target} failed (exit code {code:?}): {stderr}")]
    Failed {
        target: AudioFormat,
        code: Option<i32>,
        stderr: String,
    },
}

/// Converts audio between container/codec formats
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Re-encode `source` as `target`. The returned value is always tagged `target`.
    async fn convert(&self, source: &Audio, target: AudioFormat) -> Result<Audio, TranscodeError>;
}

/// Transcoder backed by an `ffmpeg` process reading stdin and writing stdout
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self::with_path("ffmpeg")
    }

    pub fn with_path(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn convert(&self, source: &Audio, target: AudioFormat) -> Result<Audio, TranscodeError> {
        tracing::debug!(
            "Transcoding {} bytes from {} to {}",
            source.len(),
            source.format(),
            target
        );

        let mut child = Command::new(&self.ffmpeg_path)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-i",
                "pipe:0",
                "-vn",
                "-f",
                target.ffmpeg_muxer(),
                "pipe:1",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a dropped conversion must not leave ffmpeg running
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                tool: self.ffmpeg_path.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "ffmpeg stdin unavailable"))?;

        // Feed stdin concurrently with draining stdout, otherwise a full pipe deadlocks both sides
        let input = source.binary().to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            writer.abort();
            return Err(TranscodeError::Failed {
                target,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        match writer.await {
            Ok(Ok(())) => {}
            // ffmpeg may stop reading once it has what it needs
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(e) => return Err(TranscodeError::Io(io::Error::new(io::ErrorKind::Other, e))),
        }

        tracing::info!("Transcoded audio to {} ({} bytes)", target, output.stdout.len());

        Ok(Audio::new(output.stdout, target))
    }
}
