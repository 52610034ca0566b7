use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use super::{ExtractorError, TranscriptSource, TranscriptTrack, VideoExtractor, VideoInfo};
use crate::media::{Audio, AudioFormat, SubtitleFormat};

/// Best audio-only stream that is AAC in an m4a container
const M4A_AUDIO: &str = "bestaudio[ext=m4a]";

/// Blocking yt-dlp wrapper. Every call waits on a child process, so it must
/// run through [`crate::bridge::BlockingBridge`].
pub struct YtDlp {
    yt_dlp_path: String,
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_path("yt-dlp")
    }

    pub fn with_path(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Run yt-dlp to completion and return its stdout
    fn run(&self, args: &[&str]) -> Result<Vec<u8>, ExtractorError> {
        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ExtractorError::Tool {
                tool: self.yt_dlp_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractorError::Unavailable(error.trim().to_string()));
        }

        Ok(output.stdout)
    }

    fn dump_json(&self, url: &str) -> Result<YtDlpInfo, ExtractorError> {
        tracing::debug!("Extracting video info for: {}", url);

        let stdout = self.run(&[
            "--dump-json",
            "--skip-download",
            "--no-playlist",
            "--no-warnings",
            url,
        ])?;

        serde_json::from_slice(&stdout).map_err(|e| ExtractorError::Malformed(e.to_string()))
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

/// Subset of `yt-dlp --dump-json` used here
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YtDlpInfo {
    id: String,
    display_id: Option<String>,
    title: String,
    description: Option<String>,
    channel_id: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    subtitles: BTreeMap<String, Vec<SubtitleEntry>>,
    automatic_captions: BTreeMap<String, Vec<SubtitleEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubtitleEntry {
    ext: String,
    url: String,
}

impl From<YtDlpInfo> for VideoInfo {
    fn from(info: YtDlpInfo) -> Self {
        VideoInfo {
            native_id: info.display_id.unwrap_or(info.id),
            title: info.title,
            description: info.description.unwrap_or_default(),
            channel_id: info.channel_id.unwrap_or_default(),
            channel_name: info.uploader.or(info.channel).unwrap_or_default(),
            duration_seconds: info.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
            thumbnail_url: info.thumbnail.unwrap_or_default(),
        }
    }
}

/// Uploader subtitles first, then auto captions, keeping only formats we can hand out
fn collect_tracks(info: YtDlpInfo) -> Vec<TranscriptTrack> {
    let manual = info.subtitles.into_iter().map(|(lang, entries)| (lang, entries, false));
    let generated = info
        .automatic_captions
        .into_iter()
        .map(|(lang, entries)| (lang, entries, true));

    manual
        .chain(generated)
        .filter_map(|(language_code, entries, generated)| {
            entries.into_iter().filter(|entry| !entry.url.is_empty()).find_map(|entry| {
                let format = match entry.ext.as_str() {
                    "vtt" => SubtitleFormat::Vtt,
                    "srt" => SubtitleFormat::Srt,
                    _ => return None,
                };
                Some(TranscriptTrack {
                    language_code: language_code.clone(),
                    generated,
                    format,
                    url: entry.url,
                })
            })
        })
        .collect()
}

impl VideoExtractor for YtDlp {
    fn extract_info(&self, url: &str) -> Result<VideoInfo, ExtractorError> {
        let info = self.dump_json(url)?;
        if info.id.is_empty() && info.display_id.is_none() {
            return Err(ExtractorError::Malformed("yt-dlp returned no video id".to_string()));
        }
        Ok(info.into())
    }

    fn download_audio(&self, url: &str) -> Result<Audio, ExtractorError> {
        tracing::debug!("Downloading audio for: {}", url);

        // m4a only: yt-dlp fails with "Requested format is not available" otherwise
        let binary = self.run(&[
            "--format",
            M4A_AUDIO,
            "--no-playlist",
            "--no-warnings",
            "--quiet",
            "--output",
            "-",
            url,
        ])?;

        if binary.is_empty() {
            return Err(ExtractorError::Malformed("yt-dlp produced no audio data".to_string()));
        }
        if !is_mp4_container(&binary) {
            return Err(ExtractorError::Malformed(
                "yt-dlp audio is not an MP4 container".to_string(),
            ));
        }

        Ok(Audio::new(binary, AudioFormat::M4a))
    }
}

/// An MP4 file opens with an `ftyp` box: 4 bytes of size, then the box type
fn is_mp4_container(binary: &[u8]) -> bool {
    binary.get(4..8) == Some(b"ftyp".as_slice())
}

impl TranscriptSource for YtDlp {
    fn list_transcripts(&self, native_id: &str) -> Result<Vec<TranscriptTrack>, ExtractorError> {
        let info = self.dump_json(&super::youtube::watch_url(native_id))?;
        Ok(collect_tracks(info))
    }

    fn fetch_transcript(&self, track: &TranscriptTrack) -> Result<String, ExtractorError> {
        tracing::debug!("Fetching {} transcript ({})", track.language_code, track.format);

        // runs on a blocking worker thread, never on the runtime
        let body = reqwest::blocking::get(&track.url)?.error_for_status()?.text()?;
        Ok(body)
    }
}
