use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::ingest::VideoRecord;
use crate::media::Transcription;
use crate::utils::{format_duration, sanitize_filename};

/// `<dir>/<name>.<lang>.<ext>`, with the language part left out when unknown
pub fn default_output_path(dir: &Path, name: &str, transcription: &Transcription) -> PathBuf {
    let stem = sanitize_filename(name);
    let file_name = match transcription.language {
        Some(lang) => format!("{}.{}.{}", stem, lang.code(), transcription.format),
        None => format!("{}.{}", stem, transcription.format),
    };
    dir.join(file_name)
}

/// Save subtitle text to file, creating parent directories
pub async fn save_to_file(transcription: &Transcription, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }

    fs_err::write(path, &transcription.content).context("Failed to write subtitle file")?;
    Ok(())
}

/// Print subtitle text to console
pub fn print_to_console(transcription: &Transcription) {
    println!("{}", transcription.content.trim_end());
}

/// One-line summary of an ingested video
pub fn format_record(record: &VideoRecord) -> String {
    let mut line = format!(
        "#{} {} {}",
        record.instance_id, record.identity, record.info.title
    );
    if record.info.duration_seconds > 0 {
        line.push_str(&format!(" ({})", format_duration(record.info.duration_seconds)));
    }
    if !record.info.channel_name.is_empty() {
        line.push_str(&format!(" by {}", record.info.channel_name));
    }
    line
}

pub fn format_records_json(records: &[VideoRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).context("Failed to serialize video records")
}
