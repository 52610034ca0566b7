use crate::config::ToolsConfig;

/// Format a video duration, e.g. `1h 1m 1s`
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Names of configured tools that cannot be run, with what they are needed for
pub async fn check_dependencies(tools: &ToolsConfig) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&tools.yt_dlp_path, "--version").await {
        missing.push(format!(
            "{} - required for metadata, audio and subtitle extraction",
            tools.yt_dlp_path
        ));
    }

    if !check_command_available(&tools.ffmpeg_path, "-version").await {
        missing.push(format!(
            "{} - required to convert audio for transcription",
            tools.ffmpeg_path
        ));
    }

    missing
}

/// Check if a command runs and exits successfully with `version_flag`
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
