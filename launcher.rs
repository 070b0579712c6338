use crate::models::OpenOutcome;
use std::path::Path;
use std::process::Command;

/// Splits an opener override such as `"okular --unique"` into program and args.
fn configured_command(opener: &str) -> Option<Command> {
    let mut parts = opener.split_whitespace();
    let mut command = Command::new(parts.next()?);
    command.args(parts);
    Some(command)
}

fn platform_command() -> Command {
    if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    }
}

/// Hands `path` to the desktop's default application, or to `opener` when one
/// is configured. Failures come back as an outcome message, never as an error.
pub fn open_path(path: &Path, opener: Option<&str>) -> OpenOutcome {
    if !path.is_file() {
        return OpenOutcome::failed(format!("File not found: {}", path.display()));
    }

    let mut command = match opener.map(str::trim).filter(|o| !o.is_empty()) {
        Some(opener) => match configured_command(opener) {
            Some(command) => command,
            None => return OpenOutcome::failed("Opener command is empty"),
        },
        None => platform_command(),
    };

    let output = match command.arg(path).output() {
        Ok(output) => output,
        Err(err) => {
            log::warn!("Failed to launch opener for {}: {}", path.display(), err);
            return OpenOutcome::failed(format!("Failed to launch opener: {err}"));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.trim();
        log::warn!("Opener exited with {} for {}", output.status, path.display());
        return OpenOutcome::failed(if detail.is_empty() {
            format!("Opener exited with {}", output.status)
        } else {
            format!("Opener exited with {}: {}", output.status, detail)
        });
    }

    OpenOutcome::ok()
}
