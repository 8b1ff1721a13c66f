use anyhow::{bail, Context, Result};
use log::{debug, warn};
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use uuid::Uuid;

use crate::models::WindowInfo;
use crate::sensing::{ActivityProbe, ScreenCapturer, WindowSource};

const WINDOW_SEPARATOR: &str = "|||";

const ACTIVE_WINDOW_SCRIPT: &str = r#"
tell application "System Events"
    set frontApp to first application process whose frontmost is true
    set appName to name of frontApp
    try
        set windowTitle to name of first window of frontApp
    on error
        set windowTitle to ""
    end try
end tell
return appName & "|||" & windowTitle
"#;

/// Full-screen PNG via `screencapture -x`, written as `capture_<uuid>.png`.
/// Returns `None` when the command fails or leaves no (or an empty) file.
pub fn capture_screen(output_dir: &Path) -> Option<PathBuf> {
    if let Err(err) = fs::create_dir_all(output_dir) {
        warn!("capture dir {} unavailable: {err}", output_dir.display());
        return None;
    }

    let path = output_dir.join(format!("capture_{}.png", Uuid::new_v4()));
    let status = match Command::new("screencapture")
        .args(["-x", "-t", "png"])
        .arg(&path)
        .status()
    {
        Ok(status) => status,
        Err(err) => {
            warn!("failed to spawn screencapture: {err}");
            return None;
        }
    };

    if !status.success() {
        warn!("screencapture exited with {status}");
        cleanup_image(&path);
        return None;
    }

    match fs::metadata(&path) {
        Ok(meta) if meta.len() > 0 => Some(path),
        _ => {
            warn!("screencapture produced no image at {}", path.display());
            cleanup_image(&path);
            None
        }
    }
}

/// Removes a capture file; a file that is already gone is not an error.
pub fn cleanup_image(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("failed to remove capture {}: {err}", path.display()),
    }
}

/// Frontmost app and window title through System Events.
pub fn get_active_window() -> Result<WindowInfo> {
    let output = Command::new("osascript")
        .args(["-e", ACTIVE_WINDOW_SCRIPT])
        .output()
        .context("failed to spawn osascript")?;

    if !output.status.success() {
        bail!(
            "osascript failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    Ok(parse_window_output(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_window_output(stdout: &str) -> WindowInfo {
    let mut parts = stdout.trim().splitn(2, WINDOW_SEPARATOR);
    WindowInfo {
        app_name: parts.next().unwrap_or_default().to_string(),
        window_title: parts.next().unwrap_or_default().to_string(),
    }
}

/// Reads the session lock flag from the IORegistry root. When `ioreg` is
/// unavailable the session is treated as unlocked.
pub fn is_screen_locked() -> bool {
    match Command::new("ioreg").args(["-n", "Root", "-d1"]).output() {
        Ok(output) if output.status.success() => {
            screen_locked_from_ioreg(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!("ioreg exited with {}", output.status);
            false
        }
        Err(err) => {
            debug!("ioreg unavailable: {err}");
            false
        }
    }
}

fn screen_locked_from_ioreg(output: &str) -> bool {
    const LOCK_KEY: &str = "\"CGSSessionScreenIsLocked\"=";
    output.match_indices(LOCK_KEY).any(|(idx, _)| {
        let value = &output[idx + LOCK_KEY.len()..];
        ["Yes", "1", "true"]
            .iter()
            .any(|truthy| value.starts_with(truthy))
    })
}

pub struct MacScreenCapturer;

impl ScreenCapturer for MacScreenCapturer {
    fn capture(&self, output_dir: &Path) -> Option<PathBuf> {
        capture_screen(output_dir)
    }
}

pub struct MacWindowSource;

impl WindowSource for MacWindowSource {
    fn active_window(&self) -> Result<WindowInfo> {
        get_active_window()
    }
}

pub struct MacActivityProbe;

impl ActivityProbe for MacActivityProbe {
    fn is_active(&self) -> bool {
        !is_screen_locked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_window_output() {
        assert_eq!(
            parse_window_output("Safari|||Google - Search\n"),
            WindowInfo::new("Safari", "Google - Search")
        );
        assert_eq!(parse_window_output("Finder|||"), WindowInfo::new("Finder", ""));
        assert_eq!(parse_window_output("loginwindow"), WindowInfo::new("loginwindow", ""));
        assert_eq!(
            parse_window_output("Terminal|||a ||| b"),
            WindowInfo::new("Terminal", "a ||| b")
        );
    }

    #[test]
    fn test_screen_locked_from_ioreg() {
        let locked = r#"    | "IOConsoleUsers" = ({"kCGSSessionOnConsoleKey"=Yes,"CGSSessionScreenIsLocked"=Yes,"kCGSSessionIDKey"=257})"#;
        let unlocked = r#"    | "IOConsoleUsers" = ({"kCGSSessionOnConsoleKey"=Yes,"kCGSSessionIDKey"=257})"#;
        assert!(screen_locked_from_ioreg(locked));
        assert!(!screen_locked_from_ioreg(unlocked));
        assert!(!screen_locked_from_ioreg(""));
    }

    #[test]
    fn test_cleanup_image_missing_is_fine() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.png");
        cleanup_image(&path);

        fs::write(&path, b"png").unwrap();
        cleanup_image(&path);
        assert!(!path.exists());
    }
}
