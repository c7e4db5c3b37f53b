//! Locating and renaming the tmux window the hook was fired from.

use std::path::PathBuf;
use std::process::Command;

use crate::config::TmuxConfig;
use crate::error::{NamerError, Result};

/// Which window `rename-window` should act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowTarget {
    /// A pane id from `TMUX_PANE` (e.g. `%3`); tmux resolves it to its window.
    Pane(String),
    /// `session:@window` found by matching the parent process's TTY.
    Window(String),
    /// No explicit target: the client's current window.
    Current,
}

impl WindowTarget {
    fn as_arg(&self) -> Option<&str> {
        match self {
            Self::Pane(id) | Self::Window(id) => Some(id.as_str()),
            Self::Current => None,
        }
    }
}

impl std::fmt::Display for WindowTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_arg() {
            Some(t) => write!(f, "{t}"),
            None => write!(f, "current window"),
        }
    }
}

/// The tmux session the hook runs inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxSession {
    /// Server socket path, the first field of `$TMUX`.
    pub socket: String,
    pub target: WindowTarget,
}

/// Resolve the session from the environment.
///
/// `TMUX` must be set. The target is `TMUX_PANE` when present, otherwise the
/// pane whose TTY matches our parent process (the Claude Code process),
/// otherwise the current window.
pub fn detect_session<F>(config: &TmuxConfig, env: F) -> Result<TmuxSession>
where
    F: Fn(&str) -> Option<String>,
{
    if !config.enabled {
        return Err(NamerError::Rename("tmux renaming disabled".into()));
    }

    let tmux_env = env("TMUX")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| NamerError::Rename("not running inside tmux (TMUX unset)".into()))?;
    let socket = tmux_env.split(',').next().unwrap_or_default().to_string();

    let target = match env("TMUX_PANE").filter(|p| !p.trim().is_empty()) {
        Some(pane) => WindowTarget::Pane(pane),
        None => resolve_parent_window(&socket)
            .map(WindowTarget::Window)
            .unwrap_or(WindowTarget::Current),
    };

    Ok(TmuxSession { socket, target })
}

/// Find `session:@window` for the pane attached to the parent process's TTY.
fn resolve_parent_window(socket: &str) -> Option<String> {
    let tty = parent_tty()?;
    let mut args = socket_args(socket);
    args.extend(
        [
            "list-panes",
            "-a",
            "-F",
            "#{pane_tty} #{session_name}:#{window_id}",
        ]
        .map(String::from),
    );
    let output = Command::new("tmux")
        .args(&args)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    find_window_for_tty(&String::from_utf8_lossy(&output.stdout), &tty)
}

#[cfg(unix)]
fn parent_tty() -> Option<String> {
    let ppid = std::os::unix::process::parent_id();
    let output = Command::new("ps")
        .args(["-o", "tty=", "-p", &ppid.to_string()])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let tty = String::from_utf8_lossy(&output.stdout).trim().to_string();
    // `?` and `??` mean no controlling terminal
    if tty.is_empty() || tty.starts_with('?') {
        return None;
    }
    Some(normalize_tty(&tty))
}

#[cfg(not(unix))]
fn parent_tty() -> Option<String> {
    None
}

/// `ps` prints `pts/3` (Linux) or `ttys003` (macOS); tmux prints `/dev/...`.
fn normalize_tty(tty: &str) -> String {
    if tty.starts_with('/') {
        tty.to_string()
    } else {
        format!("/dev/{tty}")
    }
}

fn find_window_for_tty(list_panes: &str, tty: &str) -> Option<String> {
    list_panes.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(pane_tty), Some(window)) if pane_tty == tty => Some(window.to_string()),
            _ => None,
        }
    })
}

/// Applies a window name.
pub trait WindowRenamer {
    fn rename(&self, session: &TmuxSession, name: &str) -> Result<()>;
}

/// Renames via `tmux rename-window`.
#[derive(Debug, Default)]
pub struct TmuxRenamer {
    binary: Option<PathBuf>,
}

impl TmuxRenamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific tmux binary instead of searching `PATH`.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    fn binary(&self) -> Result<PathBuf> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => which::which("tmux")
                .map_err(|e| NamerError::Rename(format!("tmux not found on PATH: {e}"))),
        }
    }
}

impl WindowRenamer for TmuxRenamer {
    fn rename(&self, session: &TmuxSession, name: &str) -> Result<()> {
        let binary = self.binary()?;
        let output = Command::new(&binary)
            .args(rename_args(session, name))
            .output()
            .map_err(|e| NamerError::Rename(format!("failed to run {}: {e}", binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(NamerError::Rename(if stderr.is_empty() {
                format!("tmux exited with {}", output.status)
            } else {
                stderr
            }));
        }

        tracing::debug!(
            "renamed {} on {} to '{name}'",
            session.target,
            session.socket
        );
        Ok(())
    }
}

/// `-S <socket>` so tmux talks to the server named in `$TMUX`.
fn socket_args(socket: &str) -> Vec<String> {
    if socket.is_empty() {
        Vec::new()
    } else {
        vec!["-S".to_string(), socket.to_string()]
    }
}

fn rename_args(session: &TmuxSession, name: &str) -> Vec<String> {
    let mut args = socket_args(&session.socket);
    args.push("rename-window".to_string());
    if let Some(t) = session.target.as_arg() {
        args.push("-t".to_string());
        args.push(t.to_string());
    }
    // `--` so a name starting with '-' is not read as a flag
    args.push("--".to_string());
    args.push(name.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_detect_without_tmux_env() {
        let err = detect_session(&TmuxConfig::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, NamerError::Rename(_)));
        assert!(err.to_string().contains("TMUX unset"));
    }

    #[test]
    fn test_detect_disabled() {
        let config = TmuxConfig { enabled: false };
        let env = env_of(&[("TMUX", "/tmp/tmux-1000/default,1234,0"), ("TMUX_PANE", "%1")]);
        let err = detect_session(&config, env).unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[test]
    fn test_detect_uses_tmux_pane() {
        let env = env_of(&[("TMUX", "/tmp/tmux-1000/default,1234,0"), ("TMUX_PANE", "%7")]);
        let session = detect_session(&TmuxConfig::default(), env).unwrap();
        assert_eq!(session.socket, "/tmp/tmux-1000/default");
        assert_eq!(session.target, WindowTarget::Pane("%7".into()));
    }

    #[test]
    fn test_normalize_tty() {
        assert_eq!(normalize_tty("pts/3"), "/dev/pts/3");
        assert_eq!(normalize_tty("ttys003"), "/dev/ttys003");
        assert_eq!(normalize_tty("/dev/pts/3"), "/dev/pts/3");
    }

    #[test]
    fn test_find_window_for_tty() {
        let listing = "/dev/pts/1 main:@1\n/dev/pts/3 work:@4\n/dev/pts/5 work:@5\n";
        assert_eq!(
            find_window_for_tty(listing, "/dev/pts/3").as_deref(),
            Some("work:@4")
        );
        assert_eq!(find_window_for_tty(listing, "/dev/pts/9"), None);
        assert_eq!(find_window_for_tty("", "/dev/pts/1"), None);
    }

    fn session(socket: &str, target: WindowTarget) -> TmuxSession {
        TmuxSession {
            socket: socket.into(),
            target,
        }
    }

    #[test]
    fn test_rename_args_with_target() {
        let args = rename_args(
            &session("/tmp/tmux-1000/default", WindowTarget::Pane("%3".into())),
            "auth bug fix",
        );
        assert_eq!(
            args,
            [
                "-S",
                "/tmp/tmux-1000/default",
                "rename-window",
                "-t",
                "%3",
                "--",
                "auth bug fix"
            ]
        );
    }

    #[test]
    fn test_rename_args_current_window() {
        let args = rename_args(
            &session("/tmp/tmux-1000/work", WindowTarget::Current),
            "-leading dash",
        );
        assert_eq!(
            args,
            ["-S", "/tmp/tmux-1000/work", "rename-window", "--", "-leading dash"]
        );
    }

    #[test]
    fn test_rename_args_without_socket() {
        let args = rename_args(&session("", WindowTarget::Pane("%1".into())), "name");
        assert_eq!(args, ["rename-window", "-t", "%1", "--", "name"]);
    }

    #[test]
    fn test_detect_socket_from_custom_server() {
        let env = env_of(&[("TMUX", "/tmp/tmux-1000/work,99,2"), ("TMUX_PANE", "%2")]);
        let detected = detect_session(&TmuxConfig::default(), env).unwrap();
        let args = rename_args(&detected, "x");
        assert_eq!(args[..2], ["-S", "/tmp/tmux-1000/work"]);
    }

    #[test]
    fn test_target_display() {
        assert_eq!(WindowTarget::Window("work:@4".into()).to_string(), "work:@4");
        assert_eq!(WindowTarget::Current.to_string(), "current window");
    }

    #[test]
    fn test_rename_missing_binary_is_rename_error() {
        let renamer = TmuxRenamer::with_binary("/nonexistent/bin/tmux");
        let session = TmuxSession {
            socket: "/tmp/tmux-1000/default".into(),
            target: WindowTarget::Current,
        };
        let err = renamer.rename(&session, "auth bug fix").unwrap_err();
        assert!(matches!(err, NamerError::Rename(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_rename_nonzero_exit_is_rename_error() {
        // `false` ignores its arguments and exits 1
        let renamer = TmuxRenamer::with_binary("false");
        let session = TmuxSession {
            socket: String::new(),
            target: WindowTarget::Pane("%1".into()),
        };
        let err = renamer.rename(&session, "name").unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
