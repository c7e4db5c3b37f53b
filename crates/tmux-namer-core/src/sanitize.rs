use std::sync::LazyLock;

use regex::Regex;

use crate::config::NamingConfig;
use crate::error::{NamerError, Result};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 \-]").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Reduce raw model output to a safe tmux window name.
///
/// Only `[A-Za-z0-9 -]` survives, whitespace runs become one space, and the
/// result is trimmed and capped at `config.max_len` characters.
pub fn sanitize_name(raw: &str, config: &NamingConfig) -> Result<String> {
    // Whitespace first, so "auth\nbug" keeps its word break once '\n' is gone
    let spaced = WHITESPACE_RE.replace_all(raw, " ");
    let filtered = DISALLOWED_RE.replace_all(&spaced, "");
    let collapsed = SPACES_RE.replace_all(&filtered, " ");

    let mut name = collapsed.trim().to_string();
    if config.lowercase {
        name = name.to_ascii_lowercase();
    }

    // ASCII-only at this point, so byte length is char length
    if name.len() > config.max_len {
        name.truncate(config.max_len);
        name.truncate(name.trim_end().len());
    }

    if name.is_empty() {
        return Err(NamerError::EmptyName);
    }
    Ok(name)
}
