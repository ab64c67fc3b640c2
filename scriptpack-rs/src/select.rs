//! Entry file selection from an ordered list of glob patterns.
//!
//! Patterns are evaluated left to right. An inclusion adds the files it
//! matches; an exclusion (`!` prefix) removes already selected files that it
//! matches. A later inclusion can select an excluded file again.

use crate::error::BuildError;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};

const GLOB_META: &[char] = &['*', '?', '['];

/// A selected entry file together with the glob parent it was matched under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub base: PathBuf,
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        // Dotfiles are only selected by patterns that spell out the dot.
        require_literal_leading_dot: true,
    }
}

/// Expands `patterns` relative to `cwd`.
pub fn select_entries(cwd: &Path, patterns: &[String]) -> Result<Vec<Entry>, BuildError> {
    let cwd = std::path::absolute(cwd).map_err(|err| BuildError::io(cwd, err))?;
    let mut selected: Vec<Entry> = Vec::new();

    for raw in patterns {
        let (negated, pattern) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };
        let anchored = anchor(&cwd, pattern);

        if negated {
            let exclude = Pattern::new(&anchored).map_err(|source| BuildError::Pattern {
                pattern: raw.clone(),
                source,
            })?;
            let before = selected.len();
            selected.retain(|entry| !exclude.matches_path_with(&entry.path, match_options()));
            log::debug!("{} excluded {} file(s)", raw, before - selected.len());
            continue;
        }

        let base = glob_parent(&cwd, pattern);
        let paths =
            glob::glob_with(&anchored, match_options()).map_err(|source| BuildError::Pattern {
                pattern: raw.clone(),
                source,
            })?;
        for path in paths {
            let path = path.map_err(|err| {
                let path = err.path().to_path_buf();
                BuildError::io(path, err.into_error())
            })?;
            if !path.is_file() || selected.iter().any(|entry| entry.path == path) {
                continue;
            }
            selected.push(Entry {
                path,
                base: base.clone(),
            });
        }
    }

    Ok(selected)
}

fn strip_curdir(pattern: &str) -> &str {
    let mut pattern = pattern;
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern
}

/// Makes `pattern` absolute by prefixing the escaped working directory.
fn anchor(cwd: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let cwd = Pattern::escape(&cwd.to_string_lossy());
    let pattern = strip_curdir(pattern);
    if pattern.is_empty() || pattern == "." {
        cwd
    } else {
        format!("{}/{}", cwd.trim_end_matches('/'), pattern)
    }
}

/// The leading directory of `pattern` that contains no glob metacharacters.
pub fn glob_parent(cwd: &Path, pattern: &str) -> PathBuf {
    let pattern = strip_curdir(pattern);
    let mut parent = if Path::new(pattern).is_absolute() {
        PathBuf::from("/")
    } else {
        cwd.to_path_buf()
    };
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let Some((_, dirs)) = components.split_last() else {
        return parent;
    };
    for component in dirs {
        if component.contains(GLOB_META) {
            break;
        }
        parent.push(component);
    }
    parent
}
