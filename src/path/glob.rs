//! Filesystem glob expansion for command arguments.
//!
//! Patterns arrive with quoted metacharacters already backslash-escaped, so
//! `"*.txt"` (quoted) never reaches the matcher as a wildcard.

use globset::GlobBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Characters that have a meaning to the glob matcher and must be escaped
/// when they should match literally.
pub const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}', '\\'];

/// Expands `pattern` relative to `cwd`.
///
/// Matches are sorted lexicographically. An empty vector means nothing
/// matched (or the pattern was malformed); callers keep the literal text.
/// A trailing `/` matches directories only and is kept on every match.
pub fn expand(pattern: &str, cwd: &Path) -> Vec<String> {
    let absolute = pattern.starts_with('/');
    let dirs_only = pattern.len() > 1 && pattern.ends_with('/');
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let Some(last_index) = components.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut prefixes = vec![String::new()];
    for (index, component) in components.iter().enumerate() {
        let files_allowed = index == last_index && !dirs_only;
        let mut next = Vec::new();

        for prefix in &prefixes {
            let dir = resolve_dir(prefix, absolute, cwd);
            if has_meta(component) {
                match match_component(component, &dir, files_allowed) {
                    Some(names) => next.extend(names.into_iter().map(|n| join(prefix, &n))),
                    None => return Vec::new(),
                }
            } else {
                let literal = unescape(component);
                let path = dir.join(&literal);
                let exists = if files_allowed {
                    path.symlink_metadata().is_ok()
                } else {
                    path.is_dir()
                };
                if exists {
                    next.push(join(prefix, &literal));
                }
            }
        }

        if next.is_empty() {
            return Vec::new();
        }
        prefixes = next;
    }

    let mut matches: Vec<String> = prefixes
        .into_iter()
        .map(|m| {
            let lead = if absolute { "/" } else { "" };
            let trail = if dirs_only { "/" } else { "" };
            format!("{lead}{m}{trail}")
        })
        .collect();
    matches.sort();
    debug!(pattern, count = matches.len(), "expanded glob");
    matches
}

/// Whether `component` contains an unescaped wildcard.
pub fn has_meta(component: &str) -> bool {
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

fn unescape(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Names in `dir` matching the single-component `pattern`, or `None` when the
/// pattern does not compile.
fn match_component(pattern: &str, dir: &Path, files_allowed: bool) -> Option<Vec<String>> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .ok()?
        .compile_matcher();
    let show_hidden = pattern.starts_with('.');

    let Ok(entries) = fs::read_dir(dir) else {
        return Some(Vec::new());
    };

    let names = entries
        .filter_map(Result::ok)
        .filter(|entry| files_allowed || entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .filter(|name| show_hidden || !name.starts_with('.'))
        .filter(|name| matcher.is_match(name))
        .collect();
    Some(names)
}

fn resolve_dir(prefix: &str, absolute: bool, cwd: &Path) -> PathBuf {
    match (absolute, prefix.is_empty()) {
        (true, _) => Path::new("/").join(prefix),
        (false, true) => cwd.to_path_buf(),
        (false, false) => cwd.join(prefix),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
