use std::path::{Path, PathBuf};

/// Resolves `~`-prefixed and relative paths against a home directory and a
/// working directory.
#[derive(Clone, Debug, Default)]
pub struct PathExpander;

impl PathExpander {
    pub fn new() -> Self {
        Self
    }

    /// Expands a leading `~` or `~/`. `~user` forms are returned untouched.
    pub fn expand_tilde(&self, path: &str, home: &Path) -> PathBuf {
        if path == "~" {
            return home.to_path_buf();
        }

        match path.strip_prefix("~/") {
            Some(stripped) => {
                let mut home_path = home.to_path_buf();
                for part in stripped.split('/') {
                    if !part.is_empty() {
                        home_path.push(part);
                    }
                }
                home_path
            }
            None => PathBuf::from(path),
        }
    }

    /// Tilde-expands `path` and anchors it at `cwd` when it is relative.
    pub fn resolve(&self, path: &str, home: &Path, cwd: &Path) -> PathBuf {
        let expanded = self.expand_tilde(path, home);
        if expanded.is_absolute() {
            expanded
        } else {
            cwd.join(expanded)
        }
    }

    pub fn is_home_path(&self, path: &str) -> bool {
        path == "~" || path.starts_with("~/")
    }
}
