use super::EnvError;
use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};

/// Session-scoped variables and working directory.
///
/// Spawned processes see the inherited process environment overridden by
/// these variables, minus anything removed with `unset`. Nothing here ever
/// touches the real process environment or current directory.
#[derive(Clone, Debug)]
pub struct EnvironmentState {
    vars: HashMap<Box<str>, Box<str>>,
    removed: HashSet<Box<str>>,
    cwd: PathBuf,
}

impl EnvironmentState {
    /// An empty store rooted at `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            removed: HashSet::new(),
            cwd: cwd.into(),
        }
    }

    /// A store seeded from the current process environment and directory.
    pub fn from_process() -> Result<Self, EnvError> {
        let mut state = Self::new(env::current_dir()?);
        for (key, value) in env::vars() {
            // Inherited names that are not identifiers are still passed to
            // children by inheritance; they just can't be expanded.
            if Self::is_valid_name(&key) {
                state.insert(&key, &value);
            }
        }
        Ok(state)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_ref())
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<(), EnvError> {
        if !Self::is_valid_name(name) {
            return Err(EnvError::InvalidName(name.to_string()));
        }
        self.insert(name, value);
        Ok(())
    }

    /// Applies every assignment or none of them.
    pub fn set_all<'a, I>(&mut self, assignments: I) -> Result<(), EnvError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let assignments: Vec<(&str, &str)> = assignments.into_iter().collect();
        if let Some((name, _)) = assignments
            .iter()
            .find(|(name, _)| !Self::is_valid_name(name))
        {
            return Err(EnvError::InvalidName((*name).to_string()));
        }

        for (name, value) in assignments {
            self.insert(name, value);
        }
        Ok(())
    }

    /// Removes `name` from the store and hides it from spawned processes.
    /// Returns whether the store held a value.
    pub fn unset(&mut self, name: &str) -> bool {
        self.removed.insert(name.into());
        self.vars.remove(name).is_some()
    }

    pub fn working_directory(&self) -> &Path {
        &self.cwd
    }

    pub fn set_working_directory(&mut self, path: impl Into<PathBuf>) -> Result<(), EnvError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(EnvError::NotADirectory(path));
        }
        self.cwd = path;
        Ok(())
    }

    /// Owned copy of the variables, for injection into a child process.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Names removed with `unset` that are not currently set again.
    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.removed
            .iter()
            .filter(|name| !self.vars.contains_key(&***name))
            .map(|name| name.as_ref())
    }

    /// `$HOME` from the store, falling back to the user's home directory.
    pub fn home_dir(&self) -> Result<PathBuf, EnvError> {
        match self.get("HOME") {
            Some(home) if !home.is_empty() => Ok(PathBuf::from(home)),
            _ => dirs::home_dir().ok_or(EnvError::HomeDirNotFound),
        }
    }

    /// Replaces `$NAME` and `${NAME}` in `text`. Unknown names expand to
    /// nothing; a `$` that starts no reference, or an unclosed `${`, is kept.
    pub fn expand(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(braced) = after.strip_prefix('{') {
                match braced.find('}') {
                    Some(close) => {
                        out.push_str(self.get(&braced[..close]).unwrap_or_default());
                        rest = &braced[close + 1..];
                    }
                    None => {
                        out.push_str(&rest[pos..]);
                        rest = "";
                    }
                }
                continue;
            }

            let len = after
                .char_indices()
                .take_while(|&(i, c)| {
                    c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())
                })
                .count();
            if len == 0 {
                out.push('$');
            } else {
                out.push_str(self.get(&after[..len]).unwrap_or_default());
            }
            rest = &after[len..];
        }

        out.push_str(rest);
        out
    }

    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
    }

    fn insert(&mut self, name: &str, value: &str) {
        let clean_value = if name == "PATH" {
            sanitize_path(value)
        } else {
            value.to_string()
        };
        self.removed.remove(name);
        self.vars.insert(name.into(), clean_value.into());
    }
}

/// Drops empty and repeated `PATH` entries, keeping the first occurrence.
fn sanitize_path(path: &str) -> String {
    let mut seen = HashSet::new();
    path.split(':')
        .filter(|part| !part.is_empty())
        .filter(|part| seen.insert(*part))
        .collect::<Vec<_>>()
        .join(":")
}
