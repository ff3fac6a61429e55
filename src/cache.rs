use std::collections::HashMap;

use crate::types::Label;

/// Per-repository lookup results, keyed by `owner/name`.
#[derive(Debug, Clone)]
pub struct RepoCache<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for RepoCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> RepoCache<T> {
    pub fn get(&self, repo: &str) -> Option<&T> {
        self.entries.get(&repo_key(repo))
    }

    pub fn insert(&mut self, repo: &str, value: T) {
        self.entries.insert(repo_key(repo), value);
    }

    pub fn contains(&self, repo: &str) -> bool {
        self.entries.contains_key(&repo_key(repo))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn clear_for(&mut self, repo: &str) {
        self.entries.remove(&repo_key(repo));
    }
}

/// Repository labels and assignable users, owned by the section host.
#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    pub labels: RepoCache<Vec<Label>>,
    pub users: RepoCache<Vec<String>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        self.users.clear();
    }

    pub fn clear_for(&mut self, repo: &str) {
        self.labels.clear_for(repo);
        self.users.clear_for(repo);
    }

    /// Resolves label names against the cached labels of `repo`, keeping
    /// the color when known.
    pub fn resolve_labels(&self, repo: &str, names: &[String]) -> Vec<Label> {
        let known = self.labels.get(repo);
        names
            .iter()
            .map(|name| {
                known
                    .and_then(|labels| labels.iter().find(|l| l.name.eq_ignore_ascii_case(name)))
                    .cloned()
                    .unwrap_or_else(|| Label {
                        name: name.clone(),
                        color: String::new(),
                    })
            })
            .collect()
    }
}

/// Repository names are case-insensitive on GitHub.
fn repo_key(repo: &str) -> String {
    repo.trim().to_ascii_lowercase()
}
