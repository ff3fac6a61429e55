use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, SiftError};
use crate::types::SectionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    #[default]
    Prs,
    Issues,
    Notifications,
    Branches,
}

impl ViewKind {
    /// View cycle: Notifications → PRs → Issues → Branches → Notifications
    pub fn next(self) -> Self {
        match self {
            ViewKind::Notifications => ViewKind::Prs,
            ViewKind::Prs => ViewKind::Issues,
            ViewKind::Issues => ViewKind::Branches,
            ViewKind::Branches => ViewKind::Notifications,
        }
    }

    pub fn section_kind(self) -> SectionKind {
        match self {
            ViewKind::Prs => SectionKind::Pr,
            ViewKind::Issues => SectionKind::Issue,
            ViewKind::Notifications => SectionKind::Notification,
            ViewKind::Branches => SectionKind::Branch,
        }
    }

    pub fn for_kind(kind: SectionKind) -> Self {
        match kind {
            SectionKind::Pr => ViewKind::Prs,
            SectionKind::Issue => ViewKind::Issues,
            SectionKind::Notification => ViewKind::Notifications,
            SectionKind::Branch => ViewKind::Branches,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewKind::Prs => "Pull Requests",
            ViewKind::Issues => "Issues",
            ViewKind::Notifications => "Notifications",
            ViewKind::Branches => "Branches",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionConfig {
    pub title: String,
    #[serde(default)]
    pub filters: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl SectionConfig {
    pub fn new(title: &str, filters: &str) -> Self {
        Self {
            title: title.to_string(),
            filters: filters.to_string(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub view: ViewKind,
    pub prs_limit: u32,
    pub issues_limit: u32,
    pub notifications_limit: u32,
    /// 0 disables periodic refresh
    pub refetch_interval_minutes: u64,
    pub preview_open: bool,
    pub item_height: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            view: ViewKind::Prs,
            prs_limit: 20,
            issues_limit: 20,
            notifications_limit: 20,
            refetch_interval_minutes: 30,
            preview_open: true,
            item_height: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub pr_sections: Vec<SectionConfig>,
    #[serde(default)]
    pub issue_sections: Vec<SectionConfig>,
    #[serde(default)]
    pub notification_sections: Vec<SectionConfig>,
}

fn config_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("sift").join("config.toml"))
}

impl Config {
    /// Loads an explicitly given file, failing loudly, or the default file,
    /// falling back to built-in defaults when it is missing or broken.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path)
                .map_err(|e| SiftError::Config(format!("{}: {}", path.display(), e)))?;
            return Self::parse(&content).map_err(|e| SiftError::Config(format!("{}: {}", path.display(), e)));
        }

        let Some(path) = config_path() else {
            return Ok(Config::default().with_builtin_sections());
        };
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Ok(Config::default().with_builtin_sections());
        };

        match Self::parse(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring broken config file");
                Ok(Config::default().with_builtin_sections())
            }
        }
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str::<Config>(content).map(Config::with_builtin_sections)
    }

    /// Fills every view that has no configured sections with the built-in ones.
    fn with_builtin_sections(mut self) -> Self {
        if self.pr_sections.is_empty() {
            self.pr_sections = vec![
                SectionConfig::new("My Pull Requests", "is:open author:@me"),
                SectionConfig::new("Needs My Review", "is:open review-requested:@me"),
                SectionConfig::new("Involved", "is:open involves:@me -author:@me"),
            ];
        }
        if self.issue_sections.is_empty() {
            self.issue_sections = vec![
                SectionConfig::new("My Issues", "is:open author:@me"),
                SectionConfig::new("Assigned", "is:open assignee:@me"),
                SectionConfig::new("Involved", "is:open involves:@me -author:@me"),
            ];
        }
        if self.notification_sections.is_empty() {
            self.notification_sections = vec![
                SectionConfig::new("Unread", "is:unread"),
                SectionConfig::new("All", "is:all"),
            ];
        }
        self
    }

    /// Configured sections for a view, without the search section.
    pub fn sections_for(&self, view: ViewKind) -> Vec<SectionConfig> {
        match view {
            ViewKind::Prs => self.pr_sections.clone(),
            ViewKind::Issues => self.issue_sections.clone(),
            ViewKind::Notifications => self.notification_sections.clone(),
            ViewKind::Branches => vec![SectionConfig::new("Local Branches", "")],
        }
    }

    /// The search section that sits at index 0 of every view.
    pub fn search_section(&self, view: ViewKind) -> SectionConfig {
        let filters = match view {
            ViewKind::Prs | ViewKind::Issues => "archived:false",
            ViewKind::Notifications | ViewKind::Branches => "",
        };
        SectionConfig::new("Search", filters)
    }

    pub fn limit_for(&self, kind: SectionKind) -> u32 {
        match kind {
            SectionKind::Pr => self.defaults.prs_limit,
            SectionKind::Issue => self.defaults.issues_limit,
            SectionKind::Notification => self.defaults.notifications_limit,
            // Branches are listed in one go
            SectionKind::Branch => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_config() {
        let toml_str = r#"
[defaults]
view = "notifications"
prs_limit = 50
refetch_interval_minutes = 0
preview_open = false

[[pr_sections]]
title = "Team"
filters = "is:open org:acme"
limit = 10

[[notification_sections]]
title = "Mentions"
filters = "reason:mention"
"#;
        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.defaults.view, ViewKind::Notifications);
        assert_eq!(config.defaults.prs_limit, 50);
        assert_eq!(config.defaults.issues_limit, 20);
        assert_eq!(config.defaults.refetch_interval_minutes, 0);
        assert!(!config.defaults.preview_open);
        assert_eq!(config.pr_sections.len(), 1);
        assert_eq!(config.pr_sections[0].limit, Some(10));
        assert_eq!(config.notification_sections[0].filters, "reason:mention");
        // Issues were not configured, so they get the built-in set
        assert_eq!(config.issue_sections.len(), 3);
    }

    #[test]
    fn empty_config_uses_builtin_sections() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.defaults.view, ViewKind::Prs);
        assert_eq!(config.pr_sections[0].title, "My Pull Requests");
        assert_eq!(config.notification_sections[1].filters, "is:all");
        assert_eq!(config.sections_for(ViewKind::Branches)[0].title, "Local Branches");
    }

    #[test]
    fn explicit_broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults\nview = ").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(SiftError::Config(_))));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[defaults]\nitem_height = 2\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.defaults.item_height, 2);
    }

    #[test]
    fn view_cycle_visits_every_view() {
        let mut view = ViewKind::Notifications;
        let mut seen = vec![];
        for _ in 0..4 {
            view = view.next();
            seen.push(view);
        }
        assert_eq!(
            seen,
            vec![ViewKind::Prs, ViewKind::Issues, ViewKind::Branches, ViewKind::Notifications]
        );
    }

    #[test]
    fn view_and_kind_map_one_to_one() {
        for view in [ViewKind::Prs, ViewKind::Issues, ViewKind::Notifications, ViewKind::Branches] {
            assert_eq!(ViewKind::for_kind(view.section_kind()), view);
        }
    }
}
