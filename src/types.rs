use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethod {
    Merge,
    Squash,
    Rebase,
}

impl MergeMethod {
    pub const ALL: [MergeMethod; 3] = [MergeMethod::Merge, MergeMethod::Squash, MergeMethod::Rebase];

    /// Flag understood by `gh pr merge`
    pub fn as_cli_flag(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "--merge",
            MergeMethod::Squash => "--squash",
            MergeMethod::Rebase => "--rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMethod::Merge => write!(f, "Merge commit"),
            MergeMethod::Squash => write!(f, "Squash and merge"),
            MergeMethod::Rebase => write!(f, "Rebase and merge"),
        }
    }
}

/// The four kinds of list the dashboard knows how to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Pr,
    Issue,
    Notification,
    Branch,
}

impl SectionKind {
    /// Plural used in fetch task ids, e.g. `fetching_prs_1_...`
    pub fn plural(&self) -> &'static str {
        match self {
            SectionKind::Pr => "prs",
            SectionKind::Issue => "issues",
            SectionKind::Notification => "notifications",
            SectionKind::Branch => "branches",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            SectionKind::Pr => "PR",
            SectionKind::Issue => "Issue",
            SectionKind::Notification => "Notification",
            SectionKind::Branch => "Branch",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub start_cursor: String,
    pub end_cursor: String,
}

/// One fetched slice of a remote collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub rows: Vec<R>,
    pub total_count: usize,
    pub page_info: PageInfo,
}

/// How a row is found again when a patch arrives for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowIdentity {
    Numbered { repo: String, number: u64 },
    Remote(String),
    Branch(String),
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIdentity::Numbered { repo, number } => write!(f, "{}#{}", repo, number),
            RowIdentity::Remote(id) => write!(f, "notification {}", id),
            RowIdentity::Branch(name) => write!(f, "branch {}", name),
        }
    }
}

/// Read access shared by every row kind.
pub trait RowData {
    fn title(&self) -> &str;
    fn repo_name_with_owner(&self) -> &str;
    fn number(&self) -> Option<u64>;
    fn url(&self) -> String;
    fn updated_at(&self) -> DateTime<Utc>;
    fn created_at(&self) -> DateTime<Utc>;
    fn identity(&self) -> RowIdentity;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// Hex color without the leading `#`
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "Open"),
            PrState::Closed => write!(f, "Closed"),
            PrState::Merged => write!(f, "Merged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub state: PrState,
    pub is_draft: bool,
    pub author: String,
    pub repo: String,
    pub head_branch: String,
    pub base_branch: String,
    pub additions: u64,
    pub deletions: u64,
    pub review_decision: Option<String>,
    pub assignees: Vec<String>,
    pub labels: Vec<Label>,
    pub comments: Vec<Comment>,
    pub comment_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RowData for PullRequest {
    fn title(&self) -> &str {
        &self.title
    }
    fn repo_name_with_owner(&self) -> &str {
        &self.repo
    }
    fn number(&self) -> Option<u64> {
        Some(self.number)
    }
    fn url(&self) -> String {
        self.url.clone()
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn identity(&self) -> RowIdentity {
        RowIdentity::Numbered {
            repo: self.repo.clone(),
            number: self.number,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueState {
    Open,
    Closed,
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueState::Open => write!(f, "Open"),
            IssueState::Closed => write!(f, "Closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub state: IssueState,
    pub author: String,
    pub repo: String,
    pub assignees: Vec<String>,
    pub labels: Vec<Label>,
    pub comments: Vec<Comment>,
    pub comment_count: u32,
    pub reactions: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RowData for Issue {
    fn title(&self) -> &str {
        &self.title
    }
    fn repo_name_with_owner(&self) -> &str {
        &self.repo
    }
    fn number(&self) -> Option<u64> {
        Some(self.number)
    }
    fn url(&self) -> String {
        self.url.clone()
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn identity(&self) -> RowIdentity {
        RowIdentity::Numbered {
            repo: self.repo.clone(),
            number: self.number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Thread id as reported by the notifications API
    pub id: String,
    pub title: String,
    /// `PullRequest`, `Issue`, `Release`, ...
    pub subject_type: String,
    pub reason: String,
    pub repo: String,
    /// Browser url of the subject, empty when the API gave none
    pub url: String,
    pub unread: bool,
    pub done: bool,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    /// Issue or PR number taken from the subject url, if it has one.
    pub fn subject_number(&self) -> Option<u64> {
        self.url.rsplit('/').next()?.parse().ok()
    }
}

impl RowData for Notification {
    fn title(&self) -> &str {
        &self.title
    }
    fn repo_name_with_owner(&self) -> &str {
        &self.repo
    }
    fn number(&self) -> Option<u64> {
        self.subject_number()
    }
    fn url(&self) -> String {
        if self.url.is_empty() {
            format!("https://github.com/{}", self.repo)
        } else {
            self.url.clone()
        }
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
    fn identity(&self) -> RowIdentity {
        RowIdentity::Remote(self.id.clone())
    }
}

/// A local git branch, optionally linked to the PR opened from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    /// Subject line of the tip commit
    pub subject: String,
    pub last_commit_at: DateTime<Utc>,
    pub upstream: Option<String>,
    pub is_current: bool,
    /// `owner/name` of the origin remote, empty outside a GitHub checkout
    pub repo: String,
    pub pr_number: Option<u64>,
}

impl RowData for Branch {
    fn title(&self) -> &str {
        &self.name
    }
    fn repo_name_with_owner(&self) -> &str {
        &self.repo
    }
    fn number(&self) -> Option<u64> {
        self.pr_number
    }
    fn url(&self) -> String {
        match (self.repo.is_empty(), self.pr_number) {
            (true, _) => String::new(),
            (false, Some(n)) => format!("https://github.com/{}/pull/{}", self.repo, n),
            (false, None) => format!("https://github.com/{}/tree/{}", self.repo, self.name),
        }
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.last_commit_at
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.last_commit_at
    }
    fn identity(&self) -> RowIdentity {
        RowIdentity::Branch(self.name.clone())
    }
}

/// Borrowed view of a row of any kind, handed to the sidebar and footer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowRef<'a> {
    Pr(&'a PullRequest),
    Issue(&'a Issue),
    Notification(&'a Notification),
    Branch(&'a Branch),
}

impl RowRef<'_> {
    pub fn kind(&self) -> SectionKind {
        match self {
            RowRef::Pr(_) => SectionKind::Pr,
            RowRef::Issue(_) => SectionKind::Issue,
            RowRef::Notification(_) => SectionKind::Notification,
            RowRef::Branch(_) => SectionKind::Branch,
        }
    }

    fn data(&self) -> &dyn RowData {
        match self {
            RowRef::Pr(r) => *r,
            RowRef::Issue(r) => *r,
            RowRef::Notification(r) => *r,
            RowRef::Branch(r) => *r,
        }
    }
}

impl RowData for RowRef<'_> {
    fn title(&self) -> &str {
        self.data().title()
    }
    fn repo_name_with_owner(&self) -> &str {
        self.data().repo_name_with_owner()
    }
    fn number(&self) -> Option<u64> {
        self.data().number()
    }
    fn url(&self) -> String {
        self.data().url()
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.data().updated_at()
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.data().created_at()
    }
    fn identity(&self) -> RowIdentity {
        self.data().identity()
    }
}
