use crate::patch::{BranchPatch, IssuePatch, NotificationPatch, PrPatch};
use crate::task::Task;
use crate::types::{Branch, Issue, Label, Notification, Page, PageInfo, PullRequest, SectionKind};

/// Addresses one section: its id within a view plus the kind of rows it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionIdentifier {
    pub id: usize,
    pub kind: SectionKind,
}

/// Everything an async unit of work can hand back to the update loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Prs(Page<PullRequest>),
    Issues(Page<Issue>),
    Notifications(Page<Notification>),
    Branches(Page<Branch>),
    PrUpdated(PrPatch),
    IssueUpdated(IssuePatch),
    NotificationUpdated(NotificationPatch),
    BranchUpdated(BranchPatch),
    Labels { repo: String, labels: Vec<Label> },
    Users { repo: String, users: Vec<String> },
    /// Success with nothing to reconcile
    None,
}

/// The single message shape all background work reports through.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionMessage {
    pub section: SectionIdentifier,
    pub task_id: String,
    pub outcome: Result<Payload, String>,
}

impl CompletionMessage {
    pub fn ok(section: SectionIdentifier, task_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            section,
            task_id: task_id.into(),
            outcome: Ok(payload),
        }
    }

    pub fn failed(section: SectionIdentifier, task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            section,
            task_id: task_id.into(),
            outcome: Err(error.into()),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }
}

/// A page fetch the update loop should start.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub section: SectionIdentifier,
    pub task: Task,
    pub filters: String,
    pub limit: u32,
    /// `None` for the first page
    pub page_info: Option<PageInfo>,
}

/// What routing a completion message did to the section it was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    Applied,
    /// A newer fetch superseded this one, or it was already applied
    Stale,
    /// The patched row is no longer loaded
    IdentityNotFound,
    /// The task failed; rows were left alone
    Failed,
    /// No section matched the message
    Unrouted,
}
