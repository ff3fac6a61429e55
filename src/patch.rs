//! Field-level changes applied to a single row after a mutation succeeds.
//!
//! Every field is optional so a patch only ever touches what the mutation
//! actually changed. The rest of the row stays exactly as it was fetched.

use crate::types::{Branch, Comment, Issue, IssueState, Label, Notification, PrState, PullRequest, RowIdentity};

/// A patch that knows which row it targets and how to change it.
pub trait RowPatch {
    type Row;

    fn target(&self) -> RowIdentity;
    fn apply(&self, row: &mut Self::Row);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrPatch {
    pub repo: String,
    pub number: u64,
    pub is_closed: Option<bool>,
    pub is_merged: Option<bool>,
    pub ready_for_review: Option<bool>,
    pub new_comment: Option<Comment>,
    pub added_assignees: Vec<String>,
    pub removed_assignees: Vec<String>,
    pub labels: Option<Vec<Label>>,
}

impl PrPatch {
    pub fn new(repo: impl Into<String>, number: u64) -> Self {
        Self {
            repo: repo.into(),
            number,
            ..Default::default()
        }
    }
}

impl RowPatch for PrPatch {
    type Row = PullRequest;

    fn target(&self) -> RowIdentity {
        RowIdentity::Numbered {
            repo: self.repo.clone(),
            number: self.number,
        }
    }

    fn apply(&self, pr: &mut PullRequest) {
        match self.is_closed {
            Some(true) => pr.state = PrState::Closed,
            Some(false) => pr.state = PrState::Open,
            None => {}
        }
        if self.is_merged == Some(true) {
            pr.state = PrState::Merged;
        }
        if self.ready_for_review == Some(true) {
            pr.is_draft = false;
        }
        if let Some(comment) = &self.new_comment {
            pr.comments.push(comment.clone());
            pr.comment_count += 1;
        }
        add_assignees(&mut pr.assignees, &self.added_assignees);
        remove_assignees(&mut pr.assignees, &self.removed_assignees);
        if let Some(labels) = &self.labels {
            pr.labels = labels.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePatch {
    pub repo: String,
    pub number: u64,
    pub is_closed: Option<bool>,
    pub new_comment: Option<Comment>,
    pub added_assignees: Vec<String>,
    pub removed_assignees: Vec<String>,
    pub labels: Option<Vec<Label>>,
}

impl IssuePatch {
    pub fn new(repo: impl Into<String>, number: u64) -> Self {
        Self {
            repo: repo.into(),
            number,
            ..Default::default()
        }
    }
}

impl RowPatch for IssuePatch {
    type Row = Issue;

    fn target(&self) -> RowIdentity {
        RowIdentity::Numbered {
            repo: self.repo.clone(),
            number: self.number,
        }
    }

    fn apply(&self, issue: &mut Issue) {
        match self.is_closed {
            Some(true) => issue.state = IssueState::Closed,
            Some(false) => issue.state = IssueState::Open,
            None => {}
        }
        if let Some(comment) = &self.new_comment {
            issue.comments.push(comment.clone());
            issue.comment_count += 1;
        }
        add_assignees(&mut issue.assignees, &self.added_assignees);
        remove_assignees(&mut issue.assignees, &self.removed_assignees);
        if let Some(labels) = &self.labels {
            issue.labels = labels.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationPatch {
    pub id: String,
    pub unread: Option<bool>,
    pub done: Option<bool>,
}

impl RowPatch for NotificationPatch {
    type Row = Notification;

    fn target(&self) -> RowIdentity {
        RowIdentity::Remote(self.id.clone())
    }

    fn apply(&self, notification: &mut Notification) {
        if let Some(unread) = self.unread {
            notification.unread = unread;
        }
        if let Some(done) = self.done {
            notification.done = done;
            // Done threads are read as far as the API is concerned
            if done {
                notification.unread = false;
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchPatch {
    pub name: String,
    pub pr_number: Option<u64>,
    pub upstream: Option<String>,
}

impl RowPatch for BranchPatch {
    type Row = Branch;

    fn target(&self) -> RowIdentity {
        RowIdentity::Branch(self.name.clone())
    }

    fn apply(&self, branch: &mut Branch) {
        if let Some(number) = self.pr_number {
            branch.pr_number = Some(number);
        }
        if let Some(upstream) = &self.upstream {
            branch.upstream = Some(upstream.clone());
        }
    }
}

/// Set-union, keeping existing order and appending new names.
pub fn add_assignees(current: &mut Vec<String>, added: &[String]) {
    for name in added {
        if !current.contains(name) {
            current.push(name.clone());
        }
    }
}

/// Set-difference against the current assignee list.
pub fn remove_assignees(current: &mut Vec<String>, removed: &[String]) {
    current.retain(|name| !removed.contains(name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_assignees_is_a_union() {
        let mut current = names(&["a", "b"]);
        add_assignees(&mut current, &names(&["b", "c"]));
        assert_eq!(current, names(&["a", "b", "c"]));
    }

    #[test]
    fn remove_assignees_is_a_difference() {
        let mut current = names(&["a", "b", "c"]);
        remove_assignees(&mut current, &names(&["b", "x"]));
        assert_eq!(current, names(&["a", "c"]));
    }

    #[test]
    fn pr_close_only_changes_state() {
        let mut row = pr("o/r", 5);
        let before = row.clone();
        let patch = PrPatch {
            is_closed: Some(true),
            ..PrPatch::new("o/r", 5)
        };
        patch.apply(&mut row);
        assert_eq!(row.state, PrState::Closed);
        row.state = before.state;
        assert_eq!(row, before);
    }

    #[test]
    fn pr_merge_wins_over_reopen() {
        let mut row = pr("o/r", 5);
        let patch = PrPatch {
            is_closed: Some(false),
            is_merged: Some(true),
            ..PrPatch::new("o/r", 5)
        };
        patch.apply(&mut row);
        assert_eq!(row.state, PrState::Merged);
    }

    #[test]
    fn pr_ready_clears_draft() {
        let mut row = pr("o/r", 5);
        row.is_draft = true;
        PrPatch {
            ready_for_review: Some(true),
            ..PrPatch::new("o/r", 5)
        }
        .apply(&mut row);
        assert!(!row.is_draft);
    }

    #[test]
    fn issue_comment_appends_and_counts() {
        let mut row = issue("o/r", 2);
        let comment = Comment {
            author: "me".to_string(),
            body: "thanks".to_string(),
            created_at: at(5),
        };
        IssuePatch {
            new_comment: Some(comment.clone()),
            ..IssuePatch::new("o/r", 2)
        }
        .apply(&mut row);
        assert_eq!(row.comments, vec![comment]);
        assert_eq!(row.comment_count, 1);
    }

    #[test]
    fn issue_labels_replace_existing() {
        let mut row = issue("o/r", 2);
        row.labels = vec![Label {
            name: "old".to_string(),
            color: "000000".to_string(),
        }];
        let labels = vec![Label {
            name: "bug".to_string(),
            color: "d73a4a".to_string(),
        }];
        IssuePatch {
            labels: Some(labels.clone()),
            ..IssuePatch::new("o/r", 2)
        }
        .apply(&mut row);
        assert_eq!(row.labels, labels);
    }

    #[test]
    fn notification_done_marks_read() {
        let mut row = notification("42");
        NotificationPatch {
            id: "42".to_string(),
            done: Some(true),
            ..Default::default()
        }
        .apply(&mut row);
        assert!(row.done);
        assert!(!row.unread);
    }

    #[test]
    fn branch_patch_links_pr() {
        let mut row = branch("topic");
        let patch = BranchPatch {
            name: "topic".to_string(),
            pr_number: Some(12),
            upstream: None,
        };
        assert_eq!(patch.target(), RowIdentity::Branch("topic".to_string()));
        patch.apply(&mut row);
        assert_eq!(row.pr_number, Some(12));
        assert_eq!(row.upstream, None);
    }
}
