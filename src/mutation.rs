//! Row-level actions and how they are carried out through `gh` and `git`.
//!
//! A [`MutationRequest`] is built on the update loop from the focused row,
//! then moved into a spawned task that runs the command and turns its
//! success into a patch for the row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::cache::LookupCache;
use crate::error::{Result, SiftError};
use crate::message::{CompletionMessage, Payload, SectionIdentifier};
use crate::patch::{BranchPatch, IssuePatch, NotificationPatch, PrPatch};
use crate::task::Task;
use crate::types::{Comment, Label, MergeMethod, RowData, RowRef, SectionKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Close,
    Reopen,
    Ready,
    Merge(MergeMethod),
    UpdateBranch,
    Comment(String),
    Assign(Vec<String>),
    Unassign(Vec<String>),
    /// The full set of labels the row should end up with
    Label(Vec<String>),
    MarkDone,
    MarkRead,
    Push,
    CreatePr { title: String },
}

impl Mutation {
    /// Whether the action is destructive enough to ask first.
    pub fn needs_confirmation(&self) -> bool {
        matches!(
            self,
            Mutation::Close
                | Mutation::Reopen
                | Mutation::Ready
                | Mutation::Merge(_)
                | Mutation::UpdateBranch
                | Mutation::MarkDone
        )
    }

    fn verb(&self) -> &'static str {
        match self {
            Mutation::Close => "close",
            Mutation::Reopen => "reopen",
            Mutation::Ready => "ready",
            Mutation::Merge(_) => "merge",
            Mutation::UpdateBranch => "update",
            Mutation::Comment(_) => "comment",
            Mutation::Assign(_) => "assign",
            Mutation::Unassign(_) => "unassign",
            Mutation::Label(_) => "label",
            Mutation::MarkDone => "done",
            Mutation::MarkRead => "read",
            Mutation::Push => "push",
            Mutation::CreatePr { .. } => "create_pr",
        }
    }

    fn allowed_for(&self, kind: SectionKind) -> bool {
        match self {
            Mutation::Ready | Mutation::Merge(_) | Mutation::UpdateBranch => kind == SectionKind::Pr,
            Mutation::Close
            | Mutation::Reopen
            | Mutation::Comment(_)
            | Mutation::Assign(_)
            | Mutation::Unassign(_)
            | Mutation::Label(_) => matches!(kind, SectionKind::Pr | SectionKind::Issue),
            Mutation::MarkDone | Mutation::MarkRead => kind == SectionKind::Notification,
            Mutation::Push | Mutation::CreatePr { .. } => kind == SectionKind::Branch,
        }
    }
}

/// The row a mutation acts on, reduced to what the command needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Numbered { repo: String, number: u64 },
    Thread { id: String, updated_at: DateTime<Utc> },
    Branch { name: String, repo: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub section: SectionIdentifier,
    pub target: Target,
    pub mutation: Mutation,
    /// Labels to end up with, colored from the lookup cache
    labels: Vec<Label>,
    added_labels: Vec<String>,
    removed_labels: Vec<String>,
}

impl MutationRequest {
    /// Validates `mutation` against the focused row.
    pub fn new(section: SectionIdentifier, row: RowRef<'_>, mutation: Mutation, cache: &LookupCache) -> Result<Self> {
        let kind = row.kind();
        if !mutation.allowed_for(kind) {
            return Err(SiftError::Mutation(format!(
                "cannot {} a {}",
                mutation.verb(),
                kind.singular().to_lowercase()
            )));
        }

        match &mutation {
            Mutation::Comment(body) if body.trim().is_empty() => {
                return Err(SiftError::Mutation("comment is empty".to_string()));
            }
            Mutation::Assign(users) | Mutation::Unassign(users) if users.is_empty() => {
                return Err(SiftError::Mutation("no users given".to_string()));
            }
            Mutation::CreatePr { title } if title.trim().is_empty() => {
                return Err(SiftError::Mutation("pull request title is empty".to_string()));
            }
            _ => {}
        }

        let target = match row {
            RowRef::Pr(pr) => Target::Numbered {
                repo: pr.repo.clone(),
                number: pr.number,
            },
            RowRef::Issue(issue) => Target::Numbered {
                repo: issue.repo.clone(),
                number: issue.number,
            },
            RowRef::Notification(n) => Target::Thread {
                id: n.id.clone(),
                updated_at: n.updated_at,
            },
            RowRef::Branch(b) => {
                if b.repo.is_empty() && matches!(mutation, Mutation::CreatePr { .. }) {
                    return Err(SiftError::Mutation("branch has no GitHub remote".to_string()));
                }
                Target::Branch {
                    name: b.name.clone(),
                    repo: b.repo.clone(),
                }
            }
        };

        let mut request = Self {
            section,
            target,
            mutation,
            labels: Vec::new(),
            added_labels: Vec::new(),
            removed_labels: Vec::new(),
        };

        if let Mutation::Label(wanted) = &request.mutation {
            let existing: Vec<String> = match row {
                RowRef::Pr(pr) => pr.labels.iter().map(|l| l.name.clone()).collect(),
                RowRef::Issue(issue) => issue.labels.iter().map(|l| l.name.clone()).collect(),
                _ => Vec::new(),
            };
            request.added_labels = wanted.iter().filter(|l| !existing.contains(l)).cloned().collect();
            request.removed_labels = existing.iter().filter(|l| !wanted.contains(l)).cloned().collect();
            if request.added_labels.is_empty() && request.removed_labels.is_empty() {
                return Err(SiftError::Mutation("labels unchanged".to_string()));
            }
            request.labels = cache.resolve_labels(row.repo_name_with_owner(), wanted);
        }

        Ok(request)
    }

    fn kind(&self) -> SectionKind {
        self.section.kind
    }

    fn prefix(&self) -> &'static str {
        match self.kind() {
            SectionKind::Pr => "pr",
            SectionKind::Issue => "issue",
            SectionKind::Notification => "notification",
            SectionKind::Branch => "branch",
        }
    }

    fn key(&self) -> String {
        match &self.target {
            Target::Numbered { number, .. } => number.to_string(),
            Target::Thread { id, .. } => id.clone(),
            Target::Branch { name, .. } => name.clone(),
        }
    }

    /// Deterministic id, so repeating an action on the same row reuses it.
    pub fn task_id(&self) -> String {
        match &self.mutation {
            Mutation::Merge(_) => format!("merge_{}", self.key()),
            Mutation::UpdateBranch => format!("pr_update_{}", self.key()),
            Mutation::CreatePr { .. } => format!("create_pr_{}", self.key()),
            m => format!("{}_{}_{}", self.prefix(), m.verb(), self.key()),
        }
    }

    fn subject(&self) -> String {
        match &self.target {
            Target::Numbered { number, .. } => format!("{} #{}", self.kind().singular(), number),
            Target::Thread { .. } => "notification".to_string(),
            Target::Branch { name, .. } => format!("branch {}", name),
        }
    }

    pub fn task(&self) -> Task {
        let subject = self.subject();
        let (start, finished) = match &self.mutation {
            Mutation::Close => (format!("Closing {}", subject), format!("{} closed", subject)),
            Mutation::Reopen => (format!("Reopening {}", subject), format!("{} reopened", subject)),
            Mutation::Ready => (
                format!("Marking {} ready for review", subject),
                format!("{} is ready for review", subject),
            ),
            Mutation::Merge(method) => (
                format!("Merging {} ({})", subject, method),
                format!("{} merged", subject),
            ),
            Mutation::UpdateBranch => (
                format!("Updating branch of {}", subject),
                format!("{} branch updated", subject),
            ),
            Mutation::Comment(_) => (
                format!("Commenting on {}", subject),
                format!("Commented on {}", subject),
            ),
            Mutation::Assign(users) => (
                format!("Assigning {} to {}", users.join(", "), subject),
                format!("Assigned {} to {}", users.join(", "), subject),
            ),
            Mutation::Unassign(users) => (
                format!("Unassigning {} from {}", users.join(", "), subject),
                format!("Unassigned {} from {}", users.join(", "), subject),
            ),
            Mutation::Label(_) => (
                format!("Updating labels of {}", subject),
                format!("Labels of {} updated", subject),
            ),
            Mutation::MarkDone => ("Marking notification done".to_string(), "Notification done".to_string()),
            Mutation::MarkRead => ("Marking notification read".to_string(), "Notification read".to_string()),
            Mutation::Push => (format!("Pushing {}", subject), format!("Pushed {}", subject)),
            Mutation::CreatePr { .. } => (
                format!("Creating PR for {}", subject),
                format!("Created PR for {}", subject),
            ),
        };
        Task::new(self.task_id(), start, finished)
    }

    /// Program and arguments that carry the mutation out.
    pub fn command(&self) -> (String, Vec<String>) {
        let gh = |args: Vec<String>| ("gh".to_string(), args);
        let s = |v: &str| v.to_string();
        match (&self.target, &self.mutation) {
            (Target::Numbered { repo, number }, mutation) => {
                let noun = if self.kind() == SectionKind::Pr { "pr" } else { "issue" };
                let mut args = vec![s(noun)];
                match mutation {
                    Mutation::Close => args.push(s("close")),
                    Mutation::Reopen => args.push(s("reopen")),
                    Mutation::Ready => args.push(s("ready")),
                    Mutation::Merge(_) => args.push(s("merge")),
                    Mutation::UpdateBranch => args.push(s("update-branch")),
                    Mutation::Comment(_) => args.push(s("comment")),
                    _ => args.push(s("edit")),
                }
                args.extend([number.to_string(), s("-R"), repo.clone()]);
                match mutation {
                    Mutation::Merge(method) => args.push(s(method.as_cli_flag())),
                    Mutation::Comment(body) => args.extend([s("-b"), body.clone()]),
                    Mutation::Assign(users) => args.extend([s("--add-assignee"), users.join(",")]),
                    Mutation::Unassign(users) => args.extend([s("--remove-assignee"), users.join(",")]),
                    Mutation::Label(_) => {
                        if !self.added_labels.is_empty() {
                            args.extend([s("--add-label"), self.added_labels.join(",")]);
                        }
                        if !self.removed_labels.is_empty() {
                            args.extend([s("--remove-label"), self.removed_labels.join(",")]);
                        }
                    }
                    _ => {}
                }
                gh(args)
            }
            (Target::Thread { id, .. }, Mutation::MarkRead) => gh(vec![
                s("api"),
                s("-X"),
                s("PATCH"),
                format!("notifications/threads/{}", id),
            ]),
            (Target::Thread { id, .. }, _) => gh(vec![
                s("api"),
                s("-X"),
                s("DELETE"),
                format!("notifications/threads/{}", id),
            ]),
            (Target::Branch { name, repo }, Mutation::CreatePr { title }) => gh(vec![
                s("pr"),
                s("create"),
                s("--head"),
                name.clone(),
                s("--title"),
                title.clone(),
                s("--body"),
                String::new(),
                s("-R"),
                repo.clone(),
            ]),
            (Target::Branch { name, .. }, _) => (s("git"), vec![s("push"), s("-u"), s("origin"), name.clone()]),
        }
    }

    /// The notification thread to remember as done once this succeeds.
    pub fn done_thread(&self) -> Option<(&str, DateTime<Utc>)> {
        match (&self.target, &self.mutation) {
            (Target::Thread { id, updated_at }, Mutation::MarkDone) => Some((id.as_str(), *updated_at)),
            _ => None,
        }
    }

    /// The patch describing the row after the command succeeded.
    pub fn into_payload(self, stdout: &str, user: Option<&str>) -> Payload {
        let new_comment = |body: &String| Comment {
            author: user.unwrap_or("you").to_string(),
            body: body.clone(),
            created_at: Utc::now(),
        };
        match self.target {
            Target::Numbered { repo, number } if self.section.kind == SectionKind::Pr => {
                let mut patch = PrPatch::new(repo, number);
                match self.mutation {
                    Mutation::Close => patch.is_closed = Some(true),
                    Mutation::Reopen => patch.is_closed = Some(false),
                    Mutation::Ready => patch.ready_for_review = Some(true),
                    Mutation::Merge(_) => patch.is_merged = Some(true),
                    Mutation::Comment(ref body) => patch.new_comment = Some(new_comment(body)),
                    Mutation::Assign(users) => patch.added_assignees = users,
                    Mutation::Unassign(users) => patch.removed_assignees = users,
                    Mutation::Label(_) => patch.labels = Some(self.labels),
                    _ => {}
                }
                Payload::PrUpdated(patch)
            }
            Target::Numbered { repo, number } => {
                let mut patch = IssuePatch::new(repo, number);
                match self.mutation {
                    Mutation::Close => patch.is_closed = Some(true),
                    Mutation::Reopen => patch.is_closed = Some(false),
                    Mutation::Comment(ref body) => patch.new_comment = Some(new_comment(body)),
                    Mutation::Assign(users) => patch.added_assignees = users,
                    Mutation::Unassign(users) => patch.removed_assignees = users,
                    Mutation::Label(_) => patch.labels = Some(self.labels),
                    _ => {}
                }
                Payload::IssueUpdated(patch)
            }
            Target::Thread { id, .. } => {
                let mut patch = NotificationPatch {
                    id,
                    ..Default::default()
                };
                match self.mutation {
                    Mutation::MarkDone => patch.done = Some(true),
                    _ => patch.unread = Some(false),
                }
                Payload::NotificationUpdated(patch)
            }
            Target::Branch { name, .. } => {
                let mut patch = BranchPatch {
                    name,
                    ..Default::default()
                };
                match self.mutation {
                    Mutation::CreatePr { .. } => patch.pr_number = pr_number_from_url(stdout),
                    _ => patch.upstream = Some(format!("origin/{}", patch.name)),
                }
                Payload::BranchUpdated(patch)
            }
        }
    }
}

/// `gh pr create` prints the new PR's url as its last line.
fn pr_number_from_url(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().rsplit("/pull/").next()?.parse().ok())
}

/// Runs an external program and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    async fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

#[derive(Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<String> {
        tracing::debug!(program, ?args, "running command");
        let output = tokio::process::Command::new(program).args(args).output().await?;
        if !output.status.success() {
            return Err(SiftError::Command {
                program: program.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Carries out `request` and reports the outcome as a completion message.
pub async fn execute(runner: &dyn CommandRunner, request: MutationRequest, user: Option<&str>) -> CompletionMessage {
    let section = request.section;
    let task_id = request.task_id();
    let (program, args) = request.command();
    match runner.run(&program, &args).await {
        Ok(stdout) => CompletionMessage::ok(section, task_id, request.into_payload(&stdout, user)),
        Err(e) => CompletionMessage::failed(section, task_id, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::*;
    use std::sync::Mutex;

    fn pr_section() -> SectionIdentifier {
        SectionIdentifier {
            id: 1,
            kind: SectionKind::Pr,
        }
    }

    fn issue_section() -> SectionIdentifier {
        SectionIdentifier {
            id: 2,
            kind: SectionKind::Issue,
        }
    }

    fn request(row: RowRef<'_>, mutation: Mutation) -> MutationRequest {
        let section = SectionIdentifier {
            id: 1,
            kind: row.kind(),
        };
        MutationRequest::new(section, row, mutation, &LookupCache::new()).unwrap()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Debug, Default)]
    struct FakeRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        fail: bool,
        stdout: String,
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, program: &str, args: &[String]) -> Result<String> {
            self.calls.lock().unwrap().push((program.to_string(), args.to_vec()));
            if self.fail {
                Err(SiftError::Command {
                    program: program.to_string(),
                    stderr: "GraphQL: not permitted".to_string(),
                })
            } else {
                Ok(self.stdout.clone())
            }
        }
    }

    #[test]
    fn pr_close_command_and_task_id() {
        let pr = pr("o/r", 482);
        let req = request(RowRef::Pr(&pr), Mutation::Close);
        assert_eq!(req.task_id(), "pr_close_482");
        assert_eq!(req.command(), ("gh".to_string(), args(&["pr", "close", "482", "-R", "o/r"])));
        assert_eq!(req.task().start_text, "Closing PR #482");
    }

    #[test]
    fn merge_uses_method_flag() {
        let pr = pr("o/r", 3);
        let req = request(RowRef::Pr(&pr), Mutation::Merge(MergeMethod::Squash));
        assert_eq!(req.task_id(), "merge_3");
        assert_eq!(req.command().1, args(&["pr", "merge", "3", "-R", "o/r", "--squash"]));
    }

    #[test]
    fn issue_comment_command() {
        let issue = issue("o/r", 9);
        let req = MutationRequest::new(
            issue_section(),
            RowRef::Issue(&issue),
            Mutation::Comment("LGTM".to_string()),
            &LookupCache::new(),
        )
        .unwrap();
        assert_eq!(req.task_id(), "issue_comment_9");
        assert_eq!(req.command().1, args(&["issue", "comment", "9", "-R", "o/r", "-b", "LGTM"]));
    }

    #[test]
    fn label_command_adds_and_removes() {
        let mut issue = issue("o/r", 4);
        issue.labels = vec![Label {
            name: "old".to_string(),
            color: "000000".to_string(),
        }];
        let mut cache = LookupCache::new();
        cache.labels.insert(
            "o/r",
            vec![Label {
                name: "bug".to_string(),
                color: "d73a4a".to_string(),
            }],
        );
        let req = MutationRequest::new(
            issue_section(),
            RowRef::Issue(&issue),
            Mutation::Label(vec!["bug".to_string()]),
            &cache,
        )
        .unwrap();
        assert_eq!(req.task_id(), "issue_label_4");
        assert_eq!(
            req.command().1,
            args(&["issue", "edit", "4", "-R", "o/r", "--add-label", "bug", "--remove-label", "old"])
        );
        match req.into_payload("", None) {
            Payload::IssueUpdated(patch) => {
                assert_eq!(patch.labels.unwrap()[0].color, "d73a4a");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn unchanged_labels_are_rejected() {
        let pr = pr("o/r", 1);
        let result = MutationRequest::new(pr_section(), RowRef::Pr(&pr), Mutation::Label(vec![]), &LookupCache::new());
        assert!(matches!(result, Err(SiftError::Mutation(_))));
    }

    #[test]
    fn invalid_combinations_are_rejected() {
        let issue = issue("o/r", 1);
        let cache = LookupCache::new();
        let merge = MutationRequest::new(issue_section(), RowRef::Issue(&issue), Mutation::Merge(MergeMethod::Merge), &cache);
        assert!(matches!(merge, Err(SiftError::Mutation(_))));

        let n = notification("1");
        let section = SectionIdentifier {
            id: 1,
            kind: SectionKind::Notification,
        };
        assert!(MutationRequest::new(section, RowRef::Notification(&n), Mutation::Close, &cache).is_err());
        let pr = pr("o/r", 1);
        assert!(MutationRequest::new(pr_section(), RowRef::Pr(&pr), Mutation::Comment("  ".to_string()), &cache).is_err());
        assert!(MutationRequest::new(pr_section(), RowRef::Pr(&pr), Mutation::Assign(vec![]), &cache).is_err());
    }

    #[test]
    fn notification_done_and_read_commands() {
        let n = notification("77");
        let done = request(RowRef::Notification(&n), Mutation::MarkDone);
        assert_eq!(done.task_id(), "notification_done_77");
        assert_eq!(done.command().1, args(&["api", "-X", "DELETE", "notifications/threads/77"]));
        assert_eq!(done.done_thread(), Some(("77", n.updated_at)));

        let read = request(RowRef::Notification(&n), Mutation::MarkRead);
        assert_eq!(read.command().1, args(&["api", "-X", "PATCH", "notifications/threads/77"]));
        assert_eq!(read.done_thread(), None);
    }

    #[test]
    fn branch_push_and_create_pr() {
        let b = branch("topic");
        let push = request(RowRef::Branch(&b), Mutation::Push);
        assert_eq!(push.task_id(), "branch_push_topic");
        assert_eq!(push.command(), ("git".to_string(), args(&["push", "-u", "origin", "topic"])));

        let create = request(
            RowRef::Branch(&b),
            Mutation::CreatePr {
                title: "Add topic".to_string(),
            },
        );
        assert_eq!(create.task_id(), "create_pr_topic");
        assert_eq!(
            create.command().1,
            args(&["pr", "create", "--head", "topic", "--title", "Add topic", "--body", "", "-R", "o/r"])
        );
        match create.into_payload("https://github.com/o/r/pull/31\n", None) {
            Payload::BranchUpdated(patch) => assert_eq!(patch.pr_number, Some(31)),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn create_pr_needs_remote() {
        let mut b = branch("topic");
        b.repo.clear();
        let section = SectionIdentifier {
            id: 1,
            kind: SectionKind::Branch,
        };
        let result = MutationRequest::new(
            section,
            RowRef::Branch(&b),
            Mutation::CreatePr {
                title: "x".to_string(),
            },
            &LookupCache::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn only_destructive_actions_confirm() {
        assert!(Mutation::Merge(MergeMethod::Rebase).needs_confirmation());
        assert!(Mutation::MarkDone.needs_confirmation());
        assert!(!Mutation::Comment("x".to_string()).needs_confirmation());
        assert!(!Mutation::MarkRead.needs_confirmation());
    }

    #[tokio::test]
    async fn execute_success_yields_patch() {
        let runner = FakeRunner::default();
        let pr = pr("o/r", 5);
        let req = request(RowRef::Pr(&pr), Mutation::Comment("nice".to_string()));
        let msg = execute(&runner, req, Some("me")).await;

        assert_eq!(msg.task_id, "pr_comment_5");
        match msg.outcome {
            Ok(Payload::PrUpdated(patch)) => {
                let comment = patch.new_comment.unwrap();
                assert_eq!(comment.author, "me");
                assert_eq!(comment.body, "nice");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn execute_failure_carries_stderr() {
        let runner = FakeRunner {
            fail: true,
            ..Default::default()
        };
        let pr = pr("o/r", 5);
        let req = request(RowRef::Pr(&pr), Mutation::Close);
        let msg = execute(&runner, req, None).await;
        assert!(msg.error().unwrap().contains("not permitted"));
    }

    #[test]
    fn pr_number_parsing() {
        assert_eq!(pr_number_from_url("Creating...\nhttps://github.com/o/r/pull/12\n"), Some(12));
        assert_eq!(pr_number_from_url("nothing"), None);
    }
}
