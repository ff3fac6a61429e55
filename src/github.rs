use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SiftError};
use crate::fetcher::Fetcher;
use crate::git;
use crate::store::DoneStore;
use crate::types::{
    Branch, Comment, Issue, IssueState, Label, Notification, Page, PageInfo, PrState, PullRequest,
};

const PR_SEARCH_QUERY: &str = r#"
query SearchPullRequests($query: String!, $limit: Int!, $after: String) {
  search(query: $query, type: ISSUE, first: $limit, after: $after) {
    issueCount
    pageInfo { hasNextPage startCursor endCursor }
    nodes {
      ... on PullRequest {
        number
        title
        body
        url
        state
        isDraft
        author { login }
        repository { nameWithOwner }
        headRefName
        baseRefName
        additions
        deletions
        reviewDecision
        createdAt
        updatedAt
        assignees(first: 10) { nodes { login } }
        labels(first: 20) { nodes { name color } }
        comments(last: 5) { totalCount nodes { author { login } body createdAt } }
      }
    }
  }
}
"#;

const ISSUE_SEARCH_QUERY: &str = r#"
query SearchIssues($query: String!, $limit: Int!, $after: String) {
  search(query: $query, type: ISSUE, first: $limit, after: $after) {
    issueCount
    pageInfo { hasNextPage startCursor endCursor }
    nodes {
      ... on Issue {
        number
        title
        body
        url
        state
        author { login }
        repository { nameWithOwner }
        createdAt
        updatedAt
        assignees(first: 10) { nodes { login } }
        labels(first: 20) { nodes { name color } }
        comments(last: 5) { totalCount nodes { author { login } body createdAt } }
        reactions { totalCount }
      }
    }
  }
}
"#;

pub struct GitHub {
    client: Octocrab,
    done: Arc<DoneStore>,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub").finish_non_exhaustive()
    }
}

impl From<octocrab::Error> for SiftError {
    fn from(err: octocrab::Error) -> Self {
        SiftError::Api(err.to_string())
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct SearchData {
    search: SearchResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    issue_count: usize,
    page_info: RawPageInfo,
    /// Kept untyped: nodes that do not match the fragment come back as `{}`
    nodes: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageInfo {
    has_next_page: bool,
    start_cursor: Option<String>,
    end_cursor: Option<String>,
}

impl From<RawPageInfo> for PageInfo {
    fn from(raw: RawPageInfo) -> Self {
        PageInfo {
            has_next_page: raw.has_next_page,
            start_cursor: raw.start_cursor.unwrap_or_default(),
            end_cursor: raw.end_cursor.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct Login {
    login: String,
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComments {
    total_count: u32,
    nodes: Vec<RawComment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawComment {
    author: Option<Login>,
    body: String,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRepository {
    name_with_owner: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPr {
    number: u64,
    title: String,
    body: Option<String>,
    url: String,
    state: String,
    is_draft: bool,
    author: Option<Login>,
    repository: RawRepository,
    head_ref_name: String,
    base_ref_name: String,
    additions: u64,
    deletions: u64,
    review_decision: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assignees: Nodes<Login>,
    labels: Nodes<Label>,
    comments: RawComments,
}

#[derive(Deserialize)]
struct TotalCount {
    #[serde(rename = "totalCount")]
    total_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssue {
    number: u64,
    title: String,
    body: Option<String>,
    url: String,
    state: String,
    author: Option<Login>,
    repository: RawRepository,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assignees: Nodes<Login>,
    labels: Nodes<Label>,
    comments: RawComments,
    reactions: TotalCount,
}

fn author_login(author: Option<Login>) -> String {
    author.map(|a| a.login).unwrap_or_else(|| "ghost".to_string())
}

fn comments(raw: RawComments) -> (Vec<Comment>, u32) {
    let list = raw
        .nodes
        .into_iter()
        .map(|c| Comment {
            author: author_login(c.author),
            body: c.body,
            created_at: c.created_at,
        })
        .collect();
    (list, raw.total_count)
}

impl From<RawPr> for PullRequest {
    fn from(raw: RawPr) -> Self {
        let (comments, comment_count) = comments(raw.comments);
        PullRequest {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            url: raw.url,
            state: match raw.state.as_str() {
                "MERGED" => PrState::Merged,
                "CLOSED" => PrState::Closed,
                _ => PrState::Open,
            },
            is_draft: raw.is_draft,
            author: author_login(raw.author),
            repo: raw.repository.name_with_owner,
            head_branch: raw.head_ref_name,
            base_branch: raw.base_ref_name,
            additions: raw.additions,
            deletions: raw.deletions,
            review_decision: raw.review_decision,
            assignees: raw.assignees.nodes.into_iter().map(|a| a.login).collect(),
            labels: raw.labels.nodes,
            comments,
            comment_count,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        let (comments, comment_count) = comments(raw.comments);
        Issue {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            url: raw.url,
            state: match raw.state.as_str() {
                "CLOSED" => IssueState::Closed,
                _ => IssueState::Open,
            },
            author: author_login(raw.author),
            repo: raw.repository.name_with_owner,
            assignees: raw.assignees.nodes.into_iter().map(|a| a.login).collect(),
            labels: raw.labels.nodes,
            comments,
            comment_count,
            reactions: raw.reactions.total_count,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct RawNotification {
    id: String,
    unread: bool,
    reason: String,
    updated_at: DateTime<Utc>,
    subject: RawSubject,
    repository: RawNotificationRepo,
}

#[derive(Deserialize)]
struct RawSubject {
    title: String,
    url: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct RawNotificationRepo {
    full_name: String,
}

#[derive(Deserialize)]
struct RawAssignee {
    login: String,
}

/// Turns an API subject url into the page a browser should open, e.g.
/// `https://api.github.com/repos/o/r/pulls/1` into `https://github.com/o/r/pull/1`.
pub fn html_url(api_url: &str) -> Option<String> {
    let path = api_url.strip_prefix("https://api.github.com/repos/")?;
    let mut parts = path.splitn(4, '/');
    let (owner, repo, kind, rest) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    let kind = match kind {
        "pulls" => "pull",
        "issues" => "issues",
        "commits" => "commit",
        "discussions" => "discussions",
        _ => return None,
    };
    Some(format!("https://github.com/{}/{}/{}/{}", owner, repo, kind, rest))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    #[default]
    Unread,
    Read,
    All,
    Done,
}

/// Client-side interpretation of a notification section's filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationFilter {
    pub repos: Vec<String>,
    pub reasons: Vec<String>,
    pub read_state: ReadState,
}

impl NotificationFilter {
    pub fn parse(filters: &str) -> Self {
        let mut filter = NotificationFilter::default();
        for token in filters.split_whitespace() {
            if let Some(repo) = token.strip_prefix("repo:") {
                filter.repos.push(repo.to_string());
            } else if let Some(reason) = token.strip_prefix("reason:") {
                filter.reasons.push(reason.to_string());
            } else if let Some(state) = token.strip_prefix("is:") {
                filter.read_state = match state {
                    "read" => ReadState::Read,
                    "all" => ReadState::All,
                    "done" => ReadState::Done,
                    _ => ReadState::Unread,
                };
            }
        }
        filter
    }

    fn wants_all(&self) -> bool {
        self.read_state != ReadState::Unread
    }

    fn keeps(&self, n: &Notification) -> bool {
        let state_ok = match self.read_state {
            ReadState::Unread => n.unread && !n.done,
            ReadState::Read => !n.unread && !n.done,
            ReadState::All => !n.done,
            ReadState::Done => n.done,
        };
        state_ok && (self.reasons.is_empty() || self.reasons.contains(&n.reason))
    }
}

impl GitHub {
    pub fn new(token: String, done: Arc<DoneStore>) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| SiftError::Auth(e.to_string()))?;

        Ok(Self { client, done })
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> Result<T> {
        let envelope: Envelope<T> = self
            .client
            .graphql(&json!({ "query": query, "variables": variables }))
            .await?;
        if let Some(err) = envelope.errors.first() {
            return Err(SiftError::Api(err.message.clone()));
        }
        envelope
            .data
            .ok_or_else(|| SiftError::Api("GraphQL response had no data".to_string()))
    }

    async fn search<R, Raw>(&self, query: &str, search: String, limit: u32, page_info: Option<&PageInfo>) -> Result<Page<R>>
    where
        Raw: DeserializeOwned,
        R: From<Raw>,
    {
        let after = page_info.map(|p| p.end_cursor.clone());
        tracing::debug!(%search, limit, ?after, "searching");
        let data: SearchData = self
            .graphql(query, json!({ "query": search, "limit": limit, "after": after }))
            .await?;
        let rows = data
            .search
            .nodes
            .into_iter()
            .filter_map(|node| serde_json::from_value::<Raw>(node).ok())
            .map(R::from)
            .collect();
        Ok(Page {
            rows,
            total_count: data.search.issue_count,
            page_info: data.search.page_info.into(),
        })
    }

    fn to_notification(&self, raw: RawNotification) -> Notification {
        let done = self.done.is_done(&raw.id, raw.updated_at);
        Notification {
            url: raw.subject.url.as_deref().and_then(html_url).unwrap_or_default(),
            id: raw.id,
            title: raw.subject.title,
            subject_type: raw.subject.kind,
            reason: raw.reason,
            repo: raw.repository.full_name,
            unread: raw.unread,
            done,
            updated_at: raw.updated_at,
        }
    }
}

/// Joins the per-repo notification pages. There is another page when any
/// repo filled its page. Failing repos are skipped unless all of them failed.
fn merge_repo_pages<T>(results: Vec<(String, Result<Vec<T>>)>, limit: usize) -> Result<(Vec<T>, bool)> {
    let mut merged = Vec::new();
    let mut has_next_page = false;
    let mut succeeded = false;
    let mut first_error = None;
    for (repo, result) in results {
        match result {
            Ok(mut list) => {
                has_next_page |= list.len() >= limit;
                succeeded = true;
                merged.append(&mut list);
            }
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "failed to fetch notifications for repo");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) if !succeeded => Err(e),
        _ => Ok((merged, has_next_page)),
    }
}

#[async_trait]
impl Fetcher for GitHub {
    async fn current_user(&self) -> Result<String> {
        let user = self.client.current().user().await?;
        Ok(user.login)
    }

    async fn fetch_prs(&self, filters: &str, limit: u32, page_info: Option<&PageInfo>) -> Result<Page<PullRequest>> {
        let search = format!("is:pr {} sort:updated", filters.trim());
        self.search::<PullRequest, RawPr>(PR_SEARCH_QUERY, search, limit, page_info)
            .await
    }

    async fn fetch_issues(&self, filters: &str, limit: u32, page_info: Option<&PageInfo>) -> Result<Page<Issue>> {
        let search = format!("is:issue {} sort:updated", filters.trim());
        self.search::<Issue, RawIssue>(ISSUE_SEARCH_QUERY, search, limit, page_info)
            .await
    }

    /// The REST endpoint pages by number; the page number is carried in the
    /// cursor fields.
    async fn fetch_notifications(
        &self,
        filters: &str,
        limit: u32,
        page_info: Option<&PageInfo>,
    ) -> Result<Page<Notification>> {
        let filter = NotificationFilter::parse(filters);
        let page: u32 = page_info
            .and_then(|p| p.end_cursor.parse().ok())
            .unwrap_or(1);
        let all = if filter.wants_all() { "&all=true" } else { "" };

        // Decided before filtering so heavily filtered pages still page on
        let (raw, has_next_page) = if filter.repos.is_empty() {
            let url = format!("/notifications?per_page={}&page={}{}", limit, page, all);
            let raw: Vec<RawNotification> = self.client.get(&url, None::<&()>).await?;
            let full = raw.len() >= limit as usize;
            (raw, full)
        } else {
            let mut results = Vec::with_capacity(filter.repos.len());
            for repo in &filter.repos {
                let url = format!("/repos/{}/notifications?per_page={}&page={}{}", repo, limit, page, all);
                let result = self
                    .client
                    .get::<Vec<RawNotification>, _, ()>(&url, None::<&()>)
                    .await
                    .map_err(SiftError::from);
                results.push((repo.clone(), result));
            }
            merge_repo_pages(results, limit as usize)?
        };
        let rows: Vec<Notification> = raw
            .into_iter()
            .map(|n| self.to_notification(n))
            .filter(|n| filter.keeps(n))
            .collect();
        tracing::info!(page, kept = rows.len(), has_next_page, "fetched notifications");

        Ok(Page {
            total_count: (page as usize - 1) * limit as usize + rows.len(),
            rows,
            page_info: PageInfo {
                has_next_page,
                start_cursor: page.to_string(),
                end_cursor: (page + 1).to_string(),
            },
        })
    }

    async fn fetch_branches(&self, filters: &str) -> Result<Page<Branch>> {
        let mut branches = git::local_branches(filters).await?;
        let repo = branches.first().map(|b| b.repo.clone()).unwrap_or_default();
        if !repo.is_empty() {
            // Link branches to their open PRs; failure only loses the link
            let search = format!("repo:{} is:open", repo);
            match self.fetch_prs(&search, 50, None).await {
                Ok(prs) => {
                    let by_head: HashMap<&str, u64> = prs
                        .rows
                        .iter()
                        .map(|pr| (pr.head_branch.as_str(), pr.number))
                        .collect();
                    for branch in &mut branches {
                        branch.pr_number = by_head.get(branch.name.as_str()).copied();
                    }
                }
                Err(e) => tracing::warn!(error = %e, "could not link branches to pull requests"),
            }
        }
        Ok(Page {
            total_count: branches.len(),
            rows: branches,
            page_info: PageInfo::default(),
        })
    }

    async fn fetch_repo_labels(&self, repo: &str) -> Result<Vec<Label>> {
        let url = format!("/repos/{}/labels?per_page=100", repo);
        let labels: Vec<Label> = self.client.get(&url, None::<&()>).await?;
        Ok(labels.into_iter().filter(|l| !l.name.trim().is_empty()).collect())
    }

    async fn fetch_repo_users(&self, repo: &str) -> Result<Vec<String>> {
        let url = format!("/repos/{}/assignees?per_page=100", repo);
        let users: Vec<RawAssignee> = self.client.get(&url, None::<&()>).await?;
        Ok(users.into_iter().map(|u| u.login).collect())
    }
}
