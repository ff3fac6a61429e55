use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Branch, Issue, Label, Notification, Page, PageInfo, PullRequest};

/// Remote data source for sections. `page_info` is `None` for the first
/// page; implementations continue after its `end_cursor` otherwise.
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    async fn current_user(&self) -> Result<String>;

    async fn fetch_prs(&self, filters: &str, limit: u32, page_info: Option<&PageInfo>) -> Result<Page<PullRequest>>;

    async fn fetch_issues(&self, filters: &str, limit: u32, page_info: Option<&PageInfo>) -> Result<Page<Issue>>;

    async fn fetch_notifications(
        &self,
        filters: &str,
        limit: u32,
        page_info: Option<&PageInfo>,
    ) -> Result<Page<Notification>>;

    /// Local branches are always listed in one page.
    async fn fetch_branches(&self, filters: &str) -> Result<Page<Branch>>;

    async fn fetch_repo_labels(&self, repo: &str) -> Result<Vec<Label>>;

    async fn fetch_repo_users(&self, repo: &str) -> Result<Vec<String>>;
}
