//! One independently paginated list and the closed set of list kinds.
//!
//! A [`Section`] owns its rows, the remote page cursor, and the scroll window
//! over the rows. It decides when another page may be requested and which
//! completion messages it is still willing to accept.

use chrono::{DateTime, Utc};

use crate::config::SectionConfig;
use crate::message::{CompletionMessage, FetchRequest, Payload, Reconcile, SectionIdentifier};
use crate::patch::{BranchPatch, IssuePatch, NotificationPatch, PrPatch, RowPatch};
use crate::task::{fetch_task_id, Task};
use crate::types::{Branch, Issue, Notification, Page, PageInfo, PullRequest, RowData, RowRef, SectionKind};
use crate::viewport::ListViewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Loading,
    Loaded,
    LoadingMore,
    Error,
}

impl FetchState {
    pub fn is_fetching(&self) -> bool {
        matches!(self, FetchState::Loading | FetchState::LoadingMore)
    }
}

/// What a completion payload means for a section of a given row kind.
pub enum Delivery<R: SectionRow> {
    Page(Page<R>),
    Patch(R::Patch),
}

/// A row type a section can hold.
pub trait SectionRow: RowData + Clone {
    type Patch: RowPatch<Row = Self>;
    const KIND: SectionKind;

    fn as_row_ref(&self) -> RowRef<'_>;

    /// Picks the payloads meant for this row kind.
    fn unpack(payload: Payload) -> Option<Delivery<Self>>;
}

impl SectionRow for PullRequest {
    type Patch = PrPatch;
    const KIND: SectionKind = SectionKind::Pr;

    fn as_row_ref(&self) -> RowRef<'_> {
        RowRef::Pr(self)
    }

    fn unpack(payload: Payload) -> Option<Delivery<Self>> {
        match payload {
            Payload::Prs(page) => Some(Delivery::Page(page)),
            Payload::PrUpdated(patch) => Some(Delivery::Patch(patch)),
            _ => None,
        }
    }
}

impl SectionRow for Issue {
    type Patch = IssuePatch;
    const KIND: SectionKind = SectionKind::Issue;

    fn as_row_ref(&self) -> RowRef<'_> {
        RowRef::Issue(self)
    }

    fn unpack(payload: Payload) -> Option<Delivery<Self>> {
        match payload {
            Payload::Issues(page) => Some(Delivery::Page(page)),
            Payload::IssueUpdated(patch) => Some(Delivery::Patch(patch)),
            _ => None,
        }
    }
}

impl SectionRow for Notification {
    type Patch = NotificationPatch;
    const KIND: SectionKind = SectionKind::Notification;

    fn as_row_ref(&self) -> RowRef<'_> {
        RowRef::Notification(self)
    }

    fn unpack(payload: Payload) -> Option<Delivery<Self>> {
        match payload {
            Payload::Notifications(page) => Some(Delivery::Page(page)),
            Payload::NotificationUpdated(patch) => Some(Delivery::Patch(patch)),
            _ => None,
        }
    }
}

impl SectionRow for Branch {
    type Patch = BranchPatch;
    const KIND: SectionKind = SectionKind::Branch;

    fn as_row_ref(&self) -> RowRef<'_> {
        RowRef::Branch(self)
    }

    fn unpack(payload: Payload) -> Option<Delivery<Self>> {
        match payload {
            Payload::Branches(page) => Some(Delivery::Page(page)),
            Payload::BranchUpdated(patch) => Some(Delivery::Patch(patch)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Section<R: SectionRow> {
    id: usize,
    title: String,
    filters: String,
    limit: u32,
    rows: Vec<R>,
    total_count: usize,
    page_info: Option<PageInfo>,
    last_fetch_task_id: Option<String>,
    is_loading: bool,
    state: FetchState,
    viewport: ListViewport,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl<R: SectionRow> Section<R> {
    pub fn new(id: usize, config: &SectionConfig, default_limit: u32, viewport: ListViewport) -> Self {
        Self {
            id,
            title: config.title.clone(),
            filters: config.filters.clone(),
            limit: config.limit.unwrap_or(default_limit),
            rows: Vec::new(),
            total_count: 0,
            page_info: None,
            last_fetch_task_id: None,
            is_loading: false,
            state: FetchState::Idle,
            viewport,
            last_updated: None,
            last_error: None,
        }
    }

    pub fn identifier(&self) -> SectionIdentifier {
        SectionIdentifier { id: self.id, kind: R::KIND }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn filters(&self) -> &str {
        &self.filters
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn page_info(&self) -> Option<&PageInfo> {
        self.page_info.as_ref()
    }

    pub fn last_fetch_task_id(&self) -> Option<&str> {
        self.last_fetch_task_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn viewport(&self) -> &ListViewport {
        &self.viewport
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Builds the request for the next page, or `None` once the remote
    /// reported there is nothing more to load.
    pub fn fetch_next_page(&mut self) -> Option<FetchRequest> {
        if self.page_info.as_ref().is_some_and(|p| !p.has_next_page) {
            return None;
        }

        let cursor = self.page_info.as_ref().map(|p| p.start_cursor.as_str());
        let task_id = fetch_task_id(R::KIND, self.id, cursor);
        self.last_fetch_task_id = Some(task_id.clone());
        if self.page_info.is_none() {
            self.state = FetchState::Loading;
            self.is_loading = true;
        } else {
            self.state = FetchState::LoadingMore;
        }

        let (start_text, finished_text) = if self.page_info.is_none() {
            (
                format!("Fetching {}", self.title),
                format!("Fetched {}", self.title),
            )
        } else {
            (
                format!("Fetching more {}", self.title),
                format!("Fetched more {}", self.title),
            )
        };

        Some(FetchRequest {
            section: self.identifier(),
            task: Task::new(task_id, start_text, finished_text),
            filters: self.filters.clone(),
            limit: self.limit,
            page_info: self.page_info.clone(),
        })
    }

    /// Forgets everything fetched so far.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.total_count = 0;
        self.page_info = None;
        self.last_fetch_task_id = None;
        self.is_loading = false;
        self.state = FetchState::Idle;
        self.last_error = None;
        self.viewport.set_num_items(0);
        self.viewport.reset();
    }

    /// Resets and asks for the first page again.
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        self.reset();
        self.fetch_next_page()
    }

    pub fn set_filters(&mut self, filters: impl Into<String>) -> Option<FetchRequest> {
        self.filters = filters.into();
        self.refresh()
    }

    fn accepts(&self, task_id: &str) -> bool {
        self.state.is_fetching() && self.last_fetch_task_id.as_deref() == Some(task_id)
    }

    pub fn on_page_fetched(&mut self, task_id: &str, page: Page<R>) -> Reconcile {
        if !self.accepts(task_id) {
            tracing::debug!(section = self.id, task_id, "dropping stale page");
            return Reconcile::Stale;
        }

        if self.page_info.is_none() {
            self.rows = page.rows;
        } else {
            self.rows.extend(page.rows);
        }
        self.page_info = Some(page.page_info);
        self.total_count = page.total_count;
        self.is_loading = false;
        self.state = FetchState::Loaded;
        self.last_updated = Some(Utc::now());
        self.last_error = None;
        self.viewport.set_num_items(self.rows.len());
        self.viewport.clamp();
        Reconcile::Applied
    }

    pub fn on_fetch_failed(&mut self, task_id: &str, error: &str) -> Reconcile {
        if !self.accepts(task_id) {
            return Reconcile::Stale;
        }
        self.is_loading = false;
        self.state = FetchState::Error;
        self.last_error = Some(error.to_string());
        Reconcile::Failed
    }

    /// Applies a mutation's result to the matching row in place.
    pub fn apply_patch(&mut self, patch: &R::Patch) -> Reconcile {
        let target = patch.target();
        let Some(row) = self.rows.iter_mut().find(|r| r.identity() == target) else {
            tracing::debug!(section = self.id, %target, "patch target not loaded");
            return Reconcile::IdentityNotFound;
        };
        patch.apply(row);
        self.is_loading = false;
        Reconcile::Applied
    }

    pub fn update(&mut self, msg: CompletionMessage) -> Reconcile {
        match msg.outcome {
            Err(error) => {
                if self.last_fetch_task_id.as_deref() == Some(msg.task_id.as_str()) {
                    self.on_fetch_failed(&msg.task_id, &error)
                } else {
                    Reconcile::Failed
                }
            }
            Ok(payload) => match R::unpack(payload) {
                Some(Delivery::Page(page)) => self.on_page_fetched(&msg.task_id, page),
                Some(Delivery::Patch(patch)) => self.apply_patch(&patch),
                None => Reconcile::Unrouted,
            },
        }
    }

    pub fn current_row(&self) -> Option<&R> {
        self.rows.get(self.viewport.current())
    }

    pub fn next_row(&mut self) -> usize {
        self.viewport.next()
    }

    pub fn prev_row(&mut self) -> usize {
        self.viewport.prev()
    }

    pub fn first_row(&mut self) -> usize {
        self.viewport.first()
    }

    pub fn last_row(&mut self) -> usize {
        self.viewport.last()
    }

    pub fn is_on_last_row(&self) -> bool {
        !self.rows.is_empty() && self.viewport.current() + 1 == self.rows.len()
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport.set_viewport_height(height);
    }

    pub fn pager_text(&self) -> String {
        let current = if self.rows.is_empty() { 0 } else { self.viewport.current() + 1 };
        format!(
            "{} {}/{} (fetched {})",
            R::KIND.singular(),
            current,
            self.total_count,
            self.rows.len()
        )
    }
}

/// A section of any kind. Each view holds sections of exactly one kind.
#[derive(Debug, Clone)]
pub enum AnySection {
    Pr(Section<PullRequest>),
    Issue(Section<Issue>),
    Notification(Section<Notification>),
    Branch(Section<Branch>),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            AnySection::Pr($s) => $body,
            AnySection::Issue($s) => $body,
            AnySection::Notification($s) => $body,
            AnySection::Branch($s) => $body,
        }
    };
}

impl AnySection {
    pub fn new(kind: SectionKind, id: usize, config: &SectionConfig, limit: u32, viewport: ListViewport) -> Self {
        match kind {
            SectionKind::Pr => AnySection::Pr(Section::new(id, config, limit, viewport)),
            SectionKind::Issue => AnySection::Issue(Section::new(id, config, limit, viewport)),
            SectionKind::Notification => AnySection::Notification(Section::new(id, config, limit, viewport)),
            SectionKind::Branch => AnySection::Branch(Section::new(id, config, limit, viewport)),
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            AnySection::Pr(_) => SectionKind::Pr,
            AnySection::Issue(_) => SectionKind::Issue,
            AnySection::Notification(_) => SectionKind::Notification,
            AnySection::Branch(_) => SectionKind::Branch,
        }
    }

    pub fn id(&self) -> usize {
        dispatch!(self, s => s.id())
    }

    pub fn identifier(&self) -> SectionIdentifier {
        dispatch!(self, s => s.identifier())
    }

    pub fn title(&self) -> &str {
        dispatch!(self, s => s.title())
    }

    pub fn filters(&self) -> &str {
        dispatch!(self, s => s.filters())
    }

    pub fn num_rows(&self) -> usize {
        dispatch!(self, s => s.rows().len())
    }

    pub fn total_count(&self) -> usize {
        dispatch!(self, s => s.total_count())
    }

    pub fn is_loading(&self) -> bool {
        dispatch!(self, s => s.is_loading())
    }

    pub fn state(&self) -> FetchState {
        dispatch!(self, s => s.state())
    }

    pub fn viewport(&self) -> &ListViewport {
        dispatch!(self, s => s.viewport())
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        dispatch!(self, s => s.last_updated())
    }

    pub fn last_error(&self) -> Option<&str> {
        dispatch!(self, s => s.last_error())
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        dispatch!(self, s => s.rows().get(index).map(SectionRow::as_row_ref))
    }

    pub fn current_row(&self) -> Option<RowRef<'_>> {
        dispatch!(self, s => s.current_row().map(SectionRow::as_row_ref))
    }

    pub fn fetch_next_page(&mut self) -> Option<FetchRequest> {
        dispatch!(self, s => s.fetch_next_page())
    }

    pub fn refresh(&mut self) -> Option<FetchRequest> {
        dispatch!(self, s => s.refresh())
    }

    pub fn set_filters(&mut self, filters: impl Into<String>) -> Option<FetchRequest> {
        let filters = filters.into();
        dispatch!(self, s => s.set_filters(filters))
    }

    pub fn update(&mut self, msg: CompletionMessage) -> Reconcile {
        dispatch!(self, s => s.update(msg))
    }

    pub fn next_row(&mut self) -> usize {
        dispatch!(self, s => s.next_row())
    }

    pub fn prev_row(&mut self) -> usize {
        dispatch!(self, s => s.prev_row())
    }

    pub fn first_row(&mut self) -> usize {
        dispatch!(self, s => s.first_row())
    }

    pub fn last_row(&mut self) -> usize {
        dispatch!(self, s => s.last_row())
    }

    pub fn is_on_last_row(&self) -> bool {
        dispatch!(self, s => s.is_on_last_row())
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        dispatch!(self, s => s.set_viewport_height(height))
    }

    pub fn pager_text(&self) -> String {
        dispatch!(self, s => s.pager_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::*;
    use crate::types::PrState;

    fn pr_section(id: usize) -> Section<PullRequest> {
        Section::new(
            id,
            &SectionConfig::new("My PRs", "is:open author:@me"),
            20,
            ListViewport::new(3, 1),
        )
    }

    fn prs(range: std::ops::Range<u64>) -> Vec<PullRequest> {
        range.map(|n| pr("o/r", n)).collect()
    }

    fn deliver(section: &mut Section<PullRequest>, task_id: &str, page: Page<PullRequest>) -> Reconcile {
        section.update(CompletionMessage::ok(section.identifier(), task_id, Payload::Prs(page)))
    }

    fn assert_cursor_in_range(section: &Section<PullRequest>) {
        let current = section.viewport().current();
        assert!(current < section.rows().len().max(1));
    }

    #[test]
    fn first_page_is_loaded_into_empty_section() {
        let mut section = pr_section(1);
        assert_eq!(section.state(), FetchState::Idle);

        let req = section.fetch_next_page().unwrap();
        assert!(req.page_info.is_none());
        assert_eq!(req.filters, "is:open author:@me");
        assert_eq!(req.limit, 20);
        assert!(section.is_loading());
        assert_eq!(section.state(), FetchState::Loading);

        let outcome = deliver(&mut section, &req.task.id, page(prs(1..4), true, "c1"));
        assert_eq!(outcome, Reconcile::Applied);
        assert_eq!(section.rows().len(), 3);
        assert!(!section.is_loading());
        assert_eq!(section.state(), FetchState::Loaded);
        assert_eq!(section.viewport().current(), 0);
        assert_cursor_in_range(&section);
    }

    #[test]
    fn next_page_is_appended_in_order() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..4), true, "c1"));

        let req = section.fetch_next_page().unwrap();
        assert_eq!(req.page_info.as_ref().unwrap().end_cursor, "c1");
        assert_eq!(req.task.id, "fetching_prs_1_start-c1");
        assert_eq!(section.state(), FetchState::LoadingMore);
        assert!(!section.is_loading());

        deliver(&mut section, &req.task.id, page(prs(4..6), false, "c2"));
        let numbers: Vec<u64> = section.rows().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert!(!section.page_info().unwrap().has_next_page);
    }

    #[test]
    fn no_fetch_once_last_page_was_seen() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..3), false, "end"));
        let last_task = section.last_fetch_task_id().map(str::to_string);

        assert!(section.fetch_next_page().is_none());
        assert_eq!(section.last_fetch_task_id().map(str::to_string), last_task);
        assert_eq!(section.state(), FetchState::Loaded);
    }

    #[test]
    fn duplicate_completion_does_not_duplicate_rows() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..4), true, "c1"));
        let req = section.fetch_next_page().unwrap();
        let second = page(prs(4..7), true, "c2");

        assert_eq!(deliver(&mut section, &req.task.id, second.clone()), Reconcile::Applied);
        assert_eq!(section.rows().len(), 6);
        assert_eq!(deliver(&mut section, &req.task.id, second), Reconcile::Stale);
        assert_eq!(section.rows().len(), 6);
    }

    #[test]
    fn stale_task_id_leaves_section_untouched() {
        let mut section = pr_section(1);
        let first = section.fetch_next_page().unwrap();
        deliver(&mut section, &first.task.id, page(prs(1..4), true, "c1"));
        let _newer = section.fetch_next_page().unwrap();

        let rows = section.rows().to_vec();
        let page_info = section.page_info().cloned();
        let loading = section.is_loading();

        let outcome = deliver(&mut section, &first.task.id, page(prs(10..13), true, "x"));
        assert_eq!(outcome, Reconcile::Stale);
        assert_eq!(section.rows(), rows.as_slice());
        assert_eq!(section.page_info().cloned(), page_info);
        assert_eq!(section.is_loading(), loading);
    }

    #[test]
    fn superseded_first_page_is_discarded_after_refresh() {
        let mut section = pr_section(1);
        let old = section.fetch_next_page().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let new = section.refresh().unwrap();
        assert_ne!(old.task.id, new.task.id);

        assert_eq!(deliver(&mut section, &old.task.id, page(prs(1..3), true, "a")), Reconcile::Stale);
        assert!(section.rows().is_empty());
        assert!(section.is_loading());

        assert_eq!(deliver(&mut section, &new.task.id, page(prs(5..6), true, "b")), Reconcile::Applied);
        assert_eq!(section.rows()[0].number, 5);
    }

    #[test]
    fn fetch_error_keeps_loaded_rows() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..4), true, "c1"));
        let req = section.fetch_next_page().unwrap();

        let msg = CompletionMessage::failed(section.identifier(), &req.task.id, "rate limited");
        assert_eq!(section.update(msg), Reconcile::Failed);
        assert_eq!(section.rows().len(), 3);
        assert!(!section.is_loading());
        assert_eq!(section.state(), FetchState::Error);
        assert_eq!(section.last_error(), Some("rate limited"));

        // The same page can be asked for again
        let retry = section.fetch_next_page().unwrap();
        assert_eq!(retry.task.id, req.task.id);
    }

    #[test]
    fn mutation_error_does_not_touch_rows() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..4), true, "c1"));
        let before = section.rows().to_vec();

        let msg = CompletionMessage::failed(section.identifier(), "pr_close_2", "not allowed");
        assert_eq!(section.update(msg), Reconcile::Failed);
        assert_eq!(section.rows(), before.as_slice());
        assert_eq!(section.state(), FetchState::Loaded);
    }

    #[test]
    fn patch_changes_only_target_row() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(4..7), true, "c1"));
        let before = section.rows().to_vec();

        let patch = PrPatch {
            is_closed: Some(true),
            ..PrPatch::new("o/r", 5)
        };
        let msg = CompletionMessage::ok(section.identifier(), "pr_close_5", Payload::PrUpdated(patch));
        assert_eq!(section.update(msg), Reconcile::Applied);

        assert_eq!(section.rows()[0], before[0]);
        assert_eq!(section.rows()[2], before[2]);
        assert_eq!(section.rows()[1].state, PrState::Closed);
        let mut reverted = section.rows()[1].clone();
        reverted.state = PrState::Open;
        assert_eq!(reverted, before[1]);
    }

    #[test]
    fn patch_for_missing_row_is_dropped() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..3), true, "c1"));
        let before = section.rows().to_vec();

        let patch = PrPatch {
            is_closed: Some(true),
            ..PrPatch::new("other/repo", 1)
        };
        assert_eq!(section.apply_patch(&patch), Reconcile::IdentityNotFound);
        assert_eq!(section.rows(), before.as_slice());
    }

    #[test]
    fn patch_during_first_fetch_does_not_block_page() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        let patch = PrPatch::new("o/r", 1);
        assert_eq!(section.apply_patch(&patch), Reconcile::IdentityNotFound);
        assert_eq!(deliver(&mut section, &req.task.id, page(prs(1..2), false, "c")), Reconcile::Applied);
    }

    #[test]
    fn successful_patch_clears_loading_flag() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..3), true, "c1"));
        section.is_loading = true;
        section.apply_patch(&PrPatch::new("o/r", 2));
        assert!(!section.is_loading());
    }

    #[test]
    fn wrong_payload_kind_is_unrouted() {
        let mut section = pr_section(1);
        let msg = CompletionMessage::ok(
            section.identifier(),
            "issue_close_1",
            Payload::IssueUpdated(IssuePatch::new("o/r", 1)),
        );
        assert_eq!(section.update(msg), Reconcile::Unrouted);
    }

    #[test]
    fn rows_grow_monotonically_until_reset() {
        let mut section = pr_section(1);
        let mut last_len = 0;
        let mut next = 1;
        while let Some(req) = section.fetch_next_page() {
            let more = next < 10;
            deliver(&mut section, &req.task.id, page(prs(next..next + 3), more, &format!("c{}", next)));
            assert!(section.rows().len() >= last_len);
            last_len = section.rows().len();
            next += 3;
            section.last_row();
            assert_cursor_in_range(&section);
        }
        assert_eq!(last_len, 12);

        section.reset();
        assert!(section.rows().is_empty());
        assert!(section.page_info().is_none());
        assert_eq!(section.viewport().current(), 0);
        assert_eq!(section.state(), FetchState::Idle);
    }

    #[test]
    fn set_filters_resets_and_refetches() {
        let mut section = pr_section(2);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..4), true, "c1"));
        section.next_row();

        let req = section.set_filters("is:closed").unwrap();
        assert_eq!(req.filters, "is:closed");
        assert!(req.page_info.is_none());
        assert!(section.rows().is_empty());
        assert_eq!(section.viewport().current(), 0);
        assert_eq!(section.filters(), "is:closed");
    }

    #[test]
    fn cursor_walk_over_five_rows_with_page_of_three() {
        let mut section = pr_section(1);
        let req = section.fetch_next_page().unwrap();
        deliver(&mut section, &req.task.id, page(prs(1..6), false, "c1"));

        section.last_row();
        assert_eq!(section.viewport().current(), 4);
        assert_eq!(section.viewport().top_bound(), 2);
        assert!(section.is_on_last_row());

        assert_eq!(section.next_row(), 4);
        assert_eq!(section.viewport().top_bound(), 2);

        section.prev_row();
        section.prev_row();
        assert_eq!(section.viewport().top_bound(), 2);
        assert_eq!(section.prev_row(), 1);
        assert_eq!(section.viewport().top_bound(), 1);
        assert_eq!(section.prev_row(), 0);
        assert_eq!(section.viewport().top_bound(), 0);
    }

    #[test]
    fn pager_text_counts_fetched_rows() {
        let mut section = pr_section(1);
        assert_eq!(section.pager_text(), "PR 0/0 (fetched 0)");
        let req = section.fetch_next_page().unwrap();
        let mut p = page(prs(1..4), true, "c1");
        p.total_count = 40;
        deliver(&mut section, &req.task.id, p);
        section.next_row();
        assert_eq!(section.pager_text(), "PR 2/40 (fetched 3)");
    }

    #[test]
    fn any_section_exposes_current_row() {
        let mut any = AnySection::new(
            SectionKind::Notification,
            1,
            &SectionConfig::new("Unread", "is:unread"),
            20,
            ListViewport::new(5, 1),
        );
        let req = any.fetch_next_page().unwrap();
        assert_eq!(req.section.kind, SectionKind::Notification);
        let msg = CompletionMessage::ok(
            any.identifier(),
            req.task.id.clone(),
            Payload::Notifications(page(vec![notification("a"), notification("b")], false, "1")),
        );
        assert_eq!(any.update(msg), Reconcile::Applied);
        any.next_row();
        assert_eq!(any.current_row().unwrap().identity(), notification("b").identity());
        assert_eq!(any.num_rows(), 2);
    }
}
