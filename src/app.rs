use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;

use crate::action::{Action, MutationIntent};
use crate::cache::LookupCache;
use crate::config::{Config, ViewKind};
use crate::event::Event;
use crate::fetcher::Fetcher;
use crate::host::SectionHost;
use crate::message::{CompletionMessage, FetchRequest, Payload, Reconcile};
use crate::mutation::{self, CommandRunner, Mutation, MutationRequest};
use crate::store::DoneStore;
use crate::task::{Task, TaskRegistry};
use crate::types::{MergeMethod, RowData, RowRef, SectionKind};

/// How long a finished task stays in the footer.
const TASK_CLEAR_DELAY: Duration = Duration::from_secs(2);

/// Lines taken by everything around the section table: view tabs, section
/// tabs, table borders and header, footer.
const CHROME_HEIGHT: u16 = 6;

/// Text prompts, each collecting the argument of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Comment,
    Label,
    Assign,
    Unassign,
    CreatePr,
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self {
            Prompt::Comment => "Comment",
            Prompt::Label => "Labels (comma separated)",
            Prompt::Assign => "Assign users",
            Prompt::Unassign => "Unassign users",
            Prompt::CreatePr => "Pull request title",
        }
    }

    fn into_mutation(self, input: &str) -> Mutation {
        match self {
            Prompt::Comment => Mutation::Comment(input.trim().to_string()),
            Prompt::Label => Mutation::Label(split_list(input)),
            Prompt::Assign => Mutation::Assign(split_list(input)),
            Prompt::Unassign => Mutation::Unassign(split_list(input)),
            Prompt::CreatePr => Mutation::CreatePr {
                title: input.trim().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Normal,
    /// Editing the focused section's filter
    Search,
    Prompt(Prompt),
    Confirm(Box<MutationRequest>),
    SelectMerge { selected: usize },
}

pub struct App {
    pub host: SectionHost,
    pub tasks: TaskRegistry,
    pub mode: Mode,
    pub input: String,
    /// Most recent error, shown until dismissed
    pub banner: Option<String>,
    pub sidebar_open: bool,
    pub user: Option<String>,
    pub ticks: u64,
    pub should_quit: bool,
    fetcher: Arc<dyn Fetcher>,
    runner: Arc<dyn CommandRunner>,
    done: Arc<DoneStore>,
    action_tx: mpsc::UnboundedSender<Action>,
    refetch_interval: Option<Duration>,
    last_refresh: Instant,
}

impl App {
    pub fn new(
        config: Config,
        view: ViewKind,
        fetcher: Arc<dyn Fetcher>,
        runner: Arc<dyn CommandRunner>,
        done: Arc<DoneStore>,
        action_tx: mpsc::UnboundedSender<Action>,
    ) -> Self {
        let minutes = config.defaults.refetch_interval_minutes;
        let sidebar_open = config.defaults.preview_open;
        Self {
            host: SectionHost::new(config, view, LookupCache::new()),
            tasks: TaskRegistry::new(),
            mode: Mode::Normal,
            input: String::new(),
            banner: None,
            sidebar_open,
            user: None,
            ticks: 0,
            should_quit: false,
            fetcher,
            runner,
            done,
            action_tx,
            refetch_interval: (minutes > 0).then(|| Duration::from_secs(minutes * 60)),
            last_refresh: Instant::now(),
        }
    }

    pub fn handle_event(&self, event: Event) -> Action {
        match event {
            Event::Init => Action::RefreshAll,
            Event::Tick | Event::FocusGained => Action::Tick,
            Event::Resize(_, rows) => Action::Resize(rows),
            Event::Key(key) => self.handle_key(key),
            Event::Render => Action::None,
        }
    }

    fn handle_key(&self, key: KeyEvent) -> Action {
        match &self.mode {
            Mode::Search | Mode::Prompt(_) => match key.code {
                KeyCode::Esc => Action::InputCancel,
                KeyCode::Enter => Action::InputConfirm,
                KeyCode::Backspace => Action::InputBackspace,
                KeyCode::Char(c) => Action::InputChar(c),
                _ => Action::None,
            },
            Mode::Confirm(_) => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Action::ConfirmYes,
                KeyCode::Char('n') | KeyCode::Esc => Action::ConfirmNo,
                _ => Action::None,
            },
            Mode::SelectMerge { .. } => match key.code {
                KeyCode::Char('j') | KeyCode::Down => Action::PopupDown,
                KeyCode::Char('k') | KeyCode::Up => Action::PopupUp,
                KeyCode::Enter => Action::PopupSelect,
                KeyCode::Esc | KeyCode::Char('q') => Action::ConfirmNo,
                _ => Action::None,
            },
            Mode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Esc => Action::DismissBanner,
            KeyCode::Char('j') | KeyCode::Down => Action::NextRow,
            KeyCode::Char('k') | KeyCode::Up => Action::PrevRow,
            KeyCode::Char('g') | KeyCode::Home => Action::FirstRow,
            KeyCode::Char('G') | KeyCode::End => Action::LastRow,
            KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => Action::NextSection,
            KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => Action::PrevSection,
            KeyCode::Char('s') => Action::SwitchView,
            KeyCode::Char('/') => Action::EnterSearchMode,
            KeyCode::Char('r') => Action::Refresh,
            KeyCode::Char('R') => Action::RefreshAll,
            KeyCode::Char('o') => Action::OpenInBrowser,
            KeyCode::Char('y') => Action::YankUrl,
            KeyCode::Char('O') => Action::OpenSearchInBrowser,
            KeyCode::Char('p') => Action::ToggleSidebar,
            KeyCode::Char(c @ '0'..='9') => Action::FocusSection(c as usize - '0' as usize),
            KeyCode::Char(c) => mutation_key(self.host.view().section_kind(), c)
                .map(Action::Mutate)
                .unwrap_or(Action::None),
            _ => Action::None,
        }
    }

    pub fn update(&mut self, action: Action) {
        match action {
            Action::Quit => {
                self.should_quit = true;
            }

            // Navigation
            Action::NextRow => {
                if let Some(req) = self.host.next_row() {
                    self.spawn_fetch(req);
                }
            }
            Action::PrevRow => self.host.prev_row(),
            Action::FirstRow => self.host.first_row(),
            Action::LastRow => {
                if let Some(req) = self.host.last_row() {
                    self.spawn_fetch(req);
                }
            }
            Action::NextSection => self.host.next_section(),
            Action::PrevSection => self.host.prev_section(),
            Action::FocusSection(id) => {
                if !self.host.focus_section(id) {
                    tracing::debug!(id, "no such section");
                }
            }
            Action::SwitchView => {
                let next = self.host.view().next();
                for req in self.host.switch_view(next) {
                    self.spawn_fetch(req);
                }
            }
            Action::Resize(rows) => {
                self.host
                    .set_viewport_height(rows.saturating_sub(CHROME_HEIGHT) as usize);
            }

            // Fetching
            Action::Refresh => {
                // Labels and assignees of the row's repo may have changed too
                if let Some(repo) = self.host.current_row().map(|row| row.repo_name_with_owner().to_string()) {
                    self.host.cache_mut().clear_for(&repo);
                }
                if let Some(req) = self.host.refresh_current() {
                    self.spawn_fetch(req);
                }
            }
            Action::RefreshAll => self.refresh_all(),
            Action::Tick => {
                self.ticks = self.ticks.wrapping_add(1);
                if self
                    .refetch_interval
                    .is_some_and(|interval| self.last_refresh.elapsed() >= interval)
                {
                    tracing::debug!("periodic refresh");
                    self.refresh_all();
                }
            }

            // Polish
            Action::ToggleSidebar => {
                self.sidebar_open = !self.sidebar_open;
            }
            Action::OpenInBrowser => {
                if let Some(url) = self.host.current_row().map(|row| row.url()) {
                    if let Err(e) = open::that(&url) {
                        self.banner = Some(format!("Failed to open {}: {}", url, e));
                    }
                }
            }
            Action::YankUrl => {
                if let Some(url) = self.host.current_row().map(|row| row.url()) {
                    let copied = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(url));
                    if let Err(e) = copied {
                        self.banner = Some(format!("Failed to copy url: {}", e));
                    }
                }
            }
            Action::OpenSearchInBrowser => {
                if let Some(section) = self.host.current_section() {
                    let repo = self.host.current_row().map(|row| row.repo_name_with_owner().to_string());
                    let url = search_url(section.kind(), section.filters(), repo.as_deref());
                    if let Err(e) = open::that(&url) {
                        self.banner = Some(format!("Failed to open {}: {}", url, e));
                    }
                }
            }
            Action::DismissBanner => {
                self.banner = None;
            }

            // Search and prompt input
            Action::EnterSearchMode => {
                self.input = self
                    .host
                    .current_section()
                    .map(|s| s.filters().to_string())
                    .unwrap_or_default();
                self.mode = Mode::Search;
            }
            Action::InputChar(c) => self.input.push(c),
            Action::InputBackspace => {
                self.input.pop();
            }
            Action::InputCancel => {
                self.mode = Mode::Normal;
                self.input.clear();
            }
            Action::InputConfirm => {
                let input = std::mem::take(&mut self.input);
                match std::mem::replace(&mut self.mode, Mode::Normal) {
                    Mode::Search => {
                        if let Some(req) = self.host.set_current_filters(input.trim()) {
                            self.spawn_fetch(req);
                        }
                    }
                    Mode::Prompt(prompt) => self.submit(prompt.into_mutation(&input)),
                    _ => {}
                }
            }

            // Mutations
            Action::Mutate(intent) => self.begin_mutation(intent),
            Action::ConfirmYes => {
                if let Mode::Confirm(request) = std::mem::replace(&mut self.mode, Mode::Normal) {
                    self.spawn_mutation(*request);
                }
            }
            Action::ConfirmNo => {
                self.mode = Mode::Normal;
            }
            Action::PopupUp | Action::PopupDown => {
                if let Mode::SelectMerge { selected } = &mut self.mode {
                    let len = MergeMethod::ALL.len();
                    *selected = if matches!(action, Action::PopupDown) {
                        (*selected + 1) % len
                    } else {
                        (*selected + len - 1) % len
                    };
                }
            }
            Action::PopupSelect => {
                if let Mode::SelectMerge { selected } = self.mode {
                    self.mode = Mode::Normal;
                    let method = MergeMethod::ALL[selected % MergeMethod::ALL.len()];
                    if let Some(request) = self.request(Mutation::Merge(method)) {
                        self.mode = Mode::Confirm(Box::new(request));
                    }
                }
            }

            // Background work
            Action::TaskFinished(msg) => self.on_task_finished(msg),
            Action::ClearTask { id, finished_time } => {
                self.tasks.clear(&id, finished_time);
            }
            Action::UserLoaded(user) => {
                self.user = Some(user);
            }

            Action::Error(msg) => {
                tracing::warn!(error = %msg, "action failed");
                self.banner = Some(msg);
            }
            Action::None => {}
        }
    }

    fn refresh_all(&mut self) {
        self.last_refresh = Instant::now();
        if self.user.is_none() {
            self.spawn_load_user();
        }
        for req in self.host.refresh_all() {
            self.spawn_fetch(req);
        }
    }

    fn on_task_finished(&mut self, msg: CompletionMessage) {
        let error = msg.error().map(str::to_string);
        if self.tasks.finish(&msg.task_id, error.clone()) {
            if let Some(finished_time) = self.tasks.get(&msg.task_id).and_then(|t| t.finished_time) {
                self.schedule_clear(msg.task_id.clone(), finished_time);
            }
        }
        if let Some(error) = error {
            self.banner = Some(error);
        }

        let task_id = msg.task_id.clone();
        match self.host.route(msg) {
            Reconcile::Applied | Reconcile::Failed => {}
            outcome => tracing::debug!(task = %task_id, ?outcome, "completion not applied"),
        }
    }

    /// Validates `mutation` against the focused row, reporting problems in
    /// the banner.
    fn request(&mut self, mutation: Mutation) -> Option<MutationRequest> {
        let section = self.host.current_section()?.identifier();
        let row = self.host.current_row()?;
        match MutationRequest::new(section, row, mutation, self.host.cache()) {
            Ok(request) => Some(request),
            Err(e) => {
                self.update(Action::from(e));
                None
            }
        }
    }

    fn begin_mutation(&mut self, intent: MutationIntent) {
        let Some(row) = self.host.current_row() else {
            return;
        };
        let repo = row.repo_name_with_owner().to_string();

        let prompt = match intent {
            MutationIntent::Comment => Some((Prompt::Comment, String::new())),
            MutationIntent::Label => {
                let current = match row {
                    RowRef::Pr(pr) => pr.labels.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", "),
                    RowRef::Issue(issue) => issue.labels.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", "),
                    _ => String::new(),
                };
                Some((Prompt::Label, current))
            }
            MutationIntent::Assign => Some((Prompt::Assign, String::new())),
            MutationIntent::Unassign => Some((Prompt::Unassign, String::new())),
            MutationIntent::CreatePr => {
                let subject = match row {
                    RowRef::Branch(branch) => branch.subject.clone(),
                    _ => String::new(),
                };
                Some((Prompt::CreatePr, subject))
            }
            _ => None,
        };

        if let Some((prompt, prefill)) = prompt {
            match prompt {
                Prompt::Label => self.spawn_lookup(LookupKind::Labels, repo),
                Prompt::Assign | Prompt::Unassign => self.spawn_lookup(LookupKind::Users, repo),
                _ => {}
            }
            self.input = prefill;
            self.mode = Mode::Prompt(prompt);
            return;
        }

        let mutation = match intent {
            MutationIntent::Merge => {
                // Validate before offering the method choice
                if self.request(Mutation::Merge(MergeMethod::Merge)).is_some() {
                    self.mode = Mode::SelectMerge { selected: 0 };
                }
                return;
            }
            MutationIntent::Close => Mutation::Close,
            MutationIntent::Reopen => Mutation::Reopen,
            MutationIntent::Ready => Mutation::Ready,
            MutationIntent::UpdateBranch => Mutation::UpdateBranch,
            MutationIntent::MarkDone => Mutation::MarkDone,
            MutationIntent::MarkRead => Mutation::MarkRead,
            MutationIntent::Push => Mutation::Push,
            _ => return,
        };
        self.submit(mutation);
    }

    fn submit(&mut self, mutation: Mutation) {
        let Some(request) = self.request(mutation) else {
            return;
        };
        if request.mutation.needs_confirmation() {
            self.mode = Mode::Confirm(Box::new(request));
        } else {
            self.spawn_mutation(request);
        }
    }

    /// Names the prompt can offer for the focused row's repository.
    pub fn prompt_candidates(&self) -> Vec<String> {
        let Some(repo) = self.host.current_row().map(|row| row.repo_name_with_owner().to_string()) else {
            return Vec::new();
        };
        let cache = self.host.cache();
        match self.mode {
            Mode::Prompt(Prompt::Label) => cache
                .labels
                .get(&repo)
                .map(|labels| labels.iter().map(|l| l.name.clone()).collect())
                .unwrap_or_default(),
            Mode::Prompt(Prompt::Assign) | Mode::Prompt(Prompt::Unassign) => {
                cache.users.get(&repo).cloned().unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }

    fn schedule_clear(&self, id: String, finished_time: DateTime<Utc>) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TASK_CLEAR_DELAY).await;
            tx.send(Action::ClearTask { id, finished_time }).ok();
        });
    }

    fn spawn_load_user(&self) {
        let tx = self.action_tx.clone();
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            match fetcher.current_user().await {
                Ok(user) => {
                    tx.send(Action::UserLoaded(user)).ok();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "could not load current user");
                }
            }
        });
    }

    fn spawn_fetch(&mut self, req: FetchRequest) {
        self.tasks.start(req.section.id, req.task.clone());
        let tx = self.action_tx.clone();
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            let msg = fetch_page(fetcher.as_ref(), req).await;
            tx.send(Action::TaskFinished(msg)).ok();
        });
    }

    fn spawn_lookup(&mut self, kind: LookupKind, repo: String) {
        if repo.is_empty() {
            return;
        }
        let cache = self.host.cache();
        let cached = match kind {
            LookupKind::Labels => cache.labels.contains(&repo),
            LookupKind::Users => cache.users.contains(&repo),
        };
        let id = format!("{}_{}", kind.prefix(), repo);
        if cached || self.tasks.is_running(&id) {
            return;
        }
        let Some(section) = self.host.current_section().map(|s| s.identifier()) else {
            return;
        };

        let task = Task::new(
            id.clone(),
            format!("Fetching {} for {}", kind.prefix(), repo),
            format!("Fetched {} for {}", kind.prefix(), repo),
        );
        self.tasks.start(section.id, task);

        let tx = self.action_tx.clone();
        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            let payload = match kind {
                LookupKind::Labels => fetcher
                    .fetch_repo_labels(&repo)
                    .await
                    .map(|labels| Payload::Labels { repo, labels }),
                LookupKind::Users => fetcher
                    .fetch_repo_users(&repo)
                    .await
                    .map(|users| Payload::Users { repo, users }),
            };
            let msg = match payload {
                Ok(payload) => CompletionMessage::ok(section, id, payload),
                Err(e) => CompletionMessage::failed(section, id, e.to_string()),
            };
            tx.send(Action::TaskFinished(msg)).ok();
        });
    }

    fn spawn_mutation(&mut self, request: MutationRequest) {
        self.tasks.start(request.section.id, request.task());
        let tx = self.action_tx.clone();
        let runner = Arc::clone(&self.runner);
        let done = Arc::clone(&self.done);
        let user = self.user.clone();
        tokio::spawn(async move {
            let done_thread = request.done_thread().map(|(id, at)| (id.to_string(), at));
            let msg = mutation::execute(runner.as_ref(), request, user.as_deref()).await;
            if msg.outcome.is_ok() {
                if let Some((id, updated_at)) = done_thread {
                    let thread = id.clone();
                    let saved = tokio::task::spawn_blocking(move || done.mark_done(&id, updated_at)).await;
                    match saved {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::warn!(error = %e, id = %thread, "could not persist done notification"),
                        Err(e) => tracing::warn!(error = %e, id = %thread, "done notification save panicked"),
                    }
                }
            }
            tx.send(Action::TaskFinished(msg)).ok();
        });
    }
}

#[derive(Debug, Clone, Copy)]
enum LookupKind {
    Labels,
    Users,
}

impl LookupKind {
    fn prefix(&self) -> &'static str {
        match self {
            LookupKind::Labels => "labels",
            LookupKind::Users => "users",
        }
    }
}

/// Runs one page fetch and packs the result for the section that asked.
pub async fn fetch_page(fetcher: &dyn Fetcher, req: FetchRequest) -> CompletionMessage {
    let FetchRequest {
        section,
        task,
        filters,
        limit,
        page_info,
    } = req;
    let page_info = page_info.as_ref();
    let payload = match section.kind {
        SectionKind::Pr => fetcher.fetch_prs(&filters, limit, page_info).await.map(Payload::Prs),
        SectionKind::Issue => fetcher.fetch_issues(&filters, limit, page_info).await.map(Payload::Issues),
        SectionKind::Notification => fetcher
            .fetch_notifications(&filters, limit, page_info)
            .await
            .map(Payload::Notifications),
        SectionKind::Branch => fetcher.fetch_branches(&filters).await.map(Payload::Branches),
    };
    match payload {
        Ok(payload) => CompletionMessage::ok(section, task.id, payload),
        Err(e) => CompletionMessage::failed(section, task.id, e.to_string()),
    }
}

/// Row action keys, which differ per kind of row.
fn mutation_key(kind: SectionKind, key: char) -> Option<MutationIntent> {
    let intent = match (kind, key) {
        (SectionKind::Pr | SectionKind::Issue, 'x') => MutationIntent::Close,
        (SectionKind::Pr | SectionKind::Issue, 'X') => MutationIntent::Reopen,
        (SectionKind::Pr | SectionKind::Issue, 'c') => MutationIntent::Comment,
        (SectionKind::Pr | SectionKind::Issue, 'L') => MutationIntent::Label,
        (SectionKind::Pr | SectionKind::Issue, 'a') => MutationIntent::Assign,
        (SectionKind::Pr | SectionKind::Issue, 'A') => MutationIntent::Unassign,
        (SectionKind::Pr, 'W') => MutationIntent::Ready,
        (SectionKind::Pr, 'm') => MutationIntent::Merge,
        (SectionKind::Pr, 'u') => MutationIntent::UpdateBranch,
        (SectionKind::Notification, 'D') => MutationIntent::MarkDone,
        (SectionKind::Notification, 'M') => MutationIntent::MarkRead,
        (SectionKind::Branch, 'P') => MutationIntent::Push,
        (SectionKind::Branch, 'N') => MutationIntent::CreatePr,
        _ => return None,
    };
    Some(intent)
}

/// Splits `a, b @c` into names, dropping a leading `@`.
fn split_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|s| s.trim().trim_start_matches('@'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The github.com page showing the same search as a section.
fn search_url(kind: SectionKind, filters: &str, repo: Option<&str>) -> String {
    match kind {
        SectionKind::Pr => format!(
            "https://github.com/pulls?q={}",
            urlencoding::encode(format!("is:pr {}", filters).trim())
        ),
        SectionKind::Issue => format!(
            "https://github.com/issues?q={}",
            urlencoding::encode(format!("is:issue {}", filters).trim())
        ),
        SectionKind::Notification => format!("https://github.com/notifications?query={}", urlencoding::encode(filters)),
        SectionKind::Branch => match repo.filter(|r| !r.is_empty()) {
            Some(repo) => format!("https://github.com/{}/branches", repo),
            None => "https://github.com".to_string(),
        },
    }
}
