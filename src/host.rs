//! Owns every section of every view and routes completions to them.

use std::collections::HashMap;

use crate::cache::LookupCache;
use crate::config::{Config, ViewKind};
use crate::message::{CompletionMessage, FetchRequest, Payload, Reconcile};
use crate::section::AnySection;
use crate::types::{RowRef, SectionKind};
use crate::viewport::ListViewport;

/// Id of the search section in every view.
pub const SEARCH_SECTION_ID: usize = 0;

pub struct SectionHost {
    config: Config,
    view: ViewKind,
    /// Sections of the active view; index == section id
    sections: Vec<AnySection>,
    /// Sections of views that are not on screen, kept so their
    /// in-flight completions still land
    parked: HashMap<ViewKind, Vec<AnySection>>,
    focused_section_id: usize,
    cache: LookupCache,
    viewport_height: usize,
}

impl SectionHost {
    pub fn new(config: Config, view: ViewKind, cache: LookupCache) -> Self {
        let mut host = Self {
            config,
            view,
            sections: Vec::new(),
            parked: HashMap::new(),
            focused_section_id: 0,
            cache,
            viewport_height: 0,
        };
        host.sections = host.build_sections(view);
        host.focused_section_id = if host.sections.len() > 1 { 1 } else { SEARCH_SECTION_ID };
        host
    }

    fn build_sections(&self, view: ViewKind) -> Vec<AnySection> {
        let kind = view.section_kind();
        let limit = self.config.limit_for(kind);
        let item_height = self.config.defaults.item_height;
        std::iter::once(self.config.search_section(view))
            .chain(self.config.sections_for(view))
            .enumerate()
            .map(|(id, cfg)| {
                AnySection::new(kind, id, &cfg, limit, ListViewport::new(self.viewport_height, item_height))
            })
            .collect()
    }

    pub fn view(&self) -> ViewKind {
        self.view
    }

    pub fn sections(&self) -> &[AnySection] {
        &self.sections
    }

    pub fn section(&self, id: usize) -> Option<&AnySection> {
        self.sections.iter().find(|s| s.id() == id)
    }

    pub fn focused_section_id(&self) -> usize {
        self.focused_section_id
    }

    pub fn current_section(&self) -> Option<&AnySection> {
        self.section(self.focused_section_id)
    }

    fn current_section_mut(&mut self) -> Option<&mut AnySection> {
        let id = self.focused_section_id;
        self.sections.iter_mut().find(|s| s.id() == id)
    }

    pub fn current_row(&self) -> Option<RowRef<'_>> {
        self.current_section()?.current_row()
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LookupCache {
        &mut self.cache
    }

    /// First-page requests for every section of the active view. The search
    /// section is skipped while it has nothing to search for.
    pub fn fetch_all(&mut self) -> Vec<FetchRequest> {
        self.sections
            .iter_mut()
            .filter(|s| s.id() != SEARCH_SECTION_ID || !s.filters().is_empty())
            .filter_map(AnySection::refresh)
            .collect()
    }

    /// Drops cached lookups and reloads the active view from scratch.
    pub fn refresh_all(&mut self) -> Vec<FetchRequest> {
        self.cache.clear();
        self.fetch_all()
    }

    pub fn refresh_current(&mut self) -> Option<FetchRequest> {
        self.current_section_mut()?.refresh()
    }

    pub fn set_current_filters(&mut self, filters: impl Into<String>) -> Option<FetchRequest> {
        self.current_section_mut()?.set_filters(filters)
    }

    /// Delivers a completion to the section it names, in the active view
    /// or a parked one.
    pub fn route(&mut self, msg: CompletionMessage) -> Reconcile {
        let msg = match msg.outcome {
            Ok(Payload::Labels { repo, labels }) => {
                self.cache.labels.insert(&repo, labels);
                return Reconcile::Applied;
            }
            Ok(Payload::Users { repo, users }) => {
                self.cache.users.insert(&repo, users);
                return Reconcile::Applied;
            }
            Ok(Payload::None) => return Reconcile::Applied,
            outcome => CompletionMessage { outcome, ..msg },
        };

        let target = msg.section;
        let view = ViewKind::for_kind(target.kind);
        let sections = if view == self.view {
            &mut self.sections
        } else if let Some(parked) = self.parked.get_mut(&view) {
            parked
        } else {
            tracing::debug!(task_id = %msg.task_id, ?target, "no view for completion");
            return Reconcile::Unrouted;
        };

        // A thread can show up in several notification sections at once
        if target.kind == SectionKind::Notification && matches!(msg.outcome, Ok(Payload::NotificationUpdated(_))) {
            let mut outcome = Reconcile::IdentityNotFound;
            for section in sections.iter_mut() {
                if section.update(msg.clone()) == Reconcile::Applied {
                    outcome = Reconcile::Applied;
                }
            }
            return outcome;
        }

        match sections.iter_mut().find(|s| s.identifier() == target) {
            Some(section) => section.update(msg),
            None => {
                tracing::debug!(task_id = %msg.task_id, ?target, "no section for completion");
                Reconcile::Unrouted
            }
        }
    }

    /// Replaces the active view's sections, parking the current ones.
    /// Returns the fetches needed when the new view is built fresh.
    pub fn switch_view(&mut self, view: ViewKind) -> Vec<FetchRequest> {
        if view == self.view {
            return Vec::new();
        }
        let (restored, fresh) = match self.parked.remove(&view) {
            Some(sections) => (sections, false),
            None => (self.build_sections(view), true),
        };
        let previous = std::mem::replace(&mut self.sections, restored);
        self.parked.insert(self.view, previous);
        self.view = view;

        for section in &mut self.sections {
            section.set_viewport_height(self.viewport_height);
        }
        let requests = if fresh { self.fetch_all() } else { Vec::new() };

        self.focused_section_id = self
            .sections
            .iter()
            .find(|s| s.id() != SEARCH_SECTION_ID && s.num_rows() > 0)
            .map(AnySection::id)
            .unwrap_or(SEARCH_SECTION_ID);
        requests
    }

    pub fn next_section(&mut self) {
        if !self.sections.is_empty() {
            self.focused_section_id = (self.focused_section_id + 1) % self.sections.len();
        }
    }

    pub fn prev_section(&mut self) {
        if !self.sections.is_empty() {
            let len = self.sections.len();
            self.focused_section_id = (self.focused_section_id + len - 1) % len;
        }
    }

    pub fn focus_section(&mut self, id: usize) -> bool {
        if self.section(id).is_some() {
            self.focused_section_id = id;
            true
        } else {
            false
        }
    }

    /// Moves down one row and asks for more once the cursor reaches the
    /// last loaded row. Branches are listed in full, so they never page.
    pub fn next_row(&mut self) -> Option<FetchRequest> {
        let section = self.current_section_mut()?;
        let before = section.viewport().current();
        let after = section.next_row();
        if after != before {
            Self::fetch_more_if_at_end(section)
        } else {
            None
        }
    }

    pub fn prev_row(&mut self) {
        if let Some(section) = self.current_section_mut() {
            section.prev_row();
        }
    }

    pub fn first_row(&mut self) {
        if let Some(section) = self.current_section_mut() {
            section.first_row();
        }
    }

    pub fn last_row(&mut self) -> Option<FetchRequest> {
        let section = self.current_section_mut()?;
        let was_last = section.is_on_last_row();
        section.last_row();
        if was_last {
            None
        } else {
            Self::fetch_more_if_at_end(section)
        }
    }

    fn fetch_more_if_at_end(section: &mut AnySection) -> Option<FetchRequest> {
        if section.kind() == SectionKind::Branch || !section.is_on_last_row() {
            return None;
        }
        section.fetch_next_page()
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height;
        for section in self.sections.iter_mut().chain(self.parked.values_mut().flatten()) {
            section.set_viewport_height(height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SectionIdentifier;
    use crate::patch::{NotificationPatch, PrPatch};
    use crate::types::fixtures::*;
    use crate::types::{Label, PrState, RowData};

    fn host(view: ViewKind) -> SectionHost {
        let mut host = SectionHost::new(Config::parse("").unwrap(), view, LookupCache::new());
        host.set_viewport_height(3);
        host
    }

    fn pr_page_msg(req: &FetchRequest, numbers: std::ops::Range<u64>, more: bool) -> CompletionMessage {
        let rows = numbers.map(|n| pr("o/r", n)).collect();
        CompletionMessage::ok(req.section, req.task.id.clone(), Payload::Prs(page(rows, more, "c")))
    }

    #[test]
    fn search_section_sits_at_index_zero() {
        let host = host(ViewKind::Prs);
        assert_eq!(host.sections()[0].id(), SEARCH_SECTION_ID);
        assert_eq!(host.sections()[0].title(), "Search");
        assert_eq!(host.sections()[1].title(), "My Pull Requests");
        assert_eq!(host.focused_section_id(), 1);
    }

    #[test]
    fn fetch_all_skips_empty_search() {
        let mut notifications = host(ViewKind::Notifications);
        let ids: Vec<usize> = notifications.fetch_all().iter().map(|r| r.section.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let mut prs = host(ViewKind::Prs);
        assert_eq!(prs.fetch_all().len(), 4);
    }

    #[test]
    fn route_applies_page_to_named_section() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        let req = reqs.iter().find(|r| r.section.id == 2).unwrap();
        assert_eq!(host.route(pr_page_msg(req, 1..4, true)), Reconcile::Applied);
        assert_eq!(host.section(2).unwrap().num_rows(), 3);
        assert_eq!(host.section(1).unwrap().num_rows(), 0);
    }

    #[test]
    fn route_to_unknown_section_is_unrouted() {
        let mut host = host(ViewKind::Prs);
        let msg = CompletionMessage::ok(
            SectionIdentifier {
                id: 42,
                kind: SectionKind::Pr,
            },
            "pr_close_1",
            Payload::PrUpdated(PrPatch::new("o/r", 1)),
        );
        assert_eq!(host.route(msg), Reconcile::Unrouted);

        let msg = CompletionMessage::ok(
            SectionIdentifier {
                id: 1,
                kind: SectionKind::Issue,
            },
            "issue_close_1",
            Payload::None,
        );
        assert_eq!(host.route(msg), Reconcile::Applied);
    }

    #[test]
    fn current_row_follows_focus_and_cursor() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        host.route(pr_page_msg(&reqs[1], 1..4, false));
        assert_eq!(host.current_row().unwrap().number(), Some(1));
        host.next_row();
        assert_eq!(host.current_row().unwrap().number(), Some(2));
        host.next_section();
        assert!(host.current_row().is_none());
    }

    #[test]
    fn moving_onto_last_row_fetches_next_page() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        host.route(pr_page_msg(&reqs[1], 1..4, true));

        assert!(host.next_row().is_none());
        let req = host.next_row().unwrap();
        assert_eq!(req.section.id, 1);
        assert!(req.page_info.is_some());

        // Staying on the last row does not ask again
        assert!(host.next_row().is_none());
    }

    #[test]
    fn jumping_to_last_row_fetches_once() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        host.route(pr_page_msg(&reqs[1], 1..6, true));
        assert!(host.last_row().is_some());
        assert!(host.last_row().is_none());
    }

    #[test]
    fn last_page_stops_fetching_more() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        host.route(pr_page_msg(&reqs[1], 1..3, false));
        assert!(host.next_row().is_none());
        assert!(host.current_section().unwrap().is_on_last_row());
    }

    #[test]
    fn switch_view_parks_and_restores_sections() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        host.route(pr_page_msg(&reqs[2], 1..3, true));

        let fresh = host.switch_view(ViewKind::Issues);
        assert_eq!(host.view(), ViewKind::Issues);
        assert_eq!(fresh.len(), 4);
        assert!(fresh.iter().all(|r| r.section.kind == SectionKind::Issue));
        // Nothing loaded yet, focus falls back to the search section
        assert_eq!(host.focused_section_id(), SEARCH_SECTION_ID);

        let back = host.switch_view(ViewKind::Prs);
        assert!(back.is_empty());
        assert_eq!(host.section(2).unwrap().num_rows(), 2);
        assert_eq!(host.focused_section_id(), 2);
    }

    #[test]
    fn completion_for_parked_view_still_lands() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        host.switch_view(ViewKind::Notifications);

        assert_eq!(host.route(pr_page_msg(&reqs[1], 1..3, true)), Reconcile::Applied);
        host.switch_view(ViewKind::Prs);
        assert_eq!(host.section(1).unwrap().num_rows(), 2);
        assert_eq!(host.focused_section_id(), 1);
    }

    #[test]
    fn switching_to_same_view_is_noop() {
        let mut host = host(ViewKind::Prs);
        host.next_section();
        assert!(host.switch_view(ViewKind::Prs).is_empty());
        assert_eq!(host.focused_section_id(), 2);
    }

    #[test]
    fn lookup_payloads_fill_cache() {
        let mut host = host(ViewKind::Issues);
        let id = SectionIdentifier {
            id: 1,
            kind: SectionKind::Issue,
        };
        let labels = vec![Label {
            name: "bug".to_string(),
            color: "d73a4a".to_string(),
        }];
        host.route(CompletionMessage::ok(
            id,
            "labels_o/r",
            Payload::Labels {
                repo: "o/r".to_string(),
                labels: labels.clone(),
            },
        ));
        host.route(CompletionMessage::ok(
            id,
            "users_o/r",
            Payload::Users {
                repo: "o/r".to_string(),
                users: vec!["me".to_string()],
            },
        ));
        assert_eq!(host.cache().labels.get("o/r"), Some(&labels));
        assert!(host.cache().users.contains("o/r"));

        host.refresh_all();
        assert!(!host.cache().labels.contains("o/r"));
    }

    #[test]
    fn notification_patch_reaches_every_section() {
        let mut host = host(ViewKind::Notifications);
        let reqs = host.fetch_all();
        for req in &reqs {
            let rows = vec![notification("n1"), notification("n2")];
            host.route(CompletionMessage::ok(
                req.section,
                req.task.id.clone(),
                Payload::Notifications(page(rows, false, "1")),
            ));
        }
        let patch = NotificationPatch {
            id: "n2".to_string(),
            done: Some(true),
            ..Default::default()
        };
        let outcome = host.route(CompletionMessage::ok(
            reqs[0].section,
            "notification_done_n2",
            Payload::NotificationUpdated(patch),
        ));
        assert_eq!(outcome, Reconcile::Applied);
        for id in [1, 2] {
            let section = host.section(id).unwrap();
            match section.row(1).unwrap() {
                RowRef::Notification(n) => assert!(n.done),
                other => panic!("unexpected row {:?}", other),
            }
        }
    }

    #[test]
    fn patch_targets_only_named_section() {
        let mut host = host(ViewKind::Prs);
        let reqs = host.fetch_all();
        host.route(pr_page_msg(&reqs[1], 1..3, true));
        host.route(pr_page_msg(&reqs[2], 1..3, true));

        let patch = PrPatch {
            is_merged: Some(true),
            ..PrPatch::new("o/r", 1)
        };
        host.route(CompletionMessage::ok(reqs[1].section, "merge_1", Payload::PrUpdated(patch)));

        let state = |host: &SectionHost, id| match host.section(id).unwrap().row(0).unwrap() {
            RowRef::Pr(p) => p.state,
            other => panic!("unexpected row {:?}", other),
        };
        assert_eq!(state(&host, 1), PrState::Merged);
        assert_eq!(state(&host, 2), PrState::Open);
    }

    #[test]
    fn set_current_filters_refetches_focused_section() {
        let mut host = host(ViewKind::Prs);
        let req = host.set_current_filters("is:open label:bug").unwrap();
        assert_eq!(req.section.id, 1);
        assert_eq!(req.filters, "is:open label:bug");
        assert_eq!(host.current_section().unwrap().filters(), "is:open label:bug");
    }

    #[test]
    fn section_focus_wraps_around() {
        let mut host = host(ViewKind::Notifications);
        host.next_section();
        host.next_section();
        assert_eq!(host.focused_section_id(), 0);
        host.prev_section();
        assert_eq!(host.focused_section_id(), 2);
        assert!(!host.focus_section(9));
    }
}
