use std::ops::Range;

/// A scrolling window over `num_items` rows, each `item_height` lines tall,
/// shown in a viewport `viewport_height` lines tall.
///
/// The selected index and the visible bounds move independently: the bounds
/// only slide when the cursor tries to leave them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListViewport {
    current: usize,
    top_bound: usize,
    bottom_bound: usize,
    item_height: usize,
    viewport_height: usize,
    num_items: usize,
}

impl ListViewport {
    pub fn new(viewport_height: usize, item_height: usize) -> Self {
        let mut viewport = Self {
            current: 0,
            top_bound: 0,
            bottom_bound: 0,
            item_height: item_height.max(1),
            viewport_height,
            num_items: 0,
        };
        viewport.bottom_bound = viewport.max_bottom(0);
        viewport
    }

    /// Rows that fit in the viewport, never less than one.
    pub fn page_size(&self) -> usize {
        (self.viewport_height / self.item_height).max(1)
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn top_bound(&self) -> usize {
        self.top_bound
    }

    pub fn bottom_bound(&self) -> usize {
        self.bottom_bound
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn item_height(&self) -> usize {
        self.item_height
    }

    /// Lines scrolled past in the underlying view.
    pub fn scroll_offset(&self) -> usize {
        self.top_bound * self.item_height
    }

    /// Indices of the rows currently inside the window.
    pub fn visible_range(&self) -> Range<usize> {
        if self.num_items == 0 {
            return 0..0;
        }
        self.top_bound..(self.bottom_bound + 1).min(self.num_items)
    }

    pub fn next(&mut self) -> usize {
        if self.num_items == 0 || self.current + 1 >= self.num_items {
            return self.current;
        }
        if self.current >= self.bottom_bound {
            self.top_bound += 1;
            self.bottom_bound += 1;
        }
        self.current += 1;
        self.current
    }

    pub fn prev(&mut self) -> usize {
        if self.current == 0 {
            return 0;
        }
        if self.current <= self.top_bound {
            self.top_bound = self.top_bound.saturating_sub(1);
            self.bottom_bound = self.bottom_bound.saturating_sub(1);
        }
        self.current -= 1;
        self.current
    }

    pub fn first(&mut self) -> usize {
        self.current = 0;
        self.top_bound = 0;
        self.bottom_bound = self.max_bottom(0);
        self.current
    }

    pub fn last(&mut self) -> usize {
        if self.num_items == 0 {
            return self.first();
        }
        self.current = self.num_items - 1;
        self.bottom_bound = self.current;
        self.top_bound = self.num_items.saturating_sub(self.page_size());
        self.current
    }

    /// Updates the item count and bottom bound. The cursor is left where it
    /// is; callers that shrink the list must call [`clamp`](Self::clamp).
    pub fn set_num_items(&mut self, num_items: usize) {
        self.num_items = num_items;
        if self.top_bound >= num_items {
            self.top_bound = 0;
        }
        self.bottom_bound = self.max_bottom(self.top_bound);
    }

    pub fn set_viewport_height(&mut self, viewport_height: usize) {
        self.viewport_height = viewport_height;
        self.bottom_bound = self.max_bottom(self.top_bound);
        self.follow_cursor();
    }

    /// Pulls the cursor back inside `0..num_items` and the window back
    /// around the cursor.
    pub fn clamp(&mut self) {
        if self.current >= self.num_items {
            self.current = self.num_items.saturating_sub(1);
        }
        self.follow_cursor();
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.top_bound = 0;
        self.bottom_bound = self.max_bottom(0);
    }

    fn follow_cursor(&mut self) {
        if self.num_items == 0 {
            self.top_bound = 0;
            self.bottom_bound = 0;
            return;
        }
        if self.current < self.top_bound {
            self.top_bound = self.current;
        } else if self.current > self.bottom_bound {
            self.top_bound = (self.current + 1).saturating_sub(self.page_size());
        }
        self.bottom_bound = self.max_bottom(self.top_bound);
    }

    fn max_bottom(&self, top: usize) -> usize {
        (top + self.page_size() - 1).min(self.num_items.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(items: usize, page: usize) -> ListViewport {
        let mut v = ListViewport::new(page, 1);
        v.set_num_items(items);
        v
    }

    #[test]
    fn bottom_bound_is_page_size_when_enough_items() {
        let v = viewport(10, 3);
        assert_eq!(v.top_bound(), 0);
        assert_eq!(v.bottom_bound(), 2);
        assert_eq!(v.visible_range(), 0..3);
    }

    #[test]
    fn bottom_bound_shrinks_to_item_count() {
        let v = viewport(2, 5);
        assert_eq!(v.bottom_bound(), 1);
        assert_eq!(v.visible_range(), 0..2);
    }

    #[test]
    fn page_size_accounts_for_item_height() {
        let mut v = ListViewport::new(7, 2);
        v.set_num_items(10);
        assert_eq!(v.page_size(), 3);
        assert_eq!(v.bottom_bound(), 2);
    }

    #[test]
    fn next_slides_window_at_bottom_bound() {
        let mut v = viewport(5, 3);
        v.next();
        v.next();
        assert_eq!(v.current(), 2);
        assert_eq!(v.top_bound(), 0);

        v.next();
        assert_eq!(v.current(), 3);
        assert_eq!(v.top_bound(), 1);
        assert_eq!(v.bottom_bound(), 3);
        assert_eq!(v.scroll_offset(), 1);
    }

    #[test]
    fn next_is_noop_at_last_item() {
        let mut v = viewport(5, 3);
        v.last();
        let before = v.clone();
        assert_eq!(v.next(), 4);
        assert_eq!(v, before);
    }

    #[test]
    fn prev_from_last_slides_only_when_crossing_top_bound() {
        let mut v = viewport(5, 3);
        v.last();
        assert_eq!(v.top_bound(), 2);

        v.prev();
        v.prev();
        assert_eq!(v.current(), 2);
        assert_eq!(v.top_bound(), 2);

        v.prev();
        assert_eq!(v.current(), 1);
        assert_eq!(v.top_bound(), 1);
        assert_eq!(v.bottom_bound(), 3);

        v.prev();
        assert_eq!(v.current(), 0);
        assert_eq!(v.top_bound(), 0);
    }

    #[test]
    fn prev_clamps_at_zero() {
        let mut v = viewport(3, 3);
        assert_eq!(v.prev(), 0);
        assert_eq!(v.top_bound(), 0);
    }

    #[test]
    fn first_and_last_snap_window() {
        let mut v = viewport(10, 4);
        v.last();
        assert_eq!(v.current(), 9);
        assert_eq!(v.visible_range(), 6..10);
        v.first();
        assert_eq!(v.current(), 0);
        assert_eq!(v.visible_range(), 0..4);
        assert_eq!(v.scroll_offset(), 0);
    }

    #[test]
    fn set_num_items_keeps_cursor_and_top_bound() {
        let mut v = viewport(5, 3);
        v.last();
        v.set_num_items(10);
        assert_eq!(v.current(), 4);
        assert_eq!(v.top_bound(), 2);
        assert_eq!(v.bottom_bound(), 4);
        v.next();
        assert_eq!(v.current(), 5);
        assert_eq!(v.top_bound(), 3);
    }

    #[test]
    fn clamp_after_shrink_keeps_cursor_in_range() {
        let mut v = viewport(10, 3);
        v.last();
        v.set_num_items(4);
        v.clamp();
        assert_eq!(v.current(), 3);
        assert!(v.top_bound() <= v.current() && v.current() <= v.bottom_bound());
    }

    #[test]
    fn empty_viewport_stays_at_zero() {
        let mut v = viewport(0, 3);
        assert_eq!(v.next(), 0);
        assert_eq!(v.last(), 0);
        assert_eq!(v.visible_range(), 0..0);
    }

    #[test]
    fn shrinking_viewport_follows_cursor() {
        let mut v = viewport(10, 6);
        for _ in 0..5 {
            v.next();
        }
        v.set_viewport_height(2);
        assert_eq!(v.current(), 5);
        assert!(v.top_bound() <= 5 && 5 <= v.bottom_bound());
        assert_eq!(v.bottom_bound() - v.top_bound() + 1, 2);
    }
}
