use crate::transcript::TranscriptLayout;

/// Fraction of the active segment's rows that must be inside the viewport
/// before manual mode hands control back to auto-follow.
pub const VISIBLE_THRESHOLD: f32 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowMode {
    /// Viewport recenters on the active segment whenever it changes.
    Auto,
    /// The user scrolled; the viewport stays where they put it.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Up,
    Down,
}

/// Keeps the active transcript line visible without fighting the user.
///
/// `Manual` is entered only through `user_scroll`, so programmatic
/// recentering can never mistake itself for the user.
#[derive(Debug)]
pub struct ScrollFollow {
    pub mode: FollowMode,
    pub offset: usize,
}

impl ScrollFollow {
    pub fn new() -> Self {
        ScrollFollow {
            mode: FollowMode::Auto,
            offset: 0,
        }
    }

    /// The active segment changed while following: keep it centered.
    pub fn active_changed(&mut self, layout: &TranscriptLayout, height: usize, active: usize) {
        if self.mode == FollowMode::Auto {
            self.center(layout, height, active);
        }
    }

    /// User-originated scroll (keys or wheel). Enters manual mode.
    pub fn user_scroll(&mut self, delta: isize, layout: &TranscriptLayout, height: usize) {
        self.mode = FollowMode::Manual;
        let max = layout.max_offset(height) as isize;
        self.offset = (self.offset as isize + delta).clamp(0, max) as usize;
    }

    /// Hand control back to auto once the user has scrolled the active line
    /// back into view themselves. Called once per time update.
    pub fn observe(&mut self, layout: &TranscriptLayout, height: usize, active: Option<usize>) {
        if self.mode != FollowMode::Manual {
            return;
        }
        if let Some(i) = active {
            if layout.visibility(i, self.offset, height) >= VISIBLE_THRESHOLD {
                self.mode = FollowMode::Auto;
            }
        }
    }

    /// The explicit "return to active" transition: recenter and resume
    /// following. Recentering on a line the layout does not know about is a
    /// no-op, but the mode still resets.
    pub fn return_to_active(&mut self, layout: &TranscriptLayout, height: usize, active: Option<usize>) {
        if let Some(i) = active {
            self.center(layout, height, i);
        }
        self.mode = FollowMode::Auto;
    }

    /// Direction of the active line relative to the viewport while the user
    /// is browsing elsewhere; drives the jump-back badge.
    pub fn hint(&self, layout: &TranscriptLayout, height: usize, active: Option<usize>) -> Option<Hint> {
        if self.mode != FollowMode::Manual {
            return None;
        }
        let seg = layout.segment(active?)?;
        if layout.visibility(active?, self.offset, height) >= VISIBLE_THRESHOLD {
            return None;
        }
        if seg.start < self.offset {
            Some(Hint::Up)
        } else {
            Some(Hint::Down)
        }
    }

    /// Re-clamp after a resize or transcript replacement.
    pub fn clamp_to(&mut self, layout: &TranscriptLayout, height: usize) {
        self.offset = self.offset.min(layout.max_offset(height));
    }

    fn center(&mut self, layout: &TranscriptLayout, height: usize, i: usize) {
        let Some(seg) = layout.segment(i) else {
            return;
        };
        let mid = seg.start + seg.rows / 2;
        self.offset = mid
            .saturating_sub(height / 2)
            .min(layout.max_offset(height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptLayout;

    // 20 one-row segments, viewport of 10 rows
    fn layout() -> TranscriptLayout {
        TranscriptLayout::from_rows(&[1; 20])
    }

    #[test]
    fn auto_recenters_on_active_change() {
        let l = layout();
        let mut f = ScrollFollow::new();
        f.active_changed(&l, 10, 15);
        assert_eq!(f.mode, FollowMode::Auto);
        assert_eq!(f.offset, 10); // row 15 centered in a 10-row viewport
    }

    #[test]
    fn user_scroll_enters_manual_and_pins_offset() {
        let l = layout();
        let mut f = ScrollFollow::new();
        f.user_scroll(3, &l, 10);
        assert_eq!(f.mode, FollowMode::Manual);
        let pinned = f.offset;
        // active moves while manual: viewport must not follow
        f.active_changed(&l, 10, 18);
        assert_eq!(f.offset, pinned);
    }

    #[test]
    fn manual_returns_to_auto_when_active_back_in_view() {
        let l = layout();
        let mut f = ScrollFollow::new();
        // segment 3 active and visible; user scrolls far away
        f.user_scroll(10, &l, 10);
        f.observe(&l, 10, Some(3));
        assert_eq!(f.mode, FollowMode::Manual);
        // user scrolls back until segment 3 is fully visible again
        f.user_scroll(-10, &l, 10);
        f.observe(&l, 10, Some(3));
        assert_eq!(f.mode, FollowMode::Auto);
    }

    #[test]
    fn hint_points_at_active_segment() {
        let l = layout();
        let mut f = ScrollFollow::new();
        f.user_scroll(10, &l, 10); // viewport now rows 10..20
        assert_eq!(f.hint(&l, 10, Some(3)), Some(Hint::Up));
        f.user_scroll(-10, &l, 10); // back to rows 0..10
        f.mode = FollowMode::Manual;
        assert_eq!(f.hint(&l, 10, Some(15)), Some(Hint::Down));
        assert_eq!(f.hint(&l, 10, Some(5)), None); // visible: no badge
    }

    #[test]
    fn return_to_active_is_idempotent() {
        let l = layout();
        let mut f = ScrollFollow::new();
        f.user_scroll(10, &l, 10);
        f.return_to_active(&l, 10, Some(3));
        let (mode1, off1) = (f.mode, f.offset);
        f.return_to_active(&l, 10, Some(3));
        assert_eq!(mode1, FollowMode::Auto);
        assert_eq!((f.mode, f.offset), (mode1, off1));
        assert!(f.hint(&l, 10, Some(3)).is_none());
    }

    #[test]
    fn recenter_on_unknown_segment_does_not_move_or_panic() {
        let l = layout();
        let mut f = ScrollFollow::new();
        f.user_scroll(5, &l, 10);
        let pinned = f.offset;
        f.return_to_active(&l, 10, Some(99));
        assert_eq!(f.offset, pinned);
        assert_eq!(f.mode, FollowMode::Auto);
    }
}
