//! Scenario coverage for the transcript/audio synchronization contract:
//! resolver retention across gaps, seek/skip clamping, scroll-follow
//! handover, and the selection-vs-tap guard.

use ratatui::layout::Rect;

use lingopod::follow::{FollowMode, ScrollFollow};
use lingopod::models::TranscriptSegment;
use lingopod::player::{clamp_seek, skip_target};
use lingopod::sync::resolve_active;
use lingopod::transcript::{TranscriptLayout, click_target};

fn seg(id: &str, start: f64, end: f64) -> TranscriptSegment {
    TranscriptSegment {
        id: id.into(),
        episode_id: "ep001".into(),
        order: 0,
        text: "one line of speech".into(),
        speaker: None,
        start_time: start,
        end_time: end,
    }
}

#[test]
fn gap_playback_keeps_the_last_active_line() {
    let segments = vec![seg("a", 0.0, 5.0), seg("b", 5.0, 10.0), seg("c", 12.0, 15.0)];

    // walk the clock the way the player reports it
    let mut active = None;
    for t in [0.0, 2.5, 5.0, 9.9, 10.5, 11.0, 11.9] {
        active = resolve_active(&segments, t, active);
    }
    // inside the 10..12 gap the highlight must hold on line 1, not reset
    assert_eq!(active, Some(1));

    active = resolve_active(&segments, 12.0, active);
    assert_eq!(active, Some(2));
}

#[test]
fn seek_outside_bounds_clamps_to_nearest_edge() {
    assert_eq!(clamp_seek(-10.0, 300.0), 0.0);
    assert_eq!(clamp_seek(301.0, 300.0), 300.0);
}

#[test]
fn skip_is_seek_of_clamped_sum() {
    for (current, delta) in [(0.0, -5.0), (10.0, 5.0), (298.0, 5.0), (3.0, -5.0)] {
        let via_skip = skip_target(current, delta, Some(300.0)).unwrap();
        let via_seek = clamp_seek(current + delta, 300.0);
        assert_eq!(via_skip, via_seek);
    }
}

#[test]
fn skip_before_metadata_known_changes_nothing() {
    // duration 0 (unset) and skip(-5): guarded no-op
    assert_eq!(skip_target(10.0, -5.0, Some(0.0)), None);
    assert_eq!(skip_target(10.0, -5.0, None), None);
}

#[test]
fn manual_scroll_hands_back_to_auto_at_eighty_percent_visibility() {
    // 20 single-row lines, 10-row viewport, line 3 active and visible
    let layout = TranscriptLayout::from_rows(&[1; 20]);
    let mut follow = ScrollFollow::new();
    follow.active_changed(&layout, 10, 3);
    assert_eq!(follow.mode, FollowMode::Auto);

    // the user scrolls: instant transition to manual
    follow.user_scroll(8, &layout, 10);
    assert_eq!(follow.mode, FollowMode::Manual);
    follow.observe(&layout, 10, Some(3));
    assert_eq!(follow.mode, FollowMode::Manual);

    // scrolling back until line 3 is in view flips it back automatically
    follow.user_scroll(-8, &layout, 10);
    follow.observe(&layout, 10, Some(3));
    assert_eq!(follow.mode, FollowMode::Auto);
}

#[test]
fn partial_visibility_below_threshold_stays_manual() {
    // active segment is 5 rows tall; only 2 rows (40%) inside the viewport
    let layout = TranscriptLayout::from_rows(&[5, 5, 5, 5]);
    let mut follow = ScrollFollow::new();
    follow.user_scroll(3, &layout, 10); // viewport rows 3..13
    follow.observe(&layout, 10, Some(0)); // segment 0 spans rows 0..5
    assert_eq!(follow.mode, FollowMode::Manual);
}

#[test]
fn return_to_active_twice_stays_auto_and_visible() {
    let layout = TranscriptLayout::from_rows(&[1; 20]);
    let mut follow = ScrollFollow::new();
    follow.user_scroll(9, &layout, 10);

    follow.return_to_active(&layout, 10, Some(2));
    assert_eq!(follow.mode, FollowMode::Auto);
    let offset = follow.offset;
    assert!(layout.visibility(2, follow.offset, 10) >= 0.8);

    follow.return_to_active(&layout, 10, Some(2));
    assert_eq!(follow.mode, FollowMode::Auto);
    assert_eq!(follow.offset, offset);
}

#[test]
fn click_with_selection_drag_does_not_activate() {
    let layout = TranscriptLayout::from_rows(&[1; 10]);
    let area = Rect::new(0, 0, 40, 12);
    // press and release on different cells: the user selected text
    assert_eq!(click_target((4, 3), (12, 3), area, &layout, 0), None);
    // a true tap on the same cell activates the line under it
    assert_eq!(click_target((4, 3), (4, 3), area, &layout, 0), Some(2));
}

#[test]
fn transcript_replacement_resets_to_current_position() {
    let first = vec![seg("a", 0.0, 5.0), seg("b", 5.0, 10.0)];
    let mut active = resolve_active(&first, 7.0, None);
    assert_eq!(active, Some(1));

    // navigating to another episode swaps the sequence
    let second = vec![seg("x", 0.0, 30.0), seg("y", 30.0, 60.0), seg("z", 60.0, 90.0)];
    active = lingopod::sync::reset_active(&second, 42.0);
    assert_eq!(active, Some(1));
    active = lingopod::sync::reset_active(&second, 95.0);
    assert_eq!(active, Some(0));
}
