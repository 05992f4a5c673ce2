use crate::models::TranscriptSegment;

/// Map playback time to the active transcript line.
///
/// First segment whose window contains `t` wins. When nothing matches (a gap
/// between lines, before the first line, after the last) the previous index
/// is kept so the highlight does not snap back to line 0 during silence.
pub fn resolve_active(
    segments: &[TranscriptSegment],
    t: f64,
    previous: Option<usize>,
) -> Option<usize> {
    match segments
        .iter()
        .position(|s| t >= s.start_time && t < s.end_time)
    {
        Some(i) => Some(i),
        None => previous.filter(|&i| i < segments.len()),
    }
}

/// Active index after the transcript sequence itself is replaced: the match
/// for the current position if one exists (seek-driven load), otherwise the
/// first line. An empty sequence has no active line.
pub fn reset_active(segments: &[TranscriptSegment], t: f64) -> Option<usize> {
    if segments.is_empty() {
        return None;
    }
    Some(
        segments
            .iter()
            .position(|s| t >= s.start_time && t < s.end_time)
            .unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment {
            id: id.into(),
            episode_id: "ep001".into(),
            order: 0,
            text: String::new(),
            speaker: None,
            start_time: start,
            end_time: end,
        }
    }

    fn three() -> Vec<TranscriptSegment> {
        vec![seg("a", 0.0, 5.0), seg("b", 5.0, 10.0), seg("c", 12.0, 15.0)]
    }

    #[test]
    fn picks_containing_interval() {
        let s = three();
        assert_eq!(resolve_active(&s, 0.0, None), Some(0));
        assert_eq!(resolve_active(&s, 4.99, None), Some(0));
        assert_eq!(resolve_active(&s, 5.0, None), Some(1));
        assert_eq!(resolve_active(&s, 12.0, Some(1)), Some(2));
    }

    #[test]
    fn gap_retains_previous_index() {
        let s = three();
        // t=11 falls in the 10..12 gap: stay on index 1 until 12 is reached
        assert_eq!(resolve_active(&s, 11.0, Some(1)), Some(1));
        assert_eq!(resolve_active(&s, 12.0, Some(1)), Some(2));
    }

    #[test]
    fn before_first_and_after_last_retain() {
        let s = three();
        assert_eq!(resolve_active(&s, 20.0, Some(2)), Some(2));
        assert_eq!(resolve_active(&s, 20.0, None), None);
    }

    #[test]
    fn stale_previous_from_longer_sequence_is_dropped() {
        let s = three();
        assert_eq!(resolve_active(&s, 11.0, Some(9)), None);
    }

    #[test]
    fn empty_sequence_has_no_active_line() {
        assert_eq!(resolve_active(&[], 3.0, Some(0)), None);
        assert_eq!(reset_active(&[], 3.0), None);
    }

    #[test]
    fn replacement_resets_to_match_or_zero() {
        let s = three();
        assert_eq!(reset_active(&s, 7.0), Some(1));
        assert_eq!(reset_active(&s, 11.0), Some(0));
    }
}
