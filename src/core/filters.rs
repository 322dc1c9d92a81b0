use crate::models::{Profile, SwipeMap};
use crate::services::profiles::AgeBounds;

/// The age window an actor's feed queries, clamped to the global bounds.
///
/// Returns `None` when the actor's seeking range is degenerate
/// (`min > max`) or lies entirely outside the global bounds; such an actor
/// simply has no candidates.
#[inline]
pub fn seeking_window(actor: &Profile, bounds: AgeBounds) -> Option<(u8, u8)> {
    if actor.has_degenerate_seeking_range() {
        return None;
    }

    let min = actor.min_seeking_age.max(bounds.min);
    let max = actor.max_seeking_age.min(bounds.max);
    (min <= max).then_some((min, max))
}

/// Whether `candidate` may be shown to `actor`
///
/// Excludes the actor themself, every candidate the actor already swiped
/// (like or dislike), and anyone outside the actor's inclusive seeking range.
#[inline]
pub fn is_browsable(candidate: &Profile, actor: &Profile, swiped: &SwipeMap) -> bool {
    if candidate.uid == actor.uid {
        return false;
    }

    if swiped.contains_key(&candidate.uid) {
        return false;
    }

    actor.seeks_age(candidate.age)
}
