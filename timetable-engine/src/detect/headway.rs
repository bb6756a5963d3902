//! Headway check: minimum gap between successive segment entries.

use crate::constraints::ConstraintRegistry;
use crate::domain::TimeWindow;
use crate::timetable::Traversal;

use super::conflict::{Conflict, ConflictKind, Resource};
use super::segment::{by_segment, event_refs};

/// Report consecutive entries onto a headway-ruled segment that are too close.
///
/// The window runs from the second entry until the first entry plus the gap.
pub(super) fn violations(constraints: &ConstraintRegistry, traversals: &[&Traversal]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for (segment_id, mut list) in by_segment(traversals) {
        let Some(gap) = constraints.headway(segment_id) else {
            continue;
        };
        list.sort_by(|a, b| (a.entry(), &a.train).cmp(&(b.entry(), &b.train)));

        for pair in list.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if first.train == second.train {
                continue;
            }
            let clear_at = first.entry() + gap;
            if second.entry() >= clear_at {
                continue;
            }
            let window = TimeWindow::starting_at(
                second.entry(),
                clear_at.signed_duration_since(second.entry()),
            );
            conflicts.push(Conflict::new(
                ConflictKind::HeadwayViolation,
                Resource::segment(segment_id),
                event_refs(first)
                    .into_iter()
                    .chain(event_refs(second))
                    .collect(),
                window,
            ));
        }
    }

    conflicts
}
