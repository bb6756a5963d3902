//! Schedule repair.
//!
//! A priority-ordered local search: each conflict is cleared by the
//! smallest legal change to its most junior train, then the snapshot is
//! re-checked, until nothing is left or the iteration bound runs out.

mod cancel;
mod config;
mod moves;


use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::constraints::ConstraintRegistry;
use crate::detect::{Conflict, ConflictDetector, ConflictIdentity, ResourceFilter};
use crate::domain::{EventId, TrainId};
use crate::timetable::{EventChange, Timetable};
use crate::topology::TopologyGraph;

pub use cancel::CancelFlag;
pub use config::RepairConfig;
pub use moves::{AppliedMove, Move};

/// Error from schedule repair.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepairError {
    /// A conflict has no legal move, or the iteration bound ran out
    #[error(
        "no feasible repair: {} conflict(s) remain after {iterations} iteration(s)",
        .residual.len()
    )]
    OptimizationInfeasible {
        residual: Vec<Conflict>,
        iterations: usize,
    },

    /// The caller cancelled the repair
    #[error("repair cancelled")]
    Cancelled,
}

/// A conflict-free timetable and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub timetable: Timetable,
    /// Always empty on success.
    pub residual: Vec<Conflict>,
    /// Passes that applied at least one move.
    pub iterations: usize,
    pub moves: Vec<AppliedMove>,
}

/// Repairs timetable snapshots against one topology and constraint set.
#[derive(Debug, Clone)]
pub struct Repairer<'a> {
    topology: &'a TopologyGraph,
    constraints: &'a ConstraintRegistry,
    config: RepairConfig,
    cancel: CancelFlag,
}

impl<'a> Repairer<'a> {
    pub fn new(
        topology: &'a TopologyGraph,
        constraints: &'a ConstraintRegistry,
        config: RepairConfig,
    ) -> Self {
        Self {
            topology,
            constraints,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Check `cancel` before every iteration.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Produce a conflict-free snapshot derived from `timetable`.
    ///
    /// The input is never modified. A snapshot that is already conflict-free
    /// comes back unchanged, version included.
    pub fn repair(&self, timetable: &Timetable) -> Result<RepairOutcome, RepairError> {
        let detector = ConflictDetector::new(self.topology, self.constraints);
        let mut current = timetable.clone();
        let mut moves = Vec::new();

        for iteration in 0..self.config.max_iterations {
            if self.cancel.is_cancelled() {
                return Err(RepairError::Cancelled);
            }

            let conflicts = detector.detect(&current);
            if conflicts.is_empty() {
                return Ok(self.converged(current, iteration, moves));
            }
            debug!(
                iteration,
                conflicts = conflicts.len(),
                version = current.version(),
                "Repair pass"
            );

            let mut unresolved = Vec::new();
            for stale in &conflicts {
                let identity = stale.identity();
                // Earlier moves in this pass may have cleared or reshaped it.
                let scope = ResourceFilter::new().with(&stale.resource);
                let Some(conflict) = detector
                    .detect_in(&current, &scope)
                    .into_iter()
                    .find(|c| c.identity() == identity)
                else {
                    continue;
                };

                match self.resolve(&detector, &current, &conflict) {
                    Some((next, applied)) => {
                        debug!(
                            train = %applied.train,
                            conflict = %conflict,
                            action = ?applied.action,
                            "Applied repair move"
                        );
                        current = next;
                        moves.push(applied);
                    }
                    None => {
                        warn!(conflict = %conflict, "No legal move clears conflict");
                        unresolved.push(identity);
                    }
                }
            }

            if !unresolved.is_empty() {
                let residual = detector.detect(&current);
                if residual.iter().any(|c| unresolved.contains(&c.identity())) {
                    return Err(RepairError::OptimizationInfeasible {
                        residual,
                        iterations: iteration + 1,
                    });
                }
            }
        }

        let residual = detector.detect(&current);
        if residual.is_empty() {
            return Ok(self.converged(current, self.config.max_iterations, moves));
        }
        warn!(
            iterations = self.config.max_iterations,
            residual = residual.len(),
            "Repair did not converge"
        );
        Err(RepairError::OptimizationInfeasible {
            residual,
            iterations: self.config.max_iterations,
        })
    }

    fn converged(
        &self,
        timetable: Timetable,
        iterations: usize,
        moves: Vec<AppliedMove>,
    ) -> RepairOutcome {
        info!(
            iterations,
            moves = moves.len(),
            version = timetable.version(),
            "Repair converged"
        );
        RepairOutcome {
            timetable,
            residual: Vec::new(),
            iterations,
            moves,
        }
    }

    /// Find the first accepted move for `conflict`, trying candidates in
    /// yield order and, per candidate, reassign, shift, then both.
    fn resolve(
        &self,
        detector: &ConflictDetector<'_>,
        current: &Timetable,
        conflict: &Conflict,
    ) -> Option<(Timetable, AppliedMove)> {
        let target = conflict.identity();

        for train in moves::candidates(current, conflict) {
            let group: Vec<EventId> = conflict.events_of(&train).cloned().collect();
            let attempt = self
                .try_reassign(detector, current, conflict, &train, &group, &target)
                .or_else(|| self.try_shift(detector, current, &train, &group, &target))
                .or_else(|| {
                    self.try_reassign_and_shift(detector, current, conflict, &train, &group, &target)
                });

            if let Some((next, action, changes)) = attempt {
                return Some((
                    next,
                    AppliedMove {
                        conflict: target,
                        train,
                        action,
                        changes,
                    },
                ));
            }
        }

        None
    }

    fn try_reassign(
        &self,
        detector: &ConflictDetector<'_>,
        current: &Timetable,
        conflict: &Conflict,
        train: &TrainId,
        group: &[EventId],
        target: &ConflictIdentity,
    ) -> Option<(Timetable, Move, Vec<EventChange>)> {
        for platform in moves::reassign_targets(self.topology, current, conflict, train) {
            let changes = moves::reassign_changes(train, group, &platform);
            let Ok(next) = current.with_changes(self.topology, &changes) else {
                continue;
            };
            if self.accepts(detector, current, &next, train, target) {
                return Some((next, Move::Reassign { platform }, changes));
            }
        }
        None
    }

    fn try_shift(
        &self,
        detector: &ConflictDetector<'_>,
        current: &Timetable,
        train: &TrainId,
        group: &[EventId],
        target: &ConflictIdentity,
    ) -> Option<(Timetable, Move, Vec<EventChange>)> {
        let deltas = moves::shift_deltas(
            self.topology,
            self.constraints,
            current,
            train,
            group,
            self.config.max_shift_candidates,
        );
        for delta in deltas {
            let Some(changes) = moves::shift_changes(self.topology, current, train, group, delta)
            else {
                continue;
            };
            let Ok(next) = current.with_changes(self.topology, &changes) else {
                continue;
            };
            if self.accepts(detector, current, &next, train, target) {
                let action = Move::Shift {
                    delta_sec: delta.num_seconds(),
                };
                return Some((next, action, changes));
            }
        }
        None
    }

    fn try_reassign_and_shift(
        &self,
        detector: &ConflictDetector<'_>,
        current: &Timetable,
        conflict: &Conflict,
        train: &TrainId,
        group: &[EventId],
        target: &ConflictIdentity,
    ) -> Option<(Timetable, Move, Vec<EventChange>)> {
        for platform in moves::reassign_targets(self.topology, current, conflict, train) {
            let reassign = moves::reassign_changes(train, group, &platform);
            let Ok(reassigned) = current.with_changes(self.topology, &reassign) else {
                continue;
            };

            let deltas = moves::shift_deltas(
                self.topology,
                self.constraints,
                &reassigned,
                train,
                group,
                self.config.max_shift_candidates,
            );
            for delta in deltas {
                let Some(shift) =
                    moves::shift_changes(self.topology, &reassigned, train, group, delta)
                else {
                    continue;
                };
                let changes: Vec<EventChange> = reassign.iter().cloned().chain(shift).collect();
                let Ok(next) = current.with_changes(self.topology, &changes) else {
                    continue;
                };
                if self.accepts(detector, current, &next, train, target) {
                    let action = Move::ReassignAndShift {
                        platform: platform.clone(),
                        delta_sec: delta.num_seconds(),
                    };
                    return Some((next, action, changes));
                }
            }
        }
        None
    }

    /// A move is accepted if, on every resource the train touches before or
    /// after it, the target is gone and every conflict left either existed
    /// before or is the target with some of its trains gone.
    fn accepts(
        &self,
        detector: &ConflictDetector<'_>,
        before: &Timetable,
        after: &Timetable,
        train: &TrainId,
        target: &ConflictIdentity,
    ) -> bool {
        let mut scope = ResourceFilter::new();
        for snapshot in [before, after] {
            for resource in moves::resources_of(self.topology, snapshot, train) {
                scope.insert(&resource);
            }
        }

        let known: HashSet<ConflictIdentity> = detector
            .detect_in(before, &scope)
            .iter()
            .map(Conflict::identity)
            .collect();

        detector.detect_in(after, &scope).iter().all(|c| {
            let identity = c.identity();
            &identity != target && (known.contains(&identity) || identity.narrows(target))
        })
    }
}

/// Repair `timetable` under `config`.
pub fn repair_schedule(
    topology: &TopologyGraph,
    constraints: &ConstraintRegistry,
    timetable: &Timetable,
    config: &RepairConfig,
) -> Result<RepairOutcome, RepairError> {
    Repairer::new(topology, constraints, config.clone()).repair(timetable)
}
