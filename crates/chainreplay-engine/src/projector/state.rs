use std::collections::HashMap;

use chainreplay_types::ProjectedType;

/// Outcome of applying a projected event to its entity's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    Ok,
    /// Transition attempted out of a terminal state: two outcomes racing
    /// for the same entity (e.g. a second `completed`).
    Conflict,
    /// Transition not present in the table.
    Violation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Discovered,
    Claimed,
    Disputed,
    Completed,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Discovered => "discovered",
            TaskState::Claimed => "claimed",
            TaskState::Disputed => "disputed",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    fn accepts(current: Option<TaskState>, target: TaskState) -> TransitionCheck {
        match (current, target) {
            (None, TaskState::Discovered) => TransitionCheck::Ok,
            (None, _) => TransitionCheck::Violation,
            (Some(state), _) if state.is_terminal() => TransitionCheck::Conflict,
            (Some(TaskState::Discovered), TaskState::Claimed | TaskState::Failed) => {
                TransitionCheck::Ok
            }
            (
                Some(TaskState::Claimed),
                TaskState::Completed | TaskState::Failed | TaskState::Disputed,
            ) => TransitionCheck::Ok,
            (Some(TaskState::Disputed), TaskState::Completed | TaskState::Failed) => {
                TransitionCheck::Ok
            }
            _ => TransitionCheck::Violation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisputeState {
    Open,
    Resolved,
    Cancelled,
    Expired,
}

impl DisputeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeState::Open => "open",
            DisputeState::Resolved => "resolved",
            DisputeState::Cancelled => "cancelled",
            DisputeState::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DisputeState::Open)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeculationState {
    Started,
    Confirmed,
    Aborted,
}

impl SpeculationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeculationState::Started => "started",
            SpeculationState::Confirmed => "confirmed",
            SpeculationState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SpeculationState::Started)
    }
}

/// Result of one `apply` call: the legality verdict plus the state labels
/// recorded in incident transitions.
#[derive(Debug, Clone)]
pub struct AppliedTransition {
    pub check: TransitionCheck,
    pub from: Option<&'static str>,
    pub to: &'static str,
}

/// The three independent lifecycle machines, tracked per entity.
///
/// Lenient projection records the observed chain reality: the state advances
/// to the target even when the transition is illegal, so later events are
/// judged against what actually happened on chain.
#[derive(Default)]
pub struct LifecycleTracker {
    tasks: HashMap<String, TaskState>,
    disputes: HashMap<String, DisputeState>,
    speculations: HashMap<String, SpeculationState>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a projected event to the machine it belongs to. Returns `None`
    /// for types outside any machine (the `protocol:*` family).
    pub fn apply(
        &mut self,
        event_type: &ProjectedType,
        entity_id: &str,
    ) -> Option<AppliedTransition> {
        match event_type {
            ProjectedType::Discovered => Some(self.apply_task(entity_id, TaskState::Discovered)),
            ProjectedType::Claimed => Some(self.apply_task(entity_id, TaskState::Claimed)),
            ProjectedType::Completed => Some(self.apply_task(entity_id, TaskState::Completed)),
            ProjectedType::Failed => Some(self.apply_task(entity_id, TaskState::Failed)),
            ProjectedType::Disputed => Some(self.apply_task(entity_id, TaskState::Disputed)),
            ProjectedType::DisputeInitiated => Some(self.apply_dispute_open(entity_id)),
            ProjectedType::DisputeVoteCast => Some(self.apply_dispute_vote(entity_id)),
            ProjectedType::DisputeResolved => {
                Some(self.apply_dispute_close(entity_id, DisputeState::Resolved))
            }
            ProjectedType::DisputeCancelled => {
                Some(self.apply_dispute_close(entity_id, DisputeState::Cancelled))
            }
            ProjectedType::DisputeExpired => {
                Some(self.apply_dispute_close(entity_id, DisputeState::Expired))
            }
            ProjectedType::SpeculationStarted => {
                Some(self.apply_speculation(entity_id, SpeculationState::Started))
            }
            ProjectedType::SpeculationConfirmed => {
                Some(self.apply_speculation(entity_id, SpeculationState::Confirmed))
            }
            ProjectedType::SpeculationAborted => {
                Some(self.apply_speculation(entity_id, SpeculationState::Aborted))
            }
            ProjectedType::Protocol(_) => None,
        }
    }

    /// Check whether a task currently permits the parallel `disputed`
    /// projection, without mutating state.
    pub fn task_permits_dispute(&self, task_id: &str) -> TransitionCheck {
        TaskState::accepts(self.tasks.get(task_id).copied(), TaskState::Disputed)
    }

    fn apply_task(&mut self, task_id: &str, target: TaskState) -> AppliedTransition {
        let current = self.tasks.get(task_id).copied();
        let check = TaskState::accepts(current, target);
        self.tasks.insert(task_id.to_string(), target);
        AppliedTransition {
            check,
            from: current.map(|s| s.as_str()),
            to: target.as_str(),
        }
    }

    fn apply_dispute_open(&mut self, dispute_id: &str) -> AppliedTransition {
        let current = self.disputes.get(dispute_id).copied();
        let check = match current {
            None => TransitionCheck::Ok,
            Some(state) if state.is_terminal() => TransitionCheck::Conflict,
            // Re-initiating an open dispute
            Some(_) => TransitionCheck::Violation,
        };
        self.disputes
            .insert(dispute_id.to_string(), DisputeState::Open);
        AppliedTransition {
            check,
            from: current.map(|s| s.as_str()),
            to: DisputeState::Open.as_str(),
        }
    }

    fn apply_dispute_vote(&mut self, dispute_id: &str) -> AppliedTransition {
        let current = self.disputes.get(dispute_id).copied();
        let check = match current {
            Some(DisputeState::Open) => TransitionCheck::Ok,
            Some(state) if state.is_terminal() => TransitionCheck::Conflict,
            _ => TransitionCheck::Violation,
        };
        // Votes do not change dispute state.
        AppliedTransition {
            check,
            from: current.map(|s| s.as_str()),
            to: "vote_cast",
        }
    }

    fn apply_dispute_close(
        &mut self,
        dispute_id: &str,
        target: DisputeState,
    ) -> AppliedTransition {
        let current = self.disputes.get(dispute_id).copied();
        let check = match current {
            Some(DisputeState::Open) => TransitionCheck::Ok,
            Some(state) if state.is_terminal() => TransitionCheck::Conflict,
            _ => TransitionCheck::Violation,
        };
        self.disputes.insert(dispute_id.to_string(), target);
        AppliedTransition {
            check,
            from: current.map(|s| s.as_str()),
            to: target.as_str(),
        }
    }

    fn apply_speculation(
        &mut self,
        task_id: &str,
        target: SpeculationState,
    ) -> AppliedTransition {
        let current = self.speculations.get(task_id).copied();
        let check = match (current, target) {
            (None, SpeculationState::Started) => TransitionCheck::Ok,
            (None, _) => TransitionCheck::Violation,
            (Some(state), _) if state.is_terminal() => TransitionCheck::Conflict,
            (Some(SpeculationState::Started), SpeculationState::Confirmed)
            | (Some(SpeculationState::Started), SpeculationState::Aborted) => TransitionCheck::Ok,
            _ => TransitionCheck::Violation,
        };
        self.speculations.insert(task_id.to_string(), target);
        AppliedTransition {
            check,
            from: current.map(|s| s.as_str()),
            to: target.as_str(),
        }
    }

    /// True when every tracked entity reached a terminal state.
    pub fn all_terminal(&self) -> bool {
        self.tasks.values().all(|s| s.is_terminal())
            && self.disputes.values().all(|s| s.is_terminal())
            && self.speculations.values().all(|s| s.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_task_lifecycle() {
        let mut tracker = LifecycleTracker::new();
        for event_type in [
            ProjectedType::Discovered,
            ProjectedType::Claimed,
            ProjectedType::Completed,
        ] {
            let applied = tracker.apply(&event_type, "t1").unwrap();
            assert_eq!(applied.check, TransitionCheck::Ok, "{:?}", event_type);
        }
    }

    #[test]
    fn test_completion_without_claim_is_violation() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply(&ProjectedType::Discovered, "t1").unwrap();
        let applied = tracker.apply(&ProjectedType::Completed, "t1").unwrap();
        assert_eq!(applied.check, TransitionCheck::Violation);
    }

    #[test]
    fn test_double_completion_is_conflict() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply(&ProjectedType::Discovered, "t1").unwrap();
        tracker.apply(&ProjectedType::Claimed, "t1").unwrap();
        tracker.apply(&ProjectedType::Completed, "t1").unwrap();
        let applied = tracker.apply(&ProjectedType::Completed, "t1").unwrap();
        assert_eq!(applied.check, TransitionCheck::Conflict);
    }

    #[test]
    fn test_dispute_votes_keep_dispute_open() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply(&ProjectedType::DisputeInitiated, "d1").unwrap();
        for _ in 0..3 {
            let applied = tracker.apply(&ProjectedType::DisputeVoteCast, "d1").unwrap();
            assert_eq!(applied.check, TransitionCheck::Ok);
        }
        let applied = tracker.apply(&ProjectedType::DisputeResolved, "d1").unwrap();
        assert_eq!(applied.check, TransitionCheck::Ok);
    }

    #[test]
    fn test_vote_without_dispute_is_violation() {
        let mut tracker = LifecycleTracker::new();
        let applied = tracker.apply(&ProjectedType::DisputeVoteCast, "d1").unwrap();
        assert_eq!(applied.check, TransitionCheck::Violation);
    }

    #[test]
    fn test_speculation_abort_after_confirm_is_conflict() {
        let mut tracker = LifecycleTracker::new();
        tracker
            .apply(&ProjectedType::SpeculationStarted, "t2")
            .unwrap();
        tracker
            .apply(&ProjectedType::SpeculationConfirmed, "t2")
            .unwrap();
        let applied = tracker
            .apply(&ProjectedType::SpeculationAborted, "t2")
            .unwrap();
        assert_eq!(applied.check, TransitionCheck::Conflict);
    }

    #[test]
    fn test_dispute_permission_gate() {
        let mut tracker = LifecycleTracker::new();
        tracker.apply(&ProjectedType::Discovered, "t1").unwrap();
        tracker.apply(&ProjectedType::Claimed, "t1").unwrap();
        assert_eq!(tracker.task_permits_dispute("t1"), TransitionCheck::Ok);

        tracker.apply(&ProjectedType::Completed, "t1").unwrap();
        assert_eq!(
            tracker.task_permits_dispute("t1"),
            TransitionCheck::Conflict
        );
    }

    #[test]
    fn test_protocol_events_have_no_machine() {
        let mut tracker = LifecycleTracker::new();
        assert!(tracker
            .apply(&ProjectedType::protocol("state_updated"), "state")
            .is_none());
    }
}
