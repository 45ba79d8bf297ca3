// ABOUTME: Agent lifecycle state machine with an explicit transition table.
// ABOUTME: LifecycleTracker holds per-agent state and rejects transitions the table forbids.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Uninitialized,
    Onboarding,
    Idle,
    Busy,
    Error,
    Offline,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Onboarding => "onboarding",
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Error => "error",
            Self::Offline => "offline",
        }
    }

    pub fn can_transition_to(self, next: AgentState) -> bool {
        use AgentState::*;
        if self == next {
            return true;
        }
        match (self, next) {
            (_, Offline) => true,
            (Offline, Error) => false,
            (_, Error) => true,
            (Uninitialized, Onboarding) => true,
            (Onboarding, Idle) => true,
            (Idle, Busy) | (Busy, Idle) => true,
            (Error, Idle) | (Error, Onboarding) => true,
            (Offline, Onboarding) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("agent {agent} cannot move from {from} to {to}")]
    InvalidTransition {
        agent: String,
        from: AgentState,
        to: AgentState,
    },
}

/// Per-agent lifecycle bookkeeping. Unknown agents read as `Uninitialized`.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    states: RwLock<HashMap<String, AgentState>>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, agent_id: &str) -> AgentState {
        self.states
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(agent_id)
            .copied()
            .unwrap_or_default()
    }

    /// Move `agent_id` to `next`, returning the previous state.
    pub fn transition(&self, agent_id: &str, next: AgentState) -> Result<AgentState, LifecycleError> {
        let mut states = self.states.write().unwrap_or_else(|e| e.into_inner());
        let current = states.get(agent_id).copied().unwrap_or_default();
        if !current.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                agent: agent_id.to_string(),
                from: current,
                to: next,
            });
        }
        if current != next {
            states.insert(agent_id.to_string(), next);
            tracing::debug!(agent = %agent_id, from = %current, to = %next, "Agent lifecycle transition");
        }
        Ok(current)
    }

    pub fn snapshot(&self) -> BTreeMap<String, AgentState> {
        self.states
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let tracker = LifecycleTracker::new();
        assert_eq!(tracker.state("Agent-1"), AgentState::Uninitialized);
        tracker.transition("Agent-1", AgentState::Onboarding).unwrap();
        tracker.transition("Agent-1", AgentState::Idle).unwrap();
        tracker.transition("Agent-1", AgentState::Busy).unwrap();
        let prev = tracker.transition("Agent-1", AgentState::Idle).unwrap();
        assert_eq!(prev, AgentState::Busy);
        assert_eq!(tracker.state("Agent-1"), AgentState::Idle);
    }

    #[test]
    fn test_invalid_transition_is_rejected_and_state_kept() {
        let tracker = LifecycleTracker::new();
        let err = tracker.transition("Agent-2", AgentState::Busy).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidTransition {
                agent: "Agent-2".to_string(),
                from: AgentState::Uninitialized,
                to: AgentState::Busy,
            }
        );
        assert_eq!(tracker.state("Agent-2"), AgentState::Uninitialized);
    }

    #[test]
    fn test_error_and_offline_edges() {
        use AgentState::*;
        assert!(Busy.can_transition_to(Error));
        assert!(!Offline.can_transition_to(Error));
        assert!(Error.can_transition_to(Onboarding));
        assert!(Idle.can_transition_to(Offline));
        assert!(Offline.can_transition_to(Onboarding));
        assert!(!Offline.can_transition_to(Idle));
        assert!(!Onboarding.can_transition_to(Busy));
        assert!(Idle.can_transition_to(Idle));
    }

    #[test]
    fn test_snapshot_lists_touched_agents() {
        let tracker = LifecycleTracker::new();
        tracker.transition("Agent-4", AgentState::Offline).unwrap();
        let snap = tracker.snapshot();
        assert_eq!(snap.get("Agent-4"), Some(&AgentState::Offline));
        assert_eq!(snap.len(), 1);
    }
}
