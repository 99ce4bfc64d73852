//! Activation state machine definition

use std::fmt;

/// Lifecycle of one activation attempt.
///
/// PENDING and PROCESSING are non-terminal; SUCCESS and FAILED are terminal
/// and absorb: no transition ever leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum ActivationState {
    Pending = 1,
    Processing = 2,
    Success = 3,
    Failed = 4,
}

impl ActivationState {
    /// Numeric ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(ActivationState::Pending),
            2 => Some(ActivationState::Processing),
            3 => Some(ActivationState::Success),
            4 => Some(ActivationState::Failed),
            _ => None,
        }
    }

    /// Wire/cache representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationState::Pending => "PENDING",
            ActivationState::Processing => "PROCESSING",
            ActivationState::Success => "SUCCESS",
            ActivationState::Failed => "FAILED",
        }
    }

    /// SUCCESS and FAILED absorb
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActivationState::Success | ActivationState::Failed)
    }

    /// Legal transitions of the state machine
    pub fn can_transition_to(&self, next: ActivationState) -> bool {
        matches!(
            (self, next),
            (ActivationState::Pending, ActivationState::Processing)
                | (ActivationState::Processing, ActivationState::Success)
                | (ActivationState::Processing, ActivationState::Failed)
                | (ActivationState::Pending, ActivationState::Failed)
        )
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_id_roundtrip() {
        for state in [
            ActivationState::Pending,
            ActivationState::Processing,
            ActivationState::Success,
            ActivationState::Failed,
        ] {
            assert_eq!(ActivationState::from_id(state.id()), Some(state));
        }
        assert_eq!(ActivationState::from_id(0), None);
        assert_eq!(ActivationState::from_id(5), None);
    }

    #[test]
    fn test_terminal_states_absorb() {
        assert!(!ActivationState::Pending.is_terminal());
        assert!(!ActivationState::Processing.is_terminal());
        assert!(ActivationState::Success.is_terminal());
        assert!(ActivationState::Failed.is_terminal());

        for next in [
            ActivationState::Pending,
            ActivationState::Processing,
            ActivationState::Success,
            ActivationState::Failed,
        ] {
            assert!(!ActivationState::Success.can_transition_to(next));
            assert!(!ActivationState::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_legal_transitions() {
        assert!(ActivationState::Pending.can_transition_to(ActivationState::Processing));
        assert!(ActivationState::Processing.can_transition_to(ActivationState::Success));
        assert!(ActivationState::Processing.can_transition_to(ActivationState::Failed));
        // abandoned before claim
        assert!(ActivationState::Pending.can_transition_to(ActivationState::Failed));

        assert!(!ActivationState::Pending.can_transition_to(ActivationState::Success));
        assert!(!ActivationState::Processing.can_transition_to(ActivationState::Pending));
    }

    #[test]
    fn test_wire_representation() {
        assert_eq!(ActivationState::Pending.as_str(), "PENDING");
        assert_eq!(ActivationState::Failed.to_string(), "FAILED");
    }
}
