use crate::ReasonCode;

/// The phase of the shutdown sequence.
///
/// The sequence only ever moves forward: `Idle` → `ShuttingDown` → `Exited`.
/// `ForceExit` is a transient phase reachable from `ShuttingDown` when an
/// interrupt arrives for a second time; it is immediately followed by
/// `Exited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// No shutdown trigger has been received yet.
    Idle,

    /// Cleanup handlers are running on behalf of the `origin` trigger.
    ShuttingDown {
        /// The code of the trigger that started the shutdown.
        origin: ReasonCode,
    },

    /// A repeated interrupt is bypassing the remaining cleanup.
    ForceExit {
        /// The code the process is about to exit with.
        code: ReasonCode,
    },

    /// The exit code is fixed and the exit report has been emitted.
    Exited {
        /// The code the process exited with.
        code: ReasonCode,
    },
}

impl ShutdownState {
    /// Reports whether a shutdown trigger has been received.
    pub fn has_begun(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Reports the exit code, once fixed.
    pub fn exit_code(&self) -> Option<ReasonCode> {
        match self {
            Self::Exited { code } => Some(*code),
            _ => None,
        }
    }
}

/// A snapshot of the two monotonically increasing handler counters.
///
/// `completed` never exceeds `registered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownProgress {
    /// How many cleanup handlers were registered.
    pub registered: usize,

    /// How many cleanup handlers settled (successfully or not).
    pub completed: usize,
}

impl ShutdownProgress {
    /// Reports whether every registered handler has settled.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.registered
    }
}

/// Outcome of feeding a trigger into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// This trigger started the shutdown.
    Started,

    /// A repeated interrupt: exit right away.
    ForceExit,

    /// A shutdown is already in progress (or done); nothing to do.
    Leaked,
}

impl ShutdownState {
    /// Applies the given trigger code to this state in place, reporting
    /// which transition happened.
    pub(crate) fn advance(&mut self, code: ReasonCode) -> Transition {
        match *self {
            Self::Idle => {
                *self = Self::ShuttingDown { origin: code };
                Transition::Started
            }
            Self::ShuttingDown { .. } if code == ReasonCode::INTERRUPT => {
                *self = Self::ForceExit { code };
                Transition::ForceExit
            }
            Self::ShuttingDown { .. } | Self::ForceExit { .. } | Self::Exited { .. } => {
                Transition::Leaked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_trigger_starts() {
        // Given
        let mut state = ShutdownState::Idle;

        // When
        let transition = state.advance(ReasonCode::USER_SIGNAL_1);

        // Then
        assert_eq!(transition, Transition::Started);
        assert_eq!(
            state,
            ShutdownState::ShuttingDown {
                origin: ReasonCode::USER_SIGNAL_1
            },
        );
        assert!(state.has_begun());
    }

    #[test]
    fn progress_completes_once_every_handler_settled() {
        let pending = ShutdownProgress {
            registered: 3,
            completed: 2,
        };
        let done = ShutdownProgress {
            registered: 3,
            completed: 3,
        };
        let empty = ShutdownProgress {
            registered: 0,
            completed: 0,
        };

        assert!(!pending.is_complete());
        assert!(done.is_complete());
        assert!(empty.is_complete());
    }

    #[test]
    fn repeated_trigger_leaks() {
        // Given
        let mut state = ShutdownState::Idle;
        state.advance(ReasonCode::QUIT);

        // When
        let transition = state.advance(ReasonCode::UNCAUGHT_PANIC);

        // Then
        assert_eq!(transition, Transition::Leaked);
        assert_eq!(
            state,
            ShutdownState::ShuttingDown {
                origin: ReasonCode::QUIT
            },
        );
    }

    #[test]
    fn repeated_interrupt_forces_exit() {
        // Given
        let mut state = ShutdownState::Idle;
        state.advance(ReasonCode::INTERRUPT);

        // When
        let transition = state.advance(ReasonCode::INTERRUPT);

        // Then
        assert_eq!(transition, Transition::ForceExit);
        assert_eq!(
            state,
            ShutdownState::ForceExit {
                code: ReasonCode::INTERRUPT
            },
        );
    }

    #[test]
    fn interrupt_after_other_trigger_forces_exit() {
        // Given
        let mut state = ShutdownState::Idle;
        state.advance(ReasonCode::QUIT);

        // When
        let transition = state.advance(ReasonCode::INTERRUPT);

        // Then
        assert_eq!(transition, Transition::ForceExit);
    }

    #[test]
    fn exited_is_terminal() {
        // Given
        let mut state = ShutdownState::Exited {
            code: ReasonCode::QUIT,
        };

        // When
        let transition = state.advance(ReasonCode::INTERRUPT);

        // Then
        assert_eq!(transition, Transition::Leaked);
        assert_eq!(state.exit_code(), Some(ReasonCode::QUIT));
    }
}
