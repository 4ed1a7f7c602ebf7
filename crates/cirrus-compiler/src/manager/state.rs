//! Per entry point compile state machine.

/// `Idle → Compiling → Idle`. An edit that arrives while compiling marks
/// the running compile stale; however many edits arrive, a stale compile
/// is followed by exactly one more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileState {
    #[default]
    Idle,
    Compiling {
        stale: bool,
    },
}

impl CompileState {
    /// Record an edit. Returns `true` if the caller must start a compile.
    pub fn on_edit(&mut self) -> bool {
        match self {
            CompileState::Idle => {
                *self = CompileState::Compiling { stale: false };
                true
            }
            CompileState::Compiling { stale } => {
                *stale = true;
                false
            }
        }
    }

    /// Record the end of a compile. Returns `true` if the worker must run
    /// the follow-up compile; the state then stays `Compiling`.
    pub fn on_finished(&mut self) -> bool {
        match *self {
            CompileState::Compiling { stale: true } => {
                *self = CompileState::Compiling { stale: false };
                true
            }
            _ => {
                *self = CompileState::Idle;
                false
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == CompileState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_edit() {
        let mut state = CompileState::default();
        assert!(state.on_edit());
        assert_eq!(state, CompileState::Compiling { stale: false });
        assert!(!state.on_finished());
        assert!(state.is_idle());
    }

    #[test]
    fn test_edits_while_compiling_coalesce() {
        let mut state = CompileState::default();
        assert!(state.on_edit());
        assert!(!state.on_edit());
        assert!(!state.on_edit());
        assert!(!state.on_edit());
        assert_eq!(state, CompileState::Compiling { stale: true });

        assert!(state.on_finished());
        assert_eq!(state, CompileState::Compiling { stale: false });
        assert!(!state.on_finished());
        assert!(state.is_idle());
    }

    #[test]
    fn test_edit_during_follow_up() {
        let mut state = CompileState::default();
        state.on_edit();
        state.on_edit();
        assert!(state.on_finished());
        assert!(!state.on_edit());
        assert!(state.on_finished());
        assert!(!state.on_finished());
    }
}
