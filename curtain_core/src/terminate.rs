use crate::ReasonCode;

/// The final step of every shutdown: ends the process with the given code.
///
/// The production implementation is [`ProcessTerminator`]. Hosts that embed
/// the coordinator (or tests) may substitute their own implementation to
/// observe the exit instead of performing it.
pub trait Terminator: Send + Sync {
    /// Terminates with the given code. Implementations are not expected to
    /// return, but the coordinator copes with it if they do.
    fn terminate(&self, code: ReasonCode);
}

/// Terminates the whole OS process via [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, code: ReasonCode) {
        std::process::exit(code.get());
    }
}
