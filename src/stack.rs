//! Native stack headroom for the recursive tree walk.
//!
//! Every `evaluate`/`execute` goes through [`ensure_sufficient_stack`], so a
//! Lox program can nest calls up to `MAX_CALL_DEPTH` on any host thread,
//! however small its stack.

/// Run `f`, first moving to a fresh stack segment if less than the red zone
/// is left on the current one.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Headroom kept below every tree-walk frame.
    const RED_ZONE: usize = 128 * 1024;

    /// Size of each segment stacker allocates.
    const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}
