//! Stack growth guard for deeply nested trees.
//!
//! Evaluation has no error channel, so instead of bounding recursion it
//! grows the stack on demand through `stacker`. On WASM the closure runs
//! directly; that target manages its own stack.

/// Grow the stack if fewer than the red-zone bytes remain, then run `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Remaining-space threshold that triggers a grow (64KB).
    const RED_ZONE: usize = 64 * 1024;

    /// Bytes added per grow (1MB).
    const STACK_PER_GROWTH: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_GROWTH, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
