//! Stack growth guard for the recursive-descent parser.
//!
//! The parser bounds nesting with an explicit depth cap (surfaced as a
//! `NestedTooDeeply` parse error); this guard makes sure the frames below
//! that cap always fit by growing the stack before each recursion step.

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
