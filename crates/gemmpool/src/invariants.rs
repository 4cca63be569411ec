//! Debug assertion macros for the task queue's sequencing invariants.
//!
//! Only active in debug builds (`debug_assert!`), so the release-mode fast
//! paths carry zero overhead.

/// Assert that occupancy never exceeds capacity.
///
/// `0 <= (tail - head) <= capacity`: the dispatcher must not over-produce;
/// queue sizing is a driver precondition.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "queue overflow: occupancy {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that a sequence cursor only increases.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} cursor decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that a claimed slot range lies within the live window.
///
/// `buffer[i] is initialized <=> head <= sequence(i) < tail`
macro_rules! debug_assert_claimed_in_range {
    ($lo:expr, $hi:expr, $tail:expr) => {
        debug_assert!(
            $hi <= $tail,
            "claimed range [{}, {}) runs past tail {}",
            $lo,
            $hi,
            $tail
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_claimed_in_range;
pub(crate) use debug_assert_monotonic;
