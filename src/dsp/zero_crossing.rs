//! Positive-going zero-crossing search.
//!
//! A loop that jumps between two arbitrary sample indices produces a step in
//! the waveform, heard as a click once per loop. Jumping between two points
//! where the signal rises through zero keeps the splice continuous in both
//! value and slope direction.
//!
//! ```text
//!          ╱╲        ╱╲
//!   ──────╱──╲──────╱──╲────    crossing at i: signal[i] < 0 && signal[i+1] >= 0
//!     ╲  ╱    ╲    ╱
//!      ╲╱      ╲  ╱
//!              ↑ i
//! ```

/// Default search distance in samples.
pub const DEFAULT_SEARCH_WINDOW: usize = 2000;

/// Find a positive-going zero crossing near `target`.
///
/// `max_search > 0` scans forward over `target..target + max_search`;
/// `max_search < 0` scans backward from `target` down to `target + max_search`
/// and returns the crossing nearest to `target`. The window is clipped to the
/// signal. When no crossing is found, `target` comes back unchanged.
pub fn find_positive_zero_crossing(target: usize, signal: &[f32], max_search: isize) -> usize {
    // Need signal[i + 1], so the last usable i is len - 2.
    let Some(last) = signal.len().checked_sub(2) else {
        return target;
    };
    if max_search == 0 || target > last + 1 {
        return target;
    }

    let is_crossing = |i: usize| signal[i] < 0.0 && signal[i + 1] >= 0.0;
    let distance = max_search.unsigned_abs();

    if max_search > 0 {
        let end = target.saturating_add(distance).min(last + 1);
        (target..end).find(|&i| is_crossing(i)).unwrap_or(target)
    } else {
        let start = target.saturating_sub(distance);
        let end = target.min(last + 1);
        (start..end).rev().find(|&i| is_crossing(i)).unwrap_or(target)
    }
}
