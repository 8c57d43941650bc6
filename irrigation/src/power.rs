//! Low-power sleep

/// Blocking low-power sleep primitive of the platform.
pub trait PowerManager {
    /// Longest duration a single [`PowerManager::sleep`] call accepts.
    /// Must not be zero.
    const MAX_SLEEP_MS: u32;

    /// Sleep for `duration_ms`, at most [`PowerManager::MAX_SLEEP_MS`].
    /// Nothing wakes the system early.
    fn sleep(&mut self, duration_ms: u32);
}

/// Sleep for an arbitrary duration as a sequence of bounded sleeps.
pub fn sleep_for<P: PowerManager>(power: &mut P, duration_ms: u32) {
    debug_assert!(P::MAX_SLEEP_MS > 0, "sleep bound of zero");
    let mut remaining = duration_ms;
    while remaining > 0 {
        let chunk = remaining.min(P::MAX_SLEEP_MS);
        power.sleep(chunk);
        remaining -= chunk;
    }
}
