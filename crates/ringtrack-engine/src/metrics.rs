//! Per-call tracking metrics.

use ringtrack_core::KernelId;

/// Timing and loss data for one [`Tracker::track`](crate::Tracker::track)
/// call. Durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackMetrics {
    /// Kernel that ran.
    pub kernel: Option<KernelId>,
    /// Whether this call compiled the kernel (as opposed to a cache hit or
    /// a kernel already held by the tracker).
    pub compiled: bool,
    /// Time spent obtaining the kernel.
    pub kernel_us: u64,
    /// Time spent in the launch, gather and scatter included.
    pub launch_us: u64,
    /// Wall-clock time for the whole call.
    pub total_us: u64,
    /// Particle slots in the batch.
    pub particles: usize,
    /// Turns tracked.
    pub turns: usize,
    /// Elements per turn.
    pub elements: usize,
    /// Particles lost before the call.
    pub lost_before: usize,
    /// Particles lost after the call.
    pub lost_after: usize,
}

impl TrackMetrics {
    /// Particles lost during this call.
    pub fn newly_lost(&self) -> usize {
        self.lost_after.saturating_sub(self.lost_before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = TrackMetrics::default();
        assert_eq!(m.kernel, None);
        assert!(!m.compiled);
        assert_eq!(m.total_us, 0);
        assert_eq!(m.newly_lost(), 0);
    }
}
