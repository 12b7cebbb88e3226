use std::time::Duration;

use crate::pool::PoolConfig;

/// When `end_frame` reorders draws by texture.
///
/// Sorting changes paint order inside each run of draws, so blended scenes
/// that depend on recorded order should keep the default.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SortPolicy {
    /// Submit in recorded order.
    #[default]
    Never,
    /// Always sort after merging.
    Always,
    /// Sort only when the merged list has more than this many texture changes.
    TextureSwitches(usize),
}

impl SortPolicy {
    #[inline]
    pub fn should_sort(self, texture_switches: usize) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::TextureSwitches(threshold) => texture_switches > threshold,
        }
    }
}

/// Frame pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of frames that may be recorded or executing at once (N).
    pub frames_in_flight: u32,

    pub sort_policy: SortPolicy,

    /// Longest `begin_frame` waits for a free slot before dropping the frame.
    pub wait_timeout: Duration,

    /// Interval between device polls while waiting for a free slot.
    pub poll_interval: Duration,

    /// Color the target is cleared to at the start of every frame.
    pub clear_color: [f32; 4],

    pub pool: PoolConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            sort_policy: SortPolicy::Never,
            wait_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(1),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            pool: PoolConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_switch_threshold_is_exclusive() {
        let p = SortPolicy::TextureSwitches(2);
        assert!(!p.should_sort(2));
        assert!(p.should_sort(3));
        assert!(!SortPolicy::Never.should_sort(usize::MAX));
        assert!(SortPolicy::Always.should_sort(0));
    }
}
