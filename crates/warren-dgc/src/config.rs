//! Collector configuration.

/// Configuration for [`MarkAndSweepCollector`](crate::MarkAndSweepCollector).
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Log one `info` line per phase boundary instead of `debug`.
    pub verbose: bool,
    /// Track young-generation candidates and allow `gc_young`.
    pub young_enabled: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            verbose: false,
            young_enabled: true,
        }
    }
}
