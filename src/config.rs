//! Segmenter configuration.
//!
//! [`SegmenterConfig`] holds the tunable parameters of the trigger
//! segmentation stage.  The defaults are the values used for the original
//! photodiode recordings (1000 Hz, so sample counts equal milliseconds).

/// Configuration for trigger segmentation.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use eegcsp::SegmenterConfig;
///
/// let cfg = SegmenterConfig {
///     window_size: 300,   // narrower burst-detection window
///     ..SegmenterConfig::default()
/// };
/// ```
///
/// Or just call [`SegmenterConfig::default()`] for the recording settings.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Length of the forward-looking burst-detection window, in samples.
    ///
    /// The segmenter sums the binary trigger over this window at every
    /// sample and tracks the running maximum of those sums over the same
    /// trailing span.  The window shrinks at the end of the recording
    /// rather than reading past it.
    ///
    /// Default: `600` samples (600 ms at 1000 Hz).
    pub window_size: usize,

    /// Length of a motor trial in samples, used only by the fixed-duration
    /// stamping mode ([`segment_fixed`](crate::trigger::segment_fixed)).
    /// Each motor burst edge back-labels this many samples.
    ///
    /// Default: `1200` samples.
    pub motor_trial_dur: usize,

    /// Length of a rest trial in samples, used only by the fixed-duration
    /// stamping mode.  The rest burst edge back-labels this many samples.
    ///
    /// Default: `5000` samples.
    pub rest_trial_dur: usize,
}

impl Default for SegmenterConfig {
    /// Returns the recording configuration:
    /// 600-sample window · 1200-sample motor trials · 5000-sample rest trials.
    fn default() -> Self {
        Self {
            window_size: 600,
            motor_trial_dur: 1200,
            rest_trial_dur: 5000,
        }
    }
}
