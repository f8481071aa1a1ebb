//! Photodiode trigger segmentation.
//!
//! The stimulus PC flashes a photodiode patch in short bursts.  One burst
//! announces the start of a trial block, four more count down the motor
//! phase, and a final burst closes the rest phase.  [`segment`] scans the
//! binary trigger with a sliding burst-detection window and labels every
//! sample as no-event, motor or rest.  [`segment_fixed`] is the alternate
//! stamping mode for recordings where edge-to-edge spans are unreliable: it
//! back-labels a fixed number of samples at each detected edge instead.
//!
//! [`ttl_to_binary`] and [`invert`] decode the raw integer TTL channel into
//! the binary trigger both modes consume.

use tracing::warn;

use crate::config::SegmenterConfig;

/// Per-sample event label produced by the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventLabel {
    /// No event at this sample.
    None = 0,
    /// Sample belongs to a motor-imagery phase.
    Motor = 1,
    /// Sample belongs to a rest phase.
    Rest = 2,
}

/// Burst-pattern state: one start burst, four motor bursts, one rest burst.
#[derive(Debug, Clone, Copy)]
enum SegmenterState {
    /// No trial block in progress; the next burst edge opens one.
    WaitingStart,
    /// Counting the four motor bursts that follow the start burst.
    CountingMotor { count: u8, trial_start: usize },
    /// Motor phase closed; the next burst edge closes the rest phase.
    WaitingRestEdge { rest_start: usize },
}

/// Number of motor bursts that close the motor phase of a trial block.
const MOTOR_BURSTS: u8 = 4;

/// Forward-looking window sums of the binary trigger, clamped at the tail.
///
/// `sums[i] = Σ trigger[i .. min(i + window, len)]`, computed from a prefix
/// sum so the scan stays linear.
fn window_sums(trigger: &[u8], window: usize) -> Vec<u32> {
    let n = trigger.len();
    let mut prefix = vec![0u32; n + 1];
    for (i, &t) in trigger.iter().enumerate() {
        prefix[i + 1] = prefix[i] + u32::from(t);
    }
    (0..n)
        .map(|i| {
            let end = (i + window).min(n);
            prefix[end] - prefix[i]
        })
        .collect()
}

/// Burst-edge detector shared by both segmentation modes.
///
/// An edge fires at sample `i` when the previous window sum equals the
/// maximum over the trailing `window` sums (current included) and the
/// current sum is strictly below the previous one — a drop occurring
/// exactly at the rolling peak.  Sums are integer counts of a binary
/// signal, so the equality is exact by construction.
fn is_burst_edge(sums: &[u32], i: usize, window: usize, prev: u32) -> bool {
    let lo = (i + 1).saturating_sub(window);
    // the trailing slice is at most `window` long; max() cannot fail
    let trailing_max = sums[lo..=i].iter().copied().max().unwrap_or(0);
    prev == trailing_max && sums[i] < prev
}

/// Segment a binary trigger into per-sample event labels.
///
/// Returns `(events, window_sums)`; `window_sums` is the raw per-sample
/// forward-window sum sequence, kept for diagnostics plotting.
///
/// A trial block spans six burst edges: the first records the trial start,
/// the next four count the motor phase (every sample from the trial start
/// to the fourth motor edge is labeled [`EventLabel::Motor`]), and the
/// sixth closes the rest phase ([`EventLabel::Rest`] from the fourth motor
/// edge to it).  An incomplete block at the end of the recording labels
/// nothing.
pub fn segment(trigger: &[u8], cfg: &SegmenterConfig) -> (Vec<EventLabel>, Vec<u32>) {
    let n = trigger.len();
    let mut events = vec![EventLabel::None; n];
    if n == 0 || cfg.window_size == 0 {
        return (events, Vec::new());
    }

    let sums = window_sums(trigger, cfg.window_size);
    let mut state = SegmenterState::WaitingStart;
    let mut prev = 0u32;

    for i in 0..n {
        if is_burst_edge(&sums, i, cfg.window_size, prev) {
            state = match state {
                SegmenterState::WaitingStart => SegmenterState::CountingMotor {
                    count: 0,
                    trial_start: i,
                },
                SegmenterState::CountingMotor { count, trial_start } => {
                    let count = count + 1;
                    if count == MOTOR_BURSTS {
                        for e in &mut events[trial_start..i] {
                            *e = EventLabel::Motor;
                        }
                        SegmenterState::WaitingRestEdge { rest_start: i }
                    } else {
                        SegmenterState::CountingMotor { count, trial_start }
                    }
                }
                SegmenterState::WaitingRestEdge { rest_start } => {
                    for e in &mut events[rest_start..i] {
                        *e = EventLabel::Rest;
                    }
                    SegmenterState::WaitingStart
                }
            };
        }
        prev = sums[i];
    }

    (events, sums)
}

/// Fixed-duration stamping mode.
///
/// Detects the same burst edges as [`segment`] but labels a fixed number of
/// samples *ending* at each edge — [`SegmenterConfig::motor_trial_dur`] for
/// each of the four motor edges, [`SegmenterConfig::rest_trial_dur`] for
/// the rest edge — instead of spanning between edges.  A range that would
/// start before index 0 is clamped to 0 and logged.
pub fn segment_fixed(trigger: &[u8], cfg: &SegmenterConfig) -> Vec<EventLabel> {
    let n = trigger.len();
    let mut events = vec![EventLabel::None; n];
    if n == 0 || cfg.window_size == 0 {
        return events;
    }

    let sums = window_sums(trigger, cfg.window_size);
    let mut state = SegmenterState::WaitingStart;
    let mut prev = 0u32;

    for i in 0..n {
        if is_burst_edge(&sums, i, cfg.window_size, prev) {
            state = match state {
                SegmenterState::WaitingStart => SegmenterState::CountingMotor {
                    count: 0,
                    trial_start: i,
                },
                SegmenterState::CountingMotor { count, trial_start } => {
                    stamp(&mut events, i, cfg.motor_trial_dur, EventLabel::Motor);
                    let count = count + 1;
                    if count == MOTOR_BURSTS {
                        SegmenterState::WaitingRestEdge { rest_start: i }
                    } else {
                        SegmenterState::CountingMotor { count, trial_start }
                    }
                }
                SegmenterState::WaitingRestEdge { .. } => {
                    stamp(&mut events, i, cfg.rest_trial_dur, EventLabel::Rest);
                    SegmenterState::WaitingStart
                }
            };
        }
        prev = sums[i];
    }

    events
}

/// Back-label `dur` samples ending at `edge`, clamping at the head.
fn stamp(events: &mut [EventLabel], edge: usize, dur: usize, label: EventLabel) {
    let start = edge.saturating_sub(dur);
    if dur > edge {
        warn!(edge, dur, "stamped range clamped at index 0");
    }
    for e in &mut events[start..edge] {
        *e = label;
    }
}

/// Decode a binary trigger from an integer-valued TTL channel by isolating
/// one bit plane.
///
/// Values are truncated to their integer part before the bit test, matching
/// how the acquisition stores the TTL word in a float channel.
pub fn ttl_to_binary<I>(raw: I, bit_index: u32) -> Vec<u8>
where
    I: IntoIterator<Item = f64>,
{
    raw.into_iter()
        .map(|v| (((v as u64) >> bit_index) & 1) as u8)
        .collect()
}

/// Flip trigger polarity (`1 - t`), for active-low photodiode markers.
pub fn invert(trigger: &[u8]) -> Vec<u8> {
    trigger.iter().map(|&t| 1 - (t & 1)).collect()
}
