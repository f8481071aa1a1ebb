/// Shared synthetic-data builders for the integration tests.
use ndarray::Array2;

use eegcsp::EventLabel;

/// `n_bursts` isolated photodiode bursts (runs of 1s) separated by 0-gaps
/// longer than any burst-detection window the tests use.
#[allow(unused)]
pub fn burst_trigger(n_bursts: usize, burst_len: usize, gap: usize) -> Vec<u8> {
    let mut t = vec![0u8; gap];
    for _ in 0..n_bursts {
        t.extend(std::iter::repeat(1).take(burst_len));
        t.extend(std::iter::repeat(0).take(gap));
    }
    t
}

/// A labeled two-class recording: motor spans put oscillatory power on
/// channel 0, rest spans on channel 1, background everywhere.
#[allow(unused)]
pub fn two_class_recording(
    n_ch: usize,
    block: usize,
    n_blocks: usize,
) -> (Array2<f64>, Vec<EventLabel>) {
    let n = block * n_blocks;
    let mut events = vec![EventLabel::None; n];
    let mut signal = Array2::<f64>::zeros((n, n_ch));
    for t in 0..n {
        let phase = t as f64 * 0.7;
        // distinct background frequency per channel keeps every covariance
        // full-rank
        for c in 0..n_ch {
            signal[[t, c]] = (phase * (1.0 + 0.13 * c as f64)).sin() * 0.1;
        }
        match (t / block) % 4 {
            1 => {
                events[t] = EventLabel::Motor;
                signal[[t, 0]] += phase.sin() * 5.0;
            }
            3 => {
                events[t] = EventLabel::Rest;
                signal[[t, 1]] += (phase * 1.3).sin() * 5.0;
            }
            _ => {}
        }
    }
    (signal, events)
}
