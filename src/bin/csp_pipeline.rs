use anyhow::{ensure, Result};
use clap::Parser;
use ndarray::Array2;

use eegcsp::{
    run_csp, segment, CovarianceStrategy, CspStrategy, EventLabel, SegmenterConfig,
};

#[derive(Parser)]
#[command(name = "csp_pipeline", about = "CSP extraction demo on a synthetic recording")]
struct Args {
    /// Number of channels in the synthetic recording
    #[arg(long, default_value_t = 8)]
    channels: usize,

    /// Number of full trial blocks (1 start + 4 motor + 1 rest bursts each)
    #[arg(long, default_value_t = 4)]
    trials: usize,

    /// Burst-detection window in samples
    #[arg(long, default_value_t = 60)]
    window_size: usize,

    /// Covariance shrinkage factor
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Use the robust MCD + unsymmetric-eig variant
    #[arg(long, default_value_t = false)]
    robust: bool,
}

/// Synthetic recording: one photodiode burst per timing marker, motor-phase
/// power on channel 0 and rest-phase power on channel 1.
fn synthesize(
    trials: usize,
    channels: usize,
    burst_len: usize,
    gap: usize,
) -> (Vec<u8>, Array2<f64>) {
    let mut trigger = vec![0u8; gap];
    for _ in 0..trials * 6 {
        trigger.extend(std::iter::repeat(1).take(burst_len));
        trigger.extend(std::iter::repeat(0).take(gap));
    }

    let n = trigger.len();
    let mut signal = Array2::<f64>::zeros((n, channels));
    // the burst edges land near the burst positions; modulate in the same
    // rhythm so labeled spans carry class-specific power
    let cycle = 6 * (burst_len + gap);
    for t in 0..n {
        let phase = t as f64 * 0.6;
        for c in 0..channels {
            signal[[t, c]] = (phase * (1.0 + 0.13 * c as f64)).sin() * 0.2;
        }
        let in_cycle = (t.saturating_sub(gap)) % cycle;
        if in_cycle < 4 * (burst_len + gap) {
            signal[[t, 0]] += phase.sin() * 4.0;
        } else {
            signal[[t, 1]] += (phase * 1.4).sin() * 4.0;
        }
    }
    (trigger, signal)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    ensure!(args.channels >= 2, "need at least two channels");
    ensure!(args.trials >= 1, "need at least one trial block");

    let (trigger, signal) = synthesize(args.trials, args.channels, 5, 3 * args.window_size);
    println!(
        "Synthesized {} samples × {} ch, {} trial blocks",
        signal.nrows(),
        signal.ncols(),
        args.trials
    );

    let cfg = SegmenterConfig {
        window_size: args.window_size,
        ..SegmenterConfig::default()
    };
    let (events, _sums) = segment(&trigger, &cfg);
    let n_motor = events.iter().filter(|&&e| e == EventLabel::Motor).count();
    let n_rest = events.iter().filter(|&&e| e == EventLabel::Rest).count();
    println!("Labeled {n_motor} motor samples, {n_rest} rest samples");

    let (cov, csp) = if args.robust {
        (
            CovarianceStrategy::RobustMcd { support_fraction: 0.5 },
            CspStrategy::Robust,
        )
    } else {
        (
            CovarianceStrategy::Sample { alpha: args.alpha },
            CspStrategy::Basic,
        )
    };

    let result = run_csp(&signal, &events, &cov, &csp)?;
    println!("Eigenvalues ({} filters):", result.n_filters());
    for (i, l) in result.eigenvalues.iter().enumerate() {
        println!("  λ[{i}] = {l:.4}");
    }
    println!(
        "Extreme components: head λ = {:.4}, tail λ = {:.4}",
        result.eigenvalue(0),
        result.eigenvalue_from_end(0)
    );
    Ok(())
}
