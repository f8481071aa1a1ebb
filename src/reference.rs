//! Re-referencing: subtract a reference signal from every channel.
//!
//! [`rereference_inplace`] references against one or more electrodes (their
//! per-sample mean); [`apply_car_inplace`] references against the common
//! average of all channels, optionally excluding bad channels from the
//! average (the excluded channels are still re-referenced).
//!
//! `data` is `[T, C]`: `data[t, c] -= ref_signal[t]`.

use ndarray::Array2;

use crate::error::{DomainError, Result};

fn check_channels(indices: &[usize], n_channels: usize) -> Result<()> {
    for &index in indices {
        if index >= n_channels {
            return Err(DomainError::ChannelOutOfBounds { index, n_channels });
        }
    }
    Ok(())
}

/// Re-reference against the mean of `ref_channels` (one or several
/// electrode indices), in place.
pub fn rereference_inplace(data: &mut Array2<f64>, ref_channels: &[usize]) -> Result<()> {
    if ref_channels.is_empty() {
        return Err(DomainError::EmptyInput("reference channels"));
    }
    let n_ch = data.ncols();
    check_channels(ref_channels, n_ch)?;

    let inv = 1.0 / ref_channels.len() as f64;
    for mut row in data.rows_mut() {
        let reference: f64 = ref_channels.iter().map(|&c| row[c]).sum::<f64>() * inv;
        row.mapv_inplace(|v| v - reference);
    }
    Ok(())
}

/// Apply a common average reference in place, excluding `exclude` channels
/// from the average.
pub fn apply_car_inplace(data: &mut Array2<f64>, exclude: &[usize]) -> Result<()> {
    let n_ch = data.ncols();
    check_channels(exclude, n_ch)?;

    let mut include = vec![true; n_ch];
    for &c in exclude {
        include[c] = false;
    }
    let n_included = include.iter().filter(|&&b| b).count();
    if n_included == 0 {
        return Err(DomainError::EmptyInput("channels included in the average"));
    }

    let inv = 1.0 / n_included as f64;
    for mut row in data.rows_mut() {
        let car: f64 = row
            .iter()
            .zip(include.iter())
            .filter(|(_, &keep)| keep)
            .map(|(&v, _)| v)
            .sum::<f64>()
            * inv;
        row.mapv_inplace(|v| v - car);
    }
    Ok(())
}
