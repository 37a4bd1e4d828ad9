use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::trace;

use super::model::Spectrum;
use crate::error::{SpectralError, SpectralResult};

// ---------------------------------------------------------------------------
// Reference-spectrum text files
// ---------------------------------------------------------------------------

/// Expected layout: one `wavelength amplitude` pair per line, any whitespace
/// between them, wavelengths non-decreasing but not necessarily evenly spaced.
///
/// ```text
/// 400.0   0.112
/// 402.5   0.118
/// 410.0   0.131
/// ```
impl Spectrum {
    /// Read and resample a reference-spectrum file.
    pub fn from_file(path: &Path) -> SpectralResult<Self> {
        let file = File::open(path).map_err(|e| {
            SpectralError::FileNotFound(format!("{}: {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read `(wavelength, amplitude)` pairs and resample them onto a uniform grid.
    ///
    /// The grid step is the smallest positive spacing between consecutive
    /// input wavelengths. Grid points run from the first wavelength towards the
    /// last one, each linearly interpolated from its bracketing input pair; the
    /// last input wavelength is kept when it falls on the grid.
    pub fn from_reader<R: BufRead>(reader: R) -> SpectralResult<Self> {
        let (wavelengths, amplitudes) = read_pairs(reader)?;

        if wavelengths.is_empty() {
            return Err(SpectralError::FileNotFound(
                "no samples with positive wavelength".into(),
            ));
        }
        if wavelengths.len() != amplitudes.len() {
            return Err(SpectralError::NotValid(format!(
                "{} wavelengths but {} amplitudes",
                wavelengths.len(),
                amplitudes.len()
            )));
        }
        if let Some(w) = wavelengths.windows(2).find(|w| w[1] < w[0]) {
            return Err(SpectralError::NotValid(format!(
                "wavelengths must be non-decreasing ({} followed by {})",
                w[0], w[1]
            )));
        }

        let Some(step) = min_positive_step(&wavelengths) else {
            return Err(SpectralError::FileNotFound(
                "a single distinct wavelength cannot be resampled".into(),
            ));
        };

        let span = wavelengths[wavelengths.len() - 1] - wavelengths[0];
        if span / step > MAX_GRID_POINTS as f64 {
            return Err(SpectralError::NotValid(format!(
                "a step of {step} over {span} exceeds {MAX_GRID_POINTS} grid points"
            )));
        }

        let values = interpolate_uniform(&wavelengths, &amplitudes, step);
        if values.is_empty() {
            return Err(SpectralError::FileNotFound("resampled grid is empty".into()));
        }

        Ok(Spectrum {
            start_wavelength: wavelengths[0],
            step_wavelength: step,
            values,
        })
    }
}

/// Collect the `(wavelength, amplitude)` columns, dropping non-positive or
/// non-finite values, blank lines and lines that are not two numbers.
fn read_pairs<R: BufRead>(reader: R) -> SpectralResult<(Vec<f64>, Vec<f64>)> {
    let mut wavelengths = Vec::new();
    let mut amplitudes = Vec::new();
    let mut lines_read = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SpectralError::NotValid(format!("line {line_no}: {e}")))?;
        lines_read += 1;

        let mut fields = line.split_whitespace();
        let (Some(wl), Some(amp)) = (fields.next(), fields.next()) else {
            continue;
        };
        let (Ok(wl), Ok(amp)) = (wl.parse::<f64>(), amp.parse::<f64>()) else {
            trace!("line {line_no}: skipping '{line}'");
            continue;
        };
        if !(wl.is_finite() && amp.is_finite()) {
            trace!("line {line_no}: skipping non-finite '{line}'");
            continue;
        }
        if wl > 0.0 {
            wavelengths.push(wl);
            amplitudes.push(amp);
        }
    }

    if lines_read == 0 {
        return Err(SpectralError::NotValid("empty spectrum source".into()));
    }
    Ok((wavelengths, amplitudes))
}

/// Smallest strictly positive gap between consecutive wavelengths.
fn min_positive_step(wavelengths: &[f64]) -> Option<f64> {
    wavelengths
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > 0.0)
        .min_by(|a, b| a.total_cmp(b))
}

/// Upper bound on the resampled grid length.
const MAX_GRID_POINTS: usize = 1_000_000;

/// Grid points within this fraction of a step of the last input wavelength
/// are treated as landing on it.
const GRID_EPSILON: f64 = 1e-9;

/// Linear interpolation of the input samples on `[first, last]` with spacing `step`.
fn interpolate_uniform(wavelengths: &[f64], amplitudes: &[f64], step: f64) -> Vec<f64> {
    let n = wavelengths.len();
    let first = wavelengths[0];
    let last = wavelengths[n - 1];
    let tolerance = step * GRID_EPSILON;
    let mut values = Vec::new();
    let mut upper = 0usize;

    loop {
        let wlen = first + step * values.len() as f64;
        if wlen >= last - tolerance {
            if wlen <= last + tolerance {
                values.push(amplitudes[n - 1]);
            }
            break;
        }
        // Advance to the first input wavelength strictly above the grid point.
        while upper < n - 1 && wlen >= wavelengths[upper] {
            upper += 1;
        }
        let lower = upper - 1;
        let (lo_w, hi_w) = (wavelengths[lower], wavelengths[upper]);
        let (lo_v, hi_v) = (amplitudes[lower], amplitudes[upper]);
        values.push(lo_v + (wlen - lo_w) / (hi_w - lo_w) * (hi_v - lo_v));
    }
    values
}
