use crate::error::{SpectralError, SpectralResult};

// ---------------------------------------------------------------------------
// Spectrum – amplitudes on a uniform wavelength grid
// ---------------------------------------------------------------------------

/// A reference spectrum resampled onto a uniform wavelength grid.
///
/// `values[i]` is the amplitude at `start_wavelength + i * step_wavelength`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Wavelength of `values[0]`.
    pub start_wavelength: f64,
    /// Grid spacing, strictly positive.
    pub step_wavelength: f64,
    /// Amplitude samples.
    pub values: Vec<f64>,
}

impl Spectrum {
    /// Build a spectrum, rejecting an empty value array or a non-positive step.
    pub fn new(start_wavelength: f64, step_wavelength: f64, values: Vec<f64>) -> SpectralResult<Self> {
        if values.is_empty() {
            return Err(SpectralError::NotValid("spectrum has no values".into()));
        }
        if !(step_wavelength.is_finite() && step_wavelength > 0.0) {
            return Err(SpectralError::NotValid(format!(
                "wavelength step must be positive, got {step_wavelength}"
            )));
        }
        Ok(Self {
            start_wavelength,
            step_wavelength,
            values,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the spectrum holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Wavelength of the last sample.
    pub fn end_wavelength(&self) -> f64 {
        self.start_wavelength + self.step_wavelength * self.values.len().saturating_sub(1) as f64
    }

    /// Amplitude at `wavelength`, linearly interpolated between grid points.
    ///
    /// Queries below the grid return the first sample. Queries whose bracket
    /// reaches past the last grid point return the last sample, so the exact
    /// final wavelength clamps rather than interpolates.
    pub fn value_at(&self, wavelength: f64) -> SpectralResult<f64> {
        let Some(&last) = self.values.last() else {
            return Err(SpectralError::NotValid("spectrum has no values".into()));
        };
        if !(self.step_wavelength.is_finite() && self.step_wavelength > 0.0) {
            return Err(SpectralError::NotValid(format!(
                "wavelength step must be positive, got {}",
                self.step_wavelength
            )));
        }

        let position = ((wavelength - self.start_wavelength) / self.step_wavelength).floor();
        if position.is_nan() {
            return Err(SpectralError::NotValid(format!(
                "cannot look up wavelength {wavelength}"
            )));
        }
        if position < 0.0 {
            return Ok(self.values[0]);
        }

        let lower = position as usize;
        let upper = lower.saturating_add(1);
        if lower >= self.values.len() || upper >= self.values.len() {
            return Ok(last);
        }

        let lower_wlen = self.start_wavelength + self.step_wavelength * lower as f64;
        let upper_wlen = self.start_wavelength + self.step_wavelength * upper as f64;
        let (lo, hi) = (self.values[lower], self.values[upper]);
        Ok(lo + (wavelength - lower_wlen) / (upper_wlen - lower_wlen) * (hi - lo))
    }

    /// Sample the spectrum on a uniform grid of `count` points.
    pub fn values_on_grid(&self, start: f64, step: f64, count: usize) -> SpectralResult<Vec<f64>> {
        (0..count)
            .map(|i| self.value_at(start + step * i as f64))
            .collect()
    }

    /// Sample the spectrum at each of `wavelengths`.
    pub fn sample_at(&self, wavelengths: &[f64]) -> SpectralResult<Vec<f64>> {
        wavelengths.iter().map(|&w| self.value_at(w)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Spectrum {
        // 400, 410, ..., 440 nm → 0.0, 0.1, ..., 0.4
        Spectrum::new(400.0, 10.0, vec![0.0, 0.1, 0.2, 0.3, 0.4]).unwrap()
    }

    #[test]
    fn test_new_rejects_degenerate_input() {
        assert!(matches!(
            Spectrum::new(400.0, 10.0, vec![]),
            Err(SpectralError::NotValid(_))
        ));
        assert!(matches!(
            Spectrum::new(400.0, 0.0, vec![1.0]),
            Err(SpectralError::NotValid(_))
        ));
        assert!(matches!(
            Spectrum::new(400.0, f64::NAN, vec![1.0]),
            Err(SpectralError::NotValid(_))
        ));
    }

    #[test]
    fn test_value_at_interpolates_inside_grid() {
        let sp = ramp();
        assert!((sp.value_at(415.0).unwrap() - 0.15).abs() < 1e-12);
        assert!((sp.value_at(420.0).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_value_at_clamps_below_start() {
        let sp = ramp();
        assert_eq!(sp.value_at(399.0).unwrap(), 0.0);
        assert_eq!(sp.value_at(-1.0e6).unwrap(), 0.0);
    }

    #[test]
    fn test_value_at_clamps_at_and_above_end() {
        let sp = ramp();
        assert_eq!(sp.value_at(440.0).unwrap(), 0.4);
        assert_eq!(sp.value_at(10_000.0).unwrap(), 0.4);
        // Bracket [430, 440] still interpolates.
        assert!((sp.value_at(435.0).unwrap() - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_value_at_single_sample() {
        let sp = Spectrum::new(500.0, 1.0, vec![0.7]).unwrap();
        assert_eq!(sp.value_at(400.0).unwrap(), 0.7);
        assert_eq!(sp.value_at(500.0).unwrap(), 0.7);
        assert_eq!(sp.value_at(600.0).unwrap(), 0.7);
    }

    #[test]
    fn test_value_at_empty_values_is_not_valid() {
        let sp = Spectrum {
            start_wavelength: 400.0,
            step_wavelength: 1.0,
            values: Vec::new(),
        };
        assert!(matches!(sp.value_at(400.0), Err(SpectralError::NotValid(_))));
    }

    #[test]
    fn test_values_on_grid_and_sample_at() {
        let sp = ramp();
        let grid = sp.values_on_grid(400.0, 5.0, 3).unwrap();
        assert_eq!(grid.len(), 3);
        assert!((grid[1] - 0.05).abs() < 1e-12);

        let picked = sp.sample_at(&[390.0, 425.0, 900.0]).unwrap();
        assert_eq!(picked[0], 0.0);
        assert!((picked[1] - 0.25).abs() < 1e-12);
        assert_eq!(picked[2], 0.4);
    }

    #[test]
    fn test_end_wavelength() {
        assert_eq!(ramp().end_wavelength(), 440.0);
        let single = Spectrum::new(500.0, 1.0, vec![0.7]).unwrap();
        assert_eq!(single.end_wavelength(), 500.0);
    }
}
