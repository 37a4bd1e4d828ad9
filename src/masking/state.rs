use std::ops::RangeInclusive;

use log::{debug, trace, warn};

use super::membership::MembershipMatrix;
use super::mode::MaskingMode;
use super::sam::{angle_from_parts, dot, norm, spectral_angle};
use crate::error::{MaskingError, MaskingResult, SpectralError};
use crate::spectral::SpectralLibrary;

// ---------------------------------------------------------------------------
// ReferenceSpectrum – one classification target
// ---------------------------------------------------------------------------

/// A reference spectrum sampled at the image's band wavelengths, together with
/// its running-mean adaptation.
#[derive(Debug, Clone)]
pub struct ReferenceSpectrum {
    label: String,
    static_values: Vec<f64>,
    adaptive_values: Vec<f64>,
    sample_count: u64,
    threshold: f64,
}

impl ReferenceSpectrum {
    fn new(label: String, values: Vec<f64>, threshold: f64) -> Self {
        Self {
            label,
            adaptive_values: values.clone(),
            static_values: values,
            sample_count: 0,
            threshold,
        }
    }

    /// Name of the reference, taken from its source file when there is one.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The reference as sampled at initialization. Never modified.
    pub fn static_values(&self) -> &[f64] {
        &self.static_values
    }

    /// Running mean of every pixel classified as this reference so far,
    /// equal to [`static_values`](Self::static_values) until the first match.
    pub fn adaptive_values(&self) -> &[f64] {
        &self.adaptive_values
    }

    /// Number of pixels folded into the adaptive values.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// SAM threshold in radians; a pixel matches below it.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// SAM angle between the static and adaptive spectra, i.e. how far the
    /// reference has drifted since initialization. `None` for an all-zero reference.
    pub fn drift(&self) -> Option<f64> {
        spectral_angle(&self.static_values, &self.adaptive_values)
    }

    /// Fold `pixel` into the running mean over `bands` and return the new norm
    /// of the adapted band range.
    fn absorb(&mut self, pixel: &[f64], bands: RangeInclusive<usize>) -> f64 {
        self.sample_count += 1;
        let n = self.sample_count as f64;
        let adaptive = &mut self.adaptive_values[bands];
        for (mean, &value) in adaptive.iter_mut().zip(pixel) {
            *mean += (value - *mean) / n;
        }
        norm(adaptive)
    }
}

// ---------------------------------------------------------------------------
// MaskingState – adaptive SAM classifier for one image
// ---------------------------------------------------------------------------

/// Per-image masking state.
///
/// Lines must be fed through [`classify_line`](Self::classify_line) in image
/// order: every matching pixel moves its reference's adaptive spectrum, so the
/// result for a line depends on all lines classified before it.
#[derive(Debug, Clone)]
pub struct MaskingState {
    target_wavelengths: Vec<f64>,
    band_start: usize,
    band_end: usize,
    references: Vec<ReferenceSpectrum>,
}

impl MaskingState {
    /// Build the reference library for `mode` and sample it at `target_wavelengths`.
    pub fn init(target_wavelengths: &[f64], mode: &MaskingMode) -> MaskingResult<Self> {
        let library = SpectralLibrary::from_directory(mode.library_dir())
            .map_err(|e| mode.library_error(e))?;
        let references = sample_library(&library, target_wavelengths)
            .map_err(|e| mode.library_error(e))?;
        debug!(
            "Initialized {} masking with {} reference spectra over {} bands",
            mode.kind(),
            references.len(),
            target_wavelengths.len()
        );
        Self::from_labeled(references, target_wavelengths, mode.default_threshold())
    }

    /// Sample an already built library at `target_wavelengths`.
    pub fn from_library(
        library: &SpectralLibrary,
        target_wavelengths: &[f64],
        threshold: f64,
    ) -> MaskingResult<Self> {
        let references = sample_library(library, target_wavelengths)?;
        Self::from_labeled(references, target_wavelengths, threshold)
    }

    /// Use reference vectors that are already sampled at `target_wavelengths`.
    pub fn from_references(
        references: Vec<Vec<f64>>,
        target_wavelengths: &[f64],
        threshold: f64,
    ) -> MaskingResult<Self> {
        let labeled = references
            .into_iter()
            .enumerate()
            .map(|(k, values)| (format!("reference {k}"), values))
            .collect();
        Self::from_labeled(labeled, target_wavelengths, threshold)
    }

    fn from_labeled(
        references: Vec<(String, Vec<f64>)>,
        target_wavelengths: &[f64],
        threshold: f64,
    ) -> MaskingResult<Self> {
        let bands = target_wavelengths.len();
        if bands == 0 {
            return Err(MaskingError::NoBands);
        }
        validate_threshold(threshold)?;

        let mut built = Vec::with_capacity(references.len());
        for (index, (label, values)) in references.into_iter().enumerate() {
            if values.len() != bands {
                return Err(MaskingError::BandMismatch {
                    index,
                    expected: bands,
                    actual: values.len(),
                });
            }
            if norm(&values) == 0.0 {
                warn!("Reference '{label}' is all zeros and will never match");
            }
            built.push(ReferenceSpectrum::new(label, values, threshold));
        }

        Ok(Self {
            target_wavelengths: target_wavelengths.to_vec(),
            band_start: 0,
            band_end: bands - 1,
            references: built,
        })
    }

    // -- Accessors --

    pub fn target_wavelengths(&self) -> &[f64] {
        &self.target_wavelengths
    }

    pub fn num_bands(&self) -> usize {
        self.target_wavelengths.len()
    }

    pub fn num_references(&self) -> usize {
        self.references.len()
    }

    pub fn references(&self) -> &[ReferenceSpectrum] {
        &self.references
    }

    /// Inclusive band-index range used for angle computation.
    pub fn band_range(&self) -> RangeInclusive<usize> {
        self.band_start..=self.band_end
    }

    /// Restrict angle computation and adaptation to bands `start..=end`.
    pub fn set_band_range(&mut self, start: usize, end: usize) -> MaskingResult<()> {
        let bands = self.num_bands();
        if start > end || end >= bands {
            return Err(MaskingError::InvalidBandRange { start, end, bands });
        }
        self.band_start = start;
        self.band_end = end;
        Ok(())
    }

    /// Override the threshold of one reference.
    pub fn set_threshold(&mut self, reference: usize, threshold: f64) -> MaskingResult<()> {
        validate_threshold(threshold)?;
        let count = self.references.len();
        let target = self
            .references
            .get_mut(reference)
            .ok_or(MaskingError::NoSuchReference {
                index: reference,
                count,
            })?;
        target.threshold = threshold;
        Ok(())
    }

    /// Override the threshold of every reference.
    pub fn set_all_thresholds(&mut self, threshold: f64) -> MaskingResult<()> {
        validate_threshold(threshold)?;
        for reference in &mut self.references {
            reference.threshold = threshold;
        }
        Ok(())
    }

    // -- Classification --

    /// Classify one band-major image line (`line[band * samples + sample]`)
    /// and adapt the references to the pixels that matched.
    pub fn classify_line(&mut self, line: &[f64]) -> MembershipMatrix {
        let mut membership = MembershipMatrix::default();
        self.classify_line_into(line, &mut membership);
        membership
    }

    /// Like [`classify_line`](Self::classify_line), writing into a reusable matrix.
    ///
    /// A pixel matches reference `k` when its angle to either the static or
    /// the adaptive spectrum of `k` is strictly below the threshold of `k`.
    /// Pixels are processed in sample order and each match updates the
    /// adaptive spectrum before the next pixel is looked at.
    pub fn classify_line_into(&mut self, line: &[f64], membership: &mut MembershipMatrix) {
        let bands = self.num_bands();
        let samples = line.len() / bands;
        if line.len() % bands != 0 {
            warn!(
                "Line of {} values is not a multiple of {bands} bands, ignoring the last {}",
                line.len(),
                line.len() % bands
            );
        }
        membership.reset(samples, self.references.len());

        let range = self.band_range();
        let static_norms: Vec<f64> = self
            .references
            .iter()
            .map(|r| norm(&r.static_values[range.clone()]))
            .collect();
        let mut adaptive_norms: Vec<f64> = self
            .references
            .iter()
            .map(|r| norm(&r.adaptive_values[range.clone()]))
            .collect();

        let mut pixel = vec![0.0; range.end() - range.start() + 1];
        let mut zero_pixels = 0usize;

        for sample in 0..samples {
            for (value, band) in pixel.iter_mut().zip(range.clone()) {
                *value = line[band * samples + sample];
            }
            let pixel_norm = norm(&pixel);
            if pixel_norm == 0.0 {
                zero_pixels += 1;
            }

            for (k, reference) in self.references.iter_mut().enumerate() {
                let static_angle = angle_from_parts(
                    dot(&pixel, &reference.static_values[range.clone()]),
                    pixel_norm,
                    static_norms[k],
                );
                let adaptive_angle = angle_from_parts(
                    dot(&pixel, &reference.adaptive_values[range.clone()]),
                    pixel_norm,
                    adaptive_norms[k],
                );

                let below = |angle: Option<f64>| angle.is_some_and(|a| a < reference.threshold);
                let belongs = below(static_angle) || below(adaptive_angle);
                membership.set(sample, k, belongs);

                if belongs {
                    adaptive_norms[k] = reference.absorb(&pixel, range.clone());
                }
            }
        }

        if zero_pixels > 0 {
            debug!("{zero_pixels} zero-valued pixel(s) in line left unmasked");
        }
        trace!(
            "{} of {samples} samples matched a reference",
            membership.count_belonging()
        );
    }
}

/// Sample every library spectrum at the target wavelengths.
fn sample_library(
    library: &SpectralLibrary,
    target_wavelengths: &[f64],
) -> Result<Vec<(String, Vec<f64>)>, SpectralError> {
    library
        .entries
        .iter()
        .map(|entry| {
            let label = entry
                .source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.source.display().to_string());
            let (start, end) = (entry.spectrum.start_wavelength, entry.spectrum.end_wavelength());
            let outside = target_wavelengths
                .iter()
                .filter(|&&w| w < start || w > end)
                .count();
            if outside > 0 {
                warn!(
                    "Reference '{label}' covers {start}-{end} nm; {outside} band(s) outside it use the edge value"
                );
            }
            Ok((label, entry.spectrum.sample_at(target_wavelengths)?))
        })
        .collect()
}

fn validate_threshold(threshold: f64) -> MaskingResult<()> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(MaskingError::InvalidThreshold(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::MaskingKind;
    use crate::spectral::{LibraryEntry, Spectrum};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Lay out pixels (each a band vector) as one band-major line.
    fn band_major(pixels: &[Vec<f64>]) -> Vec<f64> {
        let bands = pixels[0].len();
        let mut line = vec![0.0; bands * pixels.len()];
        for (s, px) in pixels.iter().enumerate() {
            for (b, &v) in px.iter().enumerate() {
                line[b * pixels.len() + s] = v;
            }
        }
        line
    }

    fn single_reference(reference: Vec<f64>, threshold: f64) -> MaskingState {
        let wavelengths: Vec<f64> = (0..reference.len()).map(|i| 500.0 + 10.0 * i as f64).collect();
        MaskingState::from_references(vec![reference], &wavelengths, threshold).unwrap()
    }

    #[test]
    fn test_from_references_defaults() {
        let state = MaskingState::from_references(
            vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]],
            &[450.0, 550.0, 650.0],
            0.3,
        )
        .unwrap();
        assert_eq!(state.num_references(), 2);
        assert_eq!(state.num_bands(), 3);
        assert_eq!(state.band_range(), 0..=2);
        for r in state.references() {
            assert_eq!(r.sample_count(), 0);
            assert_eq!(r.static_values(), r.adaptive_values());
            assert_eq!(r.threshold(), 0.3);
        }
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            MaskingState::from_references(vec![vec![1.0]], &[], 0.3),
            Err(MaskingError::NoBands)
        ));
        assert!(matches!(
            MaskingState::from_references(vec![vec![1.0]], &[400.0, 500.0], 0.3),
            Err(MaskingError::BandMismatch { index: 0, expected: 2, actual: 1 })
        ));
        assert!(matches!(
            MaskingState::from_references(vec![vec![1.0]], &[400.0], f64::NAN),
            Err(MaskingError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_adaptive_reference_is_running_mean() {
        let mut state = single_reference(vec![1.0, 1.0, 1.0], 4.0);
        let lines = [
            vec![vec![2.0, 1.0, 0.5], vec![0.3, 0.9, 1.7]],
            vec![vec![5.0, 4.0, 3.0]],
            vec![vec![1.5, 0.2, 2.2], vec![0.8, 0.8, 0.1], vec![3.0, 1.0, 2.0]],
        ];

        let mut seen: Vec<Vec<f64>> = Vec::new();
        for pixels in &lines {
            let m = state.classify_line(&band_major(pixels));
            assert!(m.belongs().all(|b| b));
            seen.extend(pixels.iter().cloned());
        }

        let reference = &state.references()[0];
        assert_eq!(reference.sample_count(), seen.len() as u64);
        for band in 0..3 {
            let mean = seen.iter().map(|p| p[band]).sum::<f64>() / seen.len() as f64;
            assert!((reference.adaptive_values()[band] - mean).abs() < 1e-12);
        }
        assert_eq!(reference.static_values(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_drift_tracks_adaptation() {
        let mut state = single_reference(vec![1.0, 0.0], 4.0);
        assert_eq!(state.references()[0].drift(), Some(0.0));

        state.classify_line(&band_major(&[vec![0.0, 2.0]]));
        let drift = state.references()[0].drift().unwrap();
        assert!((drift - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        let zero = single_reference(vec![0.0, 0.0], 0.3);
        assert_eq!(zero.references()[0].drift(), None);
    }

    #[test]
    fn test_first_match_replaces_static_seed() {
        let mut state = single_reference(vec![1.0, 0.0], 4.0);
        state.classify_line(&band_major(&[vec![0.25, 0.75]]));
        let adaptive = state.references()[0].adaptive_values();
        assert!((adaptive[0] - 0.25).abs() < 1e-15);
        assert!((adaptive[1] - 0.75).abs() < 1e-15);
    }

    #[test]
    fn test_angle_equal_to_threshold_does_not_match() {
        let threshold = (1.0 / 2f64.sqrt()).acos();
        let mut state = single_reference(vec![1.0, 0.0], threshold);

        let m = state.classify_line(&band_major(&[vec![1.0, 1.0]]));
        assert!(!m.get(0, 0));
        assert_eq!(state.references()[0].sample_count(), 0);
    }

    #[test]
    fn test_zero_pixel_never_matches() {
        let mut state = single_reference(vec![1.0, 2.0, 3.0], 4.0);
        let m = state.classify_line(&band_major(&[vec![0.0, 0.0, 0.0], vec![1.0, 2.0, 3.0]]));
        assert!(!m.pixel_belongs(0));
        assert!(m.pixel_belongs(1));
        let reference = &state.references()[0];
        assert_eq!(reference.sample_count(), 1);
        assert!(reference.adaptive_values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_zero_reference_never_matches() {
        let mut state = single_reference(vec![0.0, 0.0], 4.0);
        let m = state.classify_line(&band_major(&[vec![1.0, 1.0], vec![0.0, 0.0]]));
        assert_eq!(m.count_belonging(), 0);
    }

    #[test]
    fn test_adaptive_match_catches_drifted_pixel() {
        // Angles in 2D against [1, 0] are atan(y): 0.273 and 0.540 rad.
        let line = band_major(&[vec![1.0, 0.6], vec![1.0, 0.28]]);
        let mut state = single_reference(vec![1.0, 0.0], 0.3);

        let first = state.classify_line(&line);
        assert_eq!(first.belongs().collect::<Vec<_>>(), vec![false, true]);

        // Adapted towards [1, 0.28], the first pixel is now 0.267 rad away.
        let second = state.classify_line(&line);
        assert_eq!(second.belongs().collect::<Vec<_>>(), vec![true, true]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_fresh_states_reproduce_the_same_sequence() {
        let lines = [
            band_major(&[vec![1.0, 0.6], vec![1.0, 0.28], vec![0.0, 1.0]]),
            band_major(&[vec![1.0, 0.5], vec![1.0, 0.1], vec![0.2, 0.0]]),
        ];
        let run = || {
            let mut state = single_reference(vec![1.0, 0.0], 0.3);
            let results: Vec<MembershipMatrix> = lines.iter().map(|l| state.classify_line(l)).collect();
            (results, state.references()[0].adaptive_values().to_vec())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_match_on_any_reference() {
        let mut state = MaskingState::from_references(
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
            &[450.0, 550.0, 650.0],
            0.2,
        )
        .unwrap();
        let m = state.classify_line(&band_major(&[
            vec![0.1, 1.0, 0.05],
            vec![1.0, 1.0, 1.0],
        ]));
        assert_eq!(m.row(0), &[false, true, false]);
        assert!(m.pixel_belongs(0));
        assert_eq!(m.row(1), &[false, false, false]);
        assert!(!m.pixel_belongs(1));
        assert_eq!(state.references()[1].sample_count(), 1);
        assert_eq!(state.references()[0].sample_count(), 0);
    }

    #[test]
    fn test_band_range_limits_reads_and_writes() {
        let mut state = single_reference(vec![1.0, 1.0, 1.0, 1.0], 0.1);
        state.set_band_range(1, 2).unwrap();

        // Bands 0 and 3 are wildly off but excluded from the angle.
        let m = state.classify_line(&band_major(&[vec![100.0, 2.0, 2.0, -50.0]]));
        assert!(m.pixel_belongs(0));

        let adaptive = state.references()[0].adaptive_values();
        assert_eq!(adaptive[0], 1.0);
        assert_eq!(adaptive[3], 1.0);
        assert!((adaptive[1] - 2.0).abs() < 1e-12);
        assert!((adaptive[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_band_range_is_rejected() {
        let mut state = single_reference(vec![1.0, 1.0, 1.0], 0.3);
        assert!(matches!(
            state.set_band_range(2, 1),
            Err(MaskingError::InvalidBandRange { .. })
        ));
        assert!(matches!(
            state.set_band_range(0, 3),
            Err(MaskingError::InvalidBandRange { bands: 3, .. })
        ));
        assert_eq!(state.band_range(), 0..=2);
    }

    #[test]
    fn test_threshold_overrides() {
        let mut state = MaskingState::from_references(
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            &[500.0, 600.0],
            0.3,
        )
        .unwrap();
        state.set_threshold(1, 0.05).unwrap();
        assert_eq!(state.references()[1].threshold(), 0.05);
        assert!(matches!(
            state.set_threshold(2, 0.1),
            Err(MaskingError::NoSuchReference { index: 2, count: 2 })
        ));
        state.set_all_thresholds(1.0).unwrap();
        assert!(state.references().iter().all(|r| r.threshold() == 1.0));
        assert!(state.set_all_thresholds(-1.0).is_err());
    }

    #[test]
    fn test_membership_matrix_is_reused() {
        let mut state = single_reference(vec![1.0, 0.0], 0.3);
        let mut m = MembershipMatrix::new(10, 7);
        state.classify_line_into(&band_major(&[vec![1.0, 0.0], vec![0.0, 1.0]]), &mut m);
        assert_eq!((m.samples(), m.references()), (2, 1));
        assert_eq!(m.belongs().collect::<Vec<_>>(), vec![true, false]);
    }

    #[test]
    fn test_partial_trailing_pixel_is_ignored() {
        let mut state = single_reference(vec![1.0, 0.0], 0.3);
        let m = state.classify_line(&[1.0, 0.0, 0.0]);
        assert_eq!(m.samples(), 1);
    }

    #[test]
    fn test_from_library_samples_at_target_wavelengths() {
        let library = SpectralLibrary {
            entries: vec![LibraryEntry {
                source: PathBuf::from("lib/skin.txt"),
                spectrum: Spectrum::new(400.0, 100.0, vec![0.0, 1.0, 2.0]).unwrap(),
            }],
        };
        let state = MaskingState::from_library(&library, &[350.0, 450.0, 600.0, 700.0], 0.3).unwrap();
        let reference = &state.references()[0];
        assert_eq!(reference.label(), "skin");
        assert_eq!(reference.static_values(), &[0.0, 0.5, 2.0, 2.0]);
    }

    #[test]
    fn test_init_reads_mode_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("hb.txt"), "400 1.0\n500 2.0\n600 1.0\n").unwrap();
        fs::write(dir.path().join("readme.md"), "no spectrum here").unwrap();

        let mode = MaskingMode::new(MaskingKind::Transmittance, dir.path());
        let state = MaskingState::init(&[400.0, 450.0, 500.0], &mode).unwrap();
        assert_eq!(state.num_references(), 1);
        assert_eq!(state.references()[0].threshold(), 0.10);
        assert_eq!(state.references()[0].static_values(), &[1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_init_maps_library_failure_to_mode_error() {
        let dir = TempDir::new().unwrap();
        let reflectance = MaskingMode::new(MaskingKind::Reflectance, dir.path().join("missing"));
        assert!(matches!(
            MaskingState::init(&[500.0], &reflectance),
            Err(MaskingError::ReflectanceLibrary { source: SpectralError::DirectoryNotFound { .. }, .. })
        ));

        let transmittance = MaskingMode::new(MaskingKind::Transmittance, dir.path());
        assert!(matches!(
            MaskingState::init(&[500.0], &transmittance),
            Err(MaskingError::TransmittanceLibrary { source: SpectralError::DirectoryFileError(_), .. })
        ));
    }
}
