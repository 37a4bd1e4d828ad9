use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::masking::{MaskingKind, MaskingMode, MaskingState};

// ---------------------------------------------------------------------------
// MaskingConfig – where reference spectra live and optional overrides
// ---------------------------------------------------------------------------

/// Masking configuration, usually read from a JSON file:
///
/// ```json
/// {
///   "reflectance_dir": "spectra/reflectance",
///   "transmittance_dir": "spectra/transmittance",
///   "threshold": 0.25,
///   "band_range": [10, 150]
/// }
/// ```
///
/// Every field is optional. Relative directories are resolved against the
/// directory containing the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Reference spectra for reflectance masking.
    pub reflectance_dir: PathBuf,
    /// Reference spectra for transmittance masking.
    pub transmittance_dir: PathBuf,
    /// SAM threshold (radians) for every reference, replacing the mode default.
    pub threshold: Option<f64>,
    /// Inclusive `[start, end]` band indices used for angle computation.
    pub band_range: Option<[usize; 2]>,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            reflectance_dir: PathBuf::from("spectra/reflectance"),
            transmittance_dir: PathBuf::from("spectra/transmittance"),
            threshold: None,
            band_range: None,
        }
    }
}

impl MaskingConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: MaskingConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.reflectance_dir = base.join(&config.reflectance_dir);
            config.transmittance_dir = base.join(&config.transmittance_dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject overrides that cannot be applied to any image.
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.threshold {
            if !(t.is_finite() && t > 0.0) {
                bail!("threshold must be a positive angle in radians, got {t}");
            }
        }
        if let Some([start, end]) = self.band_range {
            if start > end {
                bail!("band_range start {start} is after end {end}");
            }
        }
        Ok(())
    }

    /// The masking mode for `kind`, pointing at its configured directory.
    pub fn mode(&self, kind: MaskingKind) -> MaskingMode {
        let dir = match kind {
            MaskingKind::Reflectance => &self.reflectance_dir,
            MaskingKind::Transmittance => &self.transmittance_dir,
        };
        MaskingMode::new(kind, dir.clone())
    }

    /// Initialize a masking state for an image and apply the overrides.
    pub fn build_state(&self, kind: MaskingKind, wavelengths: &[f64]) -> Result<MaskingState> {
        let mode = self.mode(kind);
        let mut state = MaskingState::init(wavelengths, &mode)
            .context("initializing masking parameters")?;

        if let Some(threshold) = self.threshold {
            state.set_all_thresholds(threshold)?;
        }
        if let Some([start, end]) = self.band_range {
            state.set_band_range(start, end)?;
        }
        Ok(state)
    }
}
