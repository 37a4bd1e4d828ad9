use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MaskingError, SpectralError};

/// Default SAM threshold for reflectance data, in radians.
pub const REFLECTANCE_THRESHOLD: f64 = 0.3;
/// Default SAM threshold for transmittance data, in radians.
pub const TRANSMITTANCE_THRESHOLD: f64 = 0.10;

// ---------------------------------------------------------------------------
// MaskingKind – which kind of measurement is being masked
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MaskingKind {
    Reflectance,
    Transmittance,
}

impl fmt::Display for MaskingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskingKind::Reflectance => write!(f, "reflectance"),
            MaskingKind::Transmittance => write!(f, "transmittance"),
        }
    }
}

// ---------------------------------------------------------------------------
// MaskingMode – kind plus where its reference spectra live
// ---------------------------------------------------------------------------

/// Masking mode, carrying the directory of reference spectra for that mode.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskingMode {
    Reflectance { library_dir: PathBuf },
    Transmittance { library_dir: PathBuf },
}

impl MaskingMode {
    pub fn new(kind: MaskingKind, library_dir: impl Into<PathBuf>) -> Self {
        let library_dir = library_dir.into();
        match kind {
            MaskingKind::Reflectance => MaskingMode::Reflectance { library_dir },
            MaskingKind::Transmittance => MaskingMode::Transmittance { library_dir },
        }
    }

    pub fn kind(&self) -> MaskingKind {
        match self {
            MaskingMode::Reflectance { .. } => MaskingKind::Reflectance,
            MaskingMode::Transmittance { .. } => MaskingKind::Transmittance,
        }
    }

    /// Directory holding the reference spectra for this mode.
    pub fn library_dir(&self) -> &Path {
        match self {
            MaskingMode::Reflectance { library_dir } | MaskingMode::Transmittance { library_dir } => {
                library_dir
            }
        }
    }

    /// SAM threshold assigned to every reference spectrum at initialization.
    pub fn default_threshold(&self) -> f64 {
        match self {
            MaskingMode::Reflectance { .. } => REFLECTANCE_THRESHOLD,
            MaskingMode::Transmittance { .. } => TRANSMITTANCE_THRESHOLD,
        }
    }

    /// Wrap a library build failure in this mode's error variant.
    pub(crate) fn library_error(&self, source: SpectralError) -> MaskingError {
        let dir = self.library_dir().to_path_buf();
        match self {
            MaskingMode::Reflectance { .. } => MaskingError::ReflectanceLibrary { dir, source },
            MaskingMode::Transmittance { .. } => MaskingError::TransmittanceLibrary { dir, source },
        }
    }
}
