use std::io;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Spectral layer errors (resampler + library)
// ---------------------------------------------------------------------------

/// Result type for spectrum parsing and library construction.
pub type SpectralResult<T> = Result<T, SpectralError>;

/// Errors raised while reading reference spectra.
#[derive(Error, Debug)]
pub enum SpectralError {
    /// The source could not be opened, or held no usable `(wavelength, amplitude)` pairs.
    #[error("spectrum not found or empty: {0}")]
    FileNotFound(String),

    /// Malformed or inconsistent spectral data.
    #[error("spectral data not valid: {0}")]
    NotValid(String),

    /// The library directory could not be enumerated.
    #[error("spectrum directory not found: {}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Every candidate file was rejected.
    #[error("no valid spectrum files in {0}")]
    DirectoryFileError(String),
}

// ---------------------------------------------------------------------------
// Masking engine errors
// ---------------------------------------------------------------------------

/// Result type for masking engine setup.
pub type MaskingResult<T> = Result<T, MaskingError>;

/// Errors raised while initializing or reconfiguring a [`MaskingState`](crate::masking::MaskingState).
#[derive(Error, Debug)]
pub enum MaskingError {
    #[error("error in constructing spectral library from reflectance spectra in {}", dir.display())]
    ReflectanceLibrary {
        dir: PathBuf,
        #[source]
        source: SpectralError,
    },

    #[error("error in constructing spectral library from transmittance spectra in {}", dir.display())]
    TransmittanceLibrary {
        dir: PathBuf,
        #[source]
        source: SpectralError,
    },

    /// The target image has no bands.
    #[error("no target wavelengths given")]
    NoBands,

    /// A reference vector does not match the band count.
    #[error("reference {index} has {actual} bands, expected {expected}")]
    BandMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("band range {start}..={end} is not inside 0..{bands}")]
    InvalidBandRange {
        start: usize,
        end: usize,
        bands: usize,
    },

    #[error("SAM threshold must be a finite positive angle, got {0}")]
    InvalidThreshold(f64),

    #[error("reference index {index} out of range ({count} references)")]
    NoSuchReference { index: usize, count: usize },

    /// A library spectrum could not be sampled at the target wavelengths.
    #[error(transparent)]
    Spectral(#[from] SpectralError),
}
