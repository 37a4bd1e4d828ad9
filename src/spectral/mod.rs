/// Spectral layer: reference spectra and their library.
///
/// Architecture:
/// ```text
///  reference-spectrum files (irregular wavelength steps)
///        │
///        ▼
///   ┌──────────┐
///   │ resample  │  parse pairs → uniform-grid Spectrum
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ library   │  directory / file list → SpectralLibrary
///   └──────────┘
///        │
///        ▼
///   Spectrum::value_at()  wavelength lookup used by the masking engine
/// ```

pub mod library;
pub mod model;
pub mod resample;

pub use library::{LibraryEntry, SpectralLibrary};
pub use model::Spectrum;
