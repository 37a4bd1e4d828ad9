//! Adaptive Spectral Angle Mapper (SAM) masking for hyperspectral images.
//!
//! Reference spectra are read from text files with irregular wavelength
//! sampling ([`spectral`]), sampled at the image's band wavelengths, and
//! compared against every pixel of each image line ([`masking`]). References
//! adapt towards the pixels they match as the image is processed.

pub mod config;
pub mod cube;
pub mod error;
pub mod masking;
pub mod output;
pub mod spectral;

pub use config::MaskingConfig;
pub use error::{MaskingError, SpectralError};
pub use masking::{MaskingKind, MaskingMode, MaskingState, MembershipMatrix};
pub use spectral::{SpectralLibrary, Spectrum};
