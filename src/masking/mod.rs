/// Adaptive masking engine.
///
/// Architecture:
/// ```text
///  SpectralLibrary ──► MaskingState::init(wavelengths, mode)
///                            │  static + adaptive reference per spectrum
///                            ▼
///  band-major line ──► classify_line() ──► MembershipMatrix [sample][reference]
///                            │
///                            └─ matching pixels update the adaptive
///                               references (running mean) before the next pixel
/// ```

pub mod membership;
pub mod mode;
pub mod sam;
pub mod state;

pub use membership::MembershipMatrix;
pub use mode::{MaskingKind, MaskingMode, REFLECTANCE_THRESHOLD, TRANSMITTANCE_THRESHOLD};
pub use state::{MaskingState, ReferenceSpectrum};
