use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LineSource – what the masking driver needs from an image reader
// ---------------------------------------------------------------------------

/// A hyperspectral image that can be read one line at a time.
///
/// Lines are band-major: `line[band * samples + sample]`.
pub trait LineSource {
    /// Centre wavelength of every band.
    fn wavelengths(&self) -> &[f64];

    /// Spatial samples per line.
    fn samples(&self) -> usize;

    /// Number of lines.
    fn lines(&self) -> usize;

    /// Read line `index` (`bands * samples` values).
    fn read_line(&mut self, index: usize) -> Result<Vec<f64>>;

    fn bands(&self) -> usize {
        self.wavelengths().len()
    }
}

// ---------------------------------------------------------------------------
// JsonCube – small in-memory image stored as JSON
// ---------------------------------------------------------------------------

/// In-memory image, handy for demos and tests.
///
/// ```json
/// {
///   "wavelengths": [450.0, 550.0, 650.0],
///   "samples": 2,
///   "lines": [[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonCube {
    pub wavelengths: Vec<f64>,
    pub samples: usize,
    #[serde(rename = "lines")]
    pub data: Vec<Vec<f64>>,
}

impl JsonCube {
    /// Load and validate a cube file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading cube {}", path.display()))?;
        let cube: JsonCube = serde_json::from_str(&text)
            .with_context(|| format!("parsing cube {}", path.display()))?;
        cube.validate()?;
        Ok(cube)
    }

    /// Write the cube as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string(self).context("serializing cube")?;
        std::fs::write(path, text).with_context(|| format!("writing cube {}", path.display()))
    }

    /// Check that every line holds exactly `bands * samples` values.
    pub fn validate(&self) -> Result<()> {
        if self.wavelengths.is_empty() {
            bail!("cube has no wavelengths");
        }
        let expected = self.wavelengths.len() * self.samples;
        for (i, line) in self.data.iter().enumerate() {
            if line.len() != expected {
                bail!(
                    "line {i} has {} values, expected {} bands x {} samples",
                    line.len(),
                    self.wavelengths.len(),
                    self.samples
                );
            }
        }
        Ok(())
    }
}

impl LineSource for JsonCube {
    fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    fn samples(&self) -> usize {
        self.samples
    }

    fn lines(&self) -> usize {
        self.data.len()
    }

    fn read_line(&mut self, index: usize) -> Result<Vec<f64>> {
        self.data
            .get(index)
            .cloned()
            .with_context(|| format!("line {index} out of range ({} lines)", self.data.len()))
    }
}
