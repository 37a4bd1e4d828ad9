use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::model::Spectrum;
use crate::error::{SpectralError, SpectralResult};

// ---------------------------------------------------------------------------
// LibraryEntry – one accepted reference spectrum
// ---------------------------------------------------------------------------

/// A resampled reference spectrum together with the file it came from.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    pub source: PathBuf,
    pub spectrum: Spectrum,
}

// ---------------------------------------------------------------------------
// SpectralLibrary – the set of reference spectra used for masking
// ---------------------------------------------------------------------------

/// Reference spectra read from a directory or an explicit file list.
///
/// Entries keep their own wavelength grids; they are only projected onto a
/// common grid when a masking state samples them.
#[derive(Debug, Clone)]
pub struct SpectralLibrary {
    pub entries: Vec<LibraryEntry>,
}

impl SpectralLibrary {
    /// Read every file in `directory` as a reference spectrum.
    ///
    /// Files are visited in file-name order. Unreadable or malformed files are
    /// skipped; the build only fails when none of them is usable.
    pub fn from_directory(directory: &Path) -> SpectralResult<Self> {
        let mut paths: Vec<PathBuf> = fs::read_dir(directory)
            .and_then(|dir| {
                dir.map(|entry| entry.map(|e| e.path()))
                    .collect::<io::Result<Vec<_>>>()
            })
            .map_err(|source| SpectralError::DirectoryNotFound {
                path: directory.to_path_buf(),
                source,
            })?;
        paths.sort();

        Self::collect(&paths).ok_or_else(|| {
            SpectralError::DirectoryFileError(directory.display().to_string())
        })
    }

    /// Read each of `files` as a reference spectrum, skipping the ones that fail.
    pub fn from_files<P: AsRef<Path>>(files: &[P]) -> SpectralResult<Self> {
        Self::collect(files).ok_or_else(|| {
            SpectralError::DirectoryFileError(format!("{} candidate file(s)", files.len()))
        })
    }

    fn collect<P: AsRef<Path>>(files: &[P]) -> Option<Self> {
        let entries: Vec<LibraryEntry> = files
            .iter()
            .filter_map(|path| {
                let path = path.as_ref();
                match Spectrum::from_file(path) {
                    Ok(spectrum) => Some(LibraryEntry {
                        source: path.to_path_buf(),
                        spectrum,
                    }),
                    Err(e) => {
                        debug!("Skipping reference spectrum {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect();

        if entries.is_empty() {
            return None;
        }
        info!(
            "Loaded {} reference spectra out of {} candidate file(s)",
            entries.len(),
            files.len()
        );
        Some(SpectralLibrary { entries })
    }

    /// Number of spectra.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the library is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the spectra in library order.
    pub fn spectra(&self) -> impl Iterator<Item = &Spectrum> {
        self.entries.iter().map(|e| &e.spectrum)
    }
}
