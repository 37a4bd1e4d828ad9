// ---------------------------------------------------------------------------
// MembershipMatrix – per-line classification result
// ---------------------------------------------------------------------------

/// Rectangular `[sample][reference]` table of membership decisions for one
/// image line.
///
/// Owned by the caller; [`MaskingState::classify_line_into`](super::MaskingState::classify_line_into)
/// resizes and overwrites it, so one matrix can be reused across lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipMatrix {
    samples: usize,
    references: usize,
    cells: Vec<bool>,
}

impl MembershipMatrix {
    /// All-`false` matrix of the given shape.
    pub fn new(samples: usize, references: usize) -> Self {
        Self {
            samples,
            references,
            cells: vec![false; samples * references],
        }
    }

    /// Build from explicit rows. Every row must have the same length.
    pub fn from_rows(rows: &[Vec<bool>]) -> Option<Self> {
        let references = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != references) {
            return None;
        }
        Some(Self {
            samples: rows.len(),
            references,
            cells: rows.concat(),
        })
    }

    /// Reshape to `(samples, references)` and clear every cell.
    pub fn reset(&mut self, samples: usize, references: usize) {
        self.samples = samples;
        self.references = references;
        self.cells.clear();
        self.cells.resize(samples * references, false);
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn references(&self) -> usize {
        self.references
    }

    /// Membership of `sample` in reference `reference`.
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, sample: usize, reference: usize) -> bool {
        assert!(reference < self.references, "reference index out of bounds");
        self.cells[sample * self.references + reference]
    }

    pub fn set(&mut self, sample: usize, reference: usize, value: bool) {
        assert!(reference < self.references, "reference index out of bounds");
        self.cells[sample * self.references + reference] = value;
    }

    /// All reference decisions for one sample.
    pub fn row(&self, sample: usize) -> &[bool] {
        let start = sample * self.references;
        &self.cells[start..start + self.references]
    }

    /// Whether `sample` matched at least one reference.
    pub fn pixel_belongs(&self, sample: usize) -> bool {
        self.row(sample).iter().any(|&b| b)
    }

    /// [`pixel_belongs`](Self::pixel_belongs) for every sample, in order.
    pub fn belongs(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.samples).map(move |s| self.pixel_belongs(s))
    }

    /// Number of samples that matched at least one reference.
    pub fn count_belonging(&self) -> usize {
        self.belongs().filter(|&b| b).count()
    }
}
