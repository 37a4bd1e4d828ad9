use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use image::{GrayImage, ImageFormat};

use crate::masking::MembershipMatrix;

// ---------------------------------------------------------------------------
// Text output: one row of 0/1 tokens per image line
// ---------------------------------------------------------------------------

/// Writes the per-pixel "belongs" decision of each line as space-separated
/// `0`/`1` tokens, one row per image line.
pub struct MaskWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> MaskWriter<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .flexible(true)
            .from_writer(inner);
        Self { writer }
    }

    pub fn write_line(&mut self, membership: &MembershipMatrix) -> Result<()> {
        self.writer
            .write_record(membership.belongs().map(|b| if b { "1" } else { "0" }))
            .context("writing mask line")
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flushing mask output")
    }
}

// ---------------------------------------------------------------------------
// Image output: the whole mask as an 8-bit PNG
// ---------------------------------------------------------------------------

/// Collects mask lines and renders them as a black/white image.
#[derive(Debug, Default)]
pub struct MaskImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl MaskImage {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            height: 0,
            pixels: Vec::new(),
        }
    }

    /// Append one line; matching pixels are white.
    pub fn push_line(&mut self, membership: &MembershipMatrix) -> Result<()> {
        if membership.samples() != self.width {
            bail!(
                "mask line has {} samples, image is {} wide",
                membership.samples(),
                self.width
            );
        }
        self.pixels
            .extend(membership.belongs().map(|b| if b { u8::MAX } else { 0 }));
        self.height += 1;
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn to_image(&self) -> Result<GrayImage> {
        GrayImage::from_raw(
            u32::try_from(self.width).context("mask too wide")?,
            u32::try_from(self.height).context("mask too tall")?,
            self.pixels.clone(),
        )
        .context("mask buffer does not match its dimensions")
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.to_image()?
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("writing mask image {}", path.display()))
    }
}
