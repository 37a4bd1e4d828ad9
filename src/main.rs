use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use spectral_mask::config::MaskingConfig;
use spectral_mask::cube::{JsonCube, LineSource};
use spectral_mask::masking::{MaskingKind, MembershipMatrix};
use spectral_mask::output::{MaskImage, MaskWriter};

/// Classify every pixel of a hyperspectral image against a library of
/// reference spectra and print one row of 0/1 per image line.
#[derive(Parser)]
#[command(name = "spectral-mask", version, about, long_about = None)]
struct Cli {
    /// Image cube (JSON: wavelengths, samples, band-major lines)
    #[arg(value_name = "CUBE")]
    cube: PathBuf,

    /// Kind of measurement, selects the reference library and default threshold
    #[arg(short, long, value_enum, default_value_t = MaskingKind::Reflectance)]
    mode: MaskingKind,

    /// Masking config file (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Reference-spectrum directory, overriding the config for the chosen mode
    #[arg(short, long, value_name = "DIR")]
    library: Option<PathBuf>,

    /// SAM threshold in radians for every reference
    #[arg(short, long, value_name = "RADIANS")]
    threshold: Option<f64>,

    /// Inclusive band-index range used for the angle, e.g. 10:150
    #[arg(long, value_name = "START:END", value_parser = parse_band_range)]
    bands: Option<[usize; 2]>,

    /// Also write the mask as a PNG image
    #[arg(long, value_name = "FILE")]
    png: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_band_range(s: &str) -> Result<[usize; 2], String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid band index '{v}': {e}"))
    };
    Ok([parse(start)?, parse(end)?])
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &cli.config {
        Some(path) => MaskingConfig::load(path)?,
        None => MaskingConfig::default(),
    };
    if let Some(dir) = cli.library {
        match cli.mode {
            MaskingKind::Reflectance => config.reflectance_dir = dir,
            MaskingKind::Transmittance => config.transmittance_dir = dir,
        }
    }
    if cli.threshold.is_some() {
        config.threshold = cli.threshold;
    }
    if cli.bands.is_some() {
        config.band_range = cli.bands;
    }
    config.validate()?;

    let mut cube = JsonCube::load(&cli.cube)?;
    info!(
        "Loaded {} with {} bands, {} samples, {} lines",
        cli.cube.display(),
        cube.bands(),
        cube.samples(),
        cube.lines()
    );

    let mut state = config.build_state(cli.mode, cube.wavelengths())?;
    info!(
        "Masking against {} reference spectra ({})",
        state.num_references(),
        cli.mode
    );

    let stdout = io::stdout();
    let mut writer = MaskWriter::new(BufWriter::new(stdout.lock()));
    let mut image = cli.png.as_ref().map(|_| MaskImage::new(cube.samples()));
    let mut membership = MembershipMatrix::default();
    let mut matched = 0usize;

    for index in 0..cube.lines() {
        let line = cube.read_line(index)?;
        state.classify_line_into(&line, &mut membership);
        matched += membership.count_belonging();

        writer.write_line(&membership)?;
        if let Some(image) = image.as_mut() {
            image.push_line(&membership)?;
        }
    }
    writer.flush()?;

    if let (Some(path), Some(image)) = (&cli.png, &image) {
        image.save_png(path)?;
        info!("Wrote mask image {}", path.display());
    }

    for reference in state.references() {
        let drift = reference
            .drift()
            .map_or_else(|| "n/a".to_string(), |a| format!("{a:.4} rad"));
        info!(
            "Reference '{}' adapted from {} pixel(s), drift {drift}",
            reference.label(),
            reference.sample_count()
        );
    }
    info!(
        "{matched} of {} pixels masked",
        cube.samples() * cube.lines()
    );
    Ok(())
}
