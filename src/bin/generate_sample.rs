use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use spectral_mask::config::MaskingConfig;
use spectral_mask::cube::JsonCube;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Baseline plus absorption-like dips, evaluated at `wavelength`.
fn material(wavelength: f64, baseline: f64, slope: f64, dips: &[(f64, f64, f64)]) -> f64 {
    let absorbed: f64 = dips
        .iter()
        .map(|&(mu, sigma, depth)| gaussian(wavelength, mu, sigma, depth))
        .sum();
    (baseline + slope * (wavelength - 400.0) - absorbed).max(0.0)
}

/// Skin-like reflectance: haemoglobin dips near 540/575 nm, rising towards NIR.
fn skin(wavelength: f64) -> f64 {
    material(
        wavelength,
        0.25,
        0.0006,
        &[(420.0, 15.0, 0.12), (542.0, 12.0, 0.08), (576.0, 10.0, 0.09)],
    )
}

/// Flat, slightly declining background (fabric, bedding, ...).
fn background(wavelength: f64) -> f64 {
    material(wavelength, 0.55, -0.0002, &[(700.0, 60.0, 0.05)])
}

/// Deterministic sensor noise: SplitMix64 uniforms through Box-Muller.
struct Noise(u64);

impl Noise {
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    fn gauss(&mut self, std_dev: f64) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

/// Write a reference spectrum with deliberately uneven wavelength spacing.
fn write_reference(path: &Path, f: impl Fn(f64) -> f64) -> Result<()> {
    let mut text = String::new();
    let mut wavelength = 380.0;
    let mut i = 0;
    while wavelength <= 1020.0 {
        writeln!(text, "{wavelength:.1}\t{:.6}", f(wavelength))?;
        wavelength += if i % 3 == 0 { 2.5 } else { 7.5 };
        i += 1;
    }
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn main() -> Result<()> {
    let mut noise = Noise(42);

    // 120 bands, 405 → 1000 nm
    let wavelengths: Vec<f64> = (0..120).map(|i| 405.0 + i as f64 * 5.0).collect();
    let samples = 64;
    let lines = 48;

    // A skin-coloured disc in the middle of a background scene.
    let (cx, cy, radius) = (32.0, 24.0, 14.0);
    let mut data = Vec::with_capacity(lines);
    let mut skin_pixels = 0usize;
    for line in 0..lines {
        let mut values = vec![0.0; wavelengths.len() * samples];
        for sample in 0..samples {
            let dx = sample as f64 - cx;
            let dy = line as f64 - cy;
            let is_skin = dx * dx + dy * dy <= radius * radius;
            if is_skin {
                skin_pixels += 1;
            }
            // Illumination varies across the scene; SAM ignores overall brightness.
            let brightness = 0.6 + 0.4 * (sample as f64 / samples as f64);
            for (band, &wl) in wavelengths.iter().enumerate() {
                let base = if is_skin { skin(wl) } else { background(wl) };
                values[band * samples + sample] = brightness * base + noise.gauss(0.004);
            }
        }
        data.push(values);
    }

    let cube = JsonCube {
        wavelengths,
        samples,
        data,
    };
    let cube_path = Path::new("sample_cube.json");
    cube.save(cube_path)?;

    let spectra_dir = Path::new("sample_spectra");
    fs::create_dir_all(spectra_dir.join("reflectance"))?;
    fs::create_dir_all(spectra_dir.join("transmittance"))?;
    write_reference(&spectra_dir.join("reflectance/skin.txt"), skin)?;
    write_reference(&spectra_dir.join("transmittance/skin.txt"), |wl| {
        1.0 - skin(wl)
    })?;

    let config = MaskingConfig {
        reflectance_dir: "reflectance".into(),
        transmittance_dir: "transmittance".into(),
        ..MaskingConfig::default()
    };
    let config_path = spectra_dir.join("masking.json");
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!(
        "Wrote {lines}x{samples} cube ({} bands, {skin_pixels} skin pixels) to {}",
        cube.wavelengths.len(),
        cube_path.display()
    );
    println!(
        "Run: spectral-mask {} --config {}",
        cube_path.display(),
        config_path.display()
    );
    Ok(())
}
