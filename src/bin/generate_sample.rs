//! Writes a synthetic spectrum store (`ap<ch>.parquet` + `a2p.parquet`)
//! sized to the default configuration, for demos and manual inspection.

use std::sync::Arc;

use arrow::array::{Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use branchgen::GeneratorConfig;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One simulated spectrum: a proton peak on a small noise floor. The peak
/// shifts down in energy with channel index, the way higher excitation
/// levels leave less energy to the proton.
fn simulate_contents(
    centers: &[f64],
    detector: usize,
    peak_energy: f64,
    amplitude: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    let det_factor = 0.7 + 0.15 * detector as f64;
    centers
        .iter()
        .map(|&e| gaussian(e, peak_energy, 1.3, amplitude * det_factor) + rng.gauss(0.0, 1.0))
        .collect()
}

fn write_spectra(
    path: &std::path::Path,
    centers: &[f64],
    per_detector: &[Vec<f64>],
) -> anyhow::Result<()> {
    let detectors: Vec<i64> = (0..per_detector.len() as i64).collect();
    let detector_array = Int64Array::from(detectors);

    let mut x_builder = ListBuilder::new(Float64Builder::new());
    let mut y_builder = ListBuilder::new(Float64Builder::new());
    for contents in per_detector {
        for &c in centers {
            x_builder.values().append_value(c);
        }
        x_builder.append(true);
        for &y in contents {
            y_builder.values().append_value(y);
        }
        y_builder.append(true);
    }
    let x_array = x_builder.finish();
    let y_array = y_builder.finish();

    let list_field = |name: &str| {
        Field::new(
            name,
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        )
    };
    let schema = Arc::new(Schema::new(vec![
        Field::new("detector", DataType::Int64, false),
        list_field("x"),
        list_field("y"),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(detector_array), Arc::new(x_array), Arc::new(y_array)],
    )?;

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_store".to_string());
    let out_dir = std::path::PathBuf::from(out_dir);
    std::fs::create_dir_all(&out_dir)?;

    let cfg = GeneratorConfig::default();
    let mut rng = SimpleRng::new(42);

    // Proton energy: 500 bins of 0.1 MeV over 0–50 MeV.
    let centers: Vec<f64> = (0..500).map(|i| 0.05 + i as f64 * 0.1).collect();

    for channel in 0..cfg.channels {
        let peak_energy = 28.0 - 0.5 * channel as f64;
        let amplitude = 300.0 / (1.0 + 0.1 * channel as f64);
        let rows: Vec<Vec<f64>> = (0..cfg.detectors)
            .map(|d| simulate_contents(&centers, d, peak_energy, amplitude, &mut rng))
            .collect();
        write_spectra(&out_dir.join(format!("ap{channel}.parquet")), &centers, &rows)?;
    }

    // Secondary: a single lower-energy bump.
    let rows: Vec<Vec<f64>> = (0..cfg.detectors)
        .map(|d| simulate_contents(&centers, d, 12.0, 150.0, &mut rng))
        .collect();
    write_spectra(&out_dir.join("a2p.parquet"), &centers, &rows)?;

    println!(
        "Wrote {} channel files (+ a2p) x {} detectors to {}",
        cfg.channels,
        cfg.detectors,
        out_dir.display()
    );
    Ok(())
}
