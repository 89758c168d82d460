use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result as AnyResult};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Float64Builder, Int64Array, LargeListArray,
    ListArray, ListBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::Spectrum;
use crate::error::{GenError, Result};
use crate::sampler::{BranchingTable, ChannelCurve};

// ---------------------------------------------------------------------------
// On-disk layout
// ---------------------------------------------------------------------------
//
// Read side (produced upstream by the simulation workers):
//   <root>/ap<channel>.{parquet|json|csv}   one row per detector
//   <root>/a2p.{parquet|json|csv}           secondary spectra, same layout
// Each row: `detector` (Int64), `x` / `y` (lists of Float64).
//
// Write side (the generator artifact):
//   <root>/tel<detector+1>.{parquet|json}   one row per channel
// Each row: `channel` (Int64), `energy` / `probability` (lists of Float64).

const SPECTRUM_EXTENSIONS: &[&str] = &["parquet", "pq", "json", "csv"];
const TABLE_EXTENSIONS: &[&str] = &["parquet", "pq", "json"];

/// One stored spectrum row. The JSON and CSV representations use the same
/// field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpectrumRow {
    detector: usize,
    x: Vec<f64>,
    y: Vec<f64>,
}

/// One persisted branching-table row (JSON representation).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableRow {
    channel: i64,
    energy: Vec<f64>,
    probability: Vec<f64>,
}

fn locate(root: &Path, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| root.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

// ---------------------------------------------------------------------------
// HistogramStore – read side
// ---------------------------------------------------------------------------

/// Keyed access to the raw per-channel spectra written by the simulation
/// workers.
///
/// Every read returns an owned [`Spectrum`] decoupled from any file handle
/// (copy-on-read), so callers never hold store resources.
#[derive(Debug, Clone)]
pub struct HistogramStore {
    root: PathBuf,
}

impl HistogramStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Spectrum for one `(detector, channel)` key.
    pub fn read_channel(&self, detector: usize, channel: usize) -> Result<Spectrum> {
        self.read_keyed(detector, Some(channel), &format!("ap{channel}"))
    }

    /// Secondary (two-proton) spectrum for one detector.
    pub fn read_secondary(&self, detector: usize) -> Result<Spectrum> {
        self.read_keyed(detector, None, "a2p")
    }

    fn read_keyed(&self, detector: usize, channel: Option<usize>, stem: &str) -> Result<Spectrum> {
        let path = locate(&self.root, stem, SPECTRUM_EXTENSIONS).ok_or_else(|| {
            GenError::MissingInput {
                detector,
                channel,
                key: self.root.join(stem).display().to_string(),
            }
        })?;
        let rows = read_spectrum_rows(&path)?;
        let row = rows
            .into_iter()
            .find(|r| r.detector == detector)
            .ok_or_else(|| GenError::MissingInput {
                detector,
                channel,
                key: path.display().to_string(),
            })?;
        Spectrum::new(row.x, row.y)
    }
}

/// Parse a spectrum file. Dispatch by extension, like every other loader in
/// this toolchain.
fn read_spectrum_rows(path: &Path) -> AnyResult<Vec<SpectrumRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "parquet" | "pq" => read_spectrum_parquet(path),
        "json" => read_spectrum_json(path),
        "csv" => read_spectrum_csv(path),
        other => bail!("unsupported spectrum format: .{other}"),
    }
}

fn read_spectrum_json(path: &Path) -> AnyResult<Vec<SpectrumRow>> {
    let text = fs::read_to_string(path).context("reading JSON spectra")?;
    serde_json::from_str(&text).context("parsing JSON spectra")
}

/// CSV layout: header `detector,x,y`; `x` and `y` cells hold
/// semicolon-separated floats (`"4.95;5.05;5.15"`).
fn read_spectrum_csv(path: &Path) -> AnyResult<Vec<SpectrumRow>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV spectra")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let det_idx = col("detector")?;
    let x_idx = col("x")?;
    let y_idx = col("y")?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let detector: usize = record
            .get(det_idx)
            .unwrap_or("")
            .trim()
            .parse()
            .with_context(|| format!("CSV row {row_no}: bad detector id"))?;
        let x = parse_packed_floats(record.get(x_idx).unwrap_or(""), row_no, "x")?;
        let y = parse_packed_floats(record.get(y_idx).unwrap_or(""), row_no, "y")?;
        rows.push(SpectrumRow { detector, x, y });
    }
    Ok(rows)
}

fn parse_packed_floats(s: &str, row: usize, col: &str) -> AnyResult<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

fn read_spectrum_parquet(path: &Path) -> AnyResult<Vec<SpectrumRow>> {
    let file = File::open(path).context("opening parquet file")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let det_idx = schema.index_of("detector").context("missing 'detector' column")?;
        let x_idx = schema.index_of("x").context("missing 'x' column")?;
        let y_idx = schema.index_of("y").context("missing 'y' column")?;

        let det_col = batch
            .column(det_idx)
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("'detector' column is not Int64")?;

        for row in 0..batch.num_rows() {
            let x = extract_f64_list(batch.column(x_idx), row)
                .with_context(|| format!("row {row}: failed to read 'x'"))?;
            let y = extract_f64_list(batch.column(y_idx), row)
                .with_context(|| format!("row {row}: failed to read 'y'"))?;
            rows.push(SpectrumRow {
                detector: det_col.value(row) as usize,
                x,
                y,
            });
        }
    }
    Ok(rows)
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
/// Both list flavours appear in the wild depending on which writer produced
/// the file.
fn extract_f64_list(col: &ArrayRef, row: usize) -> AnyResult<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values = match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .context("expected ListArray")?
            .value(row),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .context("expected LargeListArray")?
            .value(row),
        other => bail!("expected List or LargeList column, got {other:?}"),
    };

    if let Some(f64_arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "list inner type is {:?}, expected Float64 or Float32",
            values.data_type()
        )
    }
}

// ---------------------------------------------------------------------------
// GeneratorStore – write/read side for the branching-table artifact
// ---------------------------------------------------------------------------

/// Output format for persisted branching tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Parquet,
    Json,
}

impl TableFormat {
    fn extension(self) -> &'static str {
        match self {
            TableFormat::Parquet => "parquet",
            TableFormat::Json => "json",
        }
    }
}

/// Persists one detector-scoped group per branching table and reads it back
/// for validation.
#[derive(Debug, Clone)]
pub struct GeneratorStore {
    root: PathBuf,
    format: TableFormat,
}

impl GeneratorStore {
    pub fn new(root: impl Into<PathBuf>, format: TableFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_stem(detector: usize) -> String {
        format!("tel{}", detector + 1)
    }

    /// Write one detector's table. Detector groups are independent, so the
    /// write order across detectors is irrelevant.
    pub fn write_table(&self, table: &BranchingTable) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating {}", self.root.display()))?;
        let path = self.root.join(format!(
            "{}.{}",
            Self::table_stem(table.detector),
            self.format.extension()
        ));
        match self.format {
            TableFormat::Parquet => write_table_parquet(&path, table)?,
            TableFormat::Json => write_table_json(&path, table)?,
        }
        Ok(())
    }

    /// Reload a persisted table, preserving the stored row order.
    pub fn read_table(&self, detector: usize) -> Result<BranchingTable> {
        let stem = Self::table_stem(detector);
        let path = locate(&self.root, &stem, TABLE_EXTENSIONS).ok_or_else(|| {
            GenError::MissingInput {
                detector,
                channel: None,
                key: self.root.join(&stem).display().to_string(),
            }
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let rows = match ext.as_str() {
            "parquet" | "pq" => read_table_parquet(&path)?,
            "json" => read_table_json(&path)?,
            other => return Err(anyhow::anyhow!("unsupported table format: .{other}").into()),
        };

        let mut curves = Vec::with_capacity(rows.len());
        for row in rows {
            curves.push(row_to_curve(row)?);
        }
        Ok(BranchingTable {
            detector,
            rows: curves,
        })
    }
}

fn curve_to_row(curve: &ChannelCurve) -> TableRow {
    TableRow {
        channel: curve.channel as i64,
        energy: curve.points.iter().map(|&(e, _)| e).collect(),
        probability: curve.points.iter().map(|&(_, p)| p).collect(),
    }
}

fn row_to_curve(row: TableRow) -> AnyResult<ChannelCurve> {
    if row.energy.len() != row.probability.len() {
        bail!(
            "channel {}: {} energies but {} probabilities",
            row.channel,
            row.energy.len(),
            row.probability.len()
        );
    }
    Ok(ChannelCurve {
        channel: row.channel as usize,
        points: row.energy.into_iter().zip(row.probability).collect(),
    })
}

fn write_table_json(path: &Path, table: &BranchingTable) -> AnyResult<()> {
    let rows: Vec<TableRow> = table.rows.iter().map(curve_to_row).collect();
    let text = serde_json::to_string_pretty(&rows).context("encoding table JSON")?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

fn read_table_json(path: &Path) -> AnyResult<Vec<TableRow>> {
    let text = fs::read_to_string(path).context("reading table JSON")?;
    serde_json::from_str(&text).context("parsing table JSON")
}

fn write_table_parquet(path: &Path, table: &BranchingTable) -> AnyResult<()> {
    let channels: Vec<i64> = table.rows.iter().map(|r| r.channel as i64).collect();
    let channel_array = Int64Array::from(channels);

    let mut energy_builder = ListBuilder::new(Float64Builder::new());
    let mut prob_builder = ListBuilder::new(Float64Builder::new());
    for row in &table.rows {
        for &(e, p) in &row.points {
            energy_builder.values().append_value(e);
            prob_builder.values().append_value(p);
        }
        energy_builder.append(true);
        prob_builder.append(true);
    }
    let energy_array = energy_builder.finish();
    let prob_array = prob_builder.finish();

    let list_field = |name: &str| {
        Field::new(
            name,
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        )
    };
    let schema = Arc::new(Schema::new(vec![
        Field::new("channel", DataType::Int64, false),
        list_field("energy"),
        list_field("probability"),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(channel_array),
            Arc::new(energy_array),
            Arc::new(prob_array),
        ],
    )
    .context("building table record batch")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing table batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn read_table_parquet(path: &Path) -> AnyResult<Vec<TableRow>> {
    let file = File::open(path).context("opening parquet table")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .build()
        .context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading table record batch")?;
        let schema = batch.schema();
        let ch_idx = schema.index_of("channel").context("missing 'channel' column")?;
        let e_idx = schema.index_of("energy").context("missing 'energy' column")?;
        let p_idx = schema
            .index_of("probability")
            .context("missing 'probability' column")?;

        let ch_col = batch
            .column(ch_idx)
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("'channel' column is not Int64")?;

        for row in 0..batch.num_rows() {
            let energy = extract_f64_list(batch.column(e_idx), row)
                .with_context(|| format!("row {row}: failed to read 'energy'"))?;
            let probability = extract_f64_list(batch.column(p_idx), row)
                .with_context(|| format!("row {row}: failed to read 'probability'"))?;
            rows.push(TableRow {
                channel: ch_col.value(row),
                energy,
                probability,
            });
        }
    }
    Ok(rows)
}
