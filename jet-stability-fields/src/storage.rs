//! Access to the solver outputs on disk.
//!
//! Everything the field types read goes through [`FieldStore`], so catalogs
//! and fields can be built from synthetic data in tests. [`DataDirectory`]
//! is the implementation over the solver output tree:
//!
//! ```text
//! <root>/info.dat
//! <root>/Mach.dat
//! <root>/RANS69pt.dat
//! <root>/MeanFlow/mean_<id>.mat      (or mean_<id>.npy)
//! <root>/Stability/St<NN>/Field/FrancCase_<id>/pertpse_FrancCase_<id>.dat
//! <root>/Stability/St<NN>/alpha/FrancCase_<id>/vappse_FrancCase_<id>.dat
//! ```
//!
//! [`MemoryStore`] holds synthetic records.

use crate::case::CaseSelector;
use crate::error::{FieldError, Result};
use crate::quantity::{Component, FieldKey, Quantity};
use crate::reference::{MachEntry, ReferenceState};
use crate::stability::StabilityPhase;
use matfile::{MatFile, NumericData};
use ndarray::{Array3, ShapeBuilder};
use ndarray_npy::read_npy;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header lines preceding the data of stability solver outputs.
pub const STABILITY_HEADER_LINES: usize = 3;

/// Columns of a perturbation record: `x r` then `Re Im abs` per quantity.
pub const PERTURBATION_COLUMNS: usize = 2 + 3 * Quantity::PERTURBED.len();

/// Columns of a stability-phase record.
pub const PHASE_COLUMNS: usize = 9;

/// Variable holding the `(Nx, Nr, Nvalues)` array in a MATLAB mean-flow record.
pub const MEAN_FLOW_VARIABLE: &str = "arr";

/// File formats a mean-flow record may be stored in, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Mat,
    Npy,
}

impl RecordFormat {
    pub const ALL: [RecordFormat; 2] = [RecordFormat::Mat, RecordFormat::Npy];

    pub fn extension(self) -> &'static str {
        match self {
            RecordFormat::Mat => "mat",
            RecordFormat::Npy => "npy",
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

/// Flat perturbation record, one row per (x, r) sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbationTable {
    pub source: PathBuf,
    pub x: Vec<f64>,
    pub r: Vec<f64>,
    pub columns: BTreeMap<FieldKey, Vec<f64>>,
}

impl PerturbationTable {
    /// Splits raw rows laid out as in the solver output.
    pub fn from_rows(source: PathBuf, rows: &[Vec<f64>]) -> Result<Self> {
        if let Some((n, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != PERTURBATION_COLUMNS)
        {
            return Err(FieldError::storage(
                &source,
                format!(
                    "row {} has {} columns, expected {}",
                    n,
                    row.len(),
                    PERTURBATION_COLUMNS
                ),
            ));
        }
        let mut columns = BTreeMap::new();
        for (n, q) in Quantity::PERTURBED.iter().enumerate() {
            for (offset, component) in [Component::Real, Component::Imaginary, Component::Magnitude]
                .into_iter()
                .enumerate()
            {
                let col = 2 + 3 * n + offset;
                columns.insert(
                    FieldKey::new(*q, component),
                    rows.iter().map(|row| row[col]).collect(),
                );
            }
        }
        Ok(Self {
            source,
            x: rows.iter().map(|row| row[0]).collect(),
            r: rows.iter().map(|row| row[1]).collect(),
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Source of every record the field types need.
pub trait FieldStore: fmt::Debug + Send + Sync {
    /// Human-readable origin, for diagnostics.
    fn describe(&self) -> String;

    /// Number of mean-flow records available.
    fn case_count(&self) -> Result<usize>;

    fn reference_table(&self) -> Result<Vec<ReferenceState>>;

    fn mach_table(&self) -> Result<Vec<MachEntry>>;

    fn radial_grid(&self) -> Result<Vec<f64>>;

    /// `(Nx, Nr, Nvalues)` array: x, r, then the physical quantities.
    fn mean_flow(&self, case_id: usize) -> Result<Array3<f64>>;

    fn perturbation(&self, selector: &CaseSelector) -> Result<PerturbationTable>;

    fn stability_phase(&self, selector: &CaseSelector) -> Result<StabilityPhase>;
}

/// Parses a whitespace-delimited numeric table.
///
/// The first `skip_rows` lines are ignored, as are blank lines. Every
/// remaining line must hold exactly `columns` numbers. Fortran `D` exponents
/// are accepted.
pub fn read_table<R: BufRead>(
    reader: R,
    source: &Path,
    skip_rows: usize,
    columns: usize,
) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source_err| FieldError::Io {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        if idx < skip_rows || line.trim().is_empty() {
            continue;
        }
        let parse_error = |reason: String| FieldError::Parse {
            path: source.to_path_buf(),
            line: idx + 1,
            reason,
        };
        let row = line
            .split_whitespace()
            .map(|token| {
                token
                    .replace(['D', 'd'], "E")
                    .parse::<f64>()
                    .map_err(|e| parse_error(format!("'{}': {}", token, e)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if row.len() != columns {
            return Err(parse_error(format!(
                "expected {} columns, found {}",
                columns,
                row.len()
            )));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Reads the [`MEAN_FLOW_VARIABLE`] array of a MATLAB level-5 file.
pub fn read_mat_record(path: &Path) -> Result<Array3<f64>> {
    let file = File::open(path).map_err(|source| FieldError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mat = MatFile::parse(BufReader::new(file))
        .map_err(|e| FieldError::storage(path, format!("not a MAT file: {:?}", e)))?;
    let array = mat.find_by_name(MEAN_FLOW_VARIABLE).ok_or_else(|| {
        FieldError::storage(path, format!("no variable '{}'", MEAN_FLOW_VARIABLE))
    })?;
    let values: Vec<f64> = match array.data() {
        NumericData::Double { real, .. } => real.clone(),
        NumericData::Single { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        _ => {
            return Err(FieldError::storage(
                path,
                format!("variable '{}' is not floating point", MEAN_FLOW_VARIABLE),
            ))
        }
    };
    let size = array.size();
    if size.len() != 3 {
        return Err(FieldError::storage(
            path,
            format!("expected a 3-D array, found dimensions {:?}", size),
        ));
    }
    // MATLAB arrays are column-major.
    Array3::from_shape_vec((size[0], size[1], size[2]).f(), values)
        .map_err(|e| FieldError::storage(path, e.to_string()))
}

fn read_table_file(path: &Path, skip_rows: usize, columns: usize) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path).map_err(|source| FieldError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_table(BufReader::new(file), path, skip_rows, columns)?;
    debug!(path = %path.display(), rows = rows.len(), "read table");
    Ok(rows)
}

pub fn parse_reference_rows(rows: &[Vec<f64>]) -> Vec<ReferenceState> {
    rows.iter()
        .map(|row| ReferenceState {
            velocity: row[0],
            density: row[1],
            temperature: row[2],
            pressure: row[3],
        })
        .collect()
}

pub fn parse_mach_rows(rows: &[Vec<f64>], source: &Path) -> Result<Vec<MachEntry>> {
    rows.iter()
        .map(|row| {
            let id = row[0];
            if id < 1.0 || id.fract() != 0.0 {
                return Err(FieldError::storage(
                    source,
                    format!("Mach table id {} is not a positive integer", id),
                ));
            }
            Ok(MachEntry {
                id: id as usize,
                mach: row[1],
            })
        })
        .collect()
}

/// Solver output tree rooted at one directory.
#[derive(Debug, Clone)]
pub struct DataDirectory {
    root: PathBuf,
}

impl DataDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(FieldError::storage(&root, "data directory does not exist"));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reference_path(&self) -> PathBuf {
        self.root.join("info.dat")
    }

    pub fn mach_path(&self) -> PathBuf {
        self.root.join("Mach.dat")
    }

    pub fn radial_grid_path(&self) -> PathBuf {
        self.root.join("RANS69pt.dat")
    }

    pub fn mean_flow_dir(&self) -> PathBuf {
        self.root.join("MeanFlow")
    }

    pub fn mean_flow_path(&self, case_id: usize, format: RecordFormat) -> PathBuf {
        self.mean_flow_dir()
            .join(format!("mean_{}.{}", case_id, format.extension()))
    }

    fn strouhal_dir(&self, selector: &CaseSelector) -> Result<PathBuf> {
        let dir = self
            .root
            .join("Stability")
            .join(selector.strouhal_tag());
        if !dir.is_dir() {
            return Err(FieldError::storage(
                &dir,
                format!("no stability data for St={}", selector.strouhal()),
            ));
        }
        Ok(dir)
    }

    fn case_file(
        &self,
        selector: &CaseSelector,
        kind: &str,
        prefix: &str,
    ) -> Result<PathBuf> {
        let case = format!("FrancCase_{}", selector.case_id());
        let path = self
            .strouhal_dir(selector)?
            .join(kind)
            .join(&case)
            .join(format!("{}_{}.dat", prefix, case));
        if !path.is_file() {
            return Err(FieldError::storage(
                &path,
                format!("case not available ({})", selector),
            ));
        }
        Ok(path)
    }

    pub fn perturbation_path(&self, selector: &CaseSelector) -> Result<PathBuf> {
        self.case_file(selector, "Field", "pertpse")
    }

    pub fn stability_phase_path(&self, selector: &CaseSelector) -> Result<PathBuf> {
        self.case_file(selector, "alpha", "vappse")
    }
}

fn mean_flow_id(path: &Path) -> Option<usize> {
    RecordFormat::from_path(path)?;
    path.file_stem()?
        .to_str()?
        .strip_prefix("mean_")?
        .parse()
        .ok()
}

impl FieldStore for DataDirectory {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn case_count(&self) -> Result<usize> {
        let dir = self.mean_flow_dir();
        let entries = fs::read_dir(&dir).map_err(|source| FieldError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|source| FieldError::Io {
                path: dir.clone(),
                source,
            })?;
            if let Some(id) = mean_flow_id(&entry.path()) {
                ids.insert(id);
            }
        }
        Ok(ids.len())
    }

    fn reference_table(&self) -> Result<Vec<ReferenceState>> {
        let rows = read_table_file(&self.reference_path(), 1, 4)?;
        Ok(parse_reference_rows(&rows))
    }

    fn mach_table(&self) -> Result<Vec<MachEntry>> {
        let path = self.mach_path();
        let rows = read_table_file(&path, 0, 2)?;
        parse_mach_rows(&rows, &path)
    }

    fn radial_grid(&self) -> Result<Vec<f64>> {
        let rows = read_table_file(&self.radial_grid_path(), 0, 1)?;
        Ok(rows.into_iter().map(|row| row[0]).collect())
    }

    fn mean_flow(&self, case_id: usize) -> Result<Array3<f64>> {
        let Some((path, format)) = RecordFormat::ALL
            .into_iter()
            .map(|f| (self.mean_flow_path(case_id, f), f))
            .find(|(p, _)| p.is_file())
        else {
            return Err(FieldError::storage(
                self.mean_flow_path(case_id, RecordFormat::Mat),
                "mean-flow record missing",
            ));
        };
        let arr: Array3<f64> = match format {
            RecordFormat::Mat => read_mat_record(&path)?,
            RecordFormat::Npy => {
                read_npy(&path).map_err(|e| FieldError::storage(&path, e.to_string()))?
            }
        };
        debug!(path = %path.display(), shape = ?arr.dim(), "read mean-flow record");
        Ok(arr)
    }

    fn perturbation(&self, selector: &CaseSelector) -> Result<PerturbationTable> {
        let path = self.perturbation_path(selector)?;
        let rows = read_table_file(&path, STABILITY_HEADER_LINES, PERTURBATION_COLUMNS)?;
        PerturbationTable::from_rows(path, &rows)
    }

    fn stability_phase(&self, selector: &CaseSelector) -> Result<StabilityPhase> {
        let path = self.stability_phase_path(selector)?;
        let rows = read_table_file(&path, STABILITY_HEADER_LINES, PHASE_COLUMNS)?;
        StabilityPhase::from_rows(path, &rows)
    }
}

/// In-memory store, for synthetic datasets.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub reference: Vec<ReferenceState>,
    pub machs: Vec<MachEntry>,
    pub radial: Vec<f64>,
    pub mean_flows: BTreeMap<usize, Array3<f64>>,
    stability: BTreeMap<(usize, String), (PerturbationTable, StabilityPhase)>,
}

impl MemoryStore {
    pub fn new(reference: Vec<ReferenceState>, machs: Vec<MachEntry>, radial: Vec<f64>) -> Self {
        Self {
            reference,
            machs,
            radial,
            ..Self::default()
        }
    }

    pub fn insert_mean_flow(&mut self, case_id: usize, record: Array3<f64>) {
        self.mean_flows.insert(case_id, record);
    }

    pub fn insert_stability(
        &mut self,
        selector: &CaseSelector,
        perturbation: PerturbationTable,
        phase: StabilityPhase,
    ) {
        self.stability.insert(
            (selector.case_id(), selector.strouhal_tag()),
            (perturbation, phase),
        );
    }

    fn stability_record(
        &self,
        selector: &CaseSelector,
    ) -> Result<&(PerturbationTable, StabilityPhase)> {
        self.stability
            .get(&(selector.case_id(), selector.strouhal_tag()))
            .ok_or_else(|| {
                FieldError::storage("memory", format!("case not available ({})", selector))
            })
    }
}

impl FieldStore for MemoryStore {
    fn describe(&self) -> String {
        format!("in-memory store ({} cases)", self.mean_flows.len())
    }

    fn case_count(&self) -> Result<usize> {
        Ok(self.mean_flows.len())
    }

    fn reference_table(&self) -> Result<Vec<ReferenceState>> {
        Ok(self.reference.clone())
    }

    fn mach_table(&self) -> Result<Vec<MachEntry>> {
        Ok(self.machs.clone())
    }

    fn radial_grid(&self) -> Result<Vec<f64>> {
        Ok(self.radial.clone())
    }

    fn mean_flow(&self, case_id: usize) -> Result<Array3<f64>> {
        self.mean_flows.get(&case_id).cloned().ok_or_else(|| {
            FieldError::storage("memory", format!("mean-flow record {} missing", case_id))
        })
    }

    fn perturbation(&self, selector: &CaseSelector) -> Result<PerturbationTable> {
        Ok(self.stability_record(selector)?.0.clone())
    }

    fn stability_phase(&self, selector: &CaseSelector) -> Result<StabilityPhase> {
        Ok(self.stability_record(selector)?.1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_reference_table_with_header() {
        let text = "ux rho T P\n\
                    311.529138 1.576135 254.860326 115326.441784\n\
                    \n\
                    311.916903 1.574279 254.740191 115136.336935\n";
        let rows = read_table(Cursor::new(text), Path::new("info.dat"), 1, 4).unwrap();
        let states = parse_reference_rows(&rows);
        assert_eq!(states.len(), 2);
        assert_eq!(states[1].pressure, 115136.336935);
    }

    #[test]
    fn accepts_fortran_exponents() {
        let rows = read_table(Cursor::new("1.5D-01\n-2.0d+00\n"), Path::new("r"), 0, 1).unwrap();
        assert_eq!(rows, vec![vec![0.15], vec![-2.0]]);
    }

    #[test]
    fn reports_line_of_malformed_rows() {
        let err = read_table(
            Cursor::new("h1\nh2\nh3\n1 2 3\n4 5\n"),
            Path::new("vappse.dat"),
            3,
            3,
        )
        .unwrap_err();
        match err {
            FieldError::Parse { line, .. } => assert_eq!(line, 5),
            other => panic!("unexpected error {:?}", other),
        }

        let err = read_table(Cursor::new("1 x\n"), Path::new("Mach.dat"), 0, 2).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn mach_ids_must_be_integers() {
        let rows = vec![vec![1.0, 0.97335], vec![2.5, 0.97479]];
        assert!(parse_mach_rows(&rows, Path::new("Mach.dat")).is_err());
        let ok = parse_mach_rows(&rows[..1], Path::new("Mach.dat")).unwrap();
        assert_eq!(ok[0], MachEntry { id: 1, mach: 0.97335 });
    }

    #[test]
    fn perturbation_columns_follow_record_layout() {
        let row: Vec<f64> = (0..PERTURBATION_COLUMNS).map(|v| v as f64).collect();
        let table = PerturbationTable::from_rows(PathBuf::from("p.dat"), &[row]).unwrap();
        let col = |q, c| table.columns[&FieldKey::new(q, c)][0];
        assert_eq!(table.x, vec![0.0]);
        assert_eq!(table.r, vec![1.0]);
        assert_eq!(col(Quantity::AxialVelocity, Component::Real), 2.0);
        assert_eq!(col(Quantity::RadialVelocity, Component::Imaginary), 6.0);
        assert_eq!(col(Quantity::Density, Component::Magnitude), 13.0);
        assert_eq!(col(Quantity::Pressure, Component::Real), 14.0);
    }

    #[test]
    fn mean_flow_file_names() {
        assert_eq!(mean_flow_id(Path::new("MeanFlow/mean_12.npy")), Some(12));
        assert_eq!(mean_flow_id(Path::new("MeanFlow/mean_12.mat")), Some(12));
        assert_eq!(mean_flow_id(Path::new("MeanFlow/mean_12.txt")), None);
        assert_eq!(mean_flow_id(Path::new("MeanFlow/notes.npy")), None);
    }

    #[test]
    fn short_perturbation_rows_are_storage_errors() {
        let rows = vec![vec![0.0; PERTURBATION_COLUMNS], vec![0.0, 1.0]];
        let err = PerturbationTable::from_rows(PathBuf::from("p.dat"), &rows).unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn memory_store_reports_missing_cases() {
        let mut store = MemoryStore::new(vec![], vec![], vec![0.0, 1.0]);
        store.insert_mean_flow(1, Array3::zeros((2, 2, 8)));
        assert_eq!(store.case_count().unwrap(), 1);
        assert!(store.mean_flow(2).unwrap_err().is_storage());
        let selector = CaseSelector::new(1, 0.4).unwrap();
        assert!(store.perturbation(&selector).unwrap_err().is_storage());
    }

    #[test]
    fn missing_directory_is_a_storage_error() {
        let err = DataDirectory::new("/nonexistent/jet/data").unwrap_err();
        assert!(err.is_storage());
    }
}
