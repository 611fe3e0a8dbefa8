//! Axial growth and phase data of the stability solution.

use crate::error::{FieldError, Result};
use crate::grid::AxialGrid;
use crate::storage::PHASE_COLUMNS;
use ndarray::Array1;
use num_complex::Complex64;
use std::path::{Path, PathBuf};

/// Largest distance, in nozzle diameters, between a phase-record station and
/// the perturbation station it belongs to.
const STATION_TOLERANCE: f64 = 1e-6;

/// Per-station local wavenumber `alpha` and its running integral
/// `Theta = int alpha dx`, plus the derived solver outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityPhase {
    source: PathBuf,
    pub x: Vec<f64>,
    pub alpha: Vec<Complex64>,
    pub alpha_magnitude: Vec<f64>,
    pub theta: Vec<Complex64>,
    /// Phase velocity.
    pub phase_velocity: Vec<f64>,
    /// Local growth rate.
    pub growth_rate: Vec<f64>,
    /// N-factor.
    pub n_factor: Vec<f64>,
}

impl StabilityPhase {
    /// Rows laid out as `x Re(a) Im(a) abs(a) Re(int a) Im(int a) C_ph sigma N`.
    pub fn from_rows(source: PathBuf, rows: &[Vec<f64>]) -> Result<Self> {
        if let Some((n, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != PHASE_COLUMNS)
        {
            return Err(FieldError::storage(
                &source,
                format!(
                    "row {} has {} columns, expected {}",
                    n,
                    row.len(),
                    PHASE_COLUMNS
                ),
            ));
        }
        let col = |i: usize| rows.iter().map(|row| row[i]).collect::<Vec<f64>>();
        Ok(Self {
            source,
            x: col(0),
            alpha: rows
                .iter()
                .map(|row| Complex64::new(row[1], row[2]))
                .collect(),
            alpha_magnitude: col(3),
            theta: rows
                .iter()
                .map(|row| Complex64::new(row[4], row[5]))
                .collect(),
            phase_velocity: col(6),
            growth_rate: col(7),
            n_factor: col(8),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn local_wavenumber(&self) -> &[Complex64] {
        &self.alpha
    }

    pub fn phase_integral(&self) -> &[Complex64] {
        &self.theta
    }

    /// Amplitude envelope `exp(-Im Theta)` at each station.
    pub fn envelope(&self) -> Array1<f64> {
        self.theta.iter().map(|t| (-t.im).exp()).collect()
    }

    /// Time factor of a wave of angular frequency `frequency` at time `t`:
    /// `exp(-Im Theta) exp(i (Re Theta - frequency t))` per station.
    pub fn multiplier(&self, frequency: f64, t: f64) -> Array1<Complex64> {
        self.theta
            .iter()
            .map(|theta| {
                (-theta.im).exp() * Complex64::from_polar(1.0, theta.re - frequency * t)
            })
            .collect()
    }

    /// Checks that the record holds exactly the stations of `axial`, in order.
    pub fn check_stations(&self, axial: &AxialGrid) -> Result<()> {
        if self.len() != axial.len() {
            return Err(FieldError::storage(
                &self.source,
                format!(
                    "stability record has {} stations, perturbation field has {}",
                    self.len(),
                    axial.len()
                ),
            ));
        }
        let offset = self
            .x
            .iter()
            .zip(axial.coords())
            .position(|(a, b)| (a - b).abs() > STATION_TOLERANCE);
        if let Some(i) = offset {
            return Err(FieldError::storage(
                &self.source,
                format!(
                    "stability station {} is at x={}, perturbation station at x={}",
                    i,
                    self.x[i],
                    axial.x_coord(i)
                ),
            ));
        }
        Ok(())
    }
}
