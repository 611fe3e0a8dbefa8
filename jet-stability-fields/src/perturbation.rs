//! Stability (PSE) perturbation of one case at one forcing frequency, aligned
//! with the case's mean flow.
//!
//! Construction reads the perturbation and stability-phase records, pivots the
//! flat perturbation rows onto an (x, r) grid and interpolates the mean flow
//! onto the perturbation's axial stations. The mean flow is splined along x at
//! each radial index, which assumes both datasets share the radial grid; data
//! on differing radial grids would need a 2-D scattered interpolation instead.
//!
//! The perturbation at time `t` is `q(x, r) exp(-Im Theta(x)) exp(i (Re Theta(x) - St t))`
//! and the total field is `mean + amplitude Re(q')`, both in the mean-flow
//! convention.

use crate::case::CaseSelector;
use crate::context::FieldContext;
use crate::conversion::ConversionTable;
use crate::error::{FieldError, Result};
use crate::grid::{AxialGrid, FieldGrid, RadialGrid};
use crate::mean_flow::MeanFlowField;
use crate::quantity::{Component, FieldKey, FieldSet, Quantity};
use crate::stability::StabilityPhase;
use crate::storage::PerturbationTable;
use ndarray::{Array2, Axis, Zip};
use num_complex::Complex64;
use std::collections::HashMap;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Amplitude of the disturbance in [`StabilityPerturbationField::compute_default_total_field`].
pub const DEFAULT_AMPLITUDE: f64 = 0.01;

/// Axial stations closer than this are treated as the same station when
/// comparing grids.
const STATION_TOLERANCE: f64 = 1e-9;

/// Largest distance between a perturbation radius and the shared radial grid.
const RADIAL_TOLERANCE: f64 = 1e-6;

#[derive(Debug)]
pub struct StabilityPerturbationField {
    selector: CaseSelector,
    context: FieldContext,
    grid: FieldGrid,
    raw: FieldSet<f64>,
    amplitudes: FieldSet<Complex64>,
    phase: StabilityPhase,
    mean: MeanFlowField,
    interpolated_mean: FieldSet<f64>,
    conversion: ConversionTable,
}

impl StabilityPerturbationField {
    pub fn new(strouhal: f64, case_id: i64, context: &FieldContext) -> Result<Self> {
        let selector = CaseSelector::new(case_id, strouhal)?;
        context.check_case(case_id)?;
        let store = context.store();

        let table = store.perturbation(&selector)?;
        let phase = store.stability_phase(&selector)?;
        let (axial, raw) = pivot(&table, context.radial())?;
        phase.check_stations(&axial)?;
        let amplitudes = complex_amplitudes(&raw)?;

        let mean = MeanFlowField::new(case_id, context)?;
        let interpolated_mean = mean.interpolate_onto(&axial)?;
        let conversion = mean.conversion().clone();
        let grid = FieldGrid::new(axial, context.radial().clone());

        let field = Self {
            selector,
            context: context.clone(),
            grid,
            raw,
            amplitudes,
            phase,
            mean,
            interpolated_mean,
            conversion,
        };
        field.log_grid_alignment();
        Ok(field)
    }

    pub fn selector(&self) -> &CaseSelector {
        &self.selector
    }

    pub fn case_id(&self) -> usize {
        self.selector.case_id()
    }

    /// Forcing frequency (Strouhal number).
    pub fn frequency(&self) -> f64 {
        self.selector.strouhal()
    }

    /// Oscillation period `2 pi / St`.
    pub fn period(&self) -> f64 {
        2.0 * PI / self.frequency()
    }

    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }

    pub fn axial_grid(&self) -> &AxialGrid {
        &self.grid.axial
    }

    /// Stored `Re`, `Im` and `abs` components of every quantity.
    pub fn raw_fields(&self) -> &FieldSet<f64> {
        &self.raw
    }

    /// Complex amplitude `Re + i Im` of every quantity.
    pub fn amplitudes(&self) -> &FieldSet<Complex64> {
        &self.amplitudes
    }

    pub fn stability_phase(&self) -> &StabilityPhase {
        &self.phase
    }

    pub fn mean_flow(&self) -> &MeanFlowField {
        &self.mean
    }

    /// Mean flow on the perturbation grid, mean-flow convention.
    pub fn interpolated_mean(&self) -> &FieldSet<f64> {
        &self.interpolated_mean
    }

    /// Mean flow on the perturbation grid, stability convention.
    pub fn interpolated_mean_perturbation_reference(&self) -> FieldSet<f64> {
        self.mean.to_perturbation_reference(&self.interpolated_mean)
    }

    /// Number of perturbation stations that coincide with a native mean-flow
    /// station.
    pub fn shared_axial_points(&self) -> usize {
        let native = self.mean.native_axial_grid().coords();
        self.grid
            .axial
            .coords()
            .iter()
            .filter(|&&x| {
                let i = native.partition_point(|&v| v < x - STATION_TOLERANCE);
                i < native.len() && (native[i] - x).abs() <= STATION_TOLERANCE
            })
            .count()
    }

    fn log_grid_alignment(&self) {
        let native = self.mean.native_axial_grid().len();
        let stations = self.grid.axial.len();
        let shared = self.shared_axial_points();
        debug!(
            case_id = self.case_id(),
            mean_stations = native,
            perturbation_stations = stations,
            shared,
            ratio = native as f64 / stations as f64,
            "axial grid alignment"
        );
        if shared < stations {
            debug!(
                off_grid = stations - shared,
                "perturbation stations between mean-flow nodes are splined"
            );
        }
    }

    /// Complex perturbation at `phase_percent` of one period.
    pub fn compute_perturbation_field(&self, phase_percent: f64) -> Result<FieldSet<Complex64>> {
        check_phase(phase_percent)?;
        let t = phase_percent / 100.0 * self.period();
        let multiplier = self.phase.multiplier(self.frequency(), t);
        let column = multiplier.view().insert_axis(Axis(1));
        Ok(self.amplitudes.map(|_, amplitude| amplitude * &column))
    }

    /// Rescales stability-convention fields into the mean-flow convention
    /// using the reference state of `case_id`.
    pub fn convert_to_mean_flow_reference<T>(
        &self,
        fields: &FieldSet<T>,
        case_id: i64,
    ) -> Result<FieldSet<T>>
    where
        T: Clone + std::ops::Mul<f64, Output = T>,
    {
        if case_id == self.case_id() as i64 {
            return Ok(self.conversion.to_mean_flow_reference(fields));
        }
        warn!(
            own_case = self.case_id(),
            case_id, "converting with the reference state of another case"
        );
        Ok(self.context.conversion(case_id)?.to_mean_flow_reference(fields))
    }

    /// `mean + amplitude Re(q')` for every perturbed quantity, mean-flow
    /// convention.
    pub fn compute_total_field(&self, phase_percent: f64, amplitude: f64) -> Result<FieldSet<f64>> {
        check_phase(phase_percent)?;
        if !(amplitude >= 0.0) || !amplitude.is_finite() {
            return Err(FieldError::invalid(format!(
                "amplitude must be a non-negative number, got {}",
                amplitude
            )));
        }
        if amplitude == 0.0 {
            // A diverging envelope would otherwise turn 0 * inf into NaN.
            let mut total = FieldSet::new();
            for (key, _) in self.amplitudes.iter() {
                if let Some(mean) = self.interpolated_mean.get(key.quantity) {
                    total.insert(key.quantity, mean.clone())?;
                }
            }
            return Ok(total);
        }

        let perturbation = self.compute_perturbation_field(phase_percent)?;
        let converted = self.convert_to_mean_flow_reference(&perturbation, self.case_id() as i64)?;

        let mut total = FieldSet::new();
        for (key, values) in converted.iter() {
            let Some(mean) = self.interpolated_mean.get(key.quantity) else {
                warn!(field = %key, "no mean flow for perturbed quantity, skipping");
                continue;
            };
            let summed = Zip::from(mean)
                .and(values)
                .map_collect(|&m, v| m + amplitude * v.re);
            total.insert(key.quantity, summed)?;
        }
        Ok(total)
    }

    /// Total field at zero phase with [`DEFAULT_AMPLITUDE`].
    pub fn compute_default_total_field(&self) -> Result<FieldSet<f64>> {
        self.compute_total_field(0.0, DEFAULT_AMPLITUDE)
    }
}

fn check_phase(phase_percent: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&phase_percent) {
        return Err(FieldError::invalid(format!(
            "phase must be within [0, 100] percent, got {}",
            phase_percent
        )));
    }
    Ok(())
}

/// Normalises -0.0 so it indexes like 0.0.
fn coordinate_key(v: f64) -> u64 {
    (v + 0.0).to_bits()
}

/// Pivots flat `(x, r, columns...)` rows into one `(nx, nr)` array per column.
///
/// Axial stations keep their first-seen order and must increase; radial
/// positions are sorted and must match the shared radial grid.
/// Every (x, r) cell must appear exactly once.
pub fn pivot(table: &PerturbationTable, radial: &RadialGrid) -> Result<(AxialGrid, FieldSet<f64>)> {
    let bad = |reason: String| FieldError::storage(&table.source, reason);
    if table.is_empty() {
        return Err(bad("perturbation record has no rows".to_string()));
    }

    let axial = AxialGrid::from_unique(table.x.iter().map(|&x| x + 0.0))
        .map_err(|e| bad(e.to_string()))?;
    let mut r_unique: Vec<f64> = table.r.iter().map(|&r| r + 0.0).collect();
    r_unique.sort_by(f64::total_cmp);
    r_unique.dedup();
    if r_unique.len() != radial.len() {
        return Err(bad(format!(
            "perturbation record has {} radial positions, radial grid has {}",
            r_unique.len(),
            radial.len()
        )));
    }
    let offset = r_unique
        .iter()
        .zip(radial.get_radial_grid())
        .position(|(a, b)| (a - b).abs() > RADIAL_TOLERANCE);
    if let Some(k) = offset {
        return Err(bad(format!(
            "perturbation radius {} is r={}, radial grid has r={}",
            k,
            r_unique[k],
            radial.r_coord(k)
        )));
    }

    let x_index: HashMap<u64, usize> = axial
        .coords()
        .iter()
        .enumerate()
        .map(|(i, &x)| (coordinate_key(x), i))
        .collect();
    let r_index: HashMap<u64, usize> = r_unique
        .iter()
        .enumerate()
        .map(|(k, &r)| (coordinate_key(r), k))
        .collect();

    let shape = (axial.len(), r_unique.len());
    let mut seen = Array2::from_elem(shape, false);
    let mut cells = Vec::with_capacity(table.len());
    for (row, (&x, &r)) in table.x.iter().zip(&table.r).enumerate() {
        let (Some(&i), Some(&k)) = (x_index.get(&coordinate_key(x)), r_index.get(&coordinate_key(r)))
        else {
            return Err(bad(format!("row {} has an unindexed coordinate", row)));
        };
        if seen[[i, k]] {
            return Err(bad(format!("duplicate sample at x={}, r={}", x, r)));
        }
        seen[[i, k]] = true;
        cells.push((i, k));
    }
    let missing = seen.iter().filter(|&&s| !s).count();
    if missing > 0 {
        return Err(bad(format!(
            "{} of {} (x, r) cells have no sample",
            missing,
            shape.0 * shape.1
        )));
    }

    let mut fields = FieldSet::new();
    for (key, column) in &table.columns {
        let mut values = Array2::zeros(shape);
        for (&(i, k), &v) in cells.iter().zip(column) {
            values[[i, k]] = v;
        }
        fields.insert(*key, values)?;
    }
    Ok((axial, fields))
}

fn complex_amplitudes(raw: &FieldSet<f64>) -> Result<FieldSet<Complex64>> {
    let mut out = FieldSet::new();
    for quantity in Quantity::PERTURBED {
        let (Some(re), Some(im)) = (
            raw.get(FieldKey::new(quantity, Component::Real)),
            raw.get(FieldKey::new(quantity, Component::Imaginary)),
        ) else {
            warn!(quantity = %quantity, "perturbation record lacks real or imaginary part");
            continue;
        };
        let amplitude = Zip::from(re)
            .and(im)
            .map_collect(|&a, &b| Complex64::new(a, b));
        out.insert(quantity, amplitude)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PERTURBATION_COLUMNS;
    use std::path::PathBuf;

    fn table(rows: &[(f64, f64)]) -> PerturbationTable {
        let rows: Vec<Vec<f64>> = rows
            .iter()
            .map(|&(x, r)| {
                let mut row = vec![x, r];
                row.extend((2..PERTURBATION_COLUMNS).map(|c| c as f64 * x + r));
                row
            })
            .collect();
        PerturbationTable::from_rows(PathBuf::from("pertpse.dat"), &rows).unwrap()
    }

    fn radial() -> RadialGrid {
        RadialGrid::new(vec![0.0, 1.0]).unwrap()
    }

    #[test]
    fn pivots_rows_in_any_radial_order() {
        let t = table(&[(0.0, 1.0), (0.0, 0.0), (0.5, 0.0), (0.5, 1.0)]);
        let (axial, fields) = pivot(&t, &radial()).unwrap();
        assert_eq!(axial.coords(), &[0.0, 0.5]);
        let re_ux = fields
            .get(FieldKey::new(Quantity::AxialVelocity, Component::Real))
            .unwrap();
        assert_eq!(re_ux.dim(), (2, 2));
        assert_eq!(re_ux[[0, 1]], 1.0);
        assert_eq!(re_ux[[1, 0]], 1.0);
        assert_eq!(re_ux[[1, 1]], 2.0);
    }

    #[test]
    fn incomplete_or_duplicated_cells_are_storage_errors() {
        let missing = table(&[(0.0, 0.0), (0.0, 1.0), (0.5, 0.0)]);
        assert!(pivot(&missing, &radial()).unwrap_err().is_storage());

        let duplicated = table(&[(0.0, 0.0), (0.0, 1.0), (0.0, 1.0), (0.5, 0.0)]);
        assert!(pivot(&duplicated, &radial()).unwrap_err().is_storage());

        let three_radii = table(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]);
        assert!(pivot(&three_radii, &radial()).unwrap_err().is_storage());
    }

    #[test]
    fn radii_off_the_shared_grid_are_storage_errors() {
        let t = table(&[(0.0, 0.0), (0.0, 2.0), (0.5, 0.0), (0.5, 2.0)]);
        let err = pivot(&t, &radial()).unwrap_err();
        assert!(err.is_storage());
        assert!(err.to_string().contains("r=2"));
    }

    #[test]
    fn decreasing_stations_are_storage_errors() {
        let t = table(&[(0.5, 0.0), (0.5, 1.0), (0.0, 0.0), (0.0, 1.0)]);
        assert!(pivot(&t, &radial()).unwrap_err().is_storage());
    }

    #[test]
    fn phase_bounds() {
        assert!(check_phase(0.0).is_ok());
        assert!(check_phase(100.0).is_ok());
        for bad in [-1.0, 101.0, f64::NAN] {
            assert!(matches!(check_phase(bad), Err(FieldError::InvalidArgument(_))));
        }
    }

    #[test]
    fn amplitudes_combine_real_and_imaginary_parts() {
        let t = table(&[(0.0, 0.0), (0.0, 1.0), (0.5, 0.0), (0.5, 1.0)]);
        let (_, raw) = pivot(&t, &radial()).unwrap();
        let amplitudes = complex_amplitudes(&raw).unwrap();
        assert_eq!(amplitudes.len(), Quantity::PERTURBED.len());
        // rho is the fourth quantity: Re at column 11, Im at column 12.
        let rho = amplitudes.get(Quantity::Density).unwrap();
        assert_eq!(rho[[1, 1]], Complex64::new(11.0 * 0.5 + 1.0, 12.0 * 0.5 + 1.0));
    }
}
