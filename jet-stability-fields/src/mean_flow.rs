//! Steady (RANS) mean flow of one case.

use crate::context::FieldContext;
use crate::conversion::ConversionTable;
use crate::error::{FieldError, Result};
use crate::grid::{AxialGrid, FieldGrid};
use crate::quantity::{FieldSet, Quantity};
use crate::reference::ReferenceState;
use crate::spline::CubicSpline;
use ndarray::{s, Array2, Array3, Axis};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Quantity order of the trailing slices of a mean-flow record, after the
/// two coordinate slices.
const WITH_TEMPERATURE: [Quantity; 6] = [
    Quantity::Density,
    Quantity::AxialVelocity,
    Quantity::RadialVelocity,
    Quantity::AzimuthalVelocity,
    Quantity::Temperature,
    Quantity::Pressure,
];

const WITHOUT_TEMPERATURE: [Quantity; 5] = [
    Quantity::Density,
    Quantity::AxialVelocity,
    Quantity::RadialVelocity,
    Quantity::AzimuthalVelocity,
    Quantity::Pressure,
];

/// Radial coordinates of a record may differ from the shared grid by
/// rounding only.
const RADIAL_TOLERANCE: f64 = 1e-6;

/// Dimensionless mean flow in the mean-flow convention, on its native grid.
#[derive(Debug, Clone)]
pub struct MeanFlowField {
    case_id: usize,
    grid: FieldGrid,
    values: FieldSet<f64>,
    reference: ReferenceState,
    conversion: ConversionTable,
}

impl MeanFlowField {
    pub fn new(case_id: i64, context: &FieldContext) -> Result<Self> {
        let case = context.check_case(case_id)?;
        let reference = context.catalog().get_reference_state(case_id)?;
        let conversion = context.conversion(case_id)?;
        let record = context.store().mean_flow(case)?;
        let (grid, values) = split_record(&record, context, case)?;

        debug!(
            case_id = case,
            nx = grid.axial.len(),
            nr = grid.radial.len(),
            quantities = values.len(),
            "loaded mean flow"
        );
        Ok(Self {
            case_id: case,
            grid,
            values,
            reference,
            conversion,
        })
    }

    pub fn case_id(&self) -> usize {
        self.case_id
    }

    pub fn quantities(&self) -> BTreeSet<Quantity> {
        self.values.keys().map(|key| key.quantity).collect()
    }

    pub fn values(&self) -> &FieldSet<f64> {
        &self.values
    }

    pub fn value(&self, quantity: Quantity) -> Option<&Array2<f64>> {
        self.values.get(quantity)
    }

    pub fn native_axial_grid(&self) -> &AxialGrid {
        &self.grid.axial
    }

    pub fn grid(&self) -> &FieldGrid {
        &self.grid
    }

    pub fn reference_state(&self) -> &ReferenceState {
        &self.reference
    }

    pub fn conversion(&self) -> &ConversionTable {
        &self.conversion
    }

    /// Rescales mean-flow-convention fields into the stability convention of
    /// this case. Fields of unknown quantities are skipped.
    pub fn to_perturbation_reference(&self, fields: &FieldSet<f64>) -> FieldSet<f64> {
        self.conversion.to_perturbation_reference(fields)
    }

    /// Inverse of [`MeanFlowField::to_perturbation_reference`].
    pub fn to_mean_flow_reference(&self, fields: &FieldSet<f64>) -> FieldSet<f64> {
        self.conversion.to_mean_flow_reference(fields)
    }

    /// Cubic-spline interpolation of every quantity onto `target`, along x at
    /// each radial index. The radial grid is taken as shared.
    pub fn interpolate_onto(&self, target: &AxialGrid) -> Result<FieldSet<f64>> {
        let source = &self.grid.axial;
        if let Some(&outside) = target
            .coords()
            .iter()
            .find(|&&x| x < source.start() || x > source.end())
        {
            return Err(FieldError::Range {
                value: outside,
                min: source.start(),
                max: source.end(),
            });
        }

        let nr = self.grid.radial.len();
        let mut out = FieldSet::new();
        for (key, values) in self.values.iter() {
            let columns = (0..nr)
                .into_par_iter()
                .map(|k| {
                    let column = values.index_axis(Axis(1), k).to_vec();
                    CubicSpline::new(source.coords(), &column)?.eval_many(target.coords())
                })
                .collect::<Result<Vec<Vec<f64>>>>()?;
            let interpolated = Array2::from_shape_fn((target.len(), nr), |(i, k)| columns[k][i]);
            out.insert(key, interpolated)?;
        }
        debug!(
            from = source.len(),
            to = target.len(),
            "interpolated mean flow onto axial grid"
        );
        Ok(out)
    }
}

fn split_record(
    record: &Array3<f64>,
    context: &FieldContext,
    case: usize,
) -> Result<(FieldGrid, FieldSet<f64>)> {
    let source = context.store().describe();
    let (_, nr, nvalues) = record.dim();
    let radial = context.radial();
    if nr != radial.len() {
        return Err(FieldError::storage(
            &source,
            format!(
                "mean flow {} has {} radial points, radial grid has {}",
                case,
                nr,
                radial.len()
            ),
        ));
    }
    let order: &[Quantity] = match nvalues.checked_sub(2) {
        Some(6) => &WITH_TEMPERATURE,
        Some(5) => &WITHOUT_TEMPERATURE,
        _ => {
            return Err(FieldError::storage(
                &source,
                format!(
                    "mean flow {} has {} slices, expected 7 or 8",
                    case, nvalues
                ),
            ))
        }
    };

    let axial = AxialGrid::new(record.slice(s![.., 0, 0]).to_vec()).map_err(|e| {
        FieldError::storage(&source, format!("mean flow {}: {}", case, e))
    })?;
    let max_offset = record
        .slice(s![0, .., 1])
        .iter()
        .zip(radial.get_radial_grid())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    if max_offset > RADIAL_TOLERANCE {
        warn!(
            case_id = case,
            max_offset, "mean-flow radial coordinates differ from the shared radial grid"
        );
    }

    let mut values = FieldSet::new();
    for (n, quantity) in order.iter().enumerate() {
        values.insert(*quantity, record.slice(s![.., .., n + 2]).to_owned())?;
    }
    Ok((FieldGrid::new(axial, radial.clone()), values))
}
