//! Windowed access to computed fields for plots and summaries.

use crate::error::{FieldError, Result};
use crate::grid::FieldGrid;
use crate::perturbation::StabilityPerturbationField;
use crate::quantity::{Component, FieldKey, FieldSet, Quantity};
use ndarray::{s, Array2, ArrayBase, Data, Dimension};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Rectangular region of the (x, r) plane, in nozzle diameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainWindow {
    pub x_min: f64,
    pub x_max: f64,
    pub r_min: f64,
    pub r_max: f64,
}

impl DomainWindow {
    pub fn new(x_min: f64, x_max: f64, r_min: f64, r_max: f64) -> Result<Self> {
        for (name, lo, hi) in [("x", x_min, x_max), ("r", r_min, r_max)] {
            if !(hi >= lo) {
                return Err(FieldError::invalid(format!(
                    "{} window [{}, {}] is empty",
                    name, lo, hi
                )));
            }
        }
        Ok(Self {
            x_min,
            x_max,
            r_min,
            r_max,
        })
    }

    /// Index ranges of the grid points inside the window: from the first
    /// coordinate `>= min` through the last `<= max`.
    pub fn indices(&self, grid: &FieldGrid) -> Result<(Range<usize>, Range<usize>)> {
        let xs = inclusive_range(grid.axial.coords(), self.x_min, self.x_max)?;
        let rs = inclusive_range(grid.radial.get_radial_grid(), self.r_min, self.r_max)?;
        Ok((xs, rs))
    }
}

fn inclusive_range(coords: &[f64], lo: f64, hi: f64) -> Result<Range<usize>> {
    let start = coords.partition_point(|&v| v < lo);
    let end = coords.partition_point(|&v| v <= hi);
    if start >= end {
        return Err(FieldError::Range {
            value: if lo > coords[coords.len() - 1] { lo } else { hi },
            min: coords[0],
            max: coords[coords.len() - 1],
        });
    }
    Ok(start..end)
}

/// A windowed copy of one field with its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct SubField {
    pub x: Vec<f64>,
    pub r: Vec<f64>,
    pub values: Array2<f64>,
}

impl SubField {
    /// Largest absolute value, for symmetric colour scales.
    pub fn max_abs(&self) -> f64 {
        self.values.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// `(min, max)` of the finite values.
    pub fn bounds(&self) -> (f64, f64) {
        self.values
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

fn check_shape(values: &Array2<f64>, grid: &FieldGrid) -> Result<()> {
    if values.dim() != grid.dim() {
        return Err(FieldError::invalid(format!(
            "field of shape {:?} does not live on a {:?} grid",
            values.dim(),
            grid.dim()
        )));
    }
    Ok(())
}

pub fn select(values: &Array2<f64>, grid: &FieldGrid, window: &DomainWindow) -> Result<SubField> {
    check_shape(values, grid)?;
    let (xs, rs) = window.indices(grid)?;
    Ok(SubField {
        x: grid.axial.coords()[xs.clone()].to_vec(),
        r: grid.radial.get_radial_grid()[rs.clone()].to_vec(),
        values: values.slice(s![xs, rs]).to_owned(),
    })
}

/// Values along one line of a field, with the coordinate they vary over.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub coords: Vec<f64>,
    pub values: Vec<f64>,
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(FieldError::Range {
            value: index as f64,
            min: 0.0,
            max: len.saturating_sub(1) as f64,
        });
    }
    Ok(())
}

/// Profile across the jet at axial station `i`.
pub fn radial_profile(values: &Array2<f64>, grid: &FieldGrid, i: usize) -> Result<Profile> {
    check_shape(values, grid)?;
    check_index(i, grid.axial.len())?;
    Ok(Profile {
        coords: grid.radial.get_radial_grid().to_vec(),
        values: values.row(i).to_vec(),
    })
}

/// Profile along the jet at radial index `k`.
pub fn axial_profile(values: &Array2<f64>, grid: &FieldGrid, k: usize) -> Result<Profile> {
    check_shape(values, grid)?;
    check_index(k, grid.radial.len())?;
    Ok(Profile {
        coords: grid.axial.coords().to_vec(),
        values: values.column(k).to_vec(),
    })
}

/// Descriptive statistics of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; NaN for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl FieldSummary {
    pub fn describe<S, D>(values: &ArrayBase<S, D>) -> Result<Self>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let mut sorted: Vec<f64> = values.iter().copied().collect();
        if sorted.is_empty() {
            return Err(FieldError::invalid("cannot summarise an empty field"));
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            f64::NAN
        };
        Ok(Self {
            count: n,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }
}

/// Linear interpolation between closest ranks of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

impl fmt::Display for FieldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n={} mean={:.6e} std={:.6e} min={:.6e} 25%={:.6e} 50%={:.6e} 75%={:.6e} max={:.6e}",
            self.count,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.median,
            self.q75,
            self.max
        )
    }
}

/// Presentation label of a field: `ux` is the interpolated mean flow,
/// `Re(ux)`, `Im(ux)` and `abs(ux)` the stored perturbation and `total:ux`
/// the total field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Mean(Quantity),
    Perturbation(FieldKey),
    Total(Quantity),
}

impl FieldLabel {
    /// Signed perturbation parts are drawn on a scale symmetric about zero.
    pub fn symmetric_scale(&self) -> bool {
        matches!(
            self,
            FieldLabel::Perturbation(FieldKey {
                component: Component::Real | Component::Imaginary,
                ..
            })
        )
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldLabel::Mean(q) => write!(f, "{}", q),
            FieldLabel::Perturbation(key) => write!(f, "{}", key),
            FieldLabel::Total(q) => write!(f, "total:{}", q),
        }
    }
}

impl FromStr for FieldLabel {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("total:") {
            return Ok(FieldLabel::Total(rest.parse()?));
        }
        let key: FieldKey = s.parse()?;
        Ok(match key.component {
            Component::Whole => FieldLabel::Mean(key.quantity),
            _ => FieldLabel::Perturbation(key),
        })
    }
}

/// One perturbation field evaluated at a fixed phase and amplitude.
pub struct FieldQuery<'a> {
    field: &'a StabilityPerturbationField,
    total: FieldSet<f64>,
}

impl<'a> FieldQuery<'a> {
    pub fn new(
        field: &'a StabilityPerturbationField,
        phase_percent: f64,
        amplitude: f64,
    ) -> Result<Self> {
        let total = field.compute_total_field(phase_percent, amplitude)?;
        Ok(Self { field, total })
    }

    pub fn grid(&self) -> &FieldGrid {
        self.field.grid()
    }

    pub fn total(&self) -> &FieldSet<f64> {
        &self.total
    }

    pub fn resolve(&self, label: &FieldLabel) -> Result<&Array2<f64>> {
        let found = match label {
            FieldLabel::Mean(q) => self.field.interpolated_mean().get(*q),
            FieldLabel::Perturbation(key) => self.field.raw_fields().get(*key),
            FieldLabel::Total(q) => self.total.get(*q),
        };
        found.ok_or_else(|| {
            FieldError::invalid(format!(
                "{} is not available for {}",
                label,
                self.field.selector()
            ))
        })
    }

    pub fn select(&self, label: &FieldLabel, window: &DomainWindow) -> Result<SubField> {
        select(self.resolve(label)?, self.grid(), window)
    }

    pub fn summary(&self, label: &FieldLabel) -> Result<FieldSummary> {
        FieldSummary::describe(self.resolve(label)?)
    }

    /// Statistics of every quantity of the interpolated mean flow.
    pub fn mean_summaries(&self) -> Result<Vec<(FieldLabel, FieldSummary)>> {
        self.field
            .interpolated_mean()
            .iter()
            .map(|(key, values)| {
                Ok((FieldLabel::Mean(key.quantity), FieldSummary::describe(values)?))
            })
            .collect()
    }

    pub fn total_summaries(&self) -> Result<Vec<(FieldLabel, FieldSummary)>> {
        self.total
            .iter()
            .map(|(key, values)| {
                Ok((FieldLabel::Total(key.quantity), FieldSummary::describe(values)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{AxialGrid, RadialGrid};
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::sync::Arc;

    fn grid() -> FieldGrid {
        FieldGrid::new(
            AxialGrid::new(vec![0.0, 0.5, 1.0, 1.5, 2.0]).unwrap(),
            Arc::new(RadialGrid::new(vec![0.0, 0.25, 0.5]).unwrap()),
        )
    }

    fn field() -> Array2<f64> {
        Array2::from_shape_fn((5, 3), |(i, k)| (10 * i + k) as f64)
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = DomainWindow::new(0.5, 1.5, 0.2, 0.5).unwrap();
        let sub = select(&field(), &grid(), &window).unwrap();
        assert_eq!(sub.x, vec![0.5, 1.0, 1.5]);
        assert_eq!(sub.r, vec![0.25, 0.5]);
        assert_eq!(sub.values, array![[11.0, 12.0], [21.0, 22.0], [31.0, 32.0]]);
    }

    #[test]
    fn window_between_points_keeps_inner_points() {
        let window = DomainWindow::new(0.4, 1.1, 0.0, 10.0).unwrap();
        let (xs, rs) = window.indices(&grid()).unwrap();
        assert_eq!(xs, 1..3);
        assert_eq!(rs, 0..3);
    }

    #[test]
    fn inverted_windows_are_invalid() {
        assert!(matches!(
            DomainWindow::new(2.0, 1.0, 0.0, 1.0),
            Err(FieldError::InvalidArgument(_))
        ));
        assert!(matches!(
            DomainWindow::new(0.0, 1.0, 0.0, f64::NAN),
            Err(FieldError::InvalidArgument(_))
        ));
    }

    #[test]
    fn windows_outside_the_grid_are_range_errors() {
        let window = DomainWindow::new(3.0, 4.0, 0.0, 0.5).unwrap();
        assert!(matches!(
            select(&field(), &grid(), &window),
            Err(FieldError::Range { value, .. }) if value == 3.0
        ));
        let window = DomainWindow::new(0.6, 0.9, 0.0, 0.5).unwrap();
        assert!(matches!(
            window.indices(&grid()),
            Err(FieldError::Range { .. })
        ));
    }

    #[test]
    fn profiles() {
        let g = grid();
        let radial = radial_profile(&field(), &g, 2).unwrap();
        assert_eq!(radial.values, vec![20.0, 21.0, 22.0]);
        assert_eq!(radial.coords, vec![0.0, 0.25, 0.5]);
        let axial = axial_profile(&field(), &g, 1).unwrap();
        assert_eq!(axial.values, vec![1.0, 11.0, 21.0, 31.0, 41.0]);
        assert!(matches!(
            radial_profile(&field(), &g, 5),
            Err(FieldError::Range { .. })
        ));
        assert!(axial_profile(&Array2::zeros((2, 2)), &g, 0).is_err());
    }

    #[test]
    fn summary_statistics() {
        let summary = FieldSummary::describe(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(summary.count, 4);
        assert_relative_eq!(summary.mean, 2.5);
        assert_relative_eq!(summary.std, (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(summary.q25, 1.75);
        assert_relative_eq!(summary.median, 2.5);
        assert_relative_eq!(summary.q75, 3.25);
        assert_eq!((summary.min, summary.max), (1.0, 4.0));
        assert!(FieldSummary::describe(&Array2::<f64>::zeros((0, 3))).is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(
            "total:ux".parse::<FieldLabel>().unwrap(),
            FieldLabel::Total(Quantity::AxialVelocity)
        );
        assert_eq!(
            "rho".parse::<FieldLabel>().unwrap(),
            FieldLabel::Mean(Quantity::Density)
        );
        let label: FieldLabel = "Im(p)".parse().unwrap();
        assert!(label.symmetric_scale());
        assert_eq!(label.to_string(), "Im(p)");
        assert!(!"abs(p)".parse::<FieldLabel>().unwrap().symmetric_scale());
        assert!("total:vorticity".parse::<FieldLabel>().is_err());
    }
}
