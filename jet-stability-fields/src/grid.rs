use crate::error::{FieldError, Result};
use std::collections::HashSet;
use std::sync::Arc;

fn check_increasing(coords: &[f64], what: &str) -> Result<()> {
    if coords.is_empty() {
        return Err(FieldError::invalid(format!("{} grid is empty", what)));
    }
    if let Some(bad) = coords.iter().find(|v| !v.is_finite()) {
        return Err(FieldError::invalid(format!(
            "{} grid contains a non-finite coordinate ({})",
            what, bad
        )));
    }
    if let Some(i) = coords.windows(2).position(|w| w[1] <= w[0]) {
        return Err(FieldError::invalid(format!(
            "{} grid is not strictly increasing at index {} ({} -> {})",
            what,
            i + 1,
            coords[i],
            coords[i + 1]
        )));
    }
    Ok(())
}

/// Strictly increasing axial (jet-centreline) coordinates, in nozzle diameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AxialGrid {
    coords: Vec<f64>,
}

impl AxialGrid {
    pub fn new(coords: Vec<f64>) -> Result<Self> {
        check_increasing(&coords, "axial")?;
        Ok(Self { coords })
    }

    /// Keeps the first occurrence of every value, in input order.
    pub fn from_unique<I: IntoIterator<Item = f64>>(values: I) -> Result<Self> {
        let mut seen = HashSet::new();
        let coords = values
            .into_iter()
            .filter(|v| seen.insert(v.to_bits()))
            .collect();
        Self::new(coords)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn x_coord(&self, i: usize) -> f64 {
        self.coords[i]
    }

    pub fn start(&self) -> f64 {
        self.coords[0]
    }

    pub fn end(&self) -> f64 {
        self.coords[self.coords.len() - 1]
    }

    /// True when `other` lies entirely within this grid's closed domain.
    pub fn covers(&self, other: &AxialGrid) -> bool {
        other.start() >= self.start() && other.end() <= self.end()
    }
}

/// Radial coordinates shared by the mean-flow and perturbation datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGrid {
    coords: Vec<f64>,
}

impl RadialGrid {
    pub fn new(coords: Vec<f64>) -> Result<Self> {
        check_increasing(&coords, "radial")?;
        Ok(Self { coords })
    }

    pub fn get_radial_grid(&self) -> &[f64] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn r_coord(&self, k: usize) -> f64 {
        self.coords[k]
    }
}

/// Pairing of one dataset's axial grid with the shared radial grid.
#[derive(Debug, Clone)]
pub struct FieldGrid {
    pub axial: AxialGrid,
    pub radial: Arc<RadialGrid>,
}

impl FieldGrid {
    pub fn new(axial: AxialGrid, radial: Arc<RadialGrid>) -> Self {
        FieldGrid { axial, radial }
    }

    /// `(nx, nr)`, the shape of every field on this grid.
    pub fn dim(&self) -> (usize, usize) {
        (self.axial.len(), self.radial.len())
    }

    pub fn x_coord(&self, i: usize) -> f64 {
        self.axial.x_coord(i)
    }

    pub fn r_coord(&self, k: usize) -> f64 {
        self.radial.r_coord(k)
    }

    pub fn in_bounds(&self, i: usize, k: usize) -> bool {
        i < self.axial.len() && k < self.radial.len()
    }

    /// Axial extent of the domain.
    pub fn width(&self) -> f64 {
        self.axial.end() - self.axial.start()
    }

    /// Radial extent of the domain.
    pub fn height(&self) -> f64 {
        self.radial.r_coord(self.radial.len() - 1) - self.radial.r_coord(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_keeps_first_occurrence_order() {
        let grid = AxialGrid::from_unique(vec![0.0, 0.0, 0.5, 0.5, 0.5, 1.25]).unwrap();
        assert_eq!(grid.coords(), &[0.0, 0.5, 1.25]);
    }

    #[test]
    fn rejects_non_monotonic_grids() {
        assert!(AxialGrid::new(vec![0.0, 1.0, 0.5]).is_err());
        assert!(AxialGrid::new(vec![]).is_err());
        assert!(RadialGrid::new(vec![0.0, f64::NAN]).is_err());
    }

    #[test]
    fn field_grid_bounds() {
        let grid = FieldGrid::new(
            AxialGrid::new(vec![0.0, 2.0, 4.0]).unwrap(),
            Arc::new(RadialGrid::new(vec![0.0, 0.5]).unwrap()),
        );
        assert_eq!(grid.dim(), (3, 2));
        assert!(grid.in_bounds(2, 1));
        assert!(!grid.in_bounds(3, 0));
        assert_eq!(grid.width(), 4.0);
        assert_eq!(grid.height(), 0.5);
    }

    #[test]
    fn coverage() {
        let source = AxialGrid::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert!(source.covers(&AxialGrid::new(vec![0.5, 3.0]).unwrap()));
        assert!(!source.covers(&AxialGrid::new(vec![0.5, 3.1]).unwrap()));
    }
}
