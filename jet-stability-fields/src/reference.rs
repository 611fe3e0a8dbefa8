use crate::ambient::AmbientConditions;
use crate::error::{FieldError, Result};
use crate::storage::FieldStore;
use tracing::debug;

/// Dimensional reference values of one operating case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceState {
    /// Reference (jet exit) axial velocity, m/s.
    pub velocity: f64,
    /// kg/m^3.
    pub density: f64,
    /// K.
    pub temperature: f64,
    /// Pa.
    pub pressure: f64,
}

impl ReferenceState {
    /// `rho_ref * u_ref^2`.
    pub fn dynamic_head(&self) -> f64 {
        self.density * self.velocity * self.velocity
    }
}

/// Row of the Mach table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MachEntry {
    pub id: usize,
    pub mach: f64,
}

/// Per-case reference values and Mach numbers, looked up by 1-based case id.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    states: Vec<ReferenceState>,
    machs: Vec<MachEntry>,
    case_count: usize,
}

impl ReferenceCatalog {
    pub fn new(states: Vec<ReferenceState>, machs: Vec<MachEntry>, case_count: usize) -> Self {
        Self {
            states,
            machs,
            case_count,
        }
    }

    /// Reads the reference and Mach tables once; the number of cases is the
    /// number of mean-flow records the store holds.
    pub fn load(store: &dyn FieldStore) -> Result<Self> {
        let case_count = store.case_count()?;
        let states = store.reference_table()?;
        let machs = store.mach_table()?;
        debug!(
            case_count,
            reference_rows = states.len(),
            mach_rows = machs.len(),
            "loaded reference catalog from {}",
            store.describe()
        );
        Ok(Self::new(states, machs, case_count))
    }

    pub fn case_count(&self) -> usize {
        self.case_count
    }

    fn check_case(&self, case_id: i64) -> Result<usize> {
        if case_id < 1 || case_id as usize > self.case_count {
            return Err(FieldError::NotFound {
                case_id,
                case_count: self.case_count,
            });
        }
        Ok(case_id as usize)
    }

    pub fn get_reference_state(&self, case_id: i64) -> Result<ReferenceState> {
        let case = self.check_case(case_id)?;
        self.states.get(case - 1).copied().ok_or_else(|| {
            FieldError::storage(
                "reference table",
                format!(
                    "no reference row for case {} ({} rows)",
                    case,
                    self.states.len()
                ),
            )
        })
    }

    pub fn get_mach(&self, case_id: i64) -> Result<f64> {
        let case = self.check_case(case_id)?;
        self.machs
            .iter()
            .find(|entry| entry.id == case)
            .map(|entry| entry.mach)
            .ok_or_else(|| {
                FieldError::storage("Mach table", format!("no Mach entry for case {}", case))
            })
    }

    /// Mach number implied by the reference velocity and temperature.
    pub fn computed_mach(&self, case_id: i64, ambient: &AmbientConditions) -> Result<f64> {
        let state = self.get_reference_state(case_id)?;
        Ok(state.velocity / ambient.speed_of_sound_at(state.temperature))
    }

    /// Relative gap, in percent, between the implied and tabulated Mach numbers.
    pub fn mach_discrepancy_percent(
        &self,
        case_id: i64,
        ambient: &AmbientConditions,
    ) -> Result<f64> {
        let computed = self.computed_mach(case_id, ambient)?;
        let tabulated = self.get_mach(case_id)?;
        Ok(100.0 * (computed - tabulated).abs() / tabulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn catalog() -> ReferenceCatalog {
        ReferenceCatalog::new(
            vec![
                ReferenceState {
                    velocity: 311.529138,
                    density: 1.576135,
                    temperature: 254.860326,
                    pressure: 115326.441784,
                },
                ReferenceState {
                    velocity: 311.916903,
                    density: 1.574279,
                    temperature: 254.740191,
                    pressure: 115136.336935,
                },
            ],
            vec![
                MachEntry { id: 1, mach: 0.97335 },
                MachEntry { id: 2, mach: 0.97479 },
            ],
            2,
        )
    }

    #[test]
    fn lookups_are_one_based() {
        let cat = catalog();
        assert_eq!(cat.get_reference_state(2).unwrap().velocity, 311.916903);
        assert_eq!(cat.get_mach(1).unwrap(), 0.97335);
    }

    #[test]
    fn out_of_range_cases_are_not_found() {
        let cat = catalog();
        for case in [0, 3, -1] {
            assert!(matches!(
                cat.get_reference_state(case),
                Err(FieldError::NotFound { .. })
            ));
            assert!(matches!(cat.get_mach(case), Err(FieldError::NotFound { .. })));
        }
    }

    #[test]
    fn implied_mach_matches_table() {
        let cat = catalog();
        let ambient = AmbientConditions::default();
        let computed = cat.computed_mach(1, &ambient).unwrap();
        assert_relative_eq!(computed, 0.97335, epsilon = 1e-3);
        assert!(cat.mach_discrepancy_percent(1, &ambient).unwrap() < 0.1);
    }

    #[test]
    fn missing_rows_are_storage_errors() {
        let cat = ReferenceCatalog::new(vec![], vec![], 1);
        assert!(cat.get_reference_state(1).unwrap_err().is_storage());
        assert!(cat.get_mach(1).unwrap_err().is_storage());
    }
}
