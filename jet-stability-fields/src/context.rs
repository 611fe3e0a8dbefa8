use crate::ambient::AmbientConditions;
use crate::conversion::{ConversionTable, PressureScaling};
use crate::error::{FieldError, Result};
use crate::grid::RadialGrid;
use crate::mean_flow::MeanFlowField;
use crate::perturbation::StabilityPerturbationField;
use crate::reference::ReferenceCatalog;
use crate::storage::FieldStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only lookup tables shared by every field of an analysis session.
///
/// Cloning is cheap; the store, catalog and radial grid are reference
/// counted, so one context can be handed to workers processing different
/// cases in parallel.
#[derive(Debug, Clone)]
pub struct FieldContext {
    store: Arc<dyn FieldStore>,
    catalog: Arc<ReferenceCatalog>,
    radial: Arc<RadialGrid>,
    ambient: AmbientConditions,
    scaling: PressureScaling,
}

impl FieldContext {
    pub fn new(
        store: Arc<dyn FieldStore>,
        catalog: Arc<ReferenceCatalog>,
        radial: Arc<RadialGrid>,
        ambient: AmbientConditions,
        scaling: PressureScaling,
    ) -> Self {
        Self {
            store,
            catalog,
            radial,
            ambient,
            scaling,
        }
    }

    /// Reads the reference catalog and the radial grid from `store`.
    pub fn load(
        store: Arc<dyn FieldStore>,
        ambient: AmbientConditions,
        scaling: PressureScaling,
    ) -> Result<Self> {
        ambient.validate().map_err(FieldError::invalid)?;
        let catalog = ReferenceCatalog::load(store.as_ref())?;
        let radial = RadialGrid::new(store.radial_grid()?)
            .map_err(|e| FieldError::storage(store.describe(), e.to_string()))?;
        info!(
            cases = catalog.case_count(),
            radial_points = radial.len(),
            "opened {}",
            store.describe()
        );
        Ok(Self::new(
            store,
            Arc::new(catalog),
            Arc::new(radial),
            ambient,
            scaling,
        ))
    }

    pub fn store(&self) -> &dyn FieldStore {
        self.store.as_ref()
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn radial(&self) -> &Arc<RadialGrid> {
        &self.radial
    }

    pub fn ambient(&self) -> &AmbientConditions {
        &self.ambient
    }

    pub fn scaling(&self) -> PressureScaling {
        self.scaling
    }

    /// Case ids outside `[1, case_count]` are caller errors here, unlike in
    /// catalog lookups.
    pub fn check_case(&self, case_id: i64) -> Result<usize> {
        let case = crate::case::validate_case_id(case_id)?;
        if case > self.catalog.case_count() {
            return Err(FieldError::invalid(format!(
                "case id {} exceeds the {} available cases",
                case,
                self.catalog.case_count()
            )));
        }
        Ok(case)
    }

    /// Conversion factors of one case under the session's pressure scaling.
    pub fn conversion(&self, case_id: i64) -> Result<ConversionTable> {
        let reference = self.catalog.get_reference_state(case_id)?;
        if let Ok(discrepancy) = self.catalog.mach_discrepancy_percent(case_id, &self.ambient) {
            if discrepancy > 1.0 {
                warn!(
                    case_id,
                    discrepancy_percent = discrepancy,
                    "reference state disagrees with the Mach table"
                );
            }
        }
        Ok(ConversionTable::new(&self.ambient, &reference, self.scaling))
    }

    pub fn mean_flow(&self, case_id: i64) -> Result<MeanFlowField> {
        MeanFlowField::new(case_id, self)
    }

    pub fn perturbation(&self, strouhal: f64, case_id: i64) -> Result<StabilityPerturbationField> {
        StabilityPerturbationField::new(strouhal, case_id, self)
    }
}
