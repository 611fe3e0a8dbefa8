//! Rescaling between the two dimensionless conventions.
//!
//! The mean-flow solver scales with the ambient state: velocities by `c_0`,
//! density by `rho_0`, pressure by `gamma p_0` and temperature by
//! `(gamma - 1) T_0`. The stability solver scales with the case's reference
//! state: velocities by `u_ref`, density by `rho_ref`, temperature by
//! `T_ref`, and pressure by either `rho_ref u_ref^2` or the tabulated
//! `P_ref`, depending on the [`PressureScaling`] revision in use.
//!
//! A field moves from one convention to the other by the ratio of the two
//! scales; grids are never touched.

use crate::ambient::AmbientConditions;
use crate::quantity::{FieldSet, Quantity};
use crate::reference::ReferenceState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Mul;
use tracing::warn;

/// Which reference pressure the stability convention divides by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureScaling {
    /// `rho_ref * u_ref^2`, consistent with the momentum scaling.
    #[default]
    DynamicHead,
    /// The reference pressure column of the reference table.
    Tabulated,
}

/// Dimensional scale of one quantity in each convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePair {
    pub mean_flow: f64,
    pub perturbation: f64,
}

impl ScalePair {
    /// Multiplier taking mean-flow values into the perturbation convention.
    pub fn to_perturbation(&self) -> f64 {
        self.mean_flow / self.perturbation
    }

    /// Multiplier taking perturbation values into the mean-flow convention.
    pub fn to_mean_flow(&self) -> f64 {
        self.perturbation / self.mean_flow
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTable {
    scaling: PressureScaling,
    factors: BTreeMap<Quantity, ScalePair>,
}

impl ConversionTable {
    pub fn new(
        ambient: &AmbientConditions,
        reference: &ReferenceState,
        scaling: PressureScaling,
    ) -> Self {
        let c0 = ambient.sound_speed();
        let reference_pressure = match scaling {
            PressureScaling::DynamicHead => reference.dynamic_head(),
            PressureScaling::Tabulated => reference.pressure,
        };

        let mut factors = BTreeMap::new();
        for q in [
            Quantity::AxialVelocity,
            Quantity::RadialVelocity,
            Quantity::AzimuthalVelocity,
        ] {
            factors.insert(
                q,
                ScalePair {
                    mean_flow: c0,
                    perturbation: reference.velocity,
                },
            );
        }
        factors.insert(
            Quantity::Density,
            ScalePair {
                mean_flow: ambient.density(),
                perturbation: reference.density,
            },
        );
        factors.insert(
            Quantity::Pressure,
            ScalePair {
                mean_flow: ambient.pressure_scale(),
                perturbation: reference_pressure,
            },
        );
        factors.insert(
            Quantity::Temperature,
            ScalePair {
                mean_flow: ambient.temperature_scale(),
                perturbation: reference.temperature,
            },
        );

        Self { scaling, factors }
    }

    pub fn scaling(&self) -> PressureScaling {
        self.scaling
    }

    pub fn factor(&self, quantity: Quantity) -> Option<ScalePair> {
        self.factors.get(&quantity).copied()
    }

    /// Drops a quantity from the table; conversions then skip it.
    pub fn without(mut self, quantity: Quantity) -> Self {
        self.factors.remove(&quantity);
        self
    }

    pub fn to_perturbation_reference<T>(&self, fields: &FieldSet<T>) -> FieldSet<T>
    where
        T: Clone + Mul<f64, Output = T>,
    {
        self.rescale(fields, ScalePair::to_perturbation)
    }

    pub fn to_mean_flow_reference<T>(&self, fields: &FieldSet<T>) -> FieldSet<T>
    where
        T: Clone + Mul<f64, Output = T>,
    {
        self.rescale(fields, ScalePair::to_mean_flow)
    }

    fn rescale<T, F>(&self, fields: &FieldSet<T>, direction: F) -> FieldSet<T>
    where
        T: Clone + Mul<f64, Output = T>,
        F: Fn(&ScalePair) -> f64,
    {
        fields.filter_map(|key, values| match self.factors.get(&key.quantity) {
            Some(pair) => {
                let ratio = direction(pair);
                Some(values.mapv(|v| v * ratio))
            }
            None => {
                warn!(field = %key, "no conversion factor, skipping field");
                None
            }
        })
    }
}
