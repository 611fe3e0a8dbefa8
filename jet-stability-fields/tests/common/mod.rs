//! Synthetic jet datasets for integration tests.

#![allow(dead_code)]

use jet_stability_fields::reference::MachEntry;
use jet_stability_fields::storage::{PerturbationTable, PERTURBATION_COLUMNS};
use jet_stability_fields::{
    AmbientConditions, CaseSelector, FieldContext, MemoryStore, PressureScaling, ReferenceState,
    StabilityPhase,
};
use ndarray::Array3;
use std::path::PathBuf;
use std::sync::Arc;

pub const STROUHAL: f64 = 0.4;

/// Radial positions `0..=3` nozzle diameters.
pub fn radial(nr: usize) -> Vec<f64> {
    (0..nr).map(|k| 3.0 * k as f64 / (nr - 1) as f64).collect()
}

pub fn mean_stations(nx: usize) -> Vec<f64> {
    (0..nx).map(|i| 0.05 * i as f64).collect()
}

/// Every `stride`-th mean-flow station, starting at the first.
pub fn strided(xs: &[f64], stride: usize) -> Vec<f64> {
    xs.iter().step_by(stride).copied().collect()
}

/// `(Nx, Nr, 8)` record with smooth jet-like profiles.
pub fn mean_record(xs: &[f64], rs: &[f64], case_id: usize) -> Array3<f64> {
    let c = case_id as f64;
    Array3::from_shape_fn((xs.len(), rs.len(), 8), |(i, k, n)| {
        let (x, r) = (xs[i], rs[k]);
        let shear = (-(r - 0.5).powi(2) * (1.0 + 0.05 * x)).exp();
        match n {
            0 => x,
            1 => r,
            2 => 1.0 + 0.1 * shear,
            3 => (0.9 + 0.01 * c) * shear,
            4 => 0.02 * r * shear * (0.3 * x).sin(),
            5 => 0.0,
            6 => 2.5 + 0.2 * shear,
            _ => 1.0 / 1.4 + 0.001 * (0.2 * x).cos() * shear,
        }
    })
}

fn perturbation_value(quantity: usize, x: f64, r: f64) -> (f64, f64) {
    let q = 1.0 + quantity as f64;
    let envelope = (-(r - 0.5).powi(2)).exp();
    (
        q * envelope * (1.3 * x).cos(),
        q * envelope * (1.3 * x).sin() * (1.0 + 0.1 * r),
    )
}

/// Flat perturbation rows over `xs` x `rs`, radial positions listed outward
/// to inward as the solver writes them.
pub fn perturbation_table(xs: &[f64], rs: &[f64]) -> PerturbationTable {
    let mut rows = Vec::with_capacity(xs.len() * rs.len());
    for &x in xs {
        for &r in rs.iter().rev() {
            let mut row = Vec::with_capacity(PERTURBATION_COLUMNS);
            row.push(x);
            row.push(r);
            for quantity in 0..5 {
                let (re, im) = perturbation_value(quantity, x, r);
                row.extend([re, im, re.hypot(im)]);
            }
            rows.push(row);
        }
    }
    PerturbationTable::from_rows(PathBuf::from("pertpse_synthetic.dat"), &rows).unwrap()
}

/// Growth then decay: `Theta = 1.3 x + i (-0.2 x + 0.02 x^2)`.
pub fn stability_phase(xs: &[f64]) -> StabilityPhase {
    let rows: Vec<Vec<f64>> = xs
        .iter()
        .map(|&x| {
            let (a_re, a_im) = (1.3, -0.2 + 0.04 * x);
            let (t_re, t_im) = (1.3 * x, -0.2 * x + 0.02 * x * x);
            vec![
                x,
                a_re,
                a_im,
                f64::hypot(a_re, a_im),
                t_re,
                t_im,
                STROUHAL * std::f64::consts::PI / a_re,
                -a_im,
                -t_im,
            ]
        })
        .collect();
    StabilityPhase::from_rows(PathBuf::from("vappse_synthetic.dat"), &rows).unwrap()
}

pub fn reference_states(cases: usize) -> Vec<ReferenceState> {
    (0..cases)
        .map(|n| ReferenceState {
            velocity: 311.529138 + 0.4 * n as f64,
            density: 1.576135 - 0.002 * n as f64,
            temperature: 254.860326 - 0.1 * n as f64,
            pressure: 115326.441784 - 190.0 * n as f64,
        })
        .collect()
}

/// Store with `cases` cases, each with a mean flow on `nx_mean` stations and
/// a perturbation at St 0.4 on every `stride`-th of them.
pub fn store(cases: usize, nx_mean: usize, stride: usize, nr: usize) -> MemoryStore {
    let rs = radial(nr);
    let xs = mean_stations(nx_mean);
    let pert_xs = strided(&xs, stride);
    let machs = (1..=cases)
        .map(|id| MachEntry {
            id,
            mach: 0.97335 + 0.0014 * (id - 1) as f64,
        })
        .collect();
    let mut store = MemoryStore::new(reference_states(cases), machs, rs.clone());
    for case in 1..=cases {
        store.insert_mean_flow(case, mean_record(&xs, &rs, case));
        let selector = CaseSelector::new(case as i64, STROUHAL).unwrap();
        store.insert_stability(
            &selector,
            perturbation_table(&pert_xs, &rs),
            stability_phase(&pert_xs),
        );
    }
    store
}

pub fn context(store: MemoryStore, scaling: PressureScaling) -> FieldContext {
    FieldContext::load(Arc::new(store), AmbientConditions::default(), scaling).unwrap()
}

/// Two cases, 41 mean-flow stations, perturbation on every 5th, 12 radii.
pub fn small_context() -> FieldContext {
    context(store(2, 41, 5, 12), PressureScaling::DynamicHead)
}
