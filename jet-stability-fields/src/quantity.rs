//! Tagged keys for the physical quantities carried by mean-flow and
//! perturbation datasets, and the shape-checked collection that holds them.

use crate::error::{FieldError, Result};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Physical quantity of a jet field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quantity {
    Density,
    AxialVelocity,
    RadialVelocity,
    AzimuthalVelocity,
    Temperature,
    Pressure,
}

impl Quantity {
    pub const ALL: [Quantity; 6] = [
        Quantity::Density,
        Quantity::AxialVelocity,
        Quantity::RadialVelocity,
        Quantity::AzimuthalVelocity,
        Quantity::Temperature,
        Quantity::Pressure,
    ];

    /// Quantities tracked by the stability solver, in perturbation-record column order.
    pub const PERTURBED: [Quantity; 5] = [
        Quantity::AxialVelocity,
        Quantity::RadialVelocity,
        Quantity::AzimuthalVelocity,
        Quantity::Density,
        Quantity::Pressure,
    ];

    /// Short label used in data files and on plots.
    pub fn symbol(self) -> &'static str {
        match self {
            Quantity::Density => "rho",
            Quantity::AxialVelocity => "ux",
            Quantity::RadialVelocity => "ur",
            Quantity::AzimuthalVelocity => "ut",
            Quantity::Temperature => "T",
            Quantity::Pressure => "p",
        }
    }

    pub fn is_velocity(self) -> bool {
        matches!(
            self,
            Quantity::AxialVelocity | Quantity::RadialVelocity | Quantity::AzimuthalVelocity
        )
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Quantity {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "rho" => Ok(Quantity::Density),
            "ux" => Ok(Quantity::AxialVelocity),
            "ur" => Ok(Quantity::RadialVelocity),
            "ut" | "u_theta" => Ok(Quantity::AzimuthalVelocity),
            "T" => Ok(Quantity::Temperature),
            "p" | "P" => Ok(Quantity::Pressure),
            other => Err(FieldError::invalid(format!("unknown quantity '{}'", other))),
        }
    }
}

/// Which part of a (possibly complex) quantity an array holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    /// Real-valued field with no complex decomposition (mean flow, totals).
    Whole,
    Real,
    Imaginary,
    Magnitude,
}

/// A quantity crossed with a component tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldKey {
    pub quantity: Quantity,
    pub component: Component,
}

impl FieldKey {
    pub fn new(quantity: Quantity, component: Component) -> Self {
        Self {
            quantity,
            component,
        }
    }

    pub fn whole(quantity: Quantity) -> Self {
        Self::new(quantity, Component::Whole)
    }
}

impl From<Quantity> for FieldKey {
    fn from(quantity: Quantity) -> Self {
        FieldKey::whole(quantity)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.component {
            Component::Whole => write!(f, "{}", self.quantity),
            Component::Real => write!(f, "Re({})", self.quantity),
            Component::Imaginary => write!(f, "Im({})", self.quantity),
            Component::Magnitude => write!(f, "abs({})", self.quantity),
        }
    }
}

impl FromStr for FieldKey {
    type Err = FieldError;

    /// Parses `ux`, `Re(ux)`, `Im(ux)` and `abs(ux)` style labels.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let wrapped = [
            ("Re(", Component::Real),
            ("Im(", Component::Imaginary),
            ("abs(", Component::Magnitude),
        ];
        for (prefix, component) in wrapped {
            if let Some(inner) = s.strip_prefix(prefix).and_then(|r| r.strip_suffix(')')) {
                return Ok(FieldKey::new(inner.parse()?, component));
            }
        }
        Ok(FieldKey::whole(s.parse()?))
    }
}

/// Same-shape 2-D fields keyed by [`FieldKey`], indexed `(axial, radial)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet<T> {
    fields: BTreeMap<FieldKey, Array2<T>>,
}

impl<T> Default for FieldSet<T> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }
}

impl<T> FieldSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from string labels, skipping labels that do not name a
    /// known quantity.
    pub fn from_labelled<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Array2<T>)>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for (label, values) in entries {
            match label.as_ref().parse::<FieldKey>() {
                Ok(key) => set.insert(key, values)?,
                Err(_) => warn!(label = label.as_ref(), "skipping unrecognised field label"),
            }
        }
        Ok(set)
    }

    /// Inserts a field; every field in the set must share one shape.
    pub fn insert(&mut self, key: impl Into<FieldKey>, values: Array2<T>) -> Result<()> {
        let key = key.into();
        if let Some(shape) = self.shape() {
            if values.dim() != shape {
                return Err(FieldError::invalid(format!(
                    "field {} has shape {:?}, expected {:?}",
                    key,
                    values.dim(),
                    shape
                )));
            }
        }
        self.fields.insert(key, values);
        Ok(())
    }

    pub fn get(&self, key: impl Into<FieldKey>) -> Option<&Array2<T>> {
        self.fields.get(&key.into())
    }

    pub fn contains(&self, key: impl Into<FieldKey>) -> bool {
        self.fields.contains_key(&key.into())
    }

    /// Shape shared by every field, `None` when empty.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.fields.values().next().map(|a| a.dim())
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.fields.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &Array2<T>)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Applies `f` to every field, keeping keys.
    pub fn map<U, F>(&self, mut f: F) -> FieldSet<U>
    where
        F: FnMut(FieldKey, &Array2<T>) -> Array2<U>,
    {
        FieldSet {
            fields: self.fields.iter().map(|(k, v)| (*k, f(*k, v))).collect(),
        }
    }

    /// Like [`FieldSet::map`] but drops fields for which `f` returns `None`.
    /// `f` must preserve the field shape.
    pub fn filter_map<U, F>(&self, mut f: F) -> FieldSet<U>
    where
        F: FnMut(FieldKey, &Array2<T>) -> Option<Array2<U>>,
    {
        let fields: BTreeMap<FieldKey, Array2<U>> = self
            .fields
            .iter()
            .filter_map(|(k, v)| f(*k, v).map(|out| (*k, out)))
            .collect();
        debug_assert!(fields.values().all(|a| Some(a.dim()) == self.shape()));
        FieldSet { fields }
    }
}

impl<T> IntoIterator for FieldSet<T> {
    type Item = (FieldKey, Array2<T>);
    type IntoIter = std::collections::btree_map::IntoIter<FieldKey, Array2<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
