// keepers are plain name-keyed maps with a fast hasher
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

// used to print out readable forms of declarations
use std::fmt;

use serde::Serialize;

// our own stuff that we need
use crate::calendar::TimeInterval;
use crate::error::{CatalogError, Result};
use crate::value::Value;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

// ------------- Target -------------
#[derive(Debug, Clone)]
pub struct Target {
    name: String,
    base_date: Value,
    interval: TimeInterval,
    increment_hours: f64,
    snapshots: i32,
    values: Vec<String>,
    attributes: HashMap<String, String, OtherHasher>,
    template: String,
}
impl Target {
    /// `values` must line up with the attribute `schema`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        base_date: Value,
        interval: TimeInterval,
        increment_hours: f64,
        snapshots: i32,
        schema: &[String],
        values: Vec<String>,
        template: String,
    ) -> Result<Self> {
        if schema.len() != values.len() {
            return Err(CatalogError::syntax(format!(
                "target '{}' has {} attribute values but {} attributes are declared",
                name,
                values.len(),
                schema.len()
            )));
        }
        let attributes = schema.iter().cloned().zip(values.iter().cloned()).collect();
        Ok(Self { name, base_date, interval, increment_hours, snapshots, values, attributes, template })
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn base_date(&self) -> &Value {
        &self.base_date
    }
    pub fn interval(&self) -> &TimeInterval {
        &self.interval
    }
    pub fn increment_hours(&self) -> f64 {
        self.increment_hours
    }
    pub fn snapshots(&self) -> i32 {
        self.snapshots
    }
    pub fn template(&self) -> &str {
        &self.template
    }
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
    pub fn attribute_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }
}
impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} := [{}] ; {}h x {} ; {} ; {}",
            self.name,
            self.base_date,
            self.increment_hours,
            self.snapshots,
            self.values.join(" ; "),
            self.template
        )
    }
}

#[derive(Debug, Default)]
pub struct TargetKeeper {
    kept: HashMap<String, Arc<Target>, OtherHasher>,
}
impl TargetKeeper {
    pub fn new() -> Self {
        Self { kept: HashMap::default() }
    }
    pub fn keep(&mut self, target: Target) -> Result<Arc<Target>> {
        match self.kept.entry(target.name.clone()) {
            Entry::Vacant(e) => Ok(Arc::clone(e.insert(Arc::new(target)))),
            Entry::Occupied(e) => Err(CatalogError::DuplicateDefinition { kind: "Target", name: e.key().clone() }),
        }
    }
    pub fn get(&self, name: &str) -> Option<Arc<Target>> {
        self.kept.get(name).map(Arc::clone)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Quantity -------------

/// A quantity's link to one target, with the unit conversion that applies to
/// data read from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetRef {
    pub target: String,
    pub units: String,
    pub scale: f64,
    pub offset: f64,
    pub description: String,
}
impl TargetRef {
    pub fn new(target: &str) -> Self {
        Self { target: target.to_owned(), units: String::new(), scale: 1.0, offset: 0.0, description: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub name: String,
    pub standard_name: String,
    pub dims: i32,
    /// in order of preference
    pub targets: Vec<TargetRef>,
}

#[derive(Debug, Default)]
pub struct QuantityKeeper {
    kept: HashMap<String, Arc<Quantity>, OtherHasher>,
    standard_names: HashMap<String, String, OtherHasher>,
}
impl QuantityKeeper {
    pub fn new() -> Self {
        Self { kept: HashMap::default(), standard_names: HashMap::default() }
    }
    pub fn keep(&mut self, quantity: Quantity) -> Result<Arc<Quantity>> {
        match self.kept.entry(quantity.name.clone()) {
            Entry::Vacant(e) => {
                // the first quantity to claim a standard name keeps it
                self.standard_names
                    .entry(quantity.standard_name.clone())
                    .or_insert_with(|| quantity.name.clone());
                Ok(Arc::clone(e.insert(Arc::new(quantity))))
            }
            Entry::Occupied(e) => Err(CatalogError::DuplicateDefinition { kind: "Quantity", name: e.key().clone() }),
        }
    }
    pub fn get(&self, name: &str) -> Option<Arc<Quantity>> {
        self.kept.get(name).map(Arc::clone)
    }
    pub fn by_standard_name(&self, standard_name: &str) -> Option<&str> {
        self.standard_names.get(standard_name).map(String::as_str)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Dimension -------------
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionMode {
    /// `V`: the values as listed
    Explicit(Vec<f64>),
    /// `LDN`: start, step, count
    Step { start: f64, step: f64, count: usize },
    /// `LHN`: first, last, count
    Span { start: f64, end: f64, count: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub quantity: String,
    pub units: String,
    pub mode: DimensionMode,
}
impl Dimension {
    pub fn values(&self) -> Vec<f64> {
        match &self.mode {
            DimensionMode::Explicit(values) => values.clone(),
            DimensionMode::Step { start, step, count } => (0..*count).map(|i| start + step * i as f64).collect(),
            DimensionMode::Span { start, end, count } => {
                let step = if *count > 1 { (end - start) / (*count - 1) as f64 } else { 0.0 };
                (0..*count).map(|i| start + step * i as f64).collect()
            }
        }
    }
}

/// Coordinate values of a dimension, as handed out to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionValues {
    pub quantity: String,
    pub units: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct DimensionKeeper {
    kept: HashMap<String, Dimension, OtherHasher>,
}
impl DimensionKeeper {
    pub fn new() -> Self {
        Self { kept: HashMap::default() }
    }
    pub fn keep(&mut self, dimension: Dimension) -> Result<()> {
        match self.kept.entry(dimension.name.clone()) {
            Entry::Vacant(e) => {
                e.insert(dimension);
                Ok(())
            }
            Entry::Occupied(e) => Err(CatalogError::DuplicateDefinition { kind: "Dimension", name: e.key().clone() }),
        }
    }
    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.kept.get(name)
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
}
