//! The catalog: loaded declarations plus the query entry point.
//!
//! A [`Catalog`] is built empty (optionally with a locator naming its file),
//! loads its configuration on first use, and answers `query` calls by
//! bracketing the requested instant for every target of a quantity, resolving
//! the target templates at the bracketing windows, and ranking the results by
//! the caller's attribute preferences.
//!
//! A catalog is mutable state: queries install per-query automatic variables.
//! Independent instances are fully independent.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::bracket::{self, Spacing};
use crate::calendar;
use crate::candidate::{Candidate, SourceKind};
use crate::error::{CatalogError, Result};
use crate::expr::{self, EvalContext, Resolve};
use crate::grammar::{self, Declaration, TargetDecl};
use crate::model::{DimensionKeeper, DimensionValues, Quantity, QuantityKeeper, Target, TargetKeeper, TargetRef};
use crate::rank::{self, Preference, Preferences};
use crate::settings::Settings;
use crate::template;
use crate::value::{Kind, Payload};
use crate::variable::{Scope, VariableStore};

#[derive(Debug, Default)]
pub struct Catalog {
    locator: String,
    settings: Settings,
    variables: VariableStore,
    targets: TargetKeeper,
    quantities: QuantityKeeper,
    dimensions: DimensionKeeper,
    schema: Vec<String>,
    desired: Preferences,
    spacing: Spacing,
    first_date: String,
    final_date: String,
    rules: usize,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locator(locator: &str) -> Self {
        Self { locator: locator.to_owned(), ..Self::default() }
    }

    pub fn with_settings(locator: &str, settings: Settings) -> Self {
        Self { locator: locator.to_owned(), settings, ..Self::default() }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn set_locator(&mut self, locator: &str) {
        self.locator = locator.to_owned();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Path of the catalog file named by the locator.
    pub fn find_config(&self) -> Result<PathBuf> {
        self.settings.find_catalog(&self.locator)
    }

    /// Number of declarations currently loaded.
    pub fn rules(&self) -> usize {
        self.rules
    }

    // ------------- Loading -------------

    /// Loads the given file, or the one found through the locator.
    pub fn load(&mut self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.find_config()?,
        };
        let text = fs::read_to_string(&path)
            .map_err(|e| CatalogError::ConfigNotFound(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "loading catalog");
        self.load_str(&text)
    }

    /// Replaces the loaded declarations with those in `text`. Nothing is kept
    /// if any line fails.
    pub fn load_str(&mut self, text: &str) -> Result<()> {
        let started = Instant::now();
        self.clear();
        let result = self.apply_lines(text);
        if let Err(e) = &result {
            warn!(error = %e, "catalog load aborted");
            self.clear();
            return result;
        }
        info!(
            ms = started.elapsed().as_secs_f64() * 1000.0,
            rules = self.rules,
            targets = self.targets.len(),
            quantities = self.quantities.len(),
            "catalog loaded"
        );
        Ok(())
    }

    fn apply_lines(&mut self, text: &str) -> Result<()> {
        let mut declarations = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if grammar::is_ignorable(line) {
                continue;
            }
            let number = index + 1;
            let declaration = grammar::parse_declaration(line).map_err(|e| e.at_line(number))?;
            declarations.push((number, declaration));
        }
        // targets need the attribute names, wherever they were declared
        let (schemas, others): (Vec<_>, Vec<_>) =
            declarations.into_iter().partition(|(_, d)| matches!(d, Declaration::Schema(_)));
        for (number, declaration) in schemas.into_iter().chain(others) {
            self.apply(declaration).map_err(|e| e.at_line(number))?;
        }
        Ok(())
    }

    /// Adds a single declaration line to the loaded catalog.
    pub fn add_rule(&mut self, line: &str) -> Result<()> {
        if grammar::is_ignorable(line) {
            return Ok(());
        }
        let declaration = grammar::parse_declaration(line)?;
        self.apply(declaration)
    }

    fn apply(&mut self, declaration: Declaration) -> Result<()> {
        debug!(?declaration, "rule");
        match declaration {
            Declaration::Schema(names) => {
                if !self.schema.is_empty() {
                    return Err(CatalogError::syntax("attribute names are declared more than once"));
                }
                for name in &names {
                    self.desired.insert(name.clone(), Preference::default());
                }
                self.schema = names;
            }
            Declaration::FirstDate(text) => {
                calendar::parse_date(&text)?;
                self.first_date = text;
            }
            Declaration::FinalDate(text) => {
                calendar::parse_date(&text)?;
                self.final_date = text;
            }
            Declaration::Target(decl) => {
                let target = self.build_target(decl)?;
                self.targets.keep(target)?;
            }
            Declaration::Quantity(quantity) => {
                self.quantities.keep(quantity)?;
            }
            Declaration::Dimension(dimension) => {
                self.dimensions.keep(dimension)?;
            }
            Declaration::Variable { name, kind, definition } => {
                self.variables.add_definition(&name, kind, definition)?;
            }
        }
        self.rules += 1;
        Ok(())
    }

    fn build_target(&self, decl: TargetDecl) -> Result<Target> {
        if self.schema.is_empty() {
            return Err(CatalogError::syntax(format!(
                "target '{}' given before any attribute names",
                decl.name
            )));
        }
        let (values, template) = decl.split_tail(self.schema.len())?;
        Target::new(
            decl.name,
            decl.base_date,
            decl.interval,
            decl.increment_hours,
            decl.snapshots,
            &self.schema,
            values,
            template,
        )
    }

    fn clear(&mut self) {
        self.variables.clear();
        self.targets = TargetKeeper::new();
        self.quantities = QuantityKeeper::new();
        self.dimensions = DimensionKeeper::new();
        self.schema.clear();
        self.desired.clear();
        self.first_date.clear();
        self.final_date.clear();
        self.rules = 0;
    }

    /// Drops everything loaded; the next query loads again.
    pub fn reset(&mut self) {
        self.clear();
        self.spacing = Spacing::default();
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.rules == 0 {
            self.load(None)?;
        }
        Ok(())
    }

    // ------------- Queries -------------

    /// Candidate locations for `quantity` at `valid_at`, best first. An
    /// unknown quantity yields no candidates.
    pub fn query(&mut self, quantity: &str, valid_at: &str, tag: &str) -> Result<Vec<Candidate>> {
        let started = Instant::now();
        self.ensure_loaded()?;
        let t = Self::date_to_number(valid_at)?;
        let Some(q) = self.quantities.get(quantity) else {
            debug!(quantity, "unknown quantity");
            return Ok(Vec::new());
        };
        let mut candidates = Vec::with_capacity(q.targets.len());
        for reference in &q.targets {
            let target = self
                .targets
                .get(&reference.target)
                .ok_or_else(|| CatalogError::UnknownTarget(reference.target.clone()))?;
            candidates.push(self.resolve(&q, reference, &target, valid_at, t, tag)?);
        }
        let ranked = rank::rank(candidates, &self.schema, &self.desired);
        info!(
            ms = started.elapsed().as_secs_f64() * 1000.0,
            quantity,
            candidates = ranked.len(),
            "query complete"
        );
        Ok(ranked)
    }

    fn resolve(
        &mut self,
        quantity: &Quantity,
        reference: &TargetRef,
        target: &Target,
        valid_at: &str,
        t: f64,
        tag: &str,
    ) -> Result<Candidate> {
        self.variables.install_automatic(&quantity.name, t, tag)?;
        let base = self.base_date(target)?;
        let b = bracket::bracket(base, target.interval(), target.increment_hours(), t, self.spacing)?;

        self.variables.install_automatic(&quantity.name, b.pre_start, tag)?;
        let pre = self.resolve_template(target)?;
        let post = if b.post_start != b.pre_start {
            self.variables.install_automatic(&quantity.name, b.post_start, tag)?;
            self.resolve_template(target)?
        } else {
            pre.clone()
        };

        let inc = target.increment_hours() / 24.0;
        let span = b.post_start - b.pre_start;
        let spacing_days = if inc != 0.0 {
            inc
        } else if b.pre_index > 0 {
            (b.pre_time - b.pre_start) / b.pre_index as f64
        } else if target.snapshots() > 0 {
            span / f64::from(target.snapshots())
        } else {
            span
        };
        let render = |days: f64| calendar::render_date(days, None, None);
        let candidate = Candidate {
            quantity: quantity.name.clone(),
            valid_at: valid_at.to_owned(),
            dims: quantity.dims,
            target: target.name().to_owned(),
            units: reference.units.clone(),
            scale: reference.scale,
            offset: reference.offset,
            description: reference.description.clone(),
            kind: SourceKind::classify(&pre),
            attributes: self.schema.iter().map(|a| target.attribute(a).unwrap_or_default().to_owned()).collect(),
            snapshots: b.snapshots,
            spacing_days,
            pre_time: render(b.pre_time)?,
            pre_start: render(b.pre_start)?,
            pre_start_days: b.pre_start,
            pre_index: b.pre_index,
            pre,
            post_time: render(b.post_time)?,
            post_start: render(b.post_start)?,
            post_start_days: b.post_start,
            post_index: b.post_index,
            post,
        };
        debug!(target_name = %candidate.target, pre = %candidate.pre, post = %candidate.post, "candidate");
        Ok(candidate)
    }

    fn base_date(&self, target: &Target) -> Result<f64> {
        let scope = Scope::new(&self.variables, Some(target));
        let value = expr::realize(target.base_date(), &scope, &mut EvalContext::new())?.convert(Kind::Date)?;
        match value.payload() {
            Some(Payload::Date(days)) => Ok(*days),
            _ => Err(CatalogError::InvalidDateString(value.to_string())),
        }
    }

    fn resolve_template(&self, target: &Target) -> Result<String> {
        let scope = Scope::new(&self.variables, Some(target));
        template::interpolate(target.template(), &scope, &mut EvalContext::new())
    }

    /// The printed value of a variable, target-independent.
    pub fn variable_value(&mut self, name: &str) -> Result<String> {
        self.ensure_loaded()?;
        let scope = Scope::new(&self.variables, None);
        scope.lookup(name, &mut EvalContext::new())?.print()
    }

    // ------------- Lookups -------------

    pub fn dimension_values(&self, name: &str) -> Option<DimensionValues> {
        self.dimensions.get(name).map(|d| DimensionValues {
            quantity: d.quantity.clone(),
            units: d.units.clone(),
            values: d.values(),
        })
    }

    /// The quantity declared with the given standard name.
    pub fn std_lookup(&self, standard_name: &str) -> Option<&str> {
        self.quantities.by_standard_name(standard_name)
    }

    pub fn attributes(&self) -> &[String] {
        &self.schema
    }

    pub fn attr_name(&self, index: usize) -> Option<&str> {
        self.schema.get(index).map(String::as_str)
    }

    pub fn attr_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|a| a == name)
    }

    pub fn target_attr(&self, target: &str, attr: &str) -> Option<String> {
        self.targets.get(target)?.attribute(attr).map(str::to_owned)
    }

    pub fn target_attr_at(&self, target: &str, index: usize) -> Option<String> {
        self.targets.get(target)?.attribute_at(index).map(str::to_owned)
    }

    pub fn candidate_attr(&self, candidate: &Candidate, attr: &str) -> Option<String> {
        let index = self.attr_index(attr)?;
        candidate.attributes.get(index).cloned()
    }

    /// Prefers candidates whose `attr` equals `value`. A priority of 9999 makes
    /// the match mandatory, -9999 makes it disqualifying.
    pub fn desire(&mut self, attr: &str, value: &str, priority: i32) {
        self.desired.insert(attr.to_owned(), Preference { value: value.to_owned(), priority });
    }

    pub fn desired(&self, attr: &str) -> Option<&Preference> {
        self.desired.get(attr)
    }

    /// Sets the caller's desired snapshot spacing and the hour of day that
    /// windows should align to.
    pub fn set_time_spacing(&mut self, desired_hours: f64, offset_hours: Option<f64>) {
        self.spacing = Spacing { desired_hours, offset_hours };
    }

    pub fn time_spacing(&self) -> Spacing {
        self.spacing
    }

    /// Snapshot spacing in days, window start in days, and snapshots per window.
    pub fn candidate_time_spacing(&self, candidate: &Candidate) -> (f64, f64, i64) {
        (candidate.spacing_days, candidate.pre_start_days, candidate.snapshots)
    }

    /// Increment in hours, base date as written, and declared snapshot count.
    pub fn target_time_info(&self, target: &str) -> Option<(f64, String, i32)> {
        let t = self.targets.get(target)?;
        let base = t.base_date().nominal().map(str::to_owned).unwrap_or_else(|| t.base_date().to_string());
        Some((t.increment_hours(), base, t.snapshots()))
    }

    pub fn date_to_number(text: &str) -> Result<f64> {
        let text = text.trim();
        calendar::parse_date(text).map_err(|_| CatalogError::InvalidDateString(text.to_owned()))
    }

    pub fn first_date(&self) -> &str {
        &self.first_date
    }

    pub fn final_date(&self) -> &str {
        &self.final_date
    }
}
