//! Declared and automatic variables, and name resolution against them.

use std::collections::HashMap;
use std::env;

use tracing::trace;

use crate::calendar::{self, DateParts};
use crate::error::{CatalogError, Result};
use crate::expr::{EvalContext, Expression, Resolve};
use crate::model::{OtherHasher, Target};
use crate::value::{Format, Kind, Value};

/// One `test ? value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub test: Expression,
    pub value: Expression,
}

impl Definition {
    pub fn unconditional(value: Expression) -> Self {
        Self { test: Expression::literal(Value::boolean(true)), value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    kind: Kind,
    definitions: Vec<Definition>,
}

impl Variable {
    pub fn new(name: &str, kind: Kind) -> Self {
        Self { name: name.to_owned(), kind, definitions: Vec::new() }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> Kind {
        self.kind
    }
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }
    pub fn is_defined(&self) -> bool {
        !self.definitions.is_empty()
    }
    pub fn push(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }
}

// ------------- Variable Store -------------

#[derive(Debug, Default)]
pub struct VariableStore {
    kept: HashMap<String, Variable, OtherHasher>,
    automatic: HashMap<String, Variable, OtherHasher>,
    // what the automatic variables were last built from
    automatic_key: Option<(String, f64, String)>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a definition, creating the variable on first use.
    pub fn add_definition(&mut self, name: &str, kind: Kind, definition: Definition) -> Result<()> {
        let variable = self.kept.entry(name.to_owned()).or_insert_with(|| Variable::new(name, kind));
        if variable.kind != kind {
            return Err(CatalogError::TypeMismatch { name: name.to_owned(), declared: variable.kind, found: kind });
        }
        variable.push(definition);
        Ok(())
    }

    /// Automatic variables shadow declared ones.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.automatic.get(name).or_else(|| self.kept.get(name))
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    pub fn clear(&mut self) {
        self.kept.clear();
        self.remove_automatic();
    }

    /// Builds the automatic variables for a quantity, instant and tag, unless
    /// they are already in place for exactly those.
    pub fn install_automatic(&mut self, quantity: &str, at: f64, tag: &str) -> Result<()> {
        let key = (quantity.to_owned(), at, tag.to_owned());
        if self.automatic_key.as_ref() == Some(&key) {
            return Ok(());
        }
        let stamp = calendar::render_date(at, None, None)?;
        let parts = DateParts::from_days(at)?;
        let field = |from: usize, to: usize| stamp.get(from..to).unwrap_or_default().to_owned();
        let number = |text: &str, kind: Kind| Value::parse(kind, text);

        let mut automatic: HashMap<String, Variable, OtherHasher> = HashMap::default();
        let mut put = |name: &str, value: Value| {
            let mut variable = Variable::new(name, value.kind());
            variable.push(Definition::unconditional(Expression::literal(value)));
            automatic.insert(name.to_owned(), variable);
        };
        put("QUANTITY", Value::string(quantity));
        put("DATETIME", Value::string(stamp.as_str()));
        put("DATE", Value::string(field(0, 10)));
        put("TIME", Value::string(field(11, 19)));
        put("YEAR", number(&field(0, 4), Kind::Integer).with_format(Format::width(4)));
        put("CN", number(&field(0, 2), Kind::Integer).with_format(Format::width(2)));
        put("YR", number(&field(2, 4), Kind::Integer).with_format(Format::width(2)));
        put("MONTH", number(&field(5, 7), Kind::Integer).with_format(Format::width(2)));
        put("DOM", number(&field(8, 10), Kind::Integer).with_format(Format::width(2)));
        put("DOY", Value::integer(i64::from(parts.day_of_year())).with_format(Format::width(3)));
        put("HOUR", number(&field(11, 13), Kind::Integer).with_format(Format::width(2)));
        put("MINUTE", number(&field(14, 16), Kind::Integer).with_format(Format::width(2)));
        put("SECOND", number(&field(17, 19), Kind::Integer).with_format(Format::width(2)));
        put("TAG", Value::string(tag));

        trace!(quantity, stamp = %stamp, tag, "automatic variables installed");
        self.automatic = automatic;
        self.automatic_key = Some(key);
        Ok(())
    }

    pub fn remove_automatic(&mut self) {
        self.automatic.clear();
        self.automatic_key = None;
    }
}

// ------------- Scope -------------

/// Resolves names against the variables, then the active target's attributes,
/// then the process environment.
pub struct Scope<'a> {
    pub variables: &'a VariableStore,
    pub target: Option<&'a Target>,
}

impl<'a> Scope<'a> {
    pub fn new(variables: &'a VariableStore, target: Option<&'a Target>) -> Self {
        Self { variables, target }
    }

    /// Evaluates a variable: the first definition whose test holds wins.
    pub fn variable_value(&self, variable: &Variable, ctx: &mut EvalContext) -> Result<Value> {
        if !ctx.enter(variable.name()) {
            return Err(CatalogError::RecursiveDefinition(variable.name().to_owned()));
        }
        let result = self.first_match(variable, ctx);
        ctx.leave(variable.name());
        result
    }

    fn first_match(&self, variable: &Variable, ctx: &mut EvalContext) -> Result<Value> {
        for definition in variable.definitions() {
            let test = definition.test.evaluate(self, ctx)?.convert(Kind::Boolean)?;
            if test.as_bool() == Some(true) {
                return definition.value.evaluate(self, ctx)?.convert(variable.kind());
            }
        }
        Err(CatalogError::Expression(format!("no definition of '{}' applies", variable.name())))
    }
}

impl Resolve for Scope<'_> {
    fn lookup(&self, name: &str, ctx: &mut EvalContext) -> Result<Value> {
        if let Some(variable) = self.variables.get(name) {
            return self.variable_value(variable, ctx);
        }
        if let Some(text) = self.target.and_then(|t| t.attribute(name)) {
            return Ok(Value::string(text));
        }
        if let Ok(text) = env::var(name) {
            return Ok(Value::string(text));
        }
        Err(CatalogError::UnknownReference(name.to_owned()))
    }
}
