//! Parsing of single catalog declaration lines.
//!
//! The line-level structure is described by `catalog.pest`; this module walks
//! the resulting pairs and builds typed declarations. Expressions inside
//! variable definitions go through [`Expression::parse`]. A target's attribute
//! values and template are left as one tail, since where they split depends on
//! the attribute schema.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::calendar::TimeInterval;
use crate::error::{CatalogError, Result};
use crate::expr::Expression;
use crate::model::{Dimension, DimensionMode, Quantity, TargetRef};
use crate::scan;
use crate::value::{Kind, Value};
use crate::variable::Definition;

#[derive(Parser)]
#[grammar = "catalog.pest"]
pub struct CatalogParser;

/// A target line before it is checked against the attribute schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDecl {
    pub name: String,
    pub base_date: Value,
    pub interval: TimeInterval,
    pub increment_hours: f64,
    pub snapshots: i32,
    /// `attr1 ; attr2 ; ... ; template`, unsplit
    pub tail: String,
}

impl TargetDecl {
    /// Splits the tail into exactly `attributes` values and a template. The
    /// template is everything after the last attribute up to the first blank,
    /// so it may itself contain `;`.
    pub fn split_tail(&self, attributes: usize) -> Result<(Vec<String>, String)> {
        let mut fields: Vec<&str> = self.tail.splitn(attributes + 1, ';').collect();
        let template = fields
            .pop()
            .and_then(|last| last.split_whitespace().next())
            .unwrap_or_default()
            .to_owned();
        if template.is_empty() {
            return Err(CatalogError::syntax(format!("target '{}': empty template", self.name)));
        }
        let values = fields.into_iter().map(|s| unquote(s.trim()).to_owned()).collect();
        Ok((values, template))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Schema(Vec<String>),
    FirstDate(String),
    FinalDate(String),
    Target(TargetDecl),
    Quantity(Quantity),
    Dimension(Dimension),
    Variable { name: String, kind: Kind, definition: Definition },
}

/// True for lines that carry no declaration.
pub fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

pub fn parse_declaration(line: &str) -> Result<Declaration> {
    let text = line.trim();
    let mut pairs = CatalogParser::parse(Rule::line, text)
        .map_err(|e| CatalogError::syntax(format!("cannot parse '{}': {}", text, e.variant.message())))?;
    let pair = pairs
        .next()
        .ok_or_else(|| CatalogError::syntax(format!("no declaration in '{text}'")))?;
    match pair.as_rule() {
        Rule::schema => Ok(Declaration::Schema(pair.into_inner().map(|p| p.as_str().to_owned()).collect())),
        Rule::first_bound => Ok(Declaration::FirstDate(bound_text(pair))),
        Rule::final_bound => Ok(Declaration::FinalDate(bound_text(pair))),
        Rule::target => parse_target(pair).map(Declaration::Target),
        Rule::quantity => parse_quantity(pair).map(Declaration::Quantity),
        Rule::dimension => parse_dimension(pair).map(Declaration::Dimension),
        Rule::variable => parse_variable(pair),
        other => Err(CatalogError::syntax(format!("unexpected {other:?} in '{text}'"))),
    }
}

fn bound_text(pair: Pair<Rule>) -> String {
    pair.into_inner().next().map(|p| p.as_str().trim().to_owned()).unwrap_or_default()
}

fn next_text<'a>(inner: &mut impl Iterator<Item = Pair<'a, Rule>>, what: &str) -> Result<&'a str> {
    inner
        .next()
        .map(|p| p.as_str())
        .ok_or_else(|| CatalogError::syntax(format!("missing {what}")))
}

// ------------- Targets -------------

fn parse_target(pair: Pair<Rule>) -> Result<TargetDecl> {
    let mut inner = pair.into_inner();
    let name = next_text(&mut inner, "target name")?.to_owned();
    let rest = next_text(&mut inner, "target fields")?;
    let bad = |why: String| CatalogError::syntax(format!("target '{name}': {why}"));

    let fields: Vec<&str> = rest.splitn(5, ';').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(bad(format!("expected at least 5 ';'-separated fields, found {}", fields.len())));
    }

    let date_text = fields[0].strip_prefix('[').and_then(|s| s.strip_suffix(']')).unwrap_or(fields[0]).trim();
    let base_date = Value::parse(Kind::Date, date_text);
    if !base_date.is_literal() && !scan::contains_reference(date_text) {
        return Err(CatalogError::InvalidDateString(date_text.to_owned()));
    }
    let interval = TimeInterval::parse(fields[1])?;
    let increment_hours: f64 = fields[2]
        .parse()
        .map_err(|_| bad(format!("bad increment '{}'", fields[2])))?;
    let snapshots: i32 = fields[3]
        .parse()
        .map_err(|_| bad(format!("bad snapshot count '{}'", fields[3])))?;
    let tail = fields[4].to_owned();
    Ok(TargetDecl { name, base_date, interval, increment_hours, snapshots, tail })
}

/// Attribute values may be quoted; the quotes are not part of the value.
fn unquote(text: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    text
}

// ------------- Quantities -------------

fn parse_quantity(pair: Pair<Rule>) -> Result<Quantity> {
    let mut inner = pair.into_inner();
    let name = next_text(&mut inner, "quantity name")?.to_owned();
    let standard_name = next_text(&mut inner, "standard name")?.to_owned();
    let dims_text = next_text(&mut inner, "dimensionality")?;
    let dims: i32 = dims_text
        .parse()
        .map_err(|_| CatalogError::syntax(format!("bad dimensionality '{dims_text}' for '{name}'")))?;
    let list = inner
        .next()
        .ok_or_else(|| CatalogError::syntax(format!("no targets for quantity '{name}'")))?;
    let targets = list.into_inner().map(parse_target_ref).collect::<Result<Vec<_>>>()?;
    Ok(Quantity { name, standard_name, dims, targets })
}

/// `[units[;scale[;offset]]][description]` may sit on either side of the name.
fn parse_target_ref(pair: Pair<Rule>) -> Result<TargetRef> {
    let mut target = None;
    let mut metas: Vec<&str> = Vec::new();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => target = Some(part.as_str()),
            Rule::meta => metas.push(part.into_inner().next().map(|p| p.as_str()).unwrap_or_default()),
            _ => {}
        }
    }
    let target = target.ok_or_else(|| CatalogError::syntax("target reference without a name"))?;
    if metas.len() > 2 {
        return Err(CatalogError::syntax(format!("too many bracketed clauses for target '{target}'")));
    }
    let mut reference = TargetRef::new(target);
    if let Some(units) = metas.first() {
        let mut parts = units.split(';').map(str::trim);
        reference.units = parts.next().unwrap_or_default().to_owned();
        if let Some(scale) = parts.next() {
            reference.scale = scale
                .parse()
                .map_err(|_| CatalogError::syntax(format!("bad scale '{scale}' for target '{target}'")))?;
        }
        if let Some(offset) = parts.next() {
            reference.offset = offset
                .parse()
                .map_err(|_| CatalogError::syntax(format!("bad offset '{offset}' for target '{target}'")))?;
        }
        if parts.next().is_some() {
            return Err(CatalogError::syntax(format!("too many unit fields for target '{target}'")));
        }
    }
    if let Some(description) = metas.get(1) {
        reference.description = description.trim().to_owned();
    }
    Ok(reference)
}

// ------------- Dimensions -------------

fn parse_dimension(pair: Pair<Rule>) -> Result<Dimension> {
    let mut inner = pair.into_inner();
    let name = next_text(&mut inner, "dimension name")?.to_owned();
    let quantity = next_text(&mut inner, "dimension quantity")?.to_owned();
    let units = next_text(&mut inner, "dimension units")?.to_owned();
    let mode = next_text(&mut inner, "dimension mode")?;
    let numbers = inner
        .next()
        .ok_or_else(|| CatalogError::syntax(format!("no values for dimension '{name}'")))?
        .into_inner()
        .map(|p| p.as_str().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| CatalogError::syntax(format!("bad value for dimension '{name}': {e}")))?;
    let count = |x: f64| -> Result<usize> {
        if x < 0.0 || x.fract() != 0.0 {
            return Err(CatalogError::syntax(format!("bad count {x} for dimension '{name}'")));
        }
        Ok(x as usize)
    };
    let mode = match (mode, numbers.as_slice()) {
        ("V", values) if !values.is_empty() => DimensionMode::Explicit(numbers.clone()),
        ("LDN", [start, step, n]) => DimensionMode::Step { start: *start, step: *step, count: count(*n)? },
        ("LHN", [start, end, n]) => DimensionMode::Span { start: *start, end: *end, count: count(*n)? },
        (mode, values) => {
            return Err(CatalogError::syntax(format!(
                "dimension '{name}': mode {mode} does not take {} values",
                values.len()
            )));
        }
    };
    Ok(Dimension { name, quantity, units, mode })
}

// ------------- Variables -------------

fn parse_variable(pair: Pair<Rule>) -> Result<Declaration> {
    let mut name = "";
    let mut kind = Kind::String;
    let mut body = "";
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => name = part.as_str(),
            Rule::kind_tag => {
                kind = part
                    .as_str()
                    .chars()
                    .next()
                    .and_then(Kind::from_tag)
                    .ok_or_else(|| CatalogError::syntax(format!("bad type tag '{}'", part.as_str())))?;
            }
            Rule::rest => body = part.as_str(),
            _ => {}
        }
    }
    let definition = parse_definition(body)?;
    Ok(Declaration::Variable { name: name.to_owned(), kind, definition })
}

/// Splits `test ? value` at the first unquoted `?`; a body without one is
/// unconditional.
pub fn parse_definition(body: &str) -> Result<Definition> {
    match scan::scan_for(body, b'?', 0) {
        Some(q) => Ok(Definition {
            test: Expression::parse(&body[..q])?,
            value: Expression::parse(&body[q + 1..])?,
        }),
        None => Ok(Definition::unconditional(Expression::parse(body)?)),
    }
}
