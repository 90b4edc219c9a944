//! Scalar values of the catalog language.
//!
//! A [`Value`] has one of five [`Kind`]s and may hold its source text (the
//! *nominal* form), its typed [`Payload`], or both. Values written as literals
//! carry both; a bare variable reference or a string/date with embedded
//! references carries only text until it is resolved against a scope.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::calendar;
use crate::error::{CatalogError, Result};
use crate::scan;

lazy_static! {
    static ref INTEGER_LITERAL: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref FLOAT_LITERAL: Regex = Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Kind {
    String,
    Boolean,
    Integer,
    Float,
    Date,
}

impl Kind {
    /// Maps the single-letter type tags used in variable declarations.
    pub fn from_tag(tag: char) -> Option<Kind> {
        match tag {
            'S' => Some(Kind::String),
            'B' => Some(Kind::Boolean),
            'I' => Some(Kind::Integer),
            'F' => Some(Kind::Float),
            'D' => Some(Kind::Date),
            _ => None,
        }
    }
    pub fn tag(self) -> char {
        match self {
            Kind::String => 'S',
            Kind::Boolean => 'B',
            Kind::Integer => 'I',
            Kind::Float => 'F',
            Kind::Date => 'D',
        }
    }
    /// Rank used to pick the common kind of two non-string operands.
    pub(crate) fn strength(self) -> u8 {
        match self {
            Kind::String => 0,
            Kind::Boolean => 1,
            Kind::Integer => 2,
            Kind::Float => 3,
            Kind::Date => 4,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Kind::String => "String",
            Kind::Boolean => "Boolean",
            Kind::Integer => "Integer",
            Kind::Float => "Float",
            Kind::Date => "Date",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    String(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    /// days since 1899-12-31
    Date(f64),
}

impl Payload {
    pub fn kind(&self) -> Kind {
        match self {
            Payload::String(_) => Kind::String,
            Payload::Boolean(_) => Kind::Boolean,
            Payload::Integer(_) => Kind::Integer,
            Payload::Float(_) => Kind::Float,
            Payload::Date(_) => Kind::Date,
        }
    }
}

/// Print format of a value.
///
/// For strings and dates `width` is the substring length and `precision` the
/// substring start; for booleans `width` truncates; for integers it is a
/// zero-padded field width; for floats a field width with `precision` digits
/// after the decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Format {
    pub width: Option<usize>,
    pub precision: Option<usize>,
}

impl Format {
    pub fn new(width: Option<usize>, precision: Option<usize>) -> Self {
        Self { width, precision }
    }
    pub fn width(width: usize) -> Self {
        Self { width: Some(width), precision: None }
    }
    pub fn is_set(&self) -> bool {
        self.width.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    kind: Kind,
    nominal: Option<String>,
    payload: Option<Payload>,
    reference: Option<String>,
    format: Format,
}

impl Value {
    /// Builds a value of `kind` from its source text. The payload is filled in
    /// when the text is a literal of that kind; otherwise the text is kept for
    /// resolution (for instance `[${YEAR}-01-01]` as a date).
    pub fn parse(kind: Kind, text: &str) -> Self {
        let payload = if is_literal_text(kind, text) { decode(kind, text).ok() } else { None };
        Self { kind, nominal: Some(text.to_owned()), payload, reference: None, format: Format::default() }
    }
    /// A value holding only unresolved text.
    pub fn pattern(kind: Kind, text: &str) -> Self {
        Self { kind, nominal: Some(text.to_owned()), payload: None, reference: None, format: Format::default() }
    }
    /// A bare `${name}` reference; `text` is the reference as written.
    pub fn reference(name: &str, text: &str, format: Format) -> Self {
        Self {
            kind: Kind::String,
            nominal: Some(text.to_owned()),
            payload: None,
            reference: Some(name.to_owned()),
            format,
        }
    }
    pub fn from_payload(payload: Payload) -> Self {
        Self { kind: payload.kind(), nominal: None, payload: Some(payload), reference: None, format: Format::default() }
    }
    pub fn string(text: impl Into<String>) -> Self {
        Self::from_payload(Payload::String(text.into()))
    }
    pub fn boolean(b: bool) -> Self {
        Self::from_payload(Payload::Boolean(b))
    }
    pub fn integer(i: i64) -> Self {
        Self::from_payload(Payload::Integer(i))
    }
    pub fn float(x: f64) -> Self {
        Self::from_payload(Payload::Float(x))
    }
    pub fn date(days: f64) -> Self {
        Self::from_payload(Payload::Date(days))
    }
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
    pub fn nominal(&self) -> Option<&str> {
        self.nominal.as_deref()
    }
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
    pub fn reference_name(&self) -> Option<&str> {
        self.reference.as_deref()
    }
    pub fn format(&self) -> Format {
        self.format
    }
    pub fn is_literal(&self) -> bool {
        self.reference.is_none() && self.payload.is_some()
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Some(Payload::Boolean(b)) => Some(b),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match (&self.payload, &self.nominal) {
            (Some(p), _) => payload_text(p),
            (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        }
    }

    /// Converts a literal value to another kind, keeping its format.
    pub fn convert(&self, to: Kind) -> Result<Value> {
        let failed = || CatalogError::Conversion { from: self.kind, to, text: self.describe() };
        let payload = match (&self.payload, &self.reference) {
            (Some(p), None) => p,
            _ => return Err(failed()),
        };
        if self.kind == to {
            return Ok(self.clone());
        }
        if to == Kind::String {
            // the print format is consumed by the conversion
            return Ok(Value::string(self.print()?));
        }
        let converted = match (payload, to) {
            (Payload::String(s), _) => decode(to, s).map_err(|_| failed())?,
            (Payload::Boolean(b), Kind::Integer) => Payload::Integer(i64::from(*b)),
            (Payload::Boolean(b), Kind::Float) => Payload::Float(if *b { 1.0 } else { 0.0 }),
            (Payload::Boolean(b), Kind::Date) => Payload::Date(if *b { 1.0 } else { 0.0 }),
            (Payload::Integer(i), Kind::Boolean) => Payload::Boolean(*i != 0),
            (Payload::Integer(i), Kind::Float) => Payload::Float(*i as f64),
            (Payload::Integer(i), Kind::Date) => Payload::Date(*i as f64),
            (Payload::Float(x), Kind::Boolean) => Payload::Boolean(*x != 0.0),
            (Payload::Float(x), Kind::Integer) => Payload::Integer(x.trunc() as i64),
            (Payload::Float(x), Kind::Date) => Payload::Date(*x),
            (Payload::Date(d), Kind::Boolean) => Payload::Boolean(*d != 0.0),
            (Payload::Date(d), Kind::Integer) => Payload::Integer(d.trunc() as i64),
            (Payload::Date(d), Kind::Float) => Payload::Float(*d),
            _ => return Err(failed()),
        };
        Ok(Value::from_payload(converted).with_format(self.format))
    }

    /// Renders the payload as text using this value's format.
    pub fn print(&self) -> Result<String> {
        let payload = match (&self.payload, &self.reference) {
            (Some(p), None) => p,
            _ => return Err(CatalogError::Expression(format!("cannot print unresolved value '{}'", self.describe()))),
        };
        let Format { width, precision } = self.format;
        let width = width.filter(|w| *w > 0);
        let text = match payload {
            Payload::String(s) => match width {
                Some(w) => s.chars().skip(precision.unwrap_or(0)).take(w).collect(),
                None => s.clone(),
            },
            Payload::Boolean(b) => {
                let s = if *b { "true" } else { "false" };
                match width {
                    Some(w) => s.chars().take(w).collect(),
                    None => s.to_owned(),
                }
            }
            Payload::Integer(i) => match width {
                Some(w) => format!("{:0w$}", i, w = w),
                None => i.to_string(),
            },
            Payload::Float(x) => match width {
                Some(w) => format!("{:>w$.p$}", x, w = w, p = precision.unwrap_or(6)),
                None => general_float(*x),
            },
            Payload::Date(d) => calendar::render_date(*d, width, precision)?,
        };
        Ok(text)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.print() {
            Ok(text) => write!(f, "{}", text),
            Err(_) => write!(f, "{}", self.describe()),
        }
    }
}

/// True when `text` is a literal of `kind` with no variable references.
pub fn is_literal_text(kind: Kind, text: &str) -> bool {
    match kind {
        Kind::String => !scan::has_unescaped_quote(text) && !scan::contains_reference(text),
        Kind::Boolean => text == "true" || text == "false",
        Kind::Integer => INTEGER_LITERAL.is_match(text),
        Kind::Float => FLOAT_LITERAL.is_match(text),
        Kind::Date => calendar::is_date_literal(text),
    }
}

fn decode(kind: Kind, text: &str) -> Result<Payload> {
    let failed = || CatalogError::Conversion { from: Kind::String, to: kind, text: text.to_owned() };
    match kind {
        Kind::String => Ok(Payload::String(scan::unescape(text))),
        Kind::Boolean => match text {
            "true" => Ok(Payload::Boolean(true)),
            "false" => Ok(Payload::Boolean(false)),
            _ => Err(failed()),
        },
        Kind::Integer if INTEGER_LITERAL.is_match(text) => {
            text.parse().map(Payload::Integer).map_err(|_| failed())
        }
        Kind::Float if FLOAT_LITERAL.is_match(text) => {
            text.parse().map(Payload::Float).map_err(|_| failed())
        }
        Kind::Date => calendar::parse_date(text).map(Payload::Date).map_err(|_| failed()),
        _ => Err(failed()),
    }
}

fn payload_text(payload: &Payload) -> String {
    match payload {
        Payload::String(s) => s.clone(),
        Payload::Boolean(b) => b.to_string(),
        Payload::Integer(i) => i.to_string(),
        Payload::Float(x) => general_float(*x),
        Payload::Date(d) => calendar::render_date(*d, None, None).unwrap_or_else(|_| d.to_string()),
    }
}

/// Six significant digits, trailing zeros dropped, scientific notation for
/// very large or small magnitudes.
pub fn general_float(x: f64) -> String {
    if x == 0.0 || !x.is_finite() {
        return if x == 0.0 { "0".to_owned() } else { x.to_string() };
    }
    let exponent = x.abs().log10().floor() as i32;
    if !(-4..6).contains(&exponent) {
        let formatted = format!("{:.5e}", x);
        let (mantissa, exp) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (5 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, x))
    }
}

fn trim_fraction(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        text.to_owned()
    }
}
