//! Typed expressions: parsing into postfix order and stack evaluation.
//!
//! Parsing is a shunting-yard pass over the raw text. Operands become
//! [`Value`]s (literals, references, or strings and dates with embedded
//! references), operators carry a priority boosted by their parenthesis depth
//! so the resulting queue needs no parentheses.
//!
//! Evaluation never touches catalog state directly. Names are resolved through
//! the [`Resolve`] trait, and the set of variables currently being evaluated is
//! threaded through an [`EvalContext`] so that self-referencing definitions are
//! detected instead of recursing forever.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::calendar;
use crate::error::{CatalogError, Result};
use crate::model::OtherHasher;
use crate::scan;
use crate::template;
use crate::value::{Kind, Payload, Value};

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^[+-]?\d+(\.\d*)?").unwrap();
}

// each open parenthesis lifts the priority of enclosed operators by this much
const DEPTH_BOOST: u32 = 100;

// ------------- Operators -------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpId {
    Or,
    And,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
}

impl OpId {
    pub fn symbol(self) -> &'static str {
        match self {
            OpId::Or => "||",
            OpId::And => "&&",
            OpId::Eq => "==",
            OpId::Ne => "!=",
            OpId::Gt => ">",
            OpId::Ge => ">=",
            OpId::Lt => "<",
            OpId::Le => "<=",
            OpId::Not => "!",
            OpId::Add => "+",
            OpId::Sub => "-",
            OpId::Mul => "*",
            OpId::Div => "/",
            OpId::Rem => "%",
            OpId::Neg => "-",
        }
    }
    pub fn base_priority(self) -> u32 {
        match self {
            OpId::Or | OpId::And => 10,
            OpId::Eq | OpId::Ne | OpId::Gt | OpId::Ge | OpId::Lt | OpId::Le => 20,
            OpId::Not => 30,
            OpId::Add | OpId::Sub => 50,
            OpId::Mul | OpId::Div | OpId::Rem => 60,
            OpId::Neg => 80,
        }
    }
    pub fn is_unary(self) -> bool {
        matches!(self, OpId::Not | OpId::Neg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub id: OpId,
    pub priority: u32,
}

impl Operator {
    pub fn new(id: OpId, depth: u32) -> Self {
        Self { id, priority: id.base_priority() + DEPTH_BOOST * depth }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Value(Value),
    Operator(Operator),
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Item::Value(v) => match v.nominal() {
                Some(text) => write!(f, "{}", text),
                None => write!(f, "{}", v),
            },
            Item::Operator(op) => write!(f, "{}", op.id.symbol()),
        }
    }
}

// ------------- Evaluation context -------------

/// Names of the variables whose evaluation is in flight.
#[derive(Debug, Default)]
pub struct EvalContext {
    in_progress: HashSet<String, OtherHasher>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }
    /// Marks `name` as in flight. Returns false if it already was.
    pub fn enter(&mut self, name: &str) -> bool {
        self.in_progress.insert(name.to_owned())
    }
    pub fn leave(&mut self, name: &str) {
        self.in_progress.remove(name);
    }
    pub fn is_active(&self, name: &str) -> bool {
        self.in_progress.contains(name)
    }
}

/// Something that can turn a reference name into a value.
pub trait Resolve {
    fn lookup(&self, name: &str, ctx: &mut EvalContext) -> Result<Value>;
}

// ------------- Expression -------------

/// A parsed expression, stored in postfix order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    items: Vec<Item>,
}

#[derive(PartialEq)]
enum Expect {
    Operand,
    Operator,
}

impl Expression {
    /// An expression consisting of a single value.
    pub fn literal(value: Value) -> Self {
        Self { items: vec![Item::Value(value)] }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn parse(text: &str) -> Result<Self> {
        let fail = |what: &str, at: usize| {
            CatalogError::Expression(format!("{what} at offset {at} in '{}'", text.trim()))
        };
        let bytes = text.as_bytes();
        let mut output: Vec<Item> = Vec::new();
        let mut stack: Vec<Operator> = Vec::new();
        let mut expect = Expect::Operand;
        let mut depth: u32 = 0;
        let mut i = scan::skip_blanks(text, 0);

        while i < bytes.len() {
            let c = bytes[i];
            if expect == Expect::Operand {
                match c {
                    b'(' => {
                        depth += 1;
                        i += 1;
                    }
                    b'"' | b'\'' => {
                        let close = scan::scan_for(text, c, i + 1).ok_or_else(|| fail("unterminated string", i))?;
                        output.push(Item::Value(Value::parse(Kind::String, &text[i + 1..close])));
                        expect = Expect::Operator;
                        i = close + 1;
                    }
                    b'[' => {
                        let close = scan::scan_for(text, b']', i + 1).ok_or_else(|| fail("unterminated date", i))?;
                        let inner = text[i + 1..close].trim();
                        let value = Value::parse(Kind::Date, inner);
                        if !value.is_literal() && !scan::contains_reference(inner) {
                            return Err(CatalogError::InvalidDateString(inner.to_owned()));
                        }
                        output.push(Item::Value(value));
                        expect = Expect::Operator;
                        i = close + 1;
                    }
                    b'$' => {
                        let r = scan::var_ref_at(text, i).ok_or_else(|| fail("malformed reference", i))?;
                        output.push(Item::Value(Value::reference(&r.name, &text[i..r.end], r.format)));
                        expect = Expect::Operator;
                        i = r.end;
                    }
                    b'!' if bytes.get(i + 1) != Some(&b'=') => {
                        stack.push(Operator::new(OpId::Not, depth));
                        i += 1;
                    }
                    _ => {
                        if let Some(m) = NUMBER.find(&text[i..]) {
                            let kind = if m.as_str().contains('.') { Kind::Float } else { Kind::Integer };
                            output.push(Item::Value(Value::parse(kind, m.as_str())));
                            expect = Expect::Operator;
                            i += m.end();
                        } else if c == b'-' {
                            stack.push(Operator::new(OpId::Neg, depth));
                            i += 1;
                        } else if let Some(b) = boolean_at(text, i) {
                            output.push(Item::Value(Value::parse(Kind::Boolean, if b { "true" } else { "false" })));
                            expect = Expect::Operator;
                            i += if b { 4 } else { 5 };
                        } else {
                            return Err(fail("expected a value", i));
                        }
                    }
                }
            } else if c == b')' {
                if depth == 0 {
                    return Err(fail("unbalanced ')'", i));
                }
                depth -= 1;
                i += 1;
            } else {
                let (id, len) = binary_at(bytes, i).ok_or_else(|| fail("expected an operator", i))?;
                let op = Operator::new(id, depth);
                while let Some(top) = stack.last() {
                    if top.priority < op.priority {
                        break;
                    }
                    output.push(Item::Operator(*top));
                    stack.pop();
                }
                stack.push(op);
                expect = Expect::Operand;
                i += len;
            }
            i = scan::skip_blanks(text, i);
        }

        if output.is_empty() {
            return Err(CatalogError::Expression("empty expression".to_owned()));
        }
        if expect == Expect::Operand {
            return Err(fail("missing operand", bytes.len()));
        }
        if depth != 0 {
            return Err(fail("unbalanced '('", bytes.len()));
        }
        while let Some(op) = stack.pop() {
            output.push(Item::Operator(op));
        }
        Ok(Self { items: output })
    }

    pub fn evaluate<R: Resolve + ?Sized>(&self, resolver: &R, ctx: &mut EvalContext) -> Result<Value> {
        let mut stack: Vec<Value> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                Item::Value(v) => stack.push(realize(v, resolver, ctx)?),
                Item::Operator(op) => {
                    let underflow = || CatalogError::Expression(format!("missing operand for '{}'", op.id.symbol()));
                    let result = if op.id.is_unary() {
                        let operand = stack.pop().ok_or_else(underflow)?;
                        apply_unary(op.id, operand)?
                    } else {
                        let right = stack.pop().ok_or_else(underflow)?;
                        let left = stack.pop().ok_or_else(underflow)?;
                        apply_binary(op.id, left, right)?
                    };
                    stack.push(result);
                }
            }
        }
        match (stack.pop(), stack.is_empty()) {
            (Some(v), true) => Ok(v),
            (None, _) => Err(CatalogError::Expression("expression left no value".to_owned())),
            (Some(_), false) => Err(CatalogError::Expression(format!(
                "expression left {} values",
                stack.len() + 1
            ))),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self.items.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

fn boolean_at(text: &str, i: usize) -> Option<bool> {
    let rest = &text[i..];
    let (b, len) = if rest.starts_with("true") {
        (true, 4)
    } else if rest.starts_with("false") {
        (false, 5)
    } else {
        return None;
    };
    match rest.as_bytes().get(len) {
        Some(c) if scan::is_ident_char(*c) => None,
        _ => Some(b),
    }
}

fn binary_at(bytes: &[u8], i: usize) -> Option<(OpId, usize)> {
    let next = bytes.get(i + 1).copied();
    let two = match (bytes[i], next) {
        (b'!', Some(b'=')) => Some(OpId::Ne),
        (b'<', Some(b'=')) => Some(OpId::Le),
        (b'>', Some(b'=')) => Some(OpId::Ge),
        (b'=', Some(b'=')) => Some(OpId::Eq),
        (b'&', Some(b'&')) => Some(OpId::And),
        (b'|', Some(b'|')) => Some(OpId::Or),
        _ => None,
    };
    if let Some(id) = two {
        return Some((id, 2));
    }
    let one = match bytes[i] {
        b'<' => OpId::Lt,
        b'>' => OpId::Gt,
        b'+' => OpId::Add,
        b'-' => OpId::Sub,
        b'*' => OpId::Mul,
        b'/' => OpId::Div,
        b'%' => OpId::Rem,
        _ => return None,
    };
    Some((one, 1))
}

// ------------- Operand handling -------------

/// Turns an operand into a literal value.
pub fn realize<R: Resolve + ?Sized>(value: &Value, resolver: &R, ctx: &mut EvalContext) -> Result<Value> {
    if value.is_literal() {
        return Ok(value.clone());
    }
    if let Some(name) = value.reference_name() {
        let found = resolver.lookup(name, ctx)?;
        if !value.format().is_set() {
            return Ok(found);
        }
        // a formatted string reference stands for its formatted text
        let formatted = found.with_format(value.format());
        return match formatted.kind() {
            Kind::String => Ok(Value::string(formatted.print()?)),
            _ => Ok(formatted),
        };
    }
    let text = value.nominal().unwrap_or_default();
    if value.kind() == Kind::String {
        return template::interpolate_literal(text, resolver, ctx).map(Value::string);
    }
    let expanded = template::interpolate(text, resolver, ctx)?;
    match value.kind() {
        Kind::Date => {
            let trimmed = expanded.trim();
            calendar::parse_date(trimmed)
                .map(Value::date)
                .map_err(|_| CatalogError::InvalidDateString(trimmed.to_owned()))
        }
        kind => Value::string(expanded.trim()).convert(kind),
    }
}

/// Brings two literal operands to a common kind.
///
/// A string operand is first converted to the other operand's kind; if that
/// fails the other operand becomes a string instead. Otherwise the weaker of
/// the two kinds (Boolean, Integer, Float, Date in that order) is promoted.
pub fn reconcile(left: Value, right: Value) -> Result<(Value, Value)> {
    let (lk, rk) = (left.kind(), right.kind());
    if lk == rk {
        return Ok((left, right));
    }
    if lk == Kind::String {
        return match left.convert(rk) {
            Ok(l) => Ok((l, right)),
            Err(_) => Ok((left, right.convert(Kind::String)?)),
        };
    }
    if rk == Kind::String {
        return match right.convert(lk) {
            Ok(r) => Ok((left, r)),
            Err(_) => Ok((left.convert(Kind::String)?, right)),
        };
    }
    if lk.strength() > rk.strength() {
        let r = right.convert(lk)?;
        Ok((left, r))
    } else {
        let l = left.convert(rk)?;
        Ok((l, right))
    }
}

fn truth(value: &Value) -> Result<bool> {
    value
        .convert(Kind::Boolean)?
        .as_bool()
        .ok_or_else(|| CatalogError::Expression("expected a boolean".to_owned()))
}

fn not_allowed(op: OpId, kind: Kind) -> CatalogError {
    CatalogError::Expression(format!("operator '{}' is not defined for {} values", op.symbol(), kind))
}

fn overflow(op: OpId) -> CatalogError {
    CatalogError::Expression(format!("integer overflow in '{}'", op.symbol()))
}

fn apply_unary(op: OpId, operand: Value) -> Result<Value> {
    let format = operand.format();
    let result = match op {
        OpId::Not => Value::boolean(!truth(&operand)?),
        OpId::Neg => match operand.payload() {
            Some(Payload::Integer(i)) => Value::integer(i.checked_neg().ok_or_else(|| overflow(op))?),
            Some(Payload::Float(x)) => Value::float(-x),
            Some(Payload::Date(d)) => Value::date(-d),
            _ => return Err(not_allowed(op, operand.kind())),
        },
        _ => return Err(CatalogError::Expression(format!("'{}' is not a unary operator", op.symbol()))),
    };
    Ok(if op == OpId::Neg { result.with_format(format) } else { result })
}

fn apply_binary(op: OpId, left: Value, right: Value) -> Result<Value> {
    match op {
        OpId::Or => return Ok(Value::boolean(truth(&left)? || truth(&right)?)),
        OpId::And => return Ok(Value::boolean(truth(&left)? && truth(&right)?)),
        _ => {}
    }
    let (left, right) = reconcile(left, right)?;
    let kind = left.kind();
    let (l, r) = match (left.payload(), right.payload()) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(CatalogError::Expression("operand was not resolved".to_owned())),
    };
    if matches!(op, OpId::Eq | OpId::Ne | OpId::Gt | OpId::Ge | OpId::Lt | OpId::Le) {
        return compare(op, kind, l, r).map(Value::boolean);
    }
    let result = match (op, l, r) {
        (OpId::Add, Payload::String(a), Payload::String(b)) => Value::string(format!("{a}{b}")),
        (OpId::Add, Payload::Boolean(a), Payload::Boolean(b)) => Value::boolean(*a || *b),
        (OpId::Mul, Payload::Boolean(a), Payload::Boolean(b)) => Value::boolean(*a && *b),
        (_, Payload::Integer(a), Payload::Integer(b)) => {
            let n = match op {
                OpId::Add => a.checked_add(*b),
                OpId::Sub => a.checked_sub(*b),
                OpId::Mul => a.checked_mul(*b),
                OpId::Div | OpId::Rem if *b == 0 => {
                    return Err(CatalogError::Expression("integer division by zero".to_owned()));
                }
                OpId::Div => a.checked_div(*b),
                OpId::Rem => a.checked_rem(*b),
                _ => return Err(not_allowed(op, kind)),
            };
            Value::integer(n.ok_or_else(|| overflow(op))?)
        }
        (_, Payload::Float(a), Payload::Float(b)) => Value::float(match op {
            OpId::Add => a + b,
            OpId::Sub => a - b,
            OpId::Mul => a * b,
            OpId::Div => a / b,
            OpId::Rem => a % b,
            _ => return Err(not_allowed(op, kind)),
        }),
        (_, Payload::Date(a), Payload::Date(b)) => Value::date(match op {
            OpId::Add => a + b,
            OpId::Sub => a - b,
            OpId::Mul => a * b,
            _ => return Err(not_allowed(op, kind)),
        }),
        _ => return Err(not_allowed(op, kind)),
    };
    Ok(match result.kind() {
        Kind::Integer | Kind::Float | Kind::Date => result.with_format(left.format()),
        _ => result,
    })
}

fn compare(op: OpId, kind: Kind, l: &Payload, r: &Payload) -> Result<bool> {
    let ordering = match (l, r) {
        (Payload::Boolean(a), Payload::Boolean(b)) => {
            return match op {
                OpId::Eq => Ok(a == b),
                OpId::Ne => Ok(a != b),
                _ => Err(not_allowed(op, kind)),
            };
        }
        (Payload::String(a), Payload::String(b)) => Some(a.cmp(b)),
        (Payload::Integer(a), Payload::Integer(b)) => Some(a.cmp(b)),
        (Payload::Float(a), Payload::Float(b)) | (Payload::Date(a), Payload::Date(b)) => a.partial_cmp(b),
        _ => return Err(CatalogError::Expression("operands of different kinds".to_owned())),
    };
    // NaN compares unequal to everything
    let Some(ordering) = ordering else {
        return Ok(op == OpId::Ne);
    };
    Ok(match op {
        OpId::Eq => ordering == Ordering::Equal,
        OpId::Ne => ordering != Ordering::Equal,
        OpId::Gt => ordering == Ordering::Greater,
        OpId::Ge => ordering != Ordering::Less,
        OpId::Lt => ordering == Ordering::Less,
        _ => ordering != Ordering::Greater,
    })
}
