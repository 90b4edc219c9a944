//! Reference interpolation for templates and quasi-literal strings.

use crate::error::{CatalogError, Result};
use crate::expr::{EvalContext, Resolve};
use crate::scan;

/// Upper bound on substitution passes before a template is considered
/// self-perpetuating.
pub const MAX_PASSES: usize = 64;

/// Replaces every `$[w[.p]]{name}` in `text` with the printed value of `name`.
///
/// Substituted text may itself contain references, so passes repeat until a
/// pass changes nothing. Escaped characters are copied through untouched and
/// left escaped for the caller to resolve.
pub fn interpolate<R: Resolve + ?Sized>(text: &str, resolver: &R, ctx: &mut EvalContext) -> Result<String> {
    let mut current = text.to_owned();
    for _ in 0..MAX_PASSES {
        match substitute(&current, resolver, ctx)? {
            Some(next) => current = next,
            None => return Ok(current),
        }
    }
    Err(CatalogError::Expression(format!(
        "references in '{text}' did not settle after {MAX_PASSES} passes"
    )))
}

/// Interpolates a quasi-literal string. Escapes are resolved in the literal
/// text only; substituted values are taken as they print, after their own
/// references are interpolated.
pub fn interpolate_literal<R: Resolve + ?Sized>(text: &str, resolver: &R, ctx: &mut EvalContext) -> Result<String> {
    let mut out = String::with_capacity(text.len() + 16);
    let mut at = 0;
    while let Some((start, r)) = scan::next_reference(text, at) {
        out.push_str(&scan::unescape(&text[at..start]));
        let printed = print_reference(&r, resolver, ctx)?;
        out.push_str(&interpolate(&printed, resolver, ctx)?);
        at = r.end;
    }
    out.push_str(&scan::unescape(&text[at..]));
    Ok(out)
}

fn print_reference<R: Resolve + ?Sized>(r: &scan::VarRef, resolver: &R, ctx: &mut EvalContext) -> Result<String> {
    let value = resolver.lookup(&r.name, ctx)?;
    let value = if r.format.is_set() { value.with_format(r.format) } else { value };
    value.print()
}

/// One substitution pass; `None` when there was nothing to substitute.
fn substitute<R: Resolve + ?Sized>(text: &str, resolver: &R, ctx: &mut EvalContext) -> Result<Option<String>> {
    if !scan::contains_reference(text) {
        return Ok(None);
    }
    let mut out = String::with_capacity(text.len() + 16);
    let mut at = 0;
    while let Some((start, r)) = scan::next_reference(text, at) {
        out.push_str(&text[at..start]);
        out.push_str(&print_reference(&r, resolver, ctx)?);
        at = r.end;
    }
    out.push_str(&text[at..]);
    Ok(Some(out))
}
