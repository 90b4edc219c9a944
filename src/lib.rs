//! Trajcat – a catalog resolver that maps a physical quantity, a valid-at
//! instant and an optional tag to concrete data locations.
//!
//! A catalog file declares *targets* (templated file names or URLs with a time
//! layout and descriptive attributes), *quantities* (which targets can supply a
//! physical quantity, in order of preference), *dimensions* and typed
//! *variables* whose values are expressions. A query brackets the requested
//! instant for every target of a quantity, fills in the target's template at
//! the bracketing windows, and returns the candidates ranked by the caller's
//! attribute preferences.
//!
//! ## Modules
//! * [`catalog`] – The [`catalog::Catalog`] facade: loading, queries and lookups.
//! * [`grammar`] – Declaration lines (`catalog.pest`) turned into typed declarations.
//! * [`expr`] – Shunting-yard expression parser and stack evaluator.
//! * [`value`] – Scalar values of five kinds, conversions and print formats.
//! * [`variable`] – Conditional variables, automatic per-query variables and name resolution.
//! * [`template`] – Recursive `${name}` interpolation.
//! * [`calendar`] – Day numbers, date literals and separation intervals.
//! * [`bracket`] – Finding the windows and snapshots that straddle an instant.
//! * [`candidate`] – Resolved location pairs and their source kinds.
//! * [`rank`] – Preference scoring of candidates.
//! * [`model`] – Targets, quantities, dimensions and their keepers.
//! * [`settings`] – Runtime settings and catalog file discovery.
//!
//! ## Catalog lines
//! ```text
//! ; horiz ; vert ; tavg
//! > "1900-01-01T00:00"
//! < "2023-01-01T00:00"
//! targ1 := [2000-01-01] ; P1D ; 3.0 ; 8 ; 1X1 ; pres ; inst ; ${QUANTITY}_${YEAR}${MONTH}${DOM}_${FOO}.dat
//! T : air_temperature : 3 : [K]targ1 | [C;1.0;273.15]targ2
//! lon ~ lon ; degrees_east ; LDN ; -180, 1, 360
//! FOO/S = ${DATE} >= [2000-01-01] ? "New"
//! FOO/S = "Old"
//! ```
//!
//! ## Quick Start
//! ```
//! use trajcat::catalog::Catalog;
//! let mut catalog = Catalog::new();
//! catalog.load_str(r#"
//! ; res
//! t1 := [2021-01-01] ; P1D ; 6.0 ; 4 ; 1X1 ; ${QUANTITY}_${YEAR}${MONTH}${DOM}.dat
//! T : air_temperature : 3 : [K]t1
//! "#).unwrap();
//! let found = catalog.query("T", "2021-07-15T10:34", "").unwrap();
//! assert_eq!(found[0].pre, "T_20210715.dat");
//! ```

pub mod bracket;
pub mod calendar;
pub mod candidate;
pub mod catalog;
pub mod error;
pub mod expr;
pub mod grammar;
pub mod model;
pub mod rank;
pub mod scan;
pub mod settings;
pub mod template;
pub mod value;
pub mod variable;

pub use catalog::Catalog;
pub use candidate::{Candidate, SourceKind};
pub use error::{CatalogError, Result};
