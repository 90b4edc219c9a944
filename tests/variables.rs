use std::path::Path;

use trajcat::{Catalog, CatalogError};

fn setup() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .load(Some(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/sample.cat"))))
        .expect("sample catalog loads");
    catalog
}

fn check(catalog: &mut Catalog, cases: &[(&str, &str)]) {
    for (name, expected) in cases {
        let value = catalog.variable_value(name).unwrap_or_else(|e| panic!("{name} failed: {e}"));
        assert_eq!(&value, expected, "value of {name}");
    }
}

#[test]
fn literals() {
    let mut catalog = setup();
    check(
        &mut catalog,
        &[
            ("litI01", "123"),
            ("litS01", "stringA"),
            ("litF01", "-123.456"),
            ("litF02", "123.456"),
            ("litD01", "2021-11-17T05:23:12"),
            ("litB01", "true"),
        ],
    );
}

#[test]
fn references_and_formats() {
    let mut catalog = setup();
    check(
        &mut catalog,
        &[
            ("refI01", "123"),
            ("refI02", "00123"),
            ("refF03", " -123.46"),
            ("refS04", "ring"),
            ("refD05", "21-11"),
            ("refI06", "123"),
            ("refD07", "2017-02-17T01:30:00"),
            ("refS08", "123_bridge_123.456"),
        ],
    );
}

#[test]
fn expressions() {
    let mut catalog = setup();
    check(
        &mut catalog,
        &[
            ("expI01", "53"),
            ("expI02", "35"),
            ("expI03", "247"),
            ("expF04", "53.645"),
            ("expI05", "57"),
            ("expS06", "foobar"),
            ("expD07", "2021-11-17T05:23:12"),
            // the formatted reference stands for "obag", which 27 cannot join as a number
            ("expS09", "obag27"),
        ],
    );
}

#[test]
fn first_true_definition_wins() {
    let mut catalog = setup();
    check(&mut catalog, &[("varS01", "hello"), ("varS02", "right"), ("varS03", "right")]);
}

#[test]
fn no_applicable_definition() {
    let mut catalog = setup();
    let err = catalog.variable_value("neverS").unwrap_err();
    assert!(matches!(err, CatalogError::Expression(_)), "got {err:?}");
}

#[test]
fn mutual_recursion_is_detected() {
    let mut catalog = setup();
    let err = catalog.variable_value("cycA").unwrap_err();
    assert_eq!(err, CatalogError::RecursiveDefinition("cycA".to_owned()));
    // the failure leaves nothing behind for the next evaluation
    assert_eq!(catalog.variable_value("litI01").expect("value ok"), "123");
}

#[test]
fn unknown_reference() {
    let mut catalog = setup();
    let err = catalog.variable_value("nowhere_to_be_found").unwrap_err();
    assert_eq!(err, CatalogError::UnknownReference("nowhere_to_be_found".to_owned()));
}

#[test]
fn environment_fallback() {
    let mut catalog = setup();
    // SAFETY: no other test reads or writes this variable
    unsafe { std::env::set_var("TRAJCAT_TEST_SITE", "north") };
    catalog.add_rule(r#"siteS/S = "${TRAJCAT_TEST_SITE}_site""#).expect("rule ok");
    assert_eq!(catalog.variable_value("siteS").expect("value ok"), "north_site");
}

#[test]
fn added_definitions_append() {
    let mut catalog = setup();
    catalog.add_rule("neverS/S = \"at last\"").expect("rule ok");
    assert_eq!(catalog.variable_value("neverS").expect("value ok"), "at last");
}

#[test]
fn redefinition_with_another_kind() {
    let mut catalog = setup();
    let err = catalog.add_rule("litI01/F = 1.5").unwrap_err();
    assert!(matches!(err, CatalogError::TypeMismatch { ref name, .. } if name == "litI01"), "got {err:?}");
}
