use std::path::Path;

use trajcat::rank::{FORBIDDEN, REQUIRED};
use trajcat::{Catalog, CatalogError, SourceKind};

const VALID_AT: &str = "2021-07-15T10:34";
const TAG: &str = "20210714_00";

fn setup() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .load(Some(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/sample.cat"))))
        .expect("sample catalog loads");
    catalog
}

#[test]
fn fixed_patterns() {
    let mut catalog = setup();
    let found = catalog.query("stuff1", VALID_AT, TAG).expect("query ok");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].pre, "pattern_for_t01");
    assert_eq!(found[0].post, "pattern_for_t01");
    assert_eq!(found[1].pre, "pattern_for_t02");
    assert_eq!(found[0].target, "t01");
    assert_eq!(found[0].dims, 3);
    assert_eq!(found[0].units, "m");
    assert_eq!(found[0].scale, 1.0);
    assert_eq!(found[0].offset, 0.0);
    assert_eq!(found[0].description, "this is desc01");
    assert_eq!(found[1].description, "");
    assert_eq!(catalog.candidate_attr(&found[0], "attr2").as_deref(), Some("at2valt01"));
    assert_eq!(found[0].kind, SourceKind::Unknown);
}

#[test]
fn preferences_reorder_candidates() {
    let mut catalog = setup();
    catalog.desire("attr2", "at2valt04", 0);
    let found = catalog.query("stuff3", VALID_AT, TAG).expect("query ok");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].target, "t04");
    assert_eq!(found[0].pre, "stuff3_2021071506_New_FOURTH.data");
    assert_eq!(found[0].post, "stuff3_2021071512_New_FOURTH.data");
    assert_eq!(found[1].target, "t03");
    assert_eq!(found[1].pre, "stuff3_2021071510_New_THIRD_20210714_00.data");
    assert_eq!(found[1].post, "stuff3_2021071511_New_THIRD_20210714_00.data");
    assert_eq!(found[1].dims, 2);
}

#[test]
fn declaration_order_without_preferences() {
    let mut catalog = setup();
    let found = catalog.query("stuff3", VALID_AT, TAG).expect("query ok");
    let targets: Vec<&str> = found.iter().map(|c| c.target.as_str()).collect();
    assert_eq!(targets, ["t03", "t04"]);
}

#[test]
fn old_dates_pick_the_other_definition() {
    let mut catalog = setup();
    let found = catalog.query("stuff3", "1999-03-02T00:10", "").expect("query ok");
    assert_eq!(found[0].pre, "stuff3_1999030200_Old_THIRD_.data");
}

#[test]
fn required_and_forbidden_attributes() {
    let mut catalog = setup();
    catalog.desire("attr1", "at1valt03", REQUIRED);
    let found = catalog.query("stuff3", VALID_AT, TAG).expect("query ok");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].target, "t03");

    catalog.desire("attr1", "at1valt03", FORBIDDEN);
    let found = catalog.query("stuff3", VALID_AT, TAG).expect("query ok");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].target, "t04");
}

#[test]
fn weird_quantity_name() {
    let mut catalog = setup();
    let found = catalog.query("stuff$7(93)5m@_+-&^end", VALID_AT, TAG).expect("query ok");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pre, "pattern_for_t02");
    assert_eq!(found[0].dims, 2);
    assert_eq!(catalog.candidate_attr(&found[0], "attr2").as_deref(), Some("at2valt02"));
}

#[test]
fn unknown_quantity_gives_nothing() {
    let mut catalog = setup();
    let found = catalog.query("no_such_thing", VALID_AT, TAG).expect("query ok");
    assert!(found.is_empty());
}

#[test]
fn unknown_target() {
    let mut catalog = setup();
    let err = catalog.query("broken", VALID_AT, TAG).unwrap_err();
    assert_eq!(err, CatalogError::UnknownTarget("t99".to_owned()));
}

#[test]
fn bad_instant() {
    let mut catalog = setup();
    let err = catalog.query("stuff1", "yesterday", TAG).unwrap_err();
    assert_eq!(err, CatalogError::InvalidDateString("yesterday".to_owned()));
}

#[test]
fn files_and_urls() {
    let mut catalog = setup();
    let found = catalog.query("stuff2", VALID_AT, TAG).expect("query ok");
    assert_eq!(found.len(), 2);

    let daily = &found[0];
    assert_eq!(daily.pre, "/data/merra/stuff2_20210715.nc");
    assert_eq!(daily.kind, SourceKind::File);
    assert_eq!(daily.units, "K");
    assert_eq!(daily.description, "analysis");
    assert_eq!(daily.pre_index, 1);
    assert_eq!(daily.post_index, 2);
    assert_eq!(daily.pre_time, "2021-07-15T06:00:00");
    assert_eq!(daily.post_time, "2021-07-15T12:00:00");
    assert_eq!(daily.snapshots, 4);
    assert!((daily.spacing_days - 0.25).abs() < 1e-9);

    let monthly = &found[1];
    assert_eq!(monthly.pre, "https://example.org/geos/stuff2_202107.nc");
    assert_eq!(monthly.post, monthly.pre);
    assert_eq!(monthly.kind, SourceKind::Url);
    assert_eq!(monthly.units, "C");
    assert_eq!(monthly.offset, 273.15);
    assert_eq!(monthly.description, "forecast");
    assert_eq!(monthly.pre_start, "2021-07-01T00:00:00");
    assert_eq!(monthly.pre_index, 14);
}

#[test]
fn window_boundary_moves_the_later_snapshot() {
    let mut catalog = setup();
    let found = catalog.query("stuff2", "2021-07-15T19:00", TAG).expect("query ok");
    let daily = &found[0];
    assert_eq!(daily.pre, "/data/merra/stuff2_20210715.nc");
    assert_eq!(daily.post, "/data/merra/stuff2_20210716.nc");
    assert_eq!(daily.pre_index, 3);
    assert_eq!(daily.post_index, 0);
    assert_eq!(daily.post_start, "2021-07-16T00:00:00");
}

#[test]
fn wider_spacing_skips_snapshots() {
    let mut catalog = setup();
    catalog.set_time_spacing(12.0, None);
    let found = catalog.query("stuff2", VALID_AT, TAG).expect("query ok");
    let daily = &found[0];
    assert_eq!(daily.pre_index, 1);
    assert_eq!(daily.post_time, "2021-07-15T18:00:00");
    assert_eq!(daily.post_index, 3);
}

#[test]
fn daily_offset_realigns_the_windows() {
    let mut catalog = Catalog::new();
    catalog
        .load_str(
            "; res\n\
             f := [2021-07-15T00:00] ; P1D ; 3.0 ; 8 ; 1X1 ; f_${YEAR}${MONTH}${DOM}T${HOUR}.dat\n\
             F : std_f : 2 : f\n",
        )
        .expect("load ok");
    catalog.set_time_spacing(24.0, Some(12.0));

    // the realigned start falls after the instant, so one day earlier is used
    let found = catalog.query("F", "2021-07-15T06:00", "").expect("query ok");
    let c = &found[0];
    assert_eq!(c.pre_start, "2021-07-14T12:00:00");
    assert_eq!(c.pre_index, 6);
    assert_eq!(c.pre, "f_20210714T12.dat");
    assert_eq!(c.post_start, "2021-07-15T12:00:00");
    assert_eq!(c.post_index, 6);
    assert_eq!(c.post, "f_20210715T12.dat");
    assert!((c.spacing_days - 0.125).abs() < 1e-9);

    let found = catalog.query("F", "2021-07-15T15:00", "").expect("query ok");
    assert_eq!(found[0].pre_start, "2021-07-15T12:00:00");
    assert_eq!(found[0].pre_index, 1);
    assert_eq!(found[0].post_start, "2021-07-16T12:00:00");
}

#[test]
fn candidate_time_spacing() {
    let mut catalog = setup();
    let found = catalog.query("stuff3", VALID_AT, TAG).expect("query ok");
    let (spacing, start, snapshots) = catalog.candidate_time_spacing(&found[0]);
    assert!((spacing - 1.0 / 24.0).abs() < 1e-9);
    let expected = Catalog::date_to_number("2021-07-15T10:00").expect("date ok");
    assert!((start - expected).abs() < 1e-6);
    assert_eq!(snapshots, 1);
}

#[test]
fn standard_names() {
    let catalog = setup();
    assert_eq!(catalog.std_lookup("air_temperature"), Some("stuff2"));
    assert_eq!(catalog.std_lookup("std_weird"), Some("stuff$7(93)5m@_+-&^end"));
    assert_eq!(catalog.std_lookup("sea_level"), None);
}

#[test]
fn attributes_and_bounds() {
    let catalog = setup();
    assert_eq!(catalog.attributes(), ["attr1", "attr2", "attr3"]);
    assert_eq!(catalog.attr_index("attr3"), Some(2));
    assert_eq!(catalog.attr_name(0), Some("attr1"));
    assert_eq!(catalog.attr_name(3), None);
    assert_eq!(catalog.target_attr("t05", "attr1").as_deref(), Some("merra"));
    assert_eq!(catalog.target_attr_at("t06", 2).as_deref(), Some("avg"));
    assert_eq!(catalog.target_attr("t99", "attr1"), None);
    assert_eq!(catalog.first_date(), "1900-01-01T00:00");
    assert_eq!(catalog.final_date(), "2023-01-01T00:00");
    let (increment, base, snapshots) = catalog.target_time_info("t05").expect("target info");
    assert_eq!(increment, 6.0);
    assert_eq!(base, "2021-01-01");
    assert_eq!(snapshots, 4);
}

#[test]
fn json_output() {
    let mut catalog = setup();
    let found = catalog.query("stuff1", VALID_AT, TAG).expect("query ok");
    let json = serde_json::to_value(&found).expect("serializes");
    assert_eq!(json[0]["pre"], "pattern_for_t01");
    assert_eq!(json[0]["kind"], "Unknown");
}
