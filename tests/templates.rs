use trajcat::{Catalog, CatalogError};

const LINES: &str = r#"
; res ; lev
mark/S = "\${DOM}"
spin/S = "\${spin}"
t1 := [2021-01-01] ; P1D ; 6.0 ; 4 ; 1X1 ; pres ; ${QUANTITY}_${YEAR}${MONTH}${DOM}.dat
t2 := [2021-01-01] ; P1D ; 6.0 ; 4 ; 2X2 ; ml ; $7{DATE}/${res}_${lev}_${mark}_$3{DOY}.nc
t3 := [2021-01-01] ; P1D ; 6.0 ; 4 ; 1X1 ; pres ; ${spin}.dat
t4 := [2021-01-01] ; P1D ; 6.0 ; 4 ; 1X1 ; pres ; ${nothing_here}.dat
t5 := [2021-01-01] ; P1D ; 24.0 ; 1 ; 1X1 ; pres ; OTF://${QUANTITY}/$2{HOUR}$2{MINUTE}
T : air_temperature : 3 : [K]t1
U : eastward_wind : 3 : t2
V : loops : 1 : t3
W : missing : 1 : t4
X : on_the_fly : 2 : t5
"#;

fn setup() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.load_str(LINES).expect("catalog loads");
    catalog
}

#[test]
fn automatic_variables() {
    let mut catalog = setup();
    let found = catalog.query("T", "2021-07-15T10:34", "").expect("query ok");
    assert_eq!(found[0].pre, "T_20210715.dat");
    assert_eq!(found[0].post, "T_20210715.dat");
}

#[test]
fn attributes_formats_and_second_passes() {
    let mut catalog = setup();
    let found = catalog.query("U", "2021-07-15T10:34", "").expect("query ok");
    assert_eq!(found[0].pre, "2021-07/2X2_ml_15_196.nc");
}

#[test]
fn self_perpetuating_template() {
    let mut catalog = setup();
    let err = catalog.query("V", "2021-07-15T10:34", "").unwrap_err();
    assert!(matches!(err, CatalogError::Expression(_)), "got {err:?}");
}

#[test]
fn unresolvable_reference() {
    let mut catalog = setup();
    let err = catalog.query("W", "2021-07-15T10:34", "").unwrap_err();
    assert_eq!(err, CatalogError::UnknownReference("nothing_here".to_owned()));
}

#[test]
fn window_start_drives_the_automatic_variables() {
    let mut catalog = setup();
    let found = catalog.query("X", "2021-07-15T10:34", "").expect("query ok");
    assert_eq!(found[0].pre, "OTF://X/0000");
    assert_eq!(found[0].post, "OTF://X/0000");
    assert_eq!(found[0].kind, trajcat::SourceKind::OnTheFly);
}
