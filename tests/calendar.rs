use trajcat::calendar::{self, DateParts, TimeInterval};
use trajcat::{Catalog, CatalogError};

fn day(text: &str) -> f64 {
    calendar::parse_date(text).expect("date ok")
}

#[test]
fn day_numbers() {
    assert_eq!(day("1900-01-01"), 1.0);
    assert_eq!(day("1900-03-01"), 60.0);
    assert_eq!(day("2000-01-01T12:00"), 36525.5);
    assert_eq!(Catalog::date_to_number(" 1900-01-02T06:00:00 ").expect("date ok"), 2.25);
}

#[test]
fn leap_years() {
    assert!(calendar::is_leap(2000));
    assert!(calendar::is_leap(2024));
    assert!(!calendar::is_leap(1900));
    assert!(!calendar::is_leap(2023));
    assert_eq!(calendar::month_length(2000, 2), 29);
    assert_eq!(calendar::month_length(1900, 2), 28);
    assert_eq!(calendar::month_length(2021, 4), 30);
    assert_eq!(calendar::month_length(2021, 12), 31);
}

#[test]
fn rejected_dates() {
    for text in ["2021-02-29", "2021-13-01", "1500-01-01", "2021-01-01T24:00", "21-01-01", "2021/01/01"] {
        let err = calendar::parse_date(text).unwrap_err();
        assert_eq!(err, CatalogError::InvalidDateString(text.to_owned()));
    }
}

#[test]
fn rendering() {
    let t = day("2021-11-17T05:23:12");
    assert_eq!(calendar::render_date(t, None, None).expect("render"), "2021-11-17T05:23:12");
    assert_eq!(calendar::render_date(t, Some(10), None).expect("render"), "2021-11-17");
    assert_eq!(calendar::render_date(t, Some(5), Some(2)).expect("render"), "21-11");
    // a window ending at the hour rounds the minutes into it
    let late = day("2021-12-31T23:45");
    assert_eq!(calendar::render_date(late, Some(13), None).expect("render"), "2022-01-01T00");
    assert_eq!(calendar::render_date(late, Some(16), None).expect("render"), "2021-12-31T23:45");
    // a window past the seconds shows fractions
    let fine = day("2021-01-01T00:00:01.25");
    assert_eq!(calendar::render_date(fine, Some(22), None).expect("render"), "2021-01-01T00:00:01.25");
}

#[test]
fn date_parts() {
    let parts = DateParts::from_days(day("2020-12-31T18:30")).expect("parts");
    assert_eq!(parts.year(), 2020);
    assert_eq!(parts.month(), 12);
    assert_eq!(parts.day(), 31);
    assert_eq!(parts.day_of_year(), 366);
    assert_eq!(parts.hour, 18);
    assert_eq!(parts.minute, 30);
}

#[test]
fn interval_syntax() {
    let i = TimeInterval::parse("P1Y2M3DT4H5M6S").expect("interval");
    assert_eq!((i.years, i.months, i.days), (1, 2, 3));
    assert_eq!(i.seconds, 4.0 * 3600.0 + 5.0 * 60.0 + 6.0);
    assert!(TimeInterval::parse("").expect("interval").all_here);
    assert!(TimeInterval::parse("PT6H").expect("interval").years == 0);
    for bad in ["P", "PT", "1D", "P1H", "PT1D", "P1D1Y", "P0D", "PxD"] {
        assert!(TimeInterval::parse(bad).is_err(), "'{bad}' should not parse");
    }
}

#[test]
fn stepping_across_leap_days() {
    let yearly = TimeInterval::parse("P1Y").expect("interval");
    let next = yearly.advance(day("2000-02-29"), 0.0).expect("advance");
    assert_eq!(next, day("2001-03-01"));
    assert_eq!(yearly.advance(day("2019-06-01"), 0.0).expect("advance"), day("2020-06-01"));
    assert_eq!(yearly.retreat(day("2020-06-01"), 0.0).expect("retreat"), day("2019-06-01"));
    assert_eq!(yearly.retreat(day("2021-01-15"), 0.0).expect("retreat"), day("2020-01-15"));

    let monthly = TimeInterval::parse("P1M").expect("interval");
    assert_eq!(monthly.advance(day("2021-01-31"), 0.0).expect("advance"), day("2021-03-03"));
    assert_eq!(monthly.retreat(day("2021-03-01"), 0.0).expect("retreat"), day("2021-02-01"));
    assert_eq!(monthly.advance(day("2021-12-01"), 0.0).expect("advance"), day("2022-01-01"));
}

#[test]
fn sub_day_steps_widen_to_the_desired_spacing() {
    let hourly = TimeInterval::parse("PT3H").expect("interval");
    let base = day("2021-01-01");
    assert_eq!(hourly.advance(base, 0.0).expect("advance"), base + 0.125);
    assert_eq!(hourly.advance(base, 12.0).expect("advance"), base + 0.5);
    // 8 is not a multiple of 3
    assert_eq!(hourly.advance(base, 8.0).expect("advance"), base + 0.125);
    let all = TimeInterval::parse("").expect("interval");
    assert_eq!(all.advance(base, 0.0).expect("advance"), base);
}
