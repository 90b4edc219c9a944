//! Locating the snapshots of a target that straddle a requested instant.
//!
//! A target's data is split into windows (files or URLs), each starting one
//! separation interval after the previous one, and each window holds snapshots
//! spaced by the target's increment. Bracketing finds the window containing
//! the instant, the snapshot at or before it, and the snapshot after it, which
//! may live in the following window.

use tracing::trace;

use crate::calendar::TimeInterval;
use crate::error::{CatalogError, Result};

/// Snapping tolerance: half a minute, in days.
pub const EPSILON: f64 = 0.5 / 1440.0;

/// Slack for float noise when testing whether a snapshot falls before the
/// next window starts, in days.
const WINDOW_SLACK: f64 = 1e-9;

/// Relative tolerance for deciding that one spacing is a multiple of another.
const MULTIPLE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// start of the window holding the earlier snapshot
    pub pre_start: f64,
    /// start of the window holding the later snapshot
    pub post_start: f64,
    pub pre_time: f64,
    pub post_time: f64,
    pub pre_index: i64,
    pub post_index: i64,
    /// snapshots per window
    pub snapshots: i64,
    /// spacing between the two snapshots, in days
    pub spacing: f64,
}

/// `desired_hours` widens the spacing when it is a whole multiple of the
/// target's increment; `offset_hours` realigns the base to that hour of its day,
/// stepping back by `desired_hours` when that lands after the instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spacing {
    pub desired_hours: f64,
    pub offset_hours: Option<f64>,
}

fn widened(step: f64, desired: f64) -> f64 {
    if step <= 0.0 || desired <= step {
        return step;
    }
    let n = (desired / step).round();
    if n >= 1.0 && (n * step - desired).abs() <= MULTIPLE_TOLERANCE * desired {
        desired
    } else {
        step
    }
}

/// Finds the windows and snapshots around `t` for a target whose first window
/// starts at `base`, with windows `interval` apart and snapshots
/// `increment_hours` apart.
pub fn bracket(
    base: f64,
    interval: &TimeInterval,
    increment_hours: f64,
    t: f64,
    spacing: Spacing,
) -> Result<Bracket> {
    let inc = increment_hours / 24.0;
    let mut pre = base;
    if let Some(offset) = spacing.offset_hours {
        pre = base.floor() + offset / 24.0;
        if pre > t {
            pre -= spacing.desired_hours / 24.0;
        }
    }

    let stuck = |at: f64| CatalogError::Expression(format!("separation interval does not move from day {at}"));
    let post;
    if interval.all_here {
        post = pre;
    } else if pre <= t {
        let mut next = interval.advance(pre, spacing.desired_hours)?;
        loop {
            if next <= pre {
                return Err(stuck(pre));
            }
            if next > t {
                break;
            }
            pre = next;
            next = interval.advance(pre, spacing.desired_hours)?;
        }
        post = next;
    } else {
        let mut later = pre;
        loop {
            let earlier = interval.retreat(later, spacing.desired_hours)?;
            if earlier >= later {
                return Err(stuck(later));
            }
            if earlier <= t {
                pre = earlier;
                break;
            }
            later = earlier;
        }
        post = later;
    }

    let span = post - pre;
    let (snapshots, pre_index) = if inc > 0.0 {
        (((span / inc) + EPSILON).floor() as i64, (((t - pre) / inc) + EPSILON).floor() as i64)
    } else {
        (1, 0)
    };
    let pre_time = pre + pre_index as f64 * inc;
    let step = widened(if inc > 0.0 { inc } else { span }, spacing.desired_hours / 24.0);
    let mut post_time = pre_time + step;

    let mut result = Bracket {
        pre_start: pre,
        post_start: post,
        pre_time,
        post_time,
        pre_index,
        post_index: pre_index,
        snapshots,
        spacing: step,
    };
    if interval.all_here || post_time < post - WINDOW_SLACK {
        // the following snapshot is still in the earlier window
        result.post_start = pre;
        result.post_index = if inc > 0.0 { (((post_time - pre) / inc) + EPSILON).floor() as i64 } else { 0 };
    } else {
        let post_index = if inc > 0.0 { (((post_time - post) / inc) + EPSILON).floor() as i64 } else { 0 };
        post_time = post + post_index as f64 * inc;
        result.post_index = post_index;
        result.post_time = post_time;
    }
    trace!(
        pre_start = result.pre_start,
        post_start = result.post_start,
        pre_index = result.pre_index,
        post_index = result.post_index,
        "bracketed"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;

    #[test]
    fn hourly_files_with_one_snapshot() {
        let interval = TimeInterval::parse("PT1H").expect("interval");
        let base = parse_date("2021-01-01").expect("date");
        let t = parse_date("2021-07-15T10:34").expect("date");
        let b = bracket(base, &interval, 1.0, t, Spacing::default()).expect("bracket");
        assert!((b.pre_start - parse_date("2021-07-15T10:00").expect("date")).abs() < 1e-6);
        assert!((b.post_start - parse_date("2021-07-15T11:00").expect("date")).abs() < 1e-6);
        assert_eq!(b.pre_index, 0);
        assert_eq!(b.post_index, 0);
    }

    #[test]
    fn daily_file_with_six_hourly_snapshots() {
        let interval = TimeInterval::parse("P1D").expect("interval");
        let base = parse_date("2021-01-01").expect("date");
        let t = parse_date("2021-07-15T10:34").expect("date");
        let b = bracket(base, &interval, 6.0, t, Spacing::default()).expect("bracket");
        assert_eq!(b.snapshots, 4);
        assert_eq!(b.pre_index, 1);
        assert_eq!(b.post_index, 2);
        assert_eq!(b.pre_start, b.post_start);

        let late = parse_date("2021-07-15T19:00").expect("date");
        let b = bracket(base, &interval, 6.0, late, Spacing::default()).expect("bracket");
        assert_eq!(b.pre_index, 3);
        assert_eq!(b.post_index, 0);
        assert!(b.post_start > b.pre_start);
    }

    #[test]
    fn base_after_the_instant_steps_back() {
        let interval = TimeInterval::parse("P1M").expect("interval");
        let base = parse_date("2022-01-01").expect("date");
        let t = parse_date("2021-11-20").expect("date");
        let b = bracket(base, &interval, 24.0, t, Spacing::default()).expect("bracket");
        assert_eq!(b.pre_start, parse_date("2021-11-01").expect("date"));
        assert_eq!(b.post_start, parse_date("2021-12-01").expect("date"));
        assert_eq!(b.pre_index, 19);
    }

    #[test]
    fn offset_realigns_the_windows() {
        let interval = TimeInterval::parse("P1D").expect("interval");
        let base = parse_date("2021-07-15T00:00").expect("date");
        let t = parse_date("2021-07-15T06:00").expect("date");
        let spacing = Spacing { desired_hours: 24.0, offset_hours: Some(12.0) };
        let b = bracket(base, &interval, 3.0, t, spacing).expect("bracket");
        assert!((b.pre_start - parse_date("2021-07-14T12:00").expect("date")).abs() < 1e-9);
        assert!((b.post_start - parse_date("2021-07-15T12:00").expect("date")).abs() < 1e-9);
        assert_eq!(b.pre_index, 6);
        assert_eq!(b.post_index, 6);
        assert!((b.spacing - 1.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_just_before_the_next_window_stays_put() {
        let interval = TimeInterval::parse("P1D").expect("interval");
        let base = parse_date("2021-01-01").expect("date");
        let t = parse_date("2021-07-15T12:00").expect("date");
        // 20 seconds short of a day
        let b = bracket(base, &interval, 86380.0 / 3600.0, t, Spacing::default()).expect("bracket");
        assert_eq!(b.pre_index, 0);
        assert_eq!(b.post_start, b.pre_start);
        assert_eq!(b.post_index, 1);
        assert!(b.post_time < b.pre_start + 1.0);
    }
}
