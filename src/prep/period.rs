//! Pre/post period parsing and validation.
//!
//! Bounds arrive as index keys or text. Each bound is coerced to the index's
//! native kind, checked against the data range, and snapped inward onto an
//! index entry when it falls between two entries:
//!
//! - a start snaps forward to the first entry `>= start`
//! - an end snaps back to the last entry `<= end`
//!
//! After snapping each period must be non-empty and the pre-period must end
//! strictly before the post-period starts.

use tracing::debug;

use crate::domain::{IndexKey, Period, PeriodBound, Periods, TimeIndex};
use crate::error::{AppError, BoundName, Result};

/// Validate both periods against `index` and return them in the index's native type.
pub fn validate_periods(
    index: &TimeIndex,
    pre: (PeriodBound, PeriodBound),
    post: (PeriodBound, PeriodBound),
) -> Result<Periods> {
    let pre = validate_period(index, pre, BoundName::PreStart, BoundName::PreEnd)?;
    let post = validate_period(index, post, BoundName::PostStart, BoundName::PostEnd)?;

    if pre.end >= post.start {
        return Err(AppError::PeriodOverlap(format!(
            "pre-period [{}, {}] must end before post-period [{}, {}] starts.",
            pre.start, pre.end, post.start, post.end
        )));
    }

    debug!(pre = ?pre, post = ?post, "validated periods");
    Ok(Periods { pre, post })
}

fn validate_period(
    index: &TimeIndex,
    (start, end): (PeriodBound, PeriodBound),
    start_name: BoundName,
    end_name: BoundName,
) -> Result<Period> {
    let start = resolve_key(index, &start, start_name)?;
    let end = resolve_key(index, &end, end_name)?;
    if start > end {
        return Err(AppError::period(
            start_name,
            format!("{start} is after the period end {end}."),
        ));
    }

    let keys = index.keys();
    let snapped_start = keys.iter().find(|k| **k >= start).copied();
    let snapped_end = keys.iter().rev().find(|k| **k <= end).copied();
    match (snapped_start, snapped_end) {
        (Some(s), Some(e)) if s <= e => Ok(Period { start: s, end: e }),
        _ => Err(AppError::period(
            end_name,
            format!("no index entries fall within [{start}, {end}]."),
        )),
    }
}

/// Coerce a bound to the index kind and check it lies within the data range.
fn resolve_key(index: &TimeIndex, bound: &PeriodBound, name: BoundName) -> Result<IndexKey> {
    let (Some(kind), Some(first), Some(last)) = (index.kind(), index.first(), index.last()) else {
        return Err(AppError::period(name, "the data has an empty index."));
    };

    let key = match bound {
        PeriodBound::Key(k) => k.coerce_to(kind).ok_or_else(|| {
            AppError::period(name, format!("{k} is not compatible with a {kind:?} index."))
        })?,
        PeriodBound::Text(s) => kind.parse(s).ok_or_else(|| {
            AppError::period(name, format!("could not parse '{s}' as a {kind:?} index value."))
        })?,
    };

    if key < *first || key > *last {
        return Err(AppError::period(
            name,
            format!("{key} is outside the data range [{first}, {last}]."),
        ));
    }
    Ok(key)
}
