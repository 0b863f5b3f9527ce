//! Article number range parsing (RFC 3977 Section 8.1.1)
//!
//! Commands like LISTGROUP and OVER accept a range argument in the forms
//! `n`, `n-`, `n-m`, or nothing at all. The parsed form is a pair of `i64`
//! bounds with two sentinel values:
//!
//! - `(0, 0)`: no range given, the whole group
//! - `(-1, n)`: exactly article `n`
//! - `(n, -1)`: every article numbered `n` or higher
//! - `(n, m)`: the inclusive span `n..=m`
//! - `(-1, -1)`: an empty range (`low > high` after parsing)

use crate::error::{Result, YansError};

/// Whole-group sentinel pair.
pub const RANGE_ALL: (i64, i64) = (0, 0);

/// Empty-range sentinel pair.
pub const RANGE_EMPTY: (i64, i64) = (-1, -1);

/// Parse a range specification into `(low, high)` sentinel form.
///
/// An inverted span like `10-5` collapses to [`RANGE_EMPTY`]. Non-numeric
/// input is an error; callers decide whether that means `501` or a
/// fall-back to the whole group.
pub fn parse_range(spec: &str) -> Result<(i64, i64)> {
    if spec.is_empty() {
        return Ok(RANGE_ALL);
    }

    let parse_bound = |s: &str| {
        s.parse::<i64>()
            .map_err(|_| YansError::InvalidArgument(format!("bad range: {spec}")))
    };

    let (low, high) = match spec.split_once('-') {
        None => (-1, parse_bound(spec)?),
        Some((low, "")) => (parse_bound(low)?, -1),
        Some((low, high)) => (parse_bound(low)?, parse_bound(high)?),
    };

    if high != -1 && low > high {
        return Ok(RANGE_EMPTY);
    }
    Ok((low, high))
}
