//! Open-circuit-voltage lookup

use crate::config::OcvPoint;

/// Map a rest cell voltage onto the OCV curve.
///
/// Linear interpolation between the bracketing points, clamped to the first
/// and last entries outside the table. Returns `None` for an empty table.
pub fn soc_from_mv(table: &[OcvPoint], vrest_mv: f64) -> Option<f64> {
    let first = table.first()?;
    let last = table.last()?;

    if vrest_mv <= first.mv {
        return Some(first.soc);
    }
    if vrest_mv >= last.mv {
        return Some(last.soc);
    }

    for pair in table.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if vrest_mv >= lo.mv && vrest_mv <= hi.mv {
            let span = hi.mv - lo.mv;
            if span <= 0.0 {
                return Some(hi.soc);
            }
            let t = (vrest_mv - lo.mv) / span;
            return Some(lo.soc + t * (hi.soc - lo.soc));
        }
    }

    // Only reachable with a table that is not sorted by voltage
    Some(last.soc)
}
