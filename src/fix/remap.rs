//! Projection of annotation intervals through the splice map.
//!
//! Retained A-ranges map linearly into the output; positions that fall
//! into a patched gap clip to the nearest retained edge. Intervals that
//! leave the spliced region, or that shrink to (nearly) nothing, are
//! dropped. A result outside the patched read is a data-integrity error.

use crate::errors::{FixError, Result};
use crate::fix::SplicePoint;

/// Minimum length of an adjusted interval worth keeping.
pub const MIN_INT_LEN: i32 = 5;

/// Project `[ib, ie)` through `splice`. `Ok(None)` when the interval is
/// dropped.
pub fn remap_interval(
    splice: &[SplicePoint],
    ib: i32,
    ie: i32,
    out_len: i32,
    read: u32,
) -> Result<Option<(i32, i32)>> {
    let (Some(first), Some(last)) = (splice.first(), splice.last()) else {
        return Ok(None);
    };
    if ie < first.ab || ib > last.ae {
        return Ok(None);
    }

    let mut ib_adj: Option<i32> = None;
    let mut ie_adj: Option<i32> = None;

    for (j, p) in splice.iter().enumerate() {
        if ib_adj.is_none() && ib < p.ae {
            ib_adj = Some(p.out + (ib.max(p.ab) - p.ab));
        }

        if ie_adj.is_none() && ie <= p.ae {
            if ie < p.ab && j > 0 {
                // ends inside a patched gap: clip to the previous block
                let prev = &splice[j - 1];
                ie_adj = Some(prev.out + (prev.ae - prev.ab));
                break;
            } else if ie > p.ab {
                ie_adj = Some(p.out + (ie - p.ab));
                break;
            }
        }
    }

    let ib_adj = ib_adj.unwrap_or(-1);
    let ie_adj = ie_adj.unwrap_or(-1);

    if ie_adj - ib_adj <= MIN_INT_LEN {
        return Ok(None);
    }

    if ib_adj < 0 || ib_adj > out_len || ib_adj > ie_adj || ie_adj > out_len {
        return Err(FixError::Read {
            read,
            message: format!(
                "adjusted interval {}..{} outside patched length {}",
                ib_adj, ie_adj, out_len
            ),
        });
    }

    Ok(Some((ib_adj, ie_adj)))
}

/// Project a whole interval list, keeping survivors in order.
pub fn remap_track(
    splice: &[SplicePoint],
    intervals: &[(i32, i32)],
    out_len: i32,
    read: u32,
) -> Result<Vec<(i32, i32)>> {
    let mut adjusted = Vec::new();
    for &(ib, ie) in intervals {
        if let Some(pair) = remap_interval(splice, ib, ie, out_len, read)? {
            adjusted.push(pair);
        }
    }
    Ok(adjusted)
}
