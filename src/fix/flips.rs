//! Chimeric self-alignment ("flip") detection.
//!
//! A read that contains a reverse-complement copy of part of itself
//! produces self-overlaps on the anti-diagonal. Any such alignment whose
//! A-range meets its own forward-strand B-range crosses the palindrome
//! diagonal; the crossing marks a junction that cannot be assembled
//! through, so the trim interval is tightened to the longer clean side.
//! Gaps between consecutive complemented self-overlaps are treated the
//! same way when almost nothing else spans them.

use crate::fix::spanners;
use crate::overlap::Overlap;
use crate::trace::{flip_range, TraceMap};

/// Result of the flip scan: a possibly tightened trim interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlipTrim {
    pub trim_ab: i32,
    pub trim_ae: i32,
    pub flagged: bool,
}

/// Scan the self-overlaps of `aread` and tighten `[trim_ab, trim_ae)`
/// around every detected crossing. Never widens the interval.
pub fn detect_flips(
    group: &[Overlap],
    aread: u32,
    alen: i32,
    trim_ab: i32,
    trim_ae: i32,
    twidth: i32,
) -> FlipTrim {
    let mut result = FlipTrim {
        trim_ab,
        trim_ae,
        flagged: false,
    };

    let Some(first) = group.iter().position(|o| o.bread == aread) else {
        return result;
    };
    let end = group[first..]
        .iter()
        .position(|o| o.bread != aread)
        .map_or(group.len(), |p| first + p);
    let selfs = &group[first..end];

    if !selfs.iter().any(|o| o.comp) {
        return result;
    }

    for o in selfs.iter().filter(|o| o.comp) {
        let (cb, ce) = flip_range(o.bbpos, o.bepos, alen);
        if !intersect(o.abpos, o.aepos, cb, ce) {
            continue;
        }

        for seg in TraceMap::new(o, twidth).segments() {
            let (fb, fe) = flip_range(seg.bb, seg.be, alen);
            if intersect(seg.ab, seg.ae, fb, fe) {
                result.flagged = true;
                narrow(&mut result, seg.ab, seg.ae);
            }
        }
    }

    for pair in selfs.windows(2) {
        let (o1, o2) = (&pair[0], &pair[1]);
        if !(o1.comp && o2.comp) {
            continue;
        }

        let (gb, ge) = (o1.aepos, o2.abpos);
        let (cb, ce) = flip_range(o1.bepos, o2.bbpos, alen);
        if intersect(gb, ge, cb, ce) && spanners(group, gb, ge) <= 1 {
            result.flagged = true;
            narrow(&mut result, gb, ge);
        }
    }

    result
}

#[inline]
fn intersect(ab: i32, ae: i32, bb: i32, be: i32) -> bool {
    ab.max(bb) < ae.min(be)
}

/// Pull the trim endpoint nearer to the flagged region's midpoint onto
/// that midpoint, dropping the shorter side.
fn narrow(trim: &mut FlipTrim, fb: i32, fe: i32) {
    let mid = (fb + fe) / 2;
    if trim.trim_ab < mid && mid < trim.trim_ae {
        if mid - trim.trim_ab < trim.trim_ae - mid {
            trim.trim_ab = mid;
        } else {
            trim.trim_ae = mid;
        }
    }
}
