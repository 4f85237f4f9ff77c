//! Assembly of the patched sequence.
//!
//! Walks the surviving candidates in A order, copying retained A-ranges
//! and donor B-ranges alternately into the output buffer. Retained ranges
//! are recorded as splice points so annotation intervals can be projected
//! afterwards; donor ranges live in the gaps between them. Quality
//! streams mirror the byte-level splice exactly.

use crate::errors::{FixError, Result};
use crate::fix::{FixContext, SplicePoint, Stats};
use crate::seq::{reverse, reverse_complement};
use crate::store::{QvStore, ReadStore, NUM_QV_STREAMS};

/// Build the patched read for `aread` from `ctx.candidates` into
/// `ctx.out`/`ctx.qv_out`, recording the splice map in `ctx.splice`.
pub fn build_patch(
    aread: u32,
    trim_ab: i32,
    trim_ae: i32,
    store: &ReadStore,
    qv: Option<&QvStore>,
    ctx: &mut FixContext,
    stats: &mut Stats,
) -> Result<()> {
    ctx.out.clear();
    ctx.splice.clear();
    for buf in ctx.qv_out.iter_mut() {
        buf.clear();
    }

    let reada = store.read(aread);
    let mut ab = trim_ab;

    for ci in 0..ctx.candidates.len() {
        let c = ctx.candidates[ci];

        if trim_ab > c.ab {
            ab = c.ae;
            continue;
        }
        if trim_ae < c.ae {
            break;
        }

        let ae = c.ab;
        if trim_ab < ae && trim_ab > ab {
            ab = trim_ab;
        }
        debug_assert!(ab <= ae);

        if ab < ae {
            retain(ctx, reada, qv.map(|q| (q, aread)), ab, ae);
        }
        ab = c.ae;

        let blen = store.read_len(c.b);
        if c.bb < 0 || c.bb >= c.be || c.be > blen {
            return Err(FixError::Read {
                read: aread,
                message: format!(
                    "donor region {}..{} outside B-read {} length {}",
                    c.bb, c.be, c.b, blen
                ),
            });
        }

        stats.patched_gaps += 1;
        stats.bases_before += (c.ae - c.ab) as u64;
        stats.bases_after += (c.be - c.bb) as u64;
        stats.span_total += c.span as u64;

        if let Some(qv) = qv {
            for s in 0..NUM_QV_STREAMS {
                let buf = &mut ctx.qv_out[s];
                let start = buf.len();
                buf.extend_from_slice(&qv.stream(c.b, s)[c.bb as usize..c.be as usize]);
                if c.comp {
                    reverse(&mut buf[start..]);
                }
            }
        }

        let start = ctx.out.len();
        ctx.out
            .extend_from_slice(&store.read(c.b)[c.bb as usize..c.be as usize]);
        if c.comp {
            reverse_complement(&mut ctx.out[start..]);
        }
    }

    if ab < trim_ae {
        retain(ctx, reada, qv.map(|q| (q, aread)), ab, trim_ae);
    }

    Ok(())
}

/// Copy the retained A-range `[ab, ae)` and record its splice point.
fn retain(ctx: &mut FixContext, reada: &[u8], qv: Option<(&QvStore, u32)>, ab: i32, ae: i32) {
    ctx.splice.push(SplicePoint {
        ab,
        ae,
        out: ctx.out.len() as i32,
    });

    if let Some((qv, aread)) = qv {
        for s in 0..NUM_QV_STREAMS {
            ctx.qv_out[s].extend_from_slice(&qv.stream(aread, s)[ab as usize..ae as usize]);
        }
    }
    ctx.out
        .extend_from_slice(&reada[ab as usize..ae as usize]);
}
