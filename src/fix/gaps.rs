//! Patch candidates from breaks in overlap chains.
//!
//! When two overlaps with the same B-read and orientation leave a hole in
//! A between them, the B-read bridges that hole: the region between the
//! mate alignments is a replacement candidate for the (segment-rounded)
//! A-gap. Candidates are rejected when the bridging B-region is
//! low-complexity, has no quality data, or exceeds the configured gap cap.

use crate::fix::{Candidate, FixConfig};
use crate::overlap::Overlap;
use crate::store::ReadStore;
use crate::trace::flip_range;
use crate::track::{IntervalTrack, QualityTrack};

/// Collect gap candidates from consecutive overlap pairs of one group.
pub fn gap_candidates(
    group: &[Overlap],
    store: &ReadStore,
    qtrack: &QualityTrack,
    dust: &IntervalTrack,
    cfg: &FixConfig,
    out: &mut Vec<Candidate>,
) {
    let twidth = cfg.twidth;

    for pair in group.windows(2) {
        let (o1, o2) = (&pair[0], &pair[1]);
        if o1.bread != o2.bread || o1.comp != o2.comp || o1.aepos >= o2.abpos {
            continue;
        }

        // expand the hole outwards to segment boundaries
        let ab = (o1.aepos - 1) / twidth * twidth;
        let ae = (o2.abpos / twidth + 1) * twidth;

        // mated B-region bracketing the hole
        let mut bb = o1.bepos - o1.trace.last().map_or(0, |t| t.bases);
        let mut be = o2.bbpos + o2.trace.first().map_or(0, |t| t.bases);
        if bb >= be {
            continue;
        }

        if o2.comp {
            (bb, be) = flip_range(bb, be, store.read_len(o2.bread));
        }

        // the hole may just reflect a low-complexity stretch of B
        if dust
            .read(o2.bread)
            .iter()
            .any(|&(db, de)| bb <= db && be >= de)
        {
            continue;
        }

        let Some(q) = b_quality_sum(qtrack.read(o2.bread), bb, be, twidth) else {
            continue;
        };

        if exceeds_maxgap(cfg, ab, ae, bb, be) {
            continue;
        }

        out.push(Candidate {
            ab,
            ae,
            bb,
            be,
            b: o2.bread,
            diff: 100.0 * q as f64 / (be - bb) as f64,
            support: 1,
            span: 0,
            comp: o2.comp,
        });
    }
}

/// Sum of B quality values over the segments touched by `[bb, be)`,
/// clipped to the track. `None` when any segment has no data or the
/// region touches no segment at all.
fn b_quality_sum(qb: &[u16], bb: i32, be: i32, twidth: i32) -> Option<i64> {
    let beg = (bb / twidth) as usize;
    let end = ((be / twidth + 1) as usize).min(qb.len());
    if beg >= end {
        return None;
    }

    let mut q = 0i64;
    for &v in &qb[beg..end] {
        if v == 0 {
            return None;
        }
        q += v as i64;
    }
    Some(q)
}

/// The configured cap on patch sizes, applied to the A-gap and to the
/// length drift between the A-gap and its B replacement.
pub fn exceeds_maxgap(cfg: &FixConfig, ab: i32, ae: i32, bb: i32, be: i32) -> bool {
    match cfg.maxgap {
        Some(maxgap) => ae - ab >= maxgap || ((be - bb) - (ae - ab)).abs() >= maxgap,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::TracePoint;

    fn ovl(bread: u32, comp: bool, a: (i32, i32), b: (i32, i32), w: &[i32]) -> Overlap {
        Overlap {
            aread: 2,
            bread,
            comp,
            abpos: a.0,
            aepos: a.1,
            bbpos: b.0,
            bepos: b.1,
            trace: w.iter().map(|&bases| TracePoint { diffs: 1, bases }).collect(),
        }
    }

    fn setup() -> (ReadStore, QualityTrack, IntervalTrack, FixConfig) {
        let mut store = ReadStore::new();
        for _ in 0..10 {
            store.push(&vec![b'A'; 500]);
        }
        let qtrack = QualityTrack::from_values("q", vec![vec![10, 10, 10, 10, 10]; 10]);
        let dust = IntervalTrack::from_intervals("dust", vec![Vec::new(); 10]);
        (store, qtrack, dust, FixConfig::default())
    }

    fn split_pair() -> Vec<Overlap> {
        vec![
            ovl(9, false, (0, 200), (0, 200), &[100, 100]),
            ovl(9, false, (300, 500), (300, 500), &[100, 100]),
        ]
    }

    #[test]
    fn test_basic_gap_candidate() {
        let (store, qtrack, dust, cfg) = setup();
        let mut out = Vec::new();
        gap_candidates(&split_pair(), &store, &qtrack, &dust, &cfg, &mut out);

        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!((c.ab, c.ae), (100, 400));
        assert_eq!((c.bb, c.be), (100, 400));
        assert_eq!(c.b, 9);
        assert_eq!(c.support, 1);
        assert!(!c.comp);
        assert!((c.diff - 100.0 * 40.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_different_breads_ignored() {
        let (store, qtrack, dust, cfg) = setup();
        let group = vec![
            ovl(8, false, (0, 200), (0, 200), &[100, 100]),
            ovl(9, false, (300, 500), (300, 500), &[100, 100]),
        ];
        let mut out = Vec::new();
        gap_candidates(&group, &store, &qtrack, &dust, &cfg, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_orientation_mismatch_ignored() {
        let (store, qtrack, dust, cfg) = setup();
        let group = vec![
            ovl(9, false, (0, 200), (0, 200), &[100, 100]),
            ovl(9, true, (300, 500), (0, 200), &[100, 100]),
        ];
        let mut out = Vec::new();
        gap_candidates(&group, &store, &qtrack, &dust, &cfg, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_dust_vetoes_candidate() {
        let (store, qtrack, _, cfg) = setup();
        let dust = IntervalTrack::from_intervals(
            "dust",
            (0..10)
                .map(|i| if i == 9 { vec![(200, 300)] } else { Vec::new() })
                .collect(),
        );
        let mut out = Vec::new();
        gap_candidates(&split_pair(), &store, &qtrack, &dust, &cfg, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_dust_outside_region_kept() {
        let (store, qtrack, _, cfg) = setup();
        let dust = IntervalTrack::from_intervals(
            "dust",
            (0..10)
                .map(|i| if i == 9 { vec![(0, 450)] } else { Vec::new() })
                .collect(),
        );
        let mut out = Vec::new();
        gap_candidates(&split_pair(), &store, &qtrack, &dust, &cfg, &mut out);
        // the dust interval is not contained in the B-region
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_zero_quality_vetoes_candidate() {
        let (store, _, dust, cfg) = setup();
        let mut q = vec![vec![10, 10, 10, 10, 10]; 10];
        q[9][2] = 0;
        let qtrack = QualityTrack::from_values("q", q);
        let mut out = Vec::new();
        gap_candidates(&split_pair(), &store, &qtrack, &dust, &cfg, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_maxgap_rejects_wide_hole() {
        let (store, qtrack, dust, mut cfg) = setup();
        cfg.maxgap = Some(200);
        let mut out = Vec::new();
        gap_candidates(&split_pair(), &store, &qtrack, &dust, &cfg, &mut out);
        assert!(out.is_empty());

        cfg.maxgap = None;
        gap_candidates(&split_pair(), &store, &qtrack, &dust, &cfg, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_complemented_pair_converts_to_forward() {
        let (store, qtrack, dust, cfg) = setup();
        // complemented mate: B coordinates in complement space
        let group = vec![
            ovl(9, true, (0, 200), (0, 200), &[100, 100]),
            ovl(9, true, (300, 500), (300, 500), &[100, 100]),
        ];
        let mut out = Vec::new();
        gap_candidates(&group, &store, &qtrack, &dust, &cfg, &mut out);
        assert_eq!(out.len(), 1);
        let c = &out[0];
        // [100, 400) flipped within the 500bp B-read
        assert_eq!((c.bb, c.be), (100, 400));
        assert!(c.comp);
    }
}
