//! Patch candidates from low-quality segments.
//!
//! Segments inside the trim interval whose quality is zero (no data) or
//! at/above the low-quality cutoff get patched from the best spanning
//! overlap: the donor whose matching B-region has the lowest mean
//! segment quality. Leading and trailing zero-quality segments are left
//! alone, as are segments already covered by a break candidate.

use crate::fix::{Candidate, FixConfig, SPAN_MARGIN};
use crate::overlap::Overlap;
use crate::store::ReadStore;
use crate::trace::{flip_range, TraceMap};
use crate::track::QualityTrack;

struct Donor {
    mean_q: f64,
    bb: i32,
    be: i32,
    bread: u32,
    comp: bool,
}

/// Scan the trimmed segment range of `aread` and append one candidate per
/// patchable weak segment.
pub fn weak_candidates(
    aread: u32,
    group: &[Overlap],
    store: &ReadStore,
    qtrack: &QualityTrack,
    cfg: &FixConfig,
    trim_ab: i32,
    trim_ae: i32,
    cands: &mut Vec<Candidate>,
) {
    let twidth = cfg.twidth;
    let qa = qtrack.read(aread);

    let mut s_first = (trim_ab / twidth) as usize;
    let mut s_last = ((trim_ae / twidth) as usize).min(qa.len());

    // untrusted read ends are trimmed by other means, not patched
    while s_first < s_last && qa[s_first] == 0 {
        s_first += 1;
    }
    while s_last > s_first && qa[s_last - 1] == 0 {
        s_last -= 1;
    }

    for i in s_first..s_last {
        if qa[i] != 0 && qa[i] < cfg.lowq {
            continue;
        }

        let ab = i as i32 * twidth;
        let ae = ab + twidth;

        if cands.iter().any(|c| c.ab <= ae && c.ae >= ab) {
            continue;
        }

        let mut span = 0;
        let mut border = 0;
        let mut best: Option<Donor> = None;

        for o in group {
            if o.abpos + SPAN_MARGIN <= ab && o.aepos - SPAN_MARGIN >= ae {
                if let Some(donor) = donor_region(o, store, qtrack, ab, twidth) {
                    if best.as_ref().map_or(true, |b| donor.mean_q < b.mean_q) {
                        best = Some(donor);
                    }
                    span += 1;
                }
            }

            if (o.abpos >= ab && o.abpos <= ae) || (o.aepos >= ab && o.aepos <= ae) {
                border += 1;
            }
        }

        if let Some(donor) = best {
            cands.push(Candidate {
                ab,
                ae,
                bb: donor.bb,
                be: donor.be,
                b: donor.bread,
                diff: donor.mean_q,
                support: border,
                span,
                comp: donor.comp,
            });
        }
    }
}

/// The forward-strand B-region of `o` covering the A-segment at `ab`,
/// qualified by its mean segment quality. `None` when the donor region
/// contains a no-data segment.
fn donor_region(
    o: &Overlap,
    store: &ReadStore,
    qtrack: &QualityTrack,
    ab: i32,
    twidth: i32,
) -> Option<Donor> {
    let seg = TraceMap::new(o, twidth).segment_at(ab)?;

    let (mut bb, mut be) = (seg.bb, seg.be);
    if o.comp {
        (bb, be) = flip_range(bb, be, store.read_len(o.bread));
    }

    let qb = qtrack.read(o.bread);
    let beg = (bb / twidth) as usize;
    let end = ((be / twidth) as usize).min(qb.len());
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

    Some(Donor {
        mean_q: q as f64 / (end - beg) as f64,
        bb,
        be,
        bread: o.bread,
        comp: o.comp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::TracePoint;

    fn ovl(bread: u32, comp: bool, a: (i32, i32), b: (i32, i32), w: &[i32]) -> Overlap {
        Overlap {
            aread: 1,
            bread,
            comp,
            abpos: a.0,
            aepos: a.1,
            bbpos: b.0,
            bepos: b.1,
            trace: w.iter().map(|&bases| TracePoint { diffs: 1, bases }).collect(),
        }
    }

    fn store_of(lens: &[usize]) -> ReadStore {
        let mut store = ReadStore::new();
        for &len in lens {
            store.push(&vec![b'C'; len]);
        }
        store
    }

    #[test]
    fn test_weak_segment_patched_from_spanning_overlap() {
        let store = store_of(&[0, 400, 0, 0, 0, 0, 0, 400]);
        let qtrack = QualityTrack::from_values(
            "q",
            vec![
                vec![],
                vec![10, 40, 10, 12],
                vec![], vec![], vec![], vec![], vec![],
                vec![8, 9, 10, 11],
            ],
        );
        let group = vec![ovl(7, false, (0, 400), (0, 400), &[100, 100, 100, 100])];

        let mut cands = Vec::new();
        weak_candidates(1, &group, &store, &qtrack, &FixConfig::default(), 0, 400, &mut cands);

        assert_eq!(cands.len(), 1);
        let c = &cands[0];
        assert_eq!((c.ab, c.ae), (100, 200));
        assert_eq!((c.bb, c.be), (100, 200));
        assert_eq!(c.b, 7);
        assert_eq!(c.support, 0);
        assert_eq!(c.span, 1);
        assert!(!c.comp);
        assert!((c.diff - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_best_donor_wins() {
        let store = store_of(&[0, 400, 0, 0, 0, 0, 400, 400]);
        let qtrack = QualityTrack::from_values(
            "q",
            vec![
                vec![],
                vec![10, 40, 10, 12],
                vec![], vec![], vec![], vec![],
                vec![20, 25, 20, 20],
                vec![8, 4, 10, 11],
            ],
        );
        let group = vec![
            ovl(6, false, (0, 400), (0, 400), &[100, 100, 100, 100]),
            ovl(7, false, (0, 400), (0, 400), &[100, 100, 100, 100]),
        ];

        let mut cands = Vec::new();
        weak_candidates(1, &group, &store, &qtrack, &FixConfig::default(), 0, 400, &mut cands);

        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].b, 7);
        assert_eq!(cands[0].span, 2);
    }

    #[test]
    fn test_zero_quality_donor_skipped() {
        let store = store_of(&[0, 400, 0, 0, 0, 0, 0, 400]);
        let qtrack = QualityTrack::from_values(
            "q",
            vec![
                vec![],
                vec![10, 40, 10, 12],
                vec![], vec![], vec![], vec![], vec![],
                vec![8, 0, 10, 11],
            ],
        );
        let group = vec![ovl(7, false, (0, 400), (0, 400), &[100, 100, 100, 100])];

        let mut cands = Vec::new();
        weak_candidates(1, &group, &store, &qtrack, &FixConfig::default(), 0, 400, &mut cands);
        assert!(cands.is_empty());
    }

    #[test]
    fn test_barely_overlapping_donor_skipped() {
        // overlap does not reach 100 bases past both segment ends
        let store = store_of(&[0, 400, 0, 0, 0, 0, 0, 400]);
        let qtrack = QualityTrack::from_values(
            "q",
            vec![
                vec![],
                vec![10, 40, 10, 12],
                vec![], vec![], vec![], vec![], vec![],
                vec![8, 9, 10, 11],
            ],
        );
        let group = vec![ovl(7, false, (50, 250), (50, 250), &[50, 100, 50])];

        let mut cands = Vec::new();
        weak_candidates(1, &group, &store, &qtrack, &FixConfig::default(), 0, 400, &mut cands);
        assert!(cands.is_empty());
    }

    #[test]
    fn test_existing_candidate_blocks_segment() {
        let store = store_of(&[0, 400, 0, 0, 0, 0, 0, 400]);
        let qtrack = QualityTrack::from_values(
            "q",
            vec![
                vec![],
                vec![10, 40, 10, 12],
                vec![], vec![], vec![], vec![], vec![],
                vec![8, 9, 10, 11],
            ],
        );
        let group = vec![ovl(7, false, (0, 400), (0, 400), &[100, 100, 100, 100])];

        let mut cands = vec![Candidate {
            ab: 100,
            ae: 200,
            bb: 0,
            be: 100,
            b: 3,
            diff: 1.0,
            support: 5,
            span: 0,
            comp: false,
        }];
        weak_candidates(1, &group, &store, &qtrack, &FixConfig::default(), 0, 400, &mut cands);
        assert_eq!(cands.len(), 1);
    }

    #[test]
    fn test_trailing_zero_quality_ignored() {
        let store = store_of(&[0, 400, 0, 0, 0, 0, 0, 400]);
        let qtrack = QualityTrack::from_values(
            "q",
            vec![
                vec![],
                vec![10, 12, 11, 0],
                vec![], vec![], vec![], vec![], vec![],
                vec![8, 9, 10, 11],
            ],
        );
        let group = vec![ovl(7, false, (0, 400), (0, 400), &[100, 100, 100, 100])];

        let mut cands = Vec::new();
        weak_candidates(1, &group, &store, &qtrack, &FixConfig::default(), 0, 400, &mut cands);
        assert!(cands.is_empty());
    }
}
