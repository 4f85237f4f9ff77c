//! Candidate consolidation.
//!
//! Break candidates arrive one per overlap pair; several B-reads usually
//! report the same break. Consolidation sorts, folds co-located duplicates
//! into one supported candidate, resolves overlapping candidates in favor
//! of the better supported one, and drops candidates that sit in
//! well-spanned regions or whose A-side does not actually look bad.

use crate::fix::{gaps, spanners, Candidate, FixConfig, MAX_SPANNERS};
use crate::overlap::Overlap;

/// Two candidates at the same A-position describe the same break when
/// their replacement lengths agree within this many bases.
const DUP_LEN_TOLERANCE: i32 = 40;

/// Consolidate `cands` in place, leaving only surviving candidates.
pub fn merge_candidates(
    group: &[Overlap],
    qa: &[u16],
    cfg: &FixConfig,
    cands: &mut Vec<Candidate>,
) {
    if cands.is_empty() {
        return;
    }

    cands.sort_by(Candidate::order);
    let n = cands.len();
    let mut alive = vec![true; n];

    // fold duplicates at identical A-positions
    for i in 0..n {
        if !alive[i] {
            continue;
        }
        let blen_i = cands[i].be - cands[i].bb;
        for j in i + 1..n {
            if cands[j].ab != cands[i].ab || cands[j].ae != cands[i].ae {
                break;
            }
            if !alive[j] {
                continue;
            }
            let blen_j = cands[j].be - cands[j].bb;
            if (blen_j - blen_i).abs() < DUP_LEN_TOLERANCE {
                cands[i].support += 1;
                alive[j] = false;
            }
        }
    }

    // uniform gap cap
    for (i, c) in cands.iter().enumerate() {
        if alive[i] && gaps::exceeds_maxgap(cfg, c.ab, c.ae, c.bb, c.be) {
            alive[i] = false;
        }
    }

    // resolve overlapping candidates by support
    for i in 0..n {
        if !alive[i] {
            continue;
        }
        for j in i + 1..n {
            if !(cands[i].ae > cands[j].ab && cands[i].ab < cands[j].ae) {
                break;
            }
            if !alive[j] {
                continue;
            }
            if cands[i].support >= cands[j].support {
                cands[i].support += cands[j].support;
                alive[j] = false;
            } else {
                cands[j].support += cands[i].support;
                alive[i] = false;
                break;
            }
        }
    }

    // heavily spanned regions do not need patching
    for (i, c) in cands.iter().enumerate() {
        if alive[i] && spanners(group, c.ab, c.ae) > MAX_SPANNERS {
            alive[i] = false;
        }
    }

    // the A-side must itself look bad to be worth replacing
    for (i, c) in cands.iter().enumerate() {
        if !alive[i] {
            continue;
        }
        let beg = (c.ab / cfg.twidth) as usize;
        let end = (c.ae / cfg.twidth) as usize;
        let bad = (beg..end).any(|k| qa.get(k).is_none_or(|&v| v == 0 || v >= cfg.lowq));
        if !bad {
            alive[i] = false;
        }
    }

    let mut keep = alive.into_iter();
    cands.retain(|_| keep.next().unwrap());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(ab: i32, ae: i32, blen: i32, support: i32, diff: f64) -> Candidate {
        Candidate {
            ab,
            ae,
            bb: 0,
            be: blen,
            b: 9,
            diff,
            support,
            span: 0,
            comp: false,
        }
    }

    fn weak_qa() -> Vec<u16> {
        // every segment is bad
        vec![0; 20]
    }

    #[test]
    fn test_duplicates_fold_into_support() {
        let mut cands = vec![
            cand(100, 200, 100, 1, 5.0),
            cand(100, 200, 110, 1, 6.0),
            cand(100, 200, 95, 1, 7.0),
        ];
        merge_candidates(&[], &weak_qa(), &FixConfig::default(), &mut cands);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].support, 3);
        assert!((cands[0].diff - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_with_divergent_length_kept() {
        let mut cands = vec![cand(100, 200, 100, 1, 5.0), cand(100, 200, 150, 1, 6.0)];
        merge_candidates(&[], &weak_qa(), &FixConfig::default(), &mut cands);
        // B-lengths differ by 50 >= 40: distinct breaks at one position;
        // the overlap pass then resolves them by support (tie: earlier).
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].support, 2);
        assert_eq!(cands[0].be, 100);
    }

    #[test]
    fn test_overlapping_resolved_by_support() {
        let mut cands = vec![cand(100, 300, 200, 1, 5.0), cand(200, 400, 200, 4, 6.0)];
        merge_candidates(&[], &weak_qa(), &FixConfig::default(), &mut cands);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].ab, 200);
        assert_eq!(cands[0].support, 5);
    }

    #[test]
    fn test_overlapping_tie_keeps_earlier() {
        let mut cands = vec![cand(100, 300, 200, 2, 5.0), cand(200, 400, 200, 2, 6.0)];
        merge_candidates(&[], &weak_qa(), &FixConfig::default(), &mut cands);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].ab, 100);
        assert_eq!(cands[0].support, 4);
    }

    #[test]
    fn test_disjoint_candidates_all_survive() {
        let mut cands = vec![cand(100, 200, 100, 1, 5.0), cand(300, 400, 100, 1, 6.0)];
        merge_candidates(&[], &weak_qa(), &FixConfig::default(), &mut cands);
        assert_eq!(cands.len(), 2);
    }

    #[test]
    fn test_maxgap_cap_applies() {
        let mut cfg = FixConfig::default();
        cfg.maxgap = Some(150);
        let mut cands = vec![cand(100, 300, 200, 1, 5.0), cand(400, 500, 100, 1, 6.0)];
        merge_candidates(&[], &weak_qa(), &cfg, &mut cands);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].ab, 400);
    }

    #[test]
    fn test_good_a_region_not_patched() {
        // quality fine everywhere: candidate dropped
        let qa = vec![10u16; 20];
        let mut cands = vec![cand(100, 200, 100, 3, 5.0)];
        merge_candidates(&[], &qa, &FixConfig::default(), &mut cands);
        assert!(cands.is_empty());
    }

    #[test]
    fn test_survivors_are_disjoint() {
        let mut cands = vec![
            cand(100, 300, 200, 1, 5.0),
            cand(200, 400, 210, 2, 6.0),
            cand(350, 500, 150, 1, 7.0),
            cand(600, 700, 100, 1, 8.0),
        ];
        merge_candidates(&[], &weak_qa(), &FixConfig::default(), &mut cands);
        for pair in cands.windows(2) {
            assert!(pair[0].ae <= pair[1].ab || pair[1].ae <= pair[0].ab);
        }
    }
}
