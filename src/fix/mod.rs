//! The patch-planning engine.
//!
//! One read at a time: the read's overlap group is examined for chimeric
//! self-alignments (which tighten the usable trim interval), then candidate
//! patch sites are collected from breaks in overlap chains and from
//! low-quality segments, merged and filtered, and finally spliced into a
//! patched sequence. Reads are independent, so the driver shards overlap
//! groups across a thread pool and concatenates per-read output buffers in
//! read order.

pub mod flips;
pub mod gaps;
pub mod merge;
pub mod patch;
pub mod remap;
pub mod weak;

use crate::errors::{FixError, Result};
use crate::overlap::{Overlap, OverlapFile};
use crate::sink;
use crate::store::{QvStore, ReadStore, NUM_QV_STREAMS};
use crate::track::{IntervalTrack, QualityTrack};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::io::Write;

/// An overlap must reach at least this far beyond both ends of a region to
/// count as spanning it.
pub const MIN_SPAN: i32 = 400;

/// Slack required on both sides of a segment before an overlap qualifies
/// as a donor for it, and margin for the per-candidate spanner recount.
pub(crate) const SPAN_MARGIN: i32 = 100;

/// Candidates whose region is spanned by more than this many overlaps are
/// considered well supported and left unpatched.
pub(crate) const MAX_SPANNERS: usize = 10;

/// Reads below this many overlap groups are processed sequentially.
const PARALLEL_THRESHOLD: usize = 64;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct FixConfig {
    /// Minimum output length; shorter patched/trimmed reads are dropped.
    pub minlen: i32,
    /// Segments with quality `0` or `>= lowq` are patch candidates.
    pub lowq: u16,
    /// Upper bound on patched gap sizes; `None` disables the cap.
    pub maxgap: Option<i32>,
    /// Segment width of the overlap traces.
    pub twidth: i32,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            minlen: 1000,
            lowq: 28,
            maxgap: Some(500),
            twidth: 100,
        }
    }
}

/// Aggregate counters, merged across shards at the end of a run.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub flips: u64,
    pub patched_gaps: u64,
    pub bases_before: u64,
    pub bases_after: u64,
    pub span_total: u64,
    pub reads_fixed: u64,
    pub reads_trimmed: u64,
    pub reads_dropped: u64,
}

impl Stats {
    pub fn merge(&mut self, other: &Stats) {
        self.flips += other.flips;
        self.patched_gaps += other.patched_gaps;
        self.bases_before += other.bases_before;
        self.bases_after += other.bases_after;
        self.span_total += other.span_total;
        self.reads_fixed += other.reads_fixed;
        self.reads_trimmed += other.reads_trimmed;
        self.reads_dropped += other.reads_dropped;
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ryu_buf = ryu::Buffer::new();
        let spanners = if self.patched_gaps > 0 {
            self.span_total as f64 / self.patched_gaps as f64
        } else {
            0.0
        };
        write!(
            f,
            "flips: {}, patched gaps: {}, bases replaced: {} -> {}, \
             spanners/patch: {}, reads: {} fixed / {} trimmed / {} dropped",
            self.flips,
            self.patched_gaps,
            self.bases_before,
            self.bases_after,
            ryu_buf.format(spanners),
            self.reads_fixed,
            self.reads_trimmed,
            self.reads_dropped
        )
    }
}

/// A candidate patch site: replace A-range `[ab, ae)` with the
/// forward-strand B-range `[bb, be)` of read `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub ab: i32,
    pub ae: i32,
    pub bb: i32,
    pub be: i32,
    pub b: u32,
    /// Donor quality proxy, lower is better.
    pub diff: f64,
    /// Supporting B-reads (break candidates) or bordering overlaps
    /// (weak-segment candidates).
    pub support: i32,
    /// Overlaps spanning the site.
    pub span: i32,
    /// Donor must be reverse-complemented.
    pub comp: bool,
}

impl Candidate {
    /// Total order by `(ab, ae, diff)`.
    pub fn order(&self, other: &Candidate) -> Ordering {
        self.ab
            .cmp(&other.ab)
            .then(self.ae.cmp(&other.ae))
            .then(self.diff.total_cmp(&other.diff))
    }
}

/// One retained A-range and its offset in the patched output. Donor bases
/// sit in the gaps between consecutive points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplicePoint {
    pub ab: i32,
    pub ae: i32,
    pub out: i32,
}

/// Number of overlaps whose A-range extends at least [`MIN_SPAN`] bases
/// beyond both `b` and `e`.
pub fn spanners(group: &[Overlap], b: i32, e: i32) -> usize {
    group
        .iter()
        .filter(|o| o.abpos < b - MIN_SPAN && o.aepos > e + MIN_SPAN)
        .count()
}

/// Per-worker scratch, reused across reads.
pub struct FixContext {
    pub out: Vec<u8>,
    pub qv_out: Vec<Vec<u8>>,
    pub splice: Vec<SplicePoint>,
    pub candidates: Vec<Candidate>,
}

impl FixContext {
    pub fn new(max_read_len: usize, with_qv: bool) -> Self {
        let cap = 2 * max_read_len;
        let qv_out = if with_qv {
            (0..NUM_QV_STREAMS).map(|_| Vec::with_capacity(cap)).collect()
        } else {
            Vec::new()
        };
        Self {
            out: Vec::with_capacity(cap),
            qv_out,
            splice: Vec::new(),
            candidates: Vec::new(),
        }
    }
}

/// Borrowed inputs for one run.
pub struct Fixer<'a> {
    pub cfg: &'a FixConfig,
    pub store: &'a ReadStore,
    pub qv: Option<&'a QvStore>,
    pub qtrack: &'a QualityTrack,
    pub dust: &'a IntervalTrack,
    pub trim: Option<&'a IntervalTrack>,
    pub convert: &'a [IntervalTrack],
}

impl Fixer<'_> {
    /// Patch every read in the store, writing FASTA (and optionally
    /// quality) output in read order.
    pub fn run<W1: Write, W2: Write>(
        &self,
        overlaps: &OverlapFile,
        fasta_out: &mut W1,
        mut qv_out: Option<&mut W2>,
    ) -> Result<Stats> {
        let nreads = self.store.count();
        let max_len = self.store.max_len();
        let with_qv = self.qv.is_some();

        let results: Result<Vec<(Vec<u8>, Vec<u8>, Stats)>> = if nreads < PARALLEL_THRESHOLD {
            let mut ctx = FixContext::new(max_len, with_qv);
            (0..nreads as u32)
                .map(|aread| self.fix_read(aread, overlaps.group(aread), &mut ctx))
                .collect()
        } else {
            (0..nreads as u32)
                .into_par_iter()
                .map_init(
                    || FixContext::new(max_len, with_qv),
                    |ctx, aread| self.fix_read(aread, overlaps.group(aread), ctx),
                )
                .collect()
        };

        let mut total = Stats::default();
        for (fasta, qv, stats) in results? {
            fasta_out.write_all(&fasta).map_err(FixError::Io)?;
            if let Some(w) = qv_out.as_mut() {
                w.write_all(&qv).map_err(FixError::Io)?;
            }
            total.merge(&stats);
        }

        Ok(total)
    }

    /// Run the per-read pipeline, returning the formatted output buffers.
    pub fn fix_read(
        &self,
        aread: u32,
        group: &[Overlap],
        ctx: &mut FixContext,
    ) -> Result<(Vec<u8>, Vec<u8>, Stats)> {
        let mut fasta = Vec::new();
        let mut qv_buf = Vec::new();
        let mut stats = Stats::default();

        let alen = self.store.read_len(aread);
        let twidth = self.cfg.twidth;

        let (mut trim_ab, mut trim_ae) = match self.trim {
            Some(track) => track.trim(aread, alen)?,
            None => (0, alen),
        };
        if trim_ab < 0 || trim_ab > alen || trim_ab > trim_ae || trim_ae > alen {
            return Err(FixError::Read {
                read: aread,
                message: format!(
                    "trim interval {}..{} outside read length {}",
                    trim_ab, trim_ae, alen
                ),
            });
        }
        if trim_ab >= trim_ae {
            return Ok((fasta, qv_buf, stats));
        }

        let flip = flips::detect_flips(group, aread, alen, trim_ab, trim_ae, twidth);
        if flip.flagged {
            stats.flips += 1;
        }
        trim_ab = trim_ab.max(flip.trim_ab);
        trim_ae = trim_ae.min(flip.trim_ae);
        if trim_ab >= trim_ae {
            return Ok((fasta, qv_buf, stats));
        }

        self.qtrack.validate(aread, alen, twidth)?;
        self.dust.validate(aread, alen)?;

        let qa = self.qtrack.read(aread);

        ctx.candidates.clear();
        gaps::gap_candidates(
            group,
            self.store,
            self.qtrack,
            self.dust,
            self.cfg,
            &mut ctx.candidates,
        );
        merge::merge_candidates(group, qa, self.cfg, &mut ctx.candidates);
        weak::weak_candidates(
            aread,
            group,
            self.store,
            self.qtrack,
            self.cfg,
            trim_ab,
            trim_ae,
            &mut ctx.candidates,
        );

        if ctx.candidates.is_empty() {
            self.emit_trimmed(aread, trim_ab, trim_ae, &mut fasta, &mut qv_buf, &mut stats)?;
            return Ok((fasta, qv_buf, stats));
        }

        ctx.candidates.sort_by(Candidate::order);

        // recount overlaps spanning each surviving site
        for o in group {
            for c in ctx.candidates.iter_mut() {
                if o.abpos + SPAN_MARGIN < c.ab && o.aepos - SPAN_MARGIN > c.ae {
                    c.span += 1;
                }
            }
        }

        patch::build_patch(aread, trim_ab, trim_ae, self.store, self.qv, ctx, &mut stats)?;

        let out_len = ctx.out.len() as i32;
        if out_len < self.cfg.minlen {
            stats.reads_dropped += 1;
            return Ok((fasta, qv_buf, stats));
        }

        let tracks = self.remap_tracks(aread, &ctx.splice, out_len)?;
        sink::write_sequence(&mut fasta, "fixed", aread, &tracks, &ctx.out)?;
        if self.qv.is_some() {
            let streams: Vec<&[u8]> = ctx.qv_out.iter().map(|s| s.as_slice()).collect();
            sink::write_quality(&mut qv_buf, aread, out_len, &streams)?;
        }
        stats.reads_fixed += 1;

        Ok((fasta, qv_buf, stats))
    }

    /// No usable candidates: emit the bare trim slice of the read.
    fn emit_trimmed(
        &self,
        aread: u32,
        trim_ab: i32,
        trim_ae: i32,
        fasta: &mut Vec<u8>,
        qv_buf: &mut Vec<u8>,
        stats: &mut Stats,
    ) -> Result<()> {
        let len = trim_ae - trim_ab;
        if len < self.cfg.minlen {
            stats.reads_dropped += 1;
            return Ok(());
        }

        let identity = [SplicePoint {
            ab: trim_ab,
            ae: trim_ae,
            out: 0,
        }];
        let tracks = self.remap_tracks(aread, &identity, len)?;

        let body = &self.store.read(aread)[trim_ab as usize..trim_ae as usize];
        sink::write_sequence(fasta, "trimmed", aread, &tracks, body)?;

        if let Some(qv) = self.qv {
            let streams: Vec<&[u8]> = (0..NUM_QV_STREAMS)
                .map(|s| &qv.stream(aread, s)[trim_ab as usize..trim_ae as usize])
                .collect();
            sink::write_quality(qv_buf, aread, len, &streams)?;
        }
        stats.reads_trimmed += 1;

        Ok(())
    }

    /// Project every convertible track of the read through the splice map.
    fn remap_tracks<'t>(
        &'t self,
        aread: u32,
        splice: &[SplicePoint],
        out_len: i32,
    ) -> Result<Vec<(&'t str, Vec<(i32, i32)>)>> {
        let mut tracks = Vec::with_capacity(self.convert.len());
        for track in self.convert {
            let adjusted = remap::remap_track(splice, track.read(aread), out_len, aread)?;
            tracks.push((track.name(), adjusted));
        }
        Ok(tracks)
    }
}
