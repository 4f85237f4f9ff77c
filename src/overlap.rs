//! Overlap stream access.
//!
//! Overlaps are local alignments of an A-read against a B-read, one per
//! line, sorted by `(aread, bread, abpos)`:
//!
//! ```text
//! aread <TAB> bread <TAB> strand <TAB> abpos <TAB> aepos <TAB> bbpos <TAB> bepos <TAB> d0,w0,d1,w1,...
//! ```
//!
//! `strand` is `+` or `-`; `-` means the B-read aligned reverse-complemented
//! and its coordinates are given in complemented B space. The trace carries
//! one `(diffs, B-bases consumed)` pair per A-segment the alignment crosses,
//! which lets any A coordinate be projected into B (see [`crate::trace`]).
//!
//! A `#twidth=<W>` header comment sets the segment width (default 100).
//! Large files are scanned through a memory map; smaller ones are read into
//! a buffer first.

use crate::errors::{FixError, Result};
use memchr::memchr_iter;
use memmap2::Mmap;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::path::Path;

/// Default alignment trace segment width.
pub const DEFAULT_TWIDTH: i32 = 100;

/// Minimum file size before the loader switches to a memory map.
const MMAP_THRESHOLD: u64 = 64 * 1024;

/// One trace entry: alignment differences within an A-segment and the
/// number of B bases the segment consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracePoint {
    pub diffs: i32,
    pub bases: i32,
}

/// A local alignment between an A-read and a B-read.
#[derive(Debug, Clone)]
pub struct Overlap {
    pub aread: u32,
    pub bread: u32,
    /// B aligned reverse-complemented.
    pub comp: bool,
    pub abpos: i32,
    pub aepos: i32,
    pub bbpos: i32,
    pub bepos: i32,
    pub trace: Vec<TracePoint>,
}

impl Overlap {
    /// Number of A-segments an alignment spanning `[abpos, aepos)` crosses.
    pub fn segments_crossed(abpos: i32, aepos: i32, twidth: i32) -> usize {
        ((aepos - 1) / twidth - abpos / twidth + 1) as usize
    }
}

/// A loaded, validated overlap file with per-A-read group access.
pub struct OverlapFile {
    overlaps: Vec<Overlap>,
    twidth: i32,
    groups: FxHashMap<u32, (usize, usize)>,
}

impl OverlapFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();

        if len >= MMAP_THRESHOLD {
            // Safety: the mapping is read-only and dropped before return.
            let mmap = unsafe { Mmap::map(&file)? };
            Self::from_bytes(&mmap)
        } else {
            let bytes = std::fs::read(path.as_ref())?;
            Self::from_bytes(&bytes)
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut overlaps = Vec::new();
        let mut twidth = DEFAULT_TWIDTH;
        let mut line_number = 0usize;
        let mut start = 0usize;

        let mut line_ends: Vec<usize> = memchr_iter(b'\n', bytes).collect();
        if bytes.last().is_some_and(|&b| b != b'\n') {
            line_ends.push(bytes.len());
        }

        for end in line_ends {
            let line = &bytes[start..end];
            start = end + 1;
            line_number += 1;

            let line = trim_cr(line);
            if line.is_empty() {
                continue;
            }

            if line[0] == b'#' {
                if let Some(rest) = line.strip_prefix(b"#twidth=") {
                    twidth = parse_i32(rest).ok_or_else(|| FixError::Parse {
                        line: line_number,
                        message: "invalid #twidth header".to_string(),
                    })?;
                    if twidth <= 0 {
                        return Err(FixError::Parse {
                            line: line_number,
                            message: "segment width must be positive".to_string(),
                        });
                    }
                }
                continue;
            }

            overlaps.push(parse_overlap(line, line_number, twidth)?);
        }

        Self::from_overlaps(overlaps, twidth)
    }

    /// Build from already-parsed records, validating sort order and
    /// indexing the per-A-read groups.
    pub fn from_overlaps(overlaps: Vec<Overlap>, twidth: i32) -> Result<Self> {
        for pair in overlaps.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let ordered = (prev.aread, prev.bread, prev.abpos)
                <= (next.aread, next.bread, next.abpos);
            if !ordered {
                return Err(FixError::InvalidFormat(format!(
                    "overlaps not sorted by (aread, bread, abpos) near A-read {}; \
                     sort the overlap file first",
                    next.aread
                )));
            }
        }

        let mut groups = FxHashMap::default();
        let mut begin = 0usize;
        for i in 0..overlaps.len() {
            if i + 1 == overlaps.len() || overlaps[i + 1].aread != overlaps[i].aread {
                groups.insert(overlaps[i].aread, (begin, i + 1));
                begin = i + 1;
            }
        }

        Ok(Self {
            overlaps,
            twidth,
            groups,
        })
    }

    pub fn twidth(&self) -> i32 {
        self.twidth
    }

    /// All overlaps of one A-read, empty if the read has none.
    pub fn group(&self, aread: u32) -> &[Overlap] {
        match self.groups.get(&aread) {
            Some(&(b, e)) => &self.overlaps[b..e],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.overlaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlaps.is_empty()
    }
}

fn trim_cr(line: &[u8]) -> &[u8] {
    match line.last() {
        Some(b'\r') => &line[..line.len() - 1],
        _ => line,
    }
}

/// Fast signed integer parse; no allocation, no error formatting.
#[inline]
fn parse_i32(bytes: &[u8]) -> Option<i32> {
    let (neg, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return None;
    }
    let mut n: i64 = 0;
    for &b in digits {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n * 10 + d as i64;
        if n > i32::MAX as i64 + 1 {
            return None;
        }
    }
    let n = if neg { -n } else { n };
    i32::try_from(n).ok()
}

fn parse_overlap(line: &[u8], line_number: usize, twidth: i32) -> Result<Overlap> {
    let err = |message: String| FixError::Parse {
        line: line_number,
        message,
    };

    let mut fields = line.split(|&b| b == b'\t');
    let mut next = |what: &str| {
        fields
            .next()
            .ok_or_else(|| err(format!("missing {} field", what)))
    };

    let aread = parse_i32(next("aread")?)
        .filter(|&v| v >= 0)
        .ok_or_else(|| err("invalid aread".to_string()))? as u32;
    let bread = parse_i32(next("bread")?)
        .filter(|&v| v >= 0)
        .ok_or_else(|| err("invalid bread".to_string()))? as u32;

    let comp = match next("strand")? {
        b"+" => false,
        b"-" => true,
        other => {
            return Err(err(format!(
                "invalid strand {:?}",
                String::from_utf8_lossy(other)
            )))
        }
    };

    let mut coord = |what: &str| -> Result<i32> {
        parse_i32(next(what)?)
            .filter(|&v| v >= 0)
            .ok_or_else(|| err(format!("invalid {}", what)))
    };
    let abpos = coord("abpos")?;
    let aepos = coord("aepos")?;
    let bbpos = coord("bbpos")?;
    let bepos = coord("bepos")?;

    if abpos >= aepos || bbpos >= bepos {
        return Err(err(format!(
            "degenerate alignment {}..{} x {}..{}",
            abpos, aepos, bbpos, bepos
        )));
    }

    let trace_field = next("trace")?;
    let mut values = Vec::new();
    for field in trace_field.split(|&b| b == b',') {
        values.push(parse_i32(field).ok_or_else(|| err("invalid trace value".to_string()))?);
    }
    if values.len() % 2 != 0 {
        return Err(err("trace must hold (diffs, bases) pairs".to_string()));
    }

    let trace: Vec<TracePoint> = values
        .chunks_exact(2)
        .map(|p| TracePoint {
            diffs: p[0],
            bases: p[1],
        })
        .collect();

    let expected = Overlap::segments_crossed(abpos, aepos, twidth);
    if trace.len() != expected {
        return Err(err(format!(
            "trace has {} pairs, alignment crosses {} segments",
            trace.len(),
            expected
        )));
    }

    let consumed: i32 = trace.iter().map(|t| t.bases).sum();
    if bbpos + consumed != bepos {
        return Err(err(format!(
            "trace consumes {} B bases, alignment spans {}",
            consumed,
            bepos - bbpos
        )));
    }

    Ok(Overlap {
        aread,
        bread,
        comp,
        abpos,
        aepos,
        bbpos,
        bepos,
        trace,
    })
}
