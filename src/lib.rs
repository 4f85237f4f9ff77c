// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! REFIX: overlap-guided read repair
//!
//! This library patches weak regions and chimeric breaks in long,
//! error-prone reads using the read's own overlap pile, producing a
//! revised sequence corpus suitable for assembly.
//!
//! # Features
//!
//! - **Evidence-based patching**: damaged segments are replaced with the
//!   best-matching region of a supporting read; no base is ever invented
//! - **Chimera trimming**: reverse-complement self-alignments crossing the
//!   palindrome diagonal tighten the usable trim interval
//! - **Annotation remapping**: interval tracks are projected through the
//!   splice map so they keep indexing correct positions
//! - **Parallel processing**: reads are independent and sharded across a
//!   Rayon pool, with output kept in read order
//!
//! # Example
//!
//! ```rust,no_run
//! use refix::fix::{FixConfig, Fixer};
//! use refix::overlap::OverlapFile;
//! use refix::store::ReadStore;
//! use refix::track::{IntervalTrack, QualityTrack};
//!
//! let store = ReadStore::from_path("reads.fasta").unwrap();
//! let overlaps = OverlapFile::from_path("reads.ovl").unwrap();
//! let qtrack = QualityTrack::from_path("reads.fasta.q", "q", store.count()).unwrap();
//! let dust = IntervalTrack::from_path("reads.fasta.dust", "dust", store.count()).unwrap();
//!
//! let cfg = FixConfig { twidth: overlaps.twidth(), ..FixConfig::default() };
//! let fixer = Fixer {
//!     cfg: &cfg,
//!     store: &store,
//!     qv: None,
//!     qtrack: &qtrack,
//!     dust: &dust,
//!     trim: None,
//!     convert: &[],
//! };
//!
//! let mut fasta = Vec::new();
//! let stats = fixer.run::<_, Vec<u8>>(&overlaps, &mut fasta, None).unwrap();
//! eprintln!("{}", stats);
//! ```

pub mod errors;
pub mod fix;
pub mod overlap;
pub mod seq;
pub mod sink;
pub mod store;
pub mod trace;
pub mod track;

// Re-export commonly used types
pub use errors::{FixError, Result};
pub use fix::{FixConfig, Fixer, Stats};
pub use overlap::{Overlap, OverlapFile};
pub use store::ReadStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::errors::{FixError, Result};
    pub use crate::fix::{Candidate, FixConfig, FixContext, Fixer, SplicePoint, Stats};
    pub use crate::overlap::{Overlap, OverlapFile, TracePoint};
    pub use crate::store::{QvStore, ReadStore};
    pub use crate::track::{IntervalTrack, QualityTrack};
}

#[cfg(test)]
mod tests {
    use crate::fix::{FixConfig, FixContext, Fixer};
    use crate::overlap::OverlapFile;
    use crate::store::ReadStore;
    use crate::track::{IntervalTrack, QualityTrack};

    #[test]
    fn test_basic_workflow() {
        // A clean 300-base read with no overlaps passes through as a
        // trimmed record.
        let mut store = ReadStore::new();
        store.push(&vec![b'A'; 300]);

        let qtrack = QualityTrack::from_values("q", vec![vec![10, 12, 11]]);
        let dust = IntervalTrack::from_intervals("dust", vec![vec![]]);
        let overlaps = OverlapFile::from_overlaps(Vec::new(), 100).unwrap();

        let cfg = FixConfig {
            minlen: 50,
            ..FixConfig::default()
        };
        let fixer = Fixer {
            cfg: &cfg,
            store: &store,
            qv: None,
            qtrack: &qtrack,
            dust: &dust,
            trim: None,
            convert: &[],
        };

        let mut ctx = FixContext::new(store.max_len(), false);
        let (fasta, _, stats) = fixer.fix_read(0, overlaps.group(0), &mut ctx).unwrap();

        let text = String::from_utf8(fasta).unwrap();
        assert!(text.starts_with(">trimmed_0 source=0\n"));
        assert_eq!(stats.reads_trimmed, 1);
    }
}
