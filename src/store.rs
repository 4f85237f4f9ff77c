//! Read database access.
//!
//! The database is a FASTA file; read ids are assigned by order of
//! appearance, starting at zero. Bases are normalized to uppercase and
//! restricted to `ACGTN`. Sequences are stored back to back in a single
//! buffer with an offset table, so per-read access is a cheap slice.

use crate::errors::{FixError, Result};
use crate::seq::normalize_base;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Number of parallel quality streams carried per read.
pub const NUM_QV_STREAMS: usize = 5;

/// In-memory read database.
pub struct ReadStore {
    data: Vec<u8>,
    offsets: Vec<usize>,
}

impl Default for ReadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadStore {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            offsets: vec![0],
        }
    }

    /// Load a FASTA file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse FASTA from any readable source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut store = Self::new();
        let mut reader = BufReader::new(reader);
        let mut line = String::with_capacity(1024);
        let mut line_number = 0usize;
        let mut in_read = false;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;

            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('>') {
                if in_read {
                    store.finish_read();
                }
                in_read = true;
                continue;
            }

            if !in_read {
                return Err(FixError::Parse {
                    line: line_number,
                    message: "sequence data before first FASTA header".to_string(),
                });
            }

            for &b in trimmed.as_bytes() {
                match normalize_base(b) {
                    Some(base) => store.data.push(base),
                    None => {
                        return Err(FixError::Parse {
                            line: line_number,
                            message: format!("invalid base {:?}", b as char),
                        })
                    }
                }
            }
        }

        if in_read {
            store.finish_read();
        }

        Ok(store)
    }

    /// Append a read directly. Used by tests and format converters.
    pub fn push(&mut self, seq: &[u8]) {
        self.data.extend_from_slice(seq);
        self.finish_read();
    }

    fn finish_read(&mut self) {
        self.offsets.push(self.data.len());
    }

    /// Number of reads.
    pub fn count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Bases of read `id`.
    pub fn read(&self, id: u32) -> &[u8] {
        let id = id as usize;
        &self.data[self.offsets[id]..self.offsets[id + 1]]
    }

    /// Length of read `id` in bases.
    pub fn read_len(&self, id: u32) -> i32 {
        let id = id as usize;
        (self.offsets[id + 1] - self.offsets[id]) as i32
    }

    /// Length of the longest read, 0 for an empty store.
    pub fn max_len(&self) -> usize {
        (0..self.count())
            .map(|i| self.offsets[i + 1] - self.offsets[i])
            .max()
            .unwrap_or(0)
    }
}

/// Per-read quality streams, loaded from `<db>.qv`.
///
/// File layout per read: a `@<id>` line followed by [`NUM_QV_STREAMS`]
/// lines, each exactly as long as the read.
pub struct QvStore {
    data: [Vec<u8>; NUM_QV_STREAMS],
    offsets: Vec<usize>,
}

impl QvStore {
    /// Load and validate against the read lengths of `store`.
    pub fn from_path<P: AsRef<Path>>(path: P, store: &ReadStore) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, store)
    }

    pub fn from_reader<R: Read>(reader: R, store: &ReadStore) -> Result<Self> {
        let mut data: [Vec<u8>; NUM_QV_STREAMS] = std::array::from_fn(|_| Vec::new());
        let mut offsets = vec![0usize];
        let mut reader = BufReader::new(reader);
        let mut line = String::with_capacity(1024);
        let mut line_number = 0usize;

        for id in 0..store.count() {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(FixError::InvalidFormat(format!(
                    "quality file ends before read {}",
                    id
                )));
            }
            line_number += 1;

            let header = line.trim_end();
            if header != format!("@{}", id) {
                return Err(FixError::Parse {
                    line: line_number,
                    message: format!("expected quality header @{}, got {:?}", id, header),
                });
            }

            let expected = store.read_len(id as u32) as usize;
            for stream in data.iter_mut() {
                line.clear();
                if reader.read_line(&mut line)? == 0 {
                    return Err(FixError::InvalidFormat(format!(
                        "quality file truncated in read {}",
                        id
                    )));
                }
                line_number += 1;

                let row = line.trim_end();
                if row.len() != expected {
                    return Err(FixError::Parse {
                        line: line_number,
                        message: format!(
                            "quality stream length {} does not match read length {}",
                            row.len(),
                            expected
                        ),
                    });
                }
                stream.extend_from_slice(row.as_bytes());
            }

            offsets.push(offsets.last().unwrap() + expected);
        }

        Ok(Self { data, offsets })
    }

    /// Stream `s` of read `id`.
    pub fn stream(&self, id: u32, s: usize) -> &[u8] {
        let id = id as usize;
        &self.data[s][self.offsets[id]..self.offsets[id + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fasta_parsing() {
        let fasta = ">read0\nACGT\nACGT\n>read1\nggnn\n";
        let store = ReadStore::from_reader(fasta.as_bytes()).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.read(0), b"ACGTACGT");
        assert_eq!(store.read(1), b"GGNN");
        assert_eq!(store.read_len(0), 8);
        assert_eq!(store.max_len(), 8);
    }

    #[test]
    fn test_fasta_rejects_bad_base() {
        let fasta = ">r\nACXT\n";
        assert!(ReadStore::from_reader(fasta.as_bytes()).is_err());
    }

    #[test]
    fn test_fasta_rejects_headerless_data() {
        assert!(ReadStore::from_reader("ACGT\n".as_bytes()).is_err());
    }

    #[test]
    fn test_qv_store_roundtrip() {
        let mut store = ReadStore::new();
        store.push(b"ACGT");

        let qv = "@0\naaaa\nbbbb\ncccc\ndddd\neeee\n";
        let qvs = QvStore::from_reader(qv.as_bytes(), &store).unwrap();
        assert_eq!(qvs.stream(0, 0), b"aaaa");
        assert_eq!(qvs.stream(0, 4), b"eeee");
    }

    #[test]
    fn test_qv_store_length_mismatch() {
        let mut store = ReadStore::new();
        store.push(b"ACGT");

        let qv = "@0\naaa\nbbbb\ncccc\ndddd\neeee\n";
        assert!(QvStore::from_reader(qv.as_bytes(), &store).is_err());
    }
}
