//! Per-read annotation tracks.
//!
//! Track `NAME` for database `<db>` is the file `<db>.<NAME>`. Two layouts
//! exist:
//!
//! * segment tracks (the `q` quality track): `read_id <TAB> v0,v1,...`,
//!   one value per segment of the read, `0` meaning "no data";
//! * interval tracks (`dust`, trim masks, convertible annotations):
//!   `read_id <TAB> begin <TAB> end`, one interval per line, begin/end in
//!   base coordinates.
//!
//! Loaders accept lines in any order and keep per-read lists sorted.
//! Range validation against the read length happens per processed read,
//! not at load time, mirroring how the patching pass touches data.

use crate::errors::{FixError, Result};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Path of track `name` for database `db`.
pub fn track_path(db: &Path, name: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", db.display(), name))
}

/// Segment-indexed quality values for every read.
pub struct QualityTrack {
    name: String,
    values: Vec<Vec<u16>>,
}

impl QualityTrack {
    pub fn from_path<P: AsRef<Path>>(path: P, name: &str, nreads: usize) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| FixError::Track {
            track: name.to_string(),
            message: e.to_string(),
        })?;
        Self::from_reader(file, name, nreads)
    }

    pub fn from_reader<R: Read>(reader: R, name: &str, nreads: usize) -> Result<Self> {
        let mut values: Vec<Vec<u16>> = vec![Vec::new(); nreads];
        let mut reader = BufReader::new(reader);
        let mut line = String::with_capacity(1024);
        let mut line_number = 0usize;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;

            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (id_field, list) = trimmed.split_once('\t').ok_or_else(|| FixError::Parse {
                line: line_number,
                message: "expected read_id<TAB>values".to_string(),
            })?;

            let id: usize = id_field.parse().map_err(|_| FixError::Parse {
                line: line_number,
                message: format!("invalid read id {:?}", id_field),
            })?;

            if id >= nreads {
                return Err(FixError::Parse {
                    line: line_number,
                    message: format!("read id {} outside database ({} reads)", id, nreads),
                });
            }

            if !values[id].is_empty() {
                return Err(FixError::Parse {
                    line: line_number,
                    message: format!("duplicate quality entry for read {}", id),
                });
            }

            for field in list.split(',') {
                let v: u16 = field.parse().map_err(|_| FixError::Parse {
                    line: line_number,
                    message: format!("invalid quality value {:?}", field),
                })?;
                values[id].push(v);
            }
        }

        Ok(Self {
            name: name.to_string(),
            values,
        })
    }

    /// Build from explicit per-read vectors. Used by tests.
    pub fn from_values(name: &str, values: Vec<Vec<u16>>) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }

    /// Segment values of one read.
    pub fn read(&self, id: u32) -> &[u16] {
        &self.values[id as usize]
    }

    /// Check that the value count matches the read's segment count.
    pub fn validate(&self, id: u32, read_len: i32, twidth: i32) -> Result<()> {
        let expected = ((read_len + twidth - 1) / twidth) as usize;
        let found = self.values[id as usize].len();
        if found != expected {
            return Err(FixError::Read {
                read: id,
                message: format!(
                    "expected {} {} track entries, found {}",
                    expected, self.name, found
                ),
            });
        }
        Ok(())
    }
}

/// Interval lists for every read, sorted by begin position.
pub struct IntervalTrack {
    name: String,
    intervals: Vec<Vec<(i32, i32)>>,
}

impl IntervalTrack {
    pub fn from_path<P: AsRef<Path>>(path: P, name: &str, nreads: usize) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| FixError::Track {
            track: name.to_string(),
            message: e.to_string(),
        })?;
        Self::from_reader(file, name, nreads)
    }

    pub fn from_reader<R: Read>(reader: R, name: &str, nreads: usize) -> Result<Self> {
        let mut per_read: FxHashMap<usize, Vec<(i32, i32)>> = FxHashMap::default();
        let mut reader = BufReader::new(reader);
        let mut line = String::with_capacity(256);
        let mut line_number = 0usize;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;

            let trimmed = line.trim_end();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split('\t');
            let mut parse = |what: &str| -> Result<i32> {
                fields
                    .next()
                    .and_then(|f| f.parse::<i32>().ok())
                    .ok_or_else(|| FixError::Parse {
                        line: line_number,
                        message: format!("invalid or missing {}", what),
                    })
            };

            let id = parse("read id")?;
            let begin = parse("interval begin")?;
            let end = parse("interval end")?;
            let id = usize::try_from(id).map_err(|_| FixError::Parse {
                line: line_number,
                message: format!("invalid read id {}", id),
            })?;

            if id >= nreads {
                return Err(FixError::Parse {
                    line: line_number,
                    message: format!("read id {} outside database ({} reads)", id, nreads),
                });
            }

            per_read.entry(id).or_default().push((begin, end));
        }

        let mut intervals: Vec<Vec<(i32, i32)>> = vec![Vec::new(); nreads];
        for (id, mut list) in per_read {
            list.sort_unstable();
            intervals[id] = list;
        }

        Ok(Self {
            name: name.to_string(),
            intervals,
        })
    }

    /// Build from explicit per-read interval lists. Used by tests.
    pub fn from_intervals(name: &str, intervals: Vec<Vec<(i32, i32)>>) -> Self {
        Self {
            name: name.to_string(),
            intervals,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intervals of one read.
    pub fn read(&self, id: u32) -> &[(i32, i32)] {
        &self.intervals[id as usize]
    }

    /// Check that every interval of the read lies inside `[0, read_len]`.
    pub fn validate(&self, id: u32, read_len: i32) -> Result<()> {
        for &(b, e) in self.read(id) {
            if b < 0 || b > read_len || b > e || e > read_len {
                return Err(FixError::Read {
                    read: id,
                    message: format!(
                        "{} interval {}..{} outside read length {}",
                        self.name, b, e, read_len
                    ),
                });
            }
        }
        Ok(())
    }

    /// The single trim interval of a read, or `[0, read_len)` if absent.
    pub fn trim(&self, id: u32, read_len: i32) -> Result<(i32, i32)> {
        let list = self.read(id);
        match list.len() {
            0 => Ok((0, read_len)),
            1 => Ok(list[0]),
            n => Err(FixError::Read {
                read: id,
                message: format!("{} trim intervals in track {}", n, self.name),
            }),
        }
    }
}
