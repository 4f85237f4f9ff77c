//! Output formatting for patched reads.
//!
//! Sequence records carry their remapped annotation intervals on the
//! header line:
//!
//! ```text
//! >fixed_17 source=17 rep=12,140,200,260
//! ACGT...
//! ```
//!
//! Quality records mirror the FASTQ convention used downstream: one
//! header, then one line per stream, all of the patched length.

use crate::errors::{FixError, Result};
use crate::seq::write_wrapped;
use std::io::Write;

/// Write one sequence record. `prefix` is `fixed` or `trimmed`;
/// `tracks` holds `(name, adjusted intervals)` pairs, empty lists are
/// omitted from the header.
pub fn write_sequence<W: Write>(
    out: &mut W,
    prefix: &str,
    aread: u32,
    tracks: &[(&str, Vec<(i32, i32)>)],
    body: &[u8],
) -> Result<()> {
    let mut itoa_buf = itoa::Buffer::new();

    out.write_all(b">").map_err(FixError::Io)?;
    out.write_all(prefix.as_bytes()).map_err(FixError::Io)?;
    out.write_all(b"_").map_err(FixError::Io)?;
    out.write_all(itoa_buf.format(aread).as_bytes())
        .map_err(FixError::Io)?;
    out.write_all(b" source=").map_err(FixError::Io)?;
    out.write_all(itoa_buf.format(aread).as_bytes())
        .map_err(FixError::Io)?;

    for (name, intervals) in tracks {
        let mut first = true;
        for &(b, e) in intervals {
            if first {
                out.write_all(b" ").map_err(FixError::Io)?;
                out.write_all(name.as_bytes()).map_err(FixError::Io)?;
                out.write_all(b"=").map_err(FixError::Io)?;
            } else {
                out.write_all(b",").map_err(FixError::Io)?;
            }
            out.write_all(itoa_buf.format(b).as_bytes())
                .map_err(FixError::Io)?;
            out.write_all(b",").map_err(FixError::Io)?;
            out.write_all(itoa_buf.format(e).as_bytes())
                .map_err(FixError::Io)?;
            first = false;
        }
    }

    out.write_all(b"\n").map_err(FixError::Io)?;
    write_wrapped(out, body)
}

/// Write one quality record: header plus one line per stream.
pub fn write_quality<W: Write>(
    out: &mut W,
    aread: u32,
    len: i32,
    streams: &[&[u8]],
) -> Result<()> {
    let mut itoa_buf = itoa::Buffer::new();

    out.write_all(b"@fixed/0_").map_err(FixError::Io)?;
    out.write_all(itoa_buf.format(len).as_bytes())
        .map_err(FixError::Io)?;
    out.write_all(b" source=").map_err(FixError::Io)?;
    out.write_all(itoa_buf.format(aread).as_bytes())
        .map_err(FixError::Io)?;
    out.write_all(b"\n").map_err(FixError::Io)?;

    for stream in streams {
        out.write_all(stream).map_err(FixError::Io)?;
        out.write_all(b"\n").map_err(FixError::Io)?;
    }

    Ok(())
}
