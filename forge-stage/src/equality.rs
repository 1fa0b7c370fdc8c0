//! Streaming byte-equality check between two files.
//!
//! Sizes are compared first; only same-sized files are read, in
//! [`CHUNK_SIZE`] blocks, stopping at the first differing block. Both handles
//! are owned locals and close on every exit path.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{io_err, StagingError};

/// Read block size.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// `true` when `a` and `b` hold exactly the same bytes.
pub fn files_equal(a: &Path, b: &Path) -> Result<bool, StagingError> {
    let len_a = std::fs::metadata(a).map_err(|e| io_err(a, e))?.len();
    let len_b = std::fs::metadata(b).map_err(|e| io_err(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }

    let mut file_a = File::open(a).map_err(|e| io_err(a, e))?;
    let mut file_b = File::open(b).map_err(|e| io_err(b, e))?;
    let mut buf_a = vec![0u8; CHUNK_SIZE];
    let mut buf_b = vec![0u8; CHUNK_SIZE];

    loop {
        let n_a = fill(&mut file_a, &mut buf_a).map_err(|e| io_err(a, e))?;
        let n_b = fill(&mut file_b, &mut buf_b).map_err(|e| io_err(b, e))?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a < CHUNK_SIZE {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
