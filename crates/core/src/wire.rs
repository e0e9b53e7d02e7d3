// crates/core/src/wire.rs
//! Binary layout of a worker's partial count matrix.
//!
//! ```text
//! "VRPS" | version: u8 | cells: u32 | pairs: u32 | pairs x (index: u32, count: u16)
//! ```
//!
//! All integers are little-endian. Only non-zero cells are written. A cell
//! above `u16::MAX` is split over several pairs with the same index, and the
//! reader sums them, so counts never wrap.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use crate::error::WireError;
use crate::matrix::CountMatrix;

pub const MAGIC: [u8; 4] = *b"VRPS";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 4 + 1 + 4 + 4;
pub const PAIR_LEN: usize = 4 + 2;

const READ_BLOCK: usize = 64 * 1024;
const WRITE_BUFFER: usize = 1024 * 1024;

fn pairs_for(count: u32) -> u32 {
    count.div_ceil(u32::from(u16::MAX))
}

/// Serialize `matrix` into `writer`. Returns the number of pairs written.
pub fn encode<W: Write>(matrix: &CountMatrix, writer: &mut W) -> io::Result<u32> {
    let cells = u32::try_from(matrix.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "matrix too large"))?;
    let pairs: u32 = matrix.cells().iter().map(|&c| pairs_for(c)).sum();

    let mut header = [0u8; HEADER_LEN];
    header[..4].copy_from_slice(&MAGIC);
    header[4] = VERSION;
    header[5..9].copy_from_slice(&cells.to_le_bytes());
    header[9..13].copy_from_slice(&pairs.to_le_bytes());
    writer.write_all(&header)?;

    let mut pair = [0u8; PAIR_LEN];
    for (index, &count) in matrix.cells().iter().enumerate() {
        if count == 0 {
            continue;
        }
        pair[..4].copy_from_slice(&(index as u32).to_le_bytes());
        let mut left = count;
        while left > 0 {
            let part = left.min(u32::from(u16::MAX));
            pair[4..].copy_from_slice(&(part as u16).to_le_bytes());
            writer.write_all(&pair)?;
            left -= part;
        }
    }
    Ok(pairs)
}

/// Write a partial artifact. Fails if the file already exists.
pub fn write_partial(path: &Path, matrix: &CountMatrix) -> Result<u32, WireError> {
    if u32::try_from(matrix.len()).is_err() {
        return Err(WireError::TooLarge {
            cells: matrix.len(),
        });
    }
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| WireError::io(path, e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER, file);
    let pairs = encode(matrix, &mut writer).map_err(|e| WireError::io(path, e))?;
    writer.flush().map_err(|e| WireError::io(path, e))?;
    Ok(pairs)
}

/// Stream pairs from `reader` and add them into `target`.
///
/// `source` only names the artifact in errors. Reads are allowed to come back
/// short; a pair split across two reads is carried over.
pub fn decode_into<R: Read>(
    reader: &mut R,
    target: &mut CountMatrix,
    source: &Path,
) -> Result<u32, WireError> {
    let corrupt = |message: String| WireError::Corrupt {
        path: source.to_path_buf(),
        message,
    };

    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => corrupt("header is truncated".into()),
        _ => WireError::io(source, e),
    })?;

    if header[..4] != MAGIC {
        return Err(WireError::BadMagic {
            path: source.to_path_buf(),
        });
    }
    if header[4] != VERSION {
        return Err(WireError::UnsupportedVersion {
            path: source.to_path_buf(),
            version: header[4],
        });
    }
    let cells = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
    if cells != target.len() {
        return Err(WireError::ShapeMismatch {
            path: source.to_path_buf(),
            expected: target.len(),
            found: cells,
        });
    }
    let declared = u32::from_le_bytes([header[9], header[10], header[11], header[12]]);

    let mut buf = vec![0u8; READ_BLOCK];
    let mut carry = 0usize;
    let mut decoded: u32 = 0;

    loop {
        let n = match reader.read(&mut buf[carry..]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(WireError::io(source, e)),
        };
        let available = carry + n;
        let whole = available - available % PAIR_LEN;

        for pair in buf[..whole].chunks_exact(PAIR_LEN) {
            let index = u32::from_le_bytes([pair[0], pair[1], pair[2], pair[3]]);
            let count = u16::from_le_bytes([pair[4], pair[5]]);
            if index as usize >= cells {
                return Err(WireError::IndexOutOfBounds {
                    path: source.to_path_buf(),
                    index,
                    cells,
                });
            }
            target.add_at(index as usize, u32::from(count));
            decoded = decoded.saturating_add(1);
        }

        buf.copy_within(whole..available, 0);
        carry = available - whole;
    }

    if carry != 0 {
        return Err(corrupt(format!("ends with a partial {carry}-byte pair")));
    }
    if decoded != declared {
        return Err(corrupt(format!("declares {declared} pairs but holds {decoded}")));
    }
    Ok(decoded)
}

/// Open a partial artifact and add it into `target`.
pub fn read_partial(path: &Path, target: &mut CountMatrix) -> Result<u32, WireError> {
    let mut file = File::open(path).map_err(|e| WireError::io(path, e))?;
    decode_into(&mut file, target, path)
}
