//! NumPy `.npy` codec for the embedding matrix.
//!
//! Layout of a version 1.0 file:
//!
//! ```text
//! ┌──────────────┬───────┬───────┬──────────────┬────────────────────────┐
//! │ \x93NUMPY    │ major │ minor │ header_len   │ header (ASCII dict)    │
//! │ 6 bytes      │ u8    │ u8    │ u16 LE       │ padded to 64 bytes, \n │
//! └──────────────┴───────┴───────┴──────────────┴────────────────────────┘
//! followed by N * D little-endian values in C (row-major) order.
//! ```
//!
//! Versions 2.0 and 3.0 use a u32 header length. Only 2-D C-order `<f4`
//! and `<f8` arrays are accepted; `<f8` is narrowed to `f32`. Files are
//! always written as version 1.0 `<f4`.

use std::io::Write;

use crate::types::EmbeddingMatrix;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// Why a byte buffer is not a usable matrix.
pub(crate) type DecodeError = String;

/// Writes `matrix` in `.npy` 1.0 format.
pub(crate) fn write_matrix<W: Write>(out: &mut W, matrix: &EmbeddingMatrix) -> std::io::Result<()> {
    let dict = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows(),
        matrix.dimension()
    );
    // magic + version + u16 length + dict + trailing newline, padded with spaces
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    let header_len = dict.len() + padding + 1;
    let header_len = u16::try_from(header_len)
        .map_err(|_| std::io::Error::other("npy header exceeds u16 length"))?;

    out.write_all(MAGIC)?;
    out.write_all(&[1, 0])?;
    out.write_all(&header_len.to_le_bytes())?;
    out.write_all(dict.as_bytes())?;
    out.write_all(&vec![b' '; padding])?;
    out.write_all(b"\n")?;

    let mut body = Vec::with_capacity(matrix.as_slice().len() * 4);
    for value in matrix.as_slice() {
        body.extend_from_slice(&value.to_le_bytes());
    }
    out.write_all(&body)
}

/// Parses a `.npy` buffer into a matrix.
pub(crate) fn read_matrix(bytes: &[u8]) -> Result<EmbeddingMatrix, DecodeError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err("missing .npy magic".to_string());
    }
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => {
            let raw = bytes.get(8..10).ok_or("truncated header length")?;
            (usize::from(u16::from_le_bytes([raw[0], raw[1]])), 10usize)
        }
        2 | 3 => {
            let raw = bytes.get(8..12).ok_or("truncated header length")?;
            let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            (usize::try_from(len).map_err(|_| "header too large")?, 12usize)
        }
        other => return Err(format!("unsupported .npy version {other}")),
    };

    let data_start = header_start
        .checked_add(header_len)
        .ok_or("header length overflow")?;
    let header = bytes
        .get(header_start..data_start)
        .ok_or("truncated header")?;
    let header = std::str::from_utf8(header).map_err(|_| "header is not valid text")?;
    let header = parse_header(header)?;

    let width = match header.descr.as_str() {
        "<f4" => 4,
        "<f8" => 8,
        other => return Err(format!("unsupported dtype '{other}', expected '<f4' or '<f8'")),
    };
    if header.fortran_order {
        return Err("Fortran-ordered arrays are not supported".to_string());
    }
    let (rows, dimension) = match header.shape.as_slice() {
        [rows, dimension] => (*rows, *dimension),
        shape => return Err(format!("expected a 2-D array, got shape {shape:?}")),
    };
    if dimension == 0 {
        return Err("embedding dimension is 0".to_string());
    }

    let body = &bytes[data_start..];
    let expected = rows
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(width))
        .ok_or("shape overflow")?;
    if body.len() != expected {
        return Err(format!(
            "data section is {} bytes, shape ({rows}, {dimension}) needs {expected}",
            body.len()
        ));
    }

    let data: Vec<f32> = if width == 4 {
        body.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    } else {
        body.chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32)
            .collect()
    };

    if data.iter().any(|x| !x.is_finite()) {
        return Err("matrix contains non-finite values".to_string());
    }

    EmbeddingMatrix::from_flat(dimension, data).map_err(|e| e.to_string())
}

#[derive(Debug)]
struct Header {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Parses the Python dict literal numpy writes, e.g.
/// `{'descr': '<f4', 'fortran_order': False, 'shape': (7, 384), }`.
fn parse_header(text: &str) -> Result<Header, DecodeError> {
    let descr = value_after(text, "descr")?;
    let descr = descr
        .strip_prefix('\'')
        .and_then(|s| s.split('\'').next())
        .ok_or("descr is not a quoted string")?
        .to_string();

    let fortran = value_after(text, "fortran_order")?;
    let fortran_order = if fortran.starts_with("False") {
        false
    } else if fortran.starts_with("True") {
        true
    } else {
        return Err("fortran_order is not a boolean".to_string());
    };

    let shape = value_after(text, "shape")?;
    let inner = shape
        .strip_prefix('(')
        .and_then(|s| s.split(')').next())
        .ok_or("shape is not a tuple")?;
    let shape = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| format!("bad shape entry '{s}'")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header {
        descr,
        fortran_order,
        shape,
    })
}

/// Returns the text following `'key':`, with leading whitespace trimmed.
fn value_after<'a>(text: &'a str, key: &str) -> Result<&'a str, DecodeError> {
    let needle = format!("'{key}':");
    let pos = text
        .find(&needle)
        .ok_or_else(|| format!("header has no '{key}' entry"))?;
    Ok(text[pos + needle.len()..].trim_start())
}
