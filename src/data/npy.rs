//! Reader and writer for NumPy `.npy` files.
//!
//! Layout: `\x93NUMPY`, major/minor version bytes, a little-endian header
//! length (`u16` for v1, `u32` for v2/v3), an ASCII Python dict literal with
//! `descr`, `fortran_order` and `shape`, then the raw element data.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::Path;
use std::sync::OnceLock;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use regex::Regex;

use super::model::NumericArray;
use crate::error::{AlfError, Result};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Float,
    Int,
    Uint,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    big_endian: bool,
    kind: Kind,
    size: usize,
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

struct HeaderPatterns {
    descr: Regex,
    fortran_order: Regex,
    shape: Regex,
}

fn header_patterns() -> &'static HeaderPatterns {
    static PATTERNS: OnceLock<HeaderPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HeaderPatterns {
        descr: Regex::new(r"'descr'\s*:\s*'([^']*)'").expect("descr pattern is valid"),
        fortran_order: Regex::new(r"'fortran_order'\s*:\s*(True|False)")
            .expect("fortran_order pattern is valid"),
        shape: Regex::new(r"'shape'\s*:\s*\(([^)]*)\)").expect("shape pattern is valid"),
    })
}

fn parse_dtype(descr: &str) -> std::result::Result<Dtype, String> {
    let mut chars = descr.chars();
    let order = chars.next().ok_or("empty dtype")?;
    let big_endian = match order {
        '<' | '|' | '=' => false,
        '>' => true,
        _ => return Err(format!("unsupported dtype '{descr}'")),
    };
    let kind = match chars.next() {
        Some('f') => Kind::Float,
        Some('i') => Kind::Int,
        Some('u') => Kind::Uint,
        Some('b') => Kind::Bool,
        _ => return Err(format!("unsupported dtype '{descr}'")),
    };
    let size: usize = chars
        .as_str()
        .parse()
        .map_err(|_| format!("unsupported dtype '{descr}'"))?;

    let supported = match kind {
        Kind::Float => matches!(size, 4 | 8),
        Kind::Int | Kind::Uint => matches!(size, 1 | 2 | 4 | 8),
        Kind::Bool => size == 1,
    };
    if !supported {
        return Err(format!("unsupported dtype '{descr}'"));
    }
    Ok(Dtype {
        big_endian,
        kind,
        size,
    })
}

fn parse_header(text: &str) -> std::result::Result<Header, String> {
    let patterns = header_patterns();
    let descr = patterns
        .descr
        .captures(text)
        .ok_or("header has no 'descr'")?;
    let fortran = patterns
        .fortran_order
        .captures(text)
        .ok_or("header has no 'fortran_order'")?;
    let shape = patterns
        .shape
        .captures(text)
        .ok_or("header has no 'shape'")?;

    let shape = shape[1]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| format!("bad shape entry '{s}'")))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Header {
        dtype: parse_dtype(&descr[1])?,
        fortran_order: &fortran[1] == "True",
        shape,
    })
}

fn read_elements<B: ByteOrder, R: Read>(
    data: &mut R,
    dtype: Dtype,
    count: usize,
) -> io::Result<Vec<f64>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let v = match (dtype.kind, dtype.size) {
            (Kind::Float, 4) => data.read_f32::<B>()? as f64,
            (Kind::Float, _) => data.read_f64::<B>()?,
            (Kind::Int, 1) => data.read_i8()? as f64,
            (Kind::Int, 2) => data.read_i16::<B>()? as f64,
            (Kind::Int, 4) => data.read_i32::<B>()? as f64,
            (Kind::Int, _) => data.read_i64::<B>()? as f64,
            (Kind::Uint, 1) => data.read_u8()? as f64,
            (Kind::Uint, 2) => data.read_u16::<B>()? as f64,
            (Kind::Uint, 4) => data.read_u32::<B>()? as f64,
            (Kind::Uint, _) => data.read_u64::<B>()? as f64,
            (Kind::Bool, _) => {
                if data.read_u8()? != 0 {
                    1.0
                } else {
                    0.0
                }
            }
        };
        values.push(v);
    }
    Ok(values)
}

/// Reorder column-major values into row-major order for `shape`.
fn fortran_to_c(shape: &[usize], values: Vec<f64>) -> Vec<f64> {
    if shape.len() < 2 {
        return values;
    }
    let mut strides = vec![1usize; shape.len()];
    for k in 1..shape.len() {
        strides[k] = strides[k - 1] * shape[k - 1];
    }
    let mut index = vec![0usize; shape.len()];
    let mut out = Vec::with_capacity(values.len());
    for _ in 0..values.len() {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(values[offset]);
        // Advance the row-major multi-index.
        for k in (0..shape.len()).rev() {
            index[k] += 1;
            if index[k] < shape[k] {
                break;
            }
            index[k] = 0;
        }
    }
    out
}

/// Decode an in-memory `.npy` image.
pub fn decode(bytes: &[u8]) -> std::result::Result<NumericArray, String> {
    let mut cursor = Cursor::new(bytes);

    let mut magic = [0u8; 6];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| "file too short for NPY magic")?;
    if &magic != MAGIC {
        return Err("missing NPY magic string".to_string());
    }
    let major = cursor.read_u8().map_err(|e| e.to_string())?;
    let _minor = cursor.read_u8().map_err(|e| e.to_string())?;
    let header_len = match major {
        1 => cursor.read_u16::<LittleEndian>().map_err(|e| e.to_string())? as usize,
        2 | 3 => cursor.read_u32::<LittleEndian>().map_err(|e| e.to_string())? as usize,
        other => return Err(format!("unsupported NPY version {other}")),
    };

    let start = cursor.position() as usize;
    let header = bytes
        .get(start..)
        .and_then(|rest| rest.get(..header_len))
        .ok_or("truncated NPY header")?;
    cursor.set_position((start + header_len) as u64);
    let header = parse_header(&String::from_utf8_lossy(header))?;

    let count = header
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| format!("shape {:?} is too large", header.shape))?;
    let needed = count
        .checked_mul(header.dtype.size)
        .ok_or_else(|| format!("shape {:?} is too large", header.shape))?;
    let remaining = bytes.len() - cursor.position() as usize;
    if remaining < needed {
        return Err(format!("expected {needed} bytes of data, found {remaining}"));
    }

    let values = if header.dtype.big_endian {
        read_elements::<BigEndian, _>(&mut cursor, header.dtype, count)
    } else {
        read_elements::<LittleEndian, _>(&mut cursor, header.dtype, count)
    }
    .map_err(|e| e.to_string())?;

    let values = if header.fortran_order {
        fortran_to_c(&header.shape, values)
    } else {
        values
    };

    NumericArray::new(header.shape, values).ok_or_else(|| "shape does not match data".to_string())
}

/// Load an `.npy` file from disk.
pub fn read_npy(path: &Path) -> Result<NumericArray> {
    let bytes = std::fs::read(path)?;
    decode(&bytes).map_err(|reason| AlfError::malformed(path.display().to_string(), reason))
}

fn shape_literal(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Write `array` as a version 1.0 little-endian `f8` image.
pub fn write_to<W: Write>(writer: &mut W, array: &NumericArray) -> io::Result<()> {
    let mut dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        shape_literal(&array.shape)
    );
    // magic + version + u16 length + dict + trailing newline
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.extend(std::iter::repeat(' ').take(padding));
    dict.push('\n');

    let header_len = u16::try_from(dict.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NPY header too long"))?;

    writer.write_all(MAGIC)?;
    writer.write_u8(1)?;
    writer.write_u8(0)?;
    writer.write_u16::<LittleEndian>(header_len)?;
    writer.write_all(dict.as_bytes())?;
    for &v in &array.values {
        writer.write_f64::<LittleEndian>(v)?;
    }
    Ok(())
}

/// Write `array` to `path` as an `.npy` file.
pub fn write_npy(path: &Path, array: &NumericArray) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(&mut writer, array)?;
    writer.flush()?;
    Ok(())
}
