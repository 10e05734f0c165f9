use std::io::Write;
use std::path::Path;

use super::{Matrix, Stack, Val, STACK_SIZE};
use crate::error;
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

// On-disk format (v1):
//   magic[8]     = "MM15STK\0"
//   version u32  = 1
//   endian  u8   = 1 (LE) or 2 (BE), must match the host
//   reserved[3]  = 0
//   count   u32
// then per element a u32 type tag and its payload. All integers and
// doubles are native-endian; the endian byte guards against moving a
// file between hosts that disagree.

const MAGIC: &[u8; 8] = b"MM15STK\0";
const VERSION: u32 = 1;

#[cfg(target_endian = "little")]
const ENDIAN_TAG: u8 = 1;
#[cfg(target_endian = "big")]
const ENDIAN_TAG: u8 = 2;

/// Caps keep a corrupt file from allocating the universe.
const MAX_STRING_BYTES: usize = 1024 * 1024;
pub const MAX_MATRIX_DIM: usize = 20000;

const TAG_REAL: u32 = 0;
const TAG_COMPLEX: u32 = 1;
const TAG_STRING: u32 = 2;
const TAG_MATRIX_REAL: u32 = 3;
const TAG_MATRIX_COMPLEX: u32 = 4;

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_ne_bytes());
}

fn put_f64(buf: &mut Vec<u8>, x: f64) {
    buf.extend_from_slice(&x.to_ne_bytes());
}

fn encode(val: &Val, buf: &mut Vec<u8>) -> Result<()> {
    match val {
        Val::Real(x) => {
            put_u32(buf, TAG_REAL);
            put_f64(buf, *x);
        }
        Val::Complex(re, im) => {
            put_u32(buf, TAG_COMPLEX);
            put_f64(buf, *re);
            put_f64(buf, *im);
        }
        Val::Str(s) => {
            if s.len() > MAX_STRING_BYTES {
                return Err(error!(FormatError;
                    format!("string too large ({} bytes)", s.len())));
            }
            put_u32(buf, TAG_STRING);
            put_u32(buf, s.len() as u32);
            buf.extend_from_slice(s.as_bytes());
        }
        Val::MatrixReal(m) => {
            check_dims(m.rows(), m.cols())?;
            put_u32(buf, TAG_MATRIX_REAL);
            put_u32(buf, m.rows() as u32);
            put_u32(buf, m.cols() as u32);
            for x in m.data() {
                put_f64(buf, *x);
            }
        }
        Val::MatrixComplex(m) => {
            check_dims(m.rows(), m.cols())?;
            put_u32(buf, TAG_MATRIX_COMPLEX);
            put_u32(buf, m.rows() as u32);
            put_u32(buf, m.cols() as u32);
            for (re, im) in m.data() {
                put_f64(buf, *re);
                put_f64(buf, *im);
            }
        }
    }
    Ok(())
}

fn check_dims(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 || rows > MAX_MATRIX_DIM || cols > MAX_MATRIX_DIM {
        Err(error!(FormatError; format!("insane matrix dims {} x {}", rows, cols)))
    } else {
        Ok(())
    }
}

/// Serializes the whole stack, bottom first, then renames a temporary
/// file over the destination. A failed save leaves any previous file at
/// `path` untouched.
pub fn save_stack_to_file(stack: &Stack, path: &str) -> Result<()> {
    let mut buf = Vec::new();
    buf.extend_from_slice(MAGIC);
    put_u32(&mut buf, VERSION);
    buf.push(ENDIAN_TAG);
    buf.extend_from_slice(&[0, 0, 0]);
    put_u32(&mut buf, stack.len() as u32);
    for val in stack.iter() {
        encode(val, &mut buf)?;
    }

    let parent = match Path::new(path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&buf)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::from(e.error))?;
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(error!(FormatError; "truncated stack file"));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_ne_bytes(raw))
    }

    fn f64(&mut self) -> Result<f64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(f64::from_ne_bytes(raw))
    }
}

fn parse(bytes: &[u8]) -> Result<Vec<Val>> {
    let mut r = Reader { bytes, pos: 0 };

    if r.take(MAGIC.len())? != MAGIC {
        return Err(error!(FormatError; "not a stack file (bad magic)"));
    }
    let version = r.u32()?;
    if version != VERSION {
        return Err(error!(FormatError; format!("unsupported version {}", version)));
    }
    let endian = r.u8()?;
    if endian != ENDIAN_TAG {
        return Err(error!(FormatError;
            format!("endian mismatch (file={} host={})", endian, ENDIAN_TAG)));
    }
    r.take(3)?;
    let count = r.u32()? as usize;
    if count > STACK_SIZE {
        return Err(error!(FormatError;
            format!("file stack too large ({} > {})", count, STACK_SIZE)));
    }

    let mut vals = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = r.u32()?;
        let val = match tag {
            TAG_REAL => Val::Real(r.f64()?),
            TAG_COMPLEX => {
                let re = r.f64()?;
                let im = r.f64()?;
                Val::Complex(re, im)
            }
            TAG_STRING => {
                let len = r.u32()? as usize;
                if len > MAX_STRING_BYTES {
                    return Err(error!(FormatError;
                        format!("string length too large ({})", len)));
                }
                let raw = r.take(len)?;
                let s = std::str::from_utf8(raw)
                    .map_err(|_| error!(FormatError; "string is not valid utf-8"))?;
                Val::Str(s.to_string())
            }
            TAG_MATRIX_REAL => {
                let rows = r.u32()? as usize;
                let cols = r.u32()? as usize;
                check_dims(rows, cols)?;
                let mut data = Vec::with_capacity(rows * cols);
                for _ in 0..rows * cols {
                    data.push(r.f64()?);
                }
                Val::MatrixReal(Matrix::new(rows, cols, data)?)
            }
            TAG_MATRIX_COMPLEX => {
                let rows = r.u32()? as usize;
                let cols = r.u32()? as usize;
                check_dims(rows, cols)?;
                let mut data = Vec::with_capacity(rows * cols);
                for _ in 0..rows * cols {
                    let re = r.f64()?;
                    let im = r.f64()?;
                    data.push((re, im));
                }
                Val::MatrixComplex(Matrix::new(rows, cols, data)?)
            }
            tag => return Err(error!(FormatError; format!("unknown element type {}", tag))),
        };
        vals.push(val);
    }
    Ok(vals)
}

/// Replaces the stack with the file's contents. A file that cannot be
/// opened leaves the stack alone; a file that fails to parse clears it.
pub fn load_stack_from_file(stack: &mut Stack, path: &str) -> Result<()> {
    let bytes = std::fs::read(path)?;
    match parse(&bytes) {
        Ok(vals) => {
            stack.clear();
            for val in vals {
                stack.push(val)?;
            }
            Ok(())
        }
        Err(e) => {
            stack.clear();
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ErrorCode;

    fn sample_stack() -> Stack {
        let mut s = Stack::new();
        s.push(Val::Real(-1.25)).unwrap();
        s.push(Val::Complex(3.0, -4.5)).unwrap();
        s.push(Val::Str("hello stack".to_string())).unwrap();
        s.push(Val::MatrixReal(
            Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(),
        ))
        .unwrap();
        s.push(Val::MatrixComplex(
            Matrix::new(1, 2, vec![(1.0, 2.0), (-3.0, 0.5)]).unwrap(),
        ))
        .unwrap();
        s
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.bin");
        let path = path.to_str().unwrap();

        let saved = sample_stack();
        save_stack_to_file(&saved, path).unwrap();

        let mut loaded = Stack::new();
        loaded.push(Val::Real(9.0)).unwrap(); // replaced on load
        load_stack_from_file(&mut loaded, path).unwrap();

        assert_eq!(loaded.len(), saved.len());
        for (a, b) in saved.iter().zip(loaded.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_empty_stack_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        let path = path.to_str().unwrap();

        save_stack_to_file(&Stack::new(), path).unwrap();
        let mut loaded = sample_stack();
        load_stack_from_file(&mut loaded, path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_bad_magic_clears_stack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bin");
        std::fs::write(&path, b"NOTASTACKFILE").unwrap();

        let mut stack = sample_stack();
        let e = load_stack_from_file(&mut stack, path.to_str().unwrap()).unwrap_err();
        assert_eq!(e.code(), ErrorCode::FormatError);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.bin");
        let path = path.to_str().unwrap();

        save_stack_to_file(&sample_stack(), path).unwrap();
        let bytes = std::fs::read(path).unwrap();
        std::fs::write(path, &bytes[..bytes.len() - 5]).unwrap();

        let mut stack = Stack::new();
        let e = load_stack_from_file(&mut stack, path).unwrap_err();
        assert_eq!(e.code(), ErrorCode::FormatError);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.bin");
        let path = path.to_str().unwrap();

        save_stack_to_file(&sample_stack(), path).unwrap();
        let mut bytes = std::fs::read(path).unwrap();
        bytes[8] = 99; // version field follows the magic
        std::fs::write(path, &bytes).unwrap();

        let mut stack = Stack::new();
        let e = load_stack_from_file(&mut stack, path).unwrap_err();
        assert_eq!(e.code(), ErrorCode::FormatError);
    }

    #[test]
    fn test_foreign_endian_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.bin");
        let path = path.to_str().unwrap();

        save_stack_to_file(&sample_stack(), path).unwrap();
        let mut bytes = std::fs::read(path).unwrap();
        bytes[12] = if ENDIAN_TAG == 1 { 2 } else { 1 };
        std::fs::write(path, &bytes).unwrap();

        let mut stack = Stack::new();
        let e = load_stack_from_file(&mut stack, path).unwrap_err();
        assert_eq!(e.code(), ErrorCode::FormatError);
    }

    #[test]
    fn test_failed_save_leaves_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.bin");
        let path = path.to_str().unwrap();

        save_stack_to_file(&sample_stack(), path).unwrap();
        let before = std::fs::read(path).unwrap();

        let mut oversized = Stack::new();
        oversized
            .push(Val::Str("x".repeat(MAX_STRING_BYTES + 1)))
            .unwrap();
        assert!(save_stack_to_file(&oversized, path).is_err());
        assert_eq!(std::fs::read(path).unwrap(), before);
    }

    #[test]
    fn test_missing_file_leaves_stack() {
        let mut stack = sample_stack();
        let e = load_stack_from_file(&mut stack, "/nonexistent/stack.bin").unwrap_err();
        assert_eq!(e.code(), ErrorCode::IoError);
        assert_eq!(stack.len(), 5);
    }
}
