//! Magic identifiers and length-prefixed framing.
//!
//! Both container formats start with a fixed magic identifier followed by a
//! 4-byte little-endian header length and the header blob. Wall journal
//! records reuse the same length prefix.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use recon_core::{Error, Result};
use std::io::{ErrorKind, Read, Write};

/// Size of a length prefix in bytes
pub const LEN_PREFIX_SIZE: usize = 4;

/// Sanity limit for a single header or journal record
pub const MAX_RECORD_SIZE: usize = 256 * 1024 * 1024;

/// Read and verify a magic identifier.
///
/// Fails with `Format` if the leading bytes differ or the source is shorter
/// than the identifier.
pub fn read_magic<R: Read>(reader: &mut R, magic: &[u8]) -> Result<()> {
    let mut found = vec![0u8; magic.len()];
    reader.read_exact(&mut found).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::Format(format!(
            "file too short for identifier {}",
            String::from_utf8_lossy(magic)
        )),
        _ => Error::Io(e),
    })?;
    if found != magic {
        return Err(Error::Format(format!(
            "expected identifier {:?}, found {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&found)
        )));
    }
    Ok(())
}

/// Write a 4-byte length prefix.
pub fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| Error::Serialization(format!("length {} does not fit in 4 bytes", len)))?;
    writer.write_u32::<LittleEndian>(len)?;
    Ok(())
}

/// Read a 4-byte length prefix that must be present.
pub fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    match reader.read_u32::<LittleEndian>() {
        Ok(len) => Ok(len as usize),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            Err(Error::malformed("premature end of file in length prefix"))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Read a length prefix at a record boundary.
///
/// Returns `Ok(None)` on a clean end of file and `MalformedData` if the
/// file ends inside the prefix.
pub fn read_len_or_eof<R: Read>(reader: &mut R) -> Result<Option<usize>> {
    let mut buf = [0u8; LEN_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LEN_PREFIX_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    match filled {
        0 => Ok(None),
        LEN_PREFIX_SIZE => Ok(Some(LittleEndian::read_u32(&buf) as usize)),
        n => Err(Error::malformed(format!(
            "premature end of file: {} of {} length bytes",
            n, LEN_PREFIX_SIZE
        ))),
    }
}

/// Read exactly `len` bytes, reporting truncation as `MalformedData`.
pub fn read_exact_vec<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    if len > MAX_RECORD_SIZE {
        return Err(Error::malformed(format!(
            "record length {} exceeds maximum {}",
            len, MAX_RECORD_SIZE
        )));
    }
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            Error::malformed(format!("premature end of file reading {} bytes", len))
        }
        _ => Error::Io(e),
    })?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_empty_source_is_clean_eof() {
        let mut src = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_len_or_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn test_partial_length_prefix_is_malformed() {
        for partial in [&b"\x00"[..], b"\x00\x00", b"\x00\x00\x00"] {
            let mut src = Cursor::new(partial.to_vec());
            assert!(matches!(
                read_len_or_eof(&mut src),
                Err(Error::MalformedData(_))
            ));
        }
    }

    #[test]
    fn test_short_body_is_malformed() {
        let mut src = Cursor::new(b"\x08\x00\x00\x00\x01\x00".to_vec());
        let len = read_len_or_eof(&mut src).unwrap().unwrap();
        assert_eq!(len, 8);
        assert!(matches!(
            read_exact_vec(&mut src, len),
            Err(Error::MalformedData(_))
        ));
    }

    #[test]
    fn test_len_roundtrip_little_endian() {
        let mut buf = Vec::new();
        write_len(&mut buf, 0x0102).unwrap();
        assert_eq!(buf, vec![0x02, 0x01, 0x00, 0x00]);
        assert_eq!(read_len(&mut Cursor::new(buf)).unwrap(), 0x0102);
    }

    #[test]
    fn test_magic_mismatch_is_format_error() {
        let mut src = Cursor::new(b"recon:wall:v01....".to_vec());
        assert!(matches!(
            read_magic(&mut src, b"recon:meld:v2"),
            Err(Error::Format(_))
        ));
        let mut short = Cursor::new(b"rec".to_vec());
        assert!(matches!(
            read_magic(&mut short, b"recon:meld:v2"),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_oversized_record_rejected() {
        let mut src = Cursor::new(Vec::<u8>::new());
        assert!(matches!(
            read_exact_vec(&mut src, MAX_RECORD_SIZE + 1),
            Err(Error::MalformedData(_))
        ));
    }
}
