//! Little-endian binary helpers shared by the index blob formats.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{ReelmatchError, Result};

/// Write a 4-byte magic tag followed by a format version.
pub fn write_header<W: Write>(output: &mut W, magic: &[u8; 4], version: u32) -> Result<()> {
    output.write_all(magic)?;
    output.write_u32::<LittleEndian>(version)?;
    Ok(())
}

/// Read and verify a header written with [`write_header`].
pub fn read_header<R: Read>(input: &mut R, magic: &[u8; 4], version: u32) -> Result<()> {
    let mut found = [0u8; 4];
    input.read_exact(&mut found)?;
    if &found != magic {
        return Err(ReelmatchError::index_load(format!(
            "Bad magic: expected {:?}, found {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&found)
        )));
    }

    let found_version = input.read_u32::<LittleEndian>()?;
    if found_version != version {
        return Err(ReelmatchError::index_load(format!(
            "Unsupported format version {found_version} (expected {version})"
        )));
    }
    Ok(())
}

/// Write a length or count as u64.
pub fn write_len<W: Write>(output: &mut W, len: usize) -> Result<()> {
    output.write_u64::<LittleEndian>(len as u64)?;
    Ok(())
}

/// Read a length written with [`write_len`], rejecting values above `max`.
pub fn read_len<R: Read>(input: &mut R, max: usize) -> Result<usize> {
    let len = input.read_u64::<LittleEndian>()?;
    usize::try_from(len)
        .ok()
        .filter(|&len| len <= max)
        .ok_or_else(|| ReelmatchError::index_load(format!("Length {len} exceeds limit {max}")))
}

/// Write a slice of f32 values.
pub fn write_f32s<W: Write>(output: &mut W, values: &[f32]) -> Result<()> {
    for &value in values {
        output.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}

/// Read exactly `count` f32 values.
pub fn read_f32s<R: Read>(input: &mut R, count: usize) -> Result<Vec<f32>> {
    let mut values = vec![0.0f32; count];
    input.read_f32_into::<LittleEndian>(&mut values)?;
    Ok(values)
}

/// CRC32 of a blob, recorded in the manifest and checked on load.
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_header_round_trip() {
        let mut buffer = Vec::new();
        write_header(&mut buffer, b"RMFL", 1).unwrap();
        assert_eq!(buffer.len(), 8);

        let mut input = Cursor::new(&buffer);
        read_header(&mut input, b"RMFL", 1).unwrap();

        let mut input = Cursor::new(&buffer);
        assert!(matches!(
            read_header(&mut input, b"RMFO", 1),
            Err(ReelmatchError::IndexLoad(_))
        ));

        let mut input = Cursor::new(&buffer);
        assert!(read_header(&mut input, b"RMFL", 2).is_err());
    }

    #[test]
    fn test_len_limit() {
        let mut buffer = Vec::new();
        write_len(&mut buffer, 1_000).unwrap();

        assert_eq!(read_len(&mut Cursor::new(&buffer), 1_000).unwrap(), 1_000);
        assert!(read_len(&mut Cursor::new(&buffer), 999).is_err());
    }

    #[test]
    fn test_truncated_floats() {
        let mut buffer = Vec::new();
        write_f32s(&mut buffer, &[1.0, 2.0, 3.0]).unwrap();
        buffer.truncate(10);

        let result = read_f32s(&mut Cursor::new(&buffer), 3);
        assert!(matches!(result, Err(ReelmatchError::Io(_))));
    }

    #[test]
    fn test_checksum_detects_change() {
        let a = checksum(b"abc");
        let b = checksum(b"abd");
        assert_ne!(a, b);
        assert_eq!(a, checksum(b"abc"));
    }
}
