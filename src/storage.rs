//! Snapshot framing for on-disk state.
//!
//! Layout:
//! - magic: `RFLX0001`
//! - version: u32
//! - uncompressed_len: u32
//! - LZ4-compressed JSON payload
//!
//! The JSON inside stays schema-flexible (serde defaults absorb missing
//! fields); the frame pins byte-level identity and catches truncation early.

use std::io::{self, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub const MAGIC: &[u8; 8] = b"RFLX0001";
pub const VERSION_V1: u32 = 1;
pub const VERSION_CURRENT: u32 = VERSION_V1;

pub fn compress_lz4(input: &[u8]) -> Vec<u8> {
    lz4_flex::compress(input)
}

pub fn decompress_lz4(input: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
    // Strict format: raw LZ4 block with external expected size.
    lz4_flex::decompress(input, expected_size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "lz4 decompression failed"))
}

fn write_u32_le<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn write_snapshot<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let payload = serde_json::to_vec(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    let uncompressed_len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "snapshot too large"))?;
    let compressed = compress_lz4(&payload);

    w.write_all(MAGIC)?;
    write_u32_le(w, VERSION_CURRENT)?;
    write_u32_le(w, uncompressed_len)?;
    w.write_all(&compressed)?;
    w.flush()
}

pub fn read_snapshot<R: Read, T: DeserializeOwned>(r: &mut R) -> io::Result<T> {
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a reflex snapshot (bad magic)",
        ));
    }

    let version = read_u32_le(r)?;
    if version != VERSION_CURRENT {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported snapshot version {version}"),
        ));
    }

    let uncompressed_len = read_u32_le(r)? as usize;
    let mut compressed = Vec::new();
    r.read_to_end(&mut compressed)?;
    let payload = decompress_lz4(&compressed, uncompressed_len)?;

    serde_json::from_slice(&payload)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{TestKind, TestResult};

    #[test]
    fn snapshot_round_trips() {
        let mut results = vec![TestResult::new("id1".into(), TestKind::ColorChange, 42)];
        results[0].average_time = Some(231.5);
        results[0].total_clicks = Some(5);

        let mut buf = Vec::new();
        write_snapshot(&mut buf, &results).unwrap();
        assert_eq!(&buf[..8], MAGIC);

        let back: Vec<TestResult> = read_snapshot(&mut buf.as_slice()).unwrap();
        assert_eq!(back, results);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &Vec::<TestResult>::new()).unwrap();
        buf[0] = b'X';
        let err = read_snapshot::<_, Vec<TestResult>>(&mut buf.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &vec![TestResult::new("x".into(), TestKind::NumberFlash, 7)])
            .unwrap();
        buf.truncate(buf.len() - 3);
        assert!(read_snapshot::<_, Vec<TestResult>>(&mut buf.as_slice()).is_err());
    }
}
