//! Fixture builders shared by the unit tests.


use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};

pub use elf::{ElfBuilder, SectionSpec};
pub use wasm::{uleb128, WasmBuilder};

/// Wrap `payload` in the `ZLIB` envelope, declaring `declared_size` as its inflated length.
pub fn zlib_envelope(payload: &[u8], declared_size: u64) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut out = b"ZLIB".to_vec();
    out.extend_from_slice(&declared_size.to_be_bytes());
    out.extend_from_slice(&compressed);
    out
}
