//! `.zdebug` section decompression.
//!
//! A compressed debug section carries a 12-byte envelope followed by a zlib stream:
//!
//! | Offset | Size | Contents                                   |
//! |--------|------|--------------------------------------------|
//! | 0      | 4    | The literal tag `ZLIB`                     |
//! | 4      | 8    | Uncompressed size, big-endian              |
//! | 12     | ..   | zlib stream (RFC 1950 header + deflate)    |
//!
//! The stream is inflated one page of input at a time. The result must match the declared
//! size exactly; a short or long stream is an error and no partial output is returned.

use flate2::{Decompress, FlushDecompress, Status};
use tracing::debug;

use crate::{dwarf::DebugSectionDescriptor, file::io::read_be_at, LoadOptions, Result};

/// Input chunk size fed to the inflater per step.
pub const PAGE_SIZE: usize = 4096;

/// Tag opening every compressed debug section.
pub const ZLIB_TAG: &[u8; 4] = b"ZLIB";

const ENVELOPE_SIZE: usize = 12;

/// Inflate a compressed debug section.
///
/// Returns a new descriptor with the same name, offset and address, holding the
/// decompressed bytes and their size.
///
/// # Errors
/// Returns [`crate::Error::Decompression`] if the envelope is too short, the tag is not
/// `ZLIB`, the stream is corrupt, or the inflated length differs from the declared size.
/// Returns [`crate::Error::LimitExceeded`] if the declared size exceeds
/// `options.max_section_size`.
pub fn decompress(
    section: &DebugSectionDescriptor,
    options: &LoadOptions,
) -> Result<DebugSectionDescriptor> {
    let data = section.data.as_slice();
    if data.len() <= ENVELOPE_SIZE {
        return Err(decompression_error!(
            "Unsupported compressed section {}: {} bytes cannot hold a ZLIB envelope",
            section.name,
            data.len()
        ));
    }
    if &data[..ZLIB_TAG.len()] != ZLIB_TAG {
        return Err(decompression_error!(
            "Invalid compression type in {}",
            section.name
        ));
    }

    let mut offset = ZLIB_TAG.len();
    let declared = read_be_at::<u64>(data, &mut offset)?;
    options.check_section_size(declared)?;

    let limit = usize::try_from(declared)
        .ok()
        .and_then(|size| size.checked_add(1))
        .ok_or_else(|| out_of_bounds_error!())?;

    let mut inflater = Decompress::new(true);
    let mut output = Vec::new();
    let mut finished = false;

    for chunk in data[ENVELOPE_SIZE..].chunks(PAGE_SIZE) {
        finished = inflate(
            &mut inflater,
            chunk,
            &mut output,
            limit,
            FlushDecompress::None,
            &section.name,
        )?;
        if finished {
            break;
        }
    }
    if !finished {
        inflate(
            &mut inflater,
            &[],
            &mut output,
            limit,
            FlushDecompress::Finish,
            &section.name,
        )?;
    }

    if output.len() as u64 != declared {
        return Err(decompression_error!(
            "Wrong uncompressed size in {}: expected {}, got {}{}",
            section.name,
            declared,
            output.len(),
            if output.len() >= limit { " or more" } else { "" }
        ));
    }

    debug!(
        section = %section.name,
        compressed = data.len(),
        decompressed = output.len(),
        "decompressed debug section"
    );

    Ok(DebugSectionDescriptor {
        name: section.name.clone(),
        size: declared,
        data: output,
        global_offset: section.global_offset,
        address: section.address,
    })
}

/// Feed `input` to the inflater, growing `output` page by page up to `limit` bytes.
///
/// Returns `true` once the end of the zlib stream has been reached.
fn inflate(
    inflater: &mut Decompress,
    mut input: &[u8],
    output: &mut Vec<u8>,
    limit: usize,
    flush: FlushDecompress,
    name: &str,
) -> Result<bool> {
    loop {
        if output.len() == output.capacity() {
            if output.len() >= limit {
                return Ok(false);
            }
            output.reserve_exact(PAGE_SIZE.min(limit - output.len()));
        }

        let consumed_before = inflater.total_in();
        let produced_before = output.len();
        let status = inflater
            .decompress_vec(input, output, flush)
            .map_err(|e| decompression_error!("Invalid zlib stream in {}: {}", name, e))?;

        let consumed = usize::try_from(inflater.total_in() - consumed_before)
            .map_err(|_| out_of_bounds_error!())?;
        input = &input[consumed..];
        let progressed = consumed > 0 || output.len() > produced_before;
        let has_room = output.len() < output.capacity();

        match status {
            Status::StreamEnd => return Ok(true),
            _ if input.is_empty() && has_room => return Ok(false),
            Status::BufError if !progressed && has_room => return Ok(false),
            _ => {}
        }
    }
}
