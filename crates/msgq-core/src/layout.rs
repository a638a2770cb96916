//! Persisted field layout.
//!
//! The host serializes a message object field by field:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  FieldHeader (16 bytes)                                    │
//! │    field: i64   - field id                                 │
//! │    count: u64   - number of entries that follow            │
//! ├────────────────────────────────────────────────────────────┤
//! │  VectorEntry × count (24 bytes each, ascending version)    │
//! └────────────────────────────────────────────────────────────┘
//!   ... repeated for every field, in table order
//! ```
//!
//! All integers are little-endian.

use bytemuck::{Pod, Zeroable};

use crate::{FieldId, entry::VectorEntry, error::LayoutError, table::FieldTable};

/// The layout writes structs directly, so it is only defined for little-endian targets.
const _: () = {
    #[cfg(not(target_endian = "little"))]
    compile_error!("msgq-core only supports little-endian architectures");
};

const HEADER_SIZE: usize = std::mem::size_of::<FieldHeader>();
const ENTRY_SIZE: usize = std::mem::size_of::<VectorEntry>();

/// Prefix of each field in the persisted layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
struct FieldHeader {
    field: FieldId,
    count: u64,
}

/// Entries of one field, oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSnapshot {
    /// Field id.
    pub field: FieldId,
    /// Entries in ascending version order.
    pub entries: Vec<VectorEntry>,
}

/// Write every field of `table` in table order.
#[must_use]
pub fn encode_fields(table: &FieldTable) -> Vec<u8> {
    let mut out = Vec::with_capacity(table.len() * HEADER_SIZE + table.total_len() * ENTRY_SIZE);
    for (field, queue) in table.iter() {
        let header = FieldHeader {
            field,
            count: queue.len() as u64,
        };
        out.extend_from_slice(bytemuck::bytes_of(&header));
        for entry in queue.iter() {
            out.extend_from_slice(bytemuck::bytes_of(entry));
        }
    }
    out
}

/// Read fields written by [`encode_fields`].
pub fn decode_fields(bytes: &[u8]) -> Result<Vec<FieldSnapshot>, LayoutError> {
    let mut snapshots = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let header_bytes = bytes
            .get(offset..offset + HEADER_SIZE)
            .ok_or(LayoutError::TruncatedHeader { offset })?;
        let header: FieldHeader = bytemuck::pod_read_unaligned(header_bytes);
        offset += HEADER_SIZE;

        let truncated = LayoutError::TruncatedEntries {
            field: header.field,
            count: header.count,
            offset,
        };
        let body_len = usize::try_from(header.count)
            .ok()
            .and_then(|count| count.checked_mul(ENTRY_SIZE))
            .ok_or_else(|| truncated.clone())?;
        let body = bytes
            .get(offset..offset.saturating_add(body_len))
            .ok_or(truncated)?;
        offset += body_len;

        snapshots.push(FieldSnapshot {
            field: header.field,
            entries: body
                .chunks_exact(ENTRY_SIZE)
                .map(bytemuck::pod_read_unaligned)
                .collect(),
        });
    }

    Ok(snapshots)
}
