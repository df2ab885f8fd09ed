//! LUN slot allocation
//!
//! LUN numbers are a single shared pool across all volumes and initiators
//! known to the daemon, so allocation works on the full export table and
//! is recomputed from a fresh snapshot on every call. Two concurrent
//! provisions can still race on the same free slot; the daemon's export
//! table is authoritative but not allocation-safe.

use crate::backends::block::IscsiExport;
use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Size of the LUN namespace; valid slots are `0..255`.
const MAX_LUNS: usize = 255;

/// Find the lowest free LUN in the daemon's export table.
///
/// One volume exported to many initiators repeats the same LUN, so slot
/// computation runs on the deduplicated set of used values: the first
/// position in the sorted unique list whose index is below the value
/// there is a gap, otherwise the next value after the highest.
pub fn first_available_lun(exports: &[IscsiExport]) -> Result<u32> {
    let used: BTreeSet<u32> = exports.iter().map(|export| export.lun).collect();

    if used.len() >= MAX_LUNS {
        return Err(Error::NoFreeLun);
    }

    for (position, &lun) in used.iter().enumerate() {
        if (position as u32) < lun {
            return Ok(position as u32);
        }
    }
    Ok(used.len() as u32)
}
