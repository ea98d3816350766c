//! Batching: area grouping and span merging.
//!
//! Pure planning logic used by [`crate::request`]. Nothing here touches a
//! transport.
//!
//! - [`partition`] groups addresses by memory area (one group per data block),
//!   keeping each address's position in the caller's list.
//! - [`AreaGroup::spans`] merges a group's byte-sorted addresses into
//!   [`CombinedSpan`]s, each of which is written with a single transport call.
//!
//! A sorted address joins the running span when it starts no more than one
//! byte past the span's end, so touching, overlapping and one-byte-gapped
//! ranges merge.
//!
//! # Example
//!
//! ```
//! use s7_access::batch::partition;
//! use s7_access::parse_address;
//!
//! let addrs = ["DB1,DINT0", "M0.1", "DB1,INT4", "DB1,REAL24"]
//!     .iter()
//!     .map(|s| parse_address(s))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let groups = partition(&addrs);
//! assert_eq!(groups.len(), 2);
//!
//! let spans = groups[0].spans(&addrs);
//! let bounds: Vec<_> = spans.iter().map(|s| s.bounds()).collect();
//! assert_eq!(bounds, vec![(0, 6), (24, 28)]);
//! # Ok::<(), s7_access::S7Error>(())
//! ```

use std::collections::BTreeMap;

use crate::address::{bounds_of, Address};
use crate::area::Area;

/// Addresses of one memory area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaGroup {
    area: Area,
    indices: Vec<usize>,
    sorted: Vec<usize>,
}

impl AreaGroup {
    /// Area shared by every member.
    pub fn area(&self) -> Area {
        self.area
    }

    /// Member positions in the caller's list, in caller order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Member positions ordered by byte offset.
    pub fn sorted(&self) -> &[usize] {
        &self.sorted
    }

    /// `(start, end)` byte bounds over all members.
    ///
    /// `addresses` must be the list this group was partitioned from.
    pub fn bounds(&self, addresses: &[Address]) -> (u32, u32) {
        bounds_of(self.indices.iter().map(|&i| &addresses[i])).unwrap_or((0, 0))
    }

    /// Merges members into write spans, in byte order.
    ///
    /// `addresses` must be the list this group was partitioned from.
    pub fn spans(&self, addresses: &[Address]) -> Vec<CombinedSpan> {
        combine_spans(addresses, &self.sorted)
    }
}

/// Contiguous byte range covering one or more addresses of one area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedSpan {
    start: u32,
    end: u32,
    members: Vec<usize>,
}

impl CombinedSpan {
    /// First byte.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// One past the last byte.
    pub fn end(&self) -> u32 {
        self.end
    }

    /// `(start, end)`.
    pub fn bounds(&self) -> (u32, u32) {
        (self.start, self.end)
    }

    /// Span length in bytes.
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    /// Returns `true` for a zero-length span.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Member positions in the caller's list, in byte order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Returns `true` if some span byte belongs to no member.
    pub fn has_gap(&self, addresses: &[Address]) -> bool {
        let mut covered = self.start;
        for &i in &self.members {
            let addr = &addresses[i];
            if addr.byte_index() > covered {
                return true;
            }
            covered = covered.max(addr.end());
        }
        covered < self.end
    }

    /// Returns `true` if any member is a bit address.
    pub fn has_bits(&self, addresses: &[Address]) -> bool {
        self.members
            .iter()
            .any(|&i| addresses[i].data_type().is_bit())
    }
}

/// Groups addresses by area, data blocks by number.
///
/// Groups come out in a stable order (data blocks by number, then `M`, `I`,
/// `Q`).
pub fn partition(addresses: &[Address]) -> Vec<AreaGroup> {
    let mut by_area: BTreeMap<Area, Vec<usize>> = BTreeMap::new();
    for (index, addr) in addresses.iter().enumerate() {
        by_area.entry(addr.area()).or_default().push(index);
    }

    by_area
        .into_iter()
        .map(|(area, indices)| {
            let mut sorted = indices.clone();
            sorted.sort_by_key(|&i| addresses[i].byte_index());
            AreaGroup {
                area,
                indices,
                sorted,
            }
        })
        .collect()
}

/// Merges byte-sorted addresses into spans.
///
/// `sorted` lists positions in `addresses`, ordered by byte offset.
pub fn combine_spans(addresses: &[Address], sorted: &[usize]) -> Vec<CombinedSpan> {
    let mut spans: Vec<CombinedSpan> = Vec::new();
    for &index in sorted {
        let addr = &addresses[index];
        match spans.last_mut() {
            Some(span) if addr.byte_index() <= span.end.saturating_add(1) => {
                span.end = span.end.max(addr.end());
                span.members.push(index);
            }
            _ => spans.push(CombinedSpan {
                start: addr.byte_index(),
                end: addr.end(),
                members: vec![index],
            }),
        }
    }
    spans
}
