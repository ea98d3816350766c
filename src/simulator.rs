//! In-memory controller for tests and demos.
//!
//! [`MemoryPlc`] implements [`Transport`] over plain byte vectors, one per
//! configured area. It can inject failures, short reads and per-area latency,
//! and it records every call so tests can assert how a request was batched.
//!
//! # Example
//!
//! ```
//! use s7_access::simulator::MemoryPlc;
//! use s7_access::{Area, Transport};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let plc = MemoryPlc::new().with_area(Area::DataBlock(1), 16);
//! plc.write_area(Area::DataBlock(1), 2, &[0xAB]).await?;
//! assert_eq!(plc.read_area(Area::DataBlock(1), 2, 1).await?, vec![0xAB]);
//! assert_eq!(plc.calls().len(), 2);
//! # Ok::<(), s7_access::TransportError>(())
//! # }).unwrap();
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::area::Area;
use crate::transport::{Transport, TransportError};

/// One recorded transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    /// `read_area(area, start, len)`.
    Read {
        /// Area read.
        area: Area,
        /// First byte.
        start: u32,
        /// Byte count.
        len: usize,
    },
    /// `write_area(area, start, data)` with `data.len() == len`.
    Write {
        /// Area written.
        area: Area,
        /// First byte.
        start: u32,
        /// Byte count.
        len: usize,
    },
}

/// Simulated controller memory.
#[derive(Debug, Default)]
pub struct MemoryPlc {
    areas: Mutex<HashMap<Area, Vec<u8>>>,
    failing_reads: HashSet<Area>,
    failing_writes: HashSet<Area>,
    short_reads: HashSet<Area>,
    latency: HashMap<Area, Duration>,
    calls: Mutex<Vec<Call>>,
}

impl MemoryPlc {
    /// Creates a controller with no areas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zero-filled area of `size` bytes.
    pub fn with_area(self, area: Area, size: usize) -> Self {
        self.with_area_bytes(area, vec![0; size])
    }

    /// Adds an area with the given content.
    pub fn with_area_bytes(self, area: Area, bytes: Vec<u8>) -> Self {
        lock(&self.areas).insert(area, bytes);
        self
    }

    /// Makes every read of `area` fail with a rejection.
    pub fn fail_reads(mut self, area: Area) -> Self {
        self.failing_reads.insert(area);
        self
    }

    /// Makes every write to `area` fail with a rejection.
    pub fn fail_writes(mut self, area: Area) -> Self {
        self.failing_writes.insert(area);
        self
    }

    /// Makes reads of `area` return one byte less than requested.
    pub fn short_reads(mut self, area: Area) -> Self {
        self.short_reads.insert(area);
        self
    }

    /// Delays every call touching `area`.
    pub fn with_latency(mut self, area: Area, delay: Duration) -> Self {
        self.latency.insert(area, delay);
        self
    }

    /// Snapshot of an area's content.
    pub fn bytes(&self, area: Area) -> Option<Vec<u8>> {
        lock(&self.areas).get(&area).cloned()
    }

    /// Overwrites part of an area directly, bypassing the call log.
    pub fn poke(&self, area: Area, start: usize, data: &[u8]) -> Result<(), TransportError> {
        let mut areas = lock(&self.areas);
        let range = checked_range(&areas, area, start as u32, data.len())?;
        if let Some(mem) = areas.get_mut(&area) {
            mem[range].copy_from_slice(data);
        }
        Ok(())
    }

    /// All calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    async fn delay(&self, area: Area) {
        if let Some(delay) = self.latency.get(&area) {
            tokio::time::sleep(*delay).await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn checked_range(
    areas: &HashMap<Area, Vec<u8>>,
    area: Area,
    start: u32,
    len: usize,
) -> Result<std::ops::Range<usize>, TransportError> {
    let out_of_range = || TransportError::OutOfRange { area, start, len };
    let mem = areas.get(&area).ok_or_else(out_of_range)?;
    let begin = start as usize;
    let end = begin.checked_add(len).ok_or_else(out_of_range)?;
    if end > mem.len() {
        return Err(out_of_range());
    }
    Ok(begin..end)
}

#[async_trait]
impl Transport for MemoryPlc {
    async fn read_area(
        &self,
        area: Area,
        start: u32,
        len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        lock(&self.calls).push(Call::Read { area, start, len });
        self.delay(area).await;
        if self.failing_reads.contains(&area) {
            return Err(TransportError::rejected(format!("read of {} refused", area)));
        }

        let areas = lock(&self.areas);
        let range = checked_range(&areas, area, start, len)?;
        let mut data = areas.get(&area).map(|mem| mem[range].to_vec()).unwrap_or_default();
        if self.short_reads.contains(&area) {
            data.pop();
        }
        Ok(data)
    }

    async fn write_area(&self, area: Area, start: u32, data: &[u8]) -> Result<(), TransportError> {
        lock(&self.calls).push(Call::Write {
            area,
            start,
            len: data.len(),
        });
        self.delay(area).await;
        if self.failing_writes.contains(&area) {
            return Err(TransportError::rejected(format!("write of {} refused", area)));
        }

        let mut areas = lock(&self.areas);
        let range = checked_range(&areas, area, start, data.len())?;
        if let Some(mem) = areas.get_mut(&area) {
            mem[range].copy_from_slice(data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write() {
        let plc = MemoryPlc::new().with_area(Area::Marker, 8);
        plc.write_area(Area::Marker, 4, &[1, 2, 3]).await.unwrap();
        assert_eq!(plc.read_area(Area::Marker, 3, 3).await.unwrap(), vec![0, 1, 2]);
        assert_eq!(plc.bytes(Area::Marker).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 0]);
        assert_eq!(
            plc.calls(),
            vec![
                Call::Write {
                    area: Area::Marker,
                    start: 4,
                    len: 3,
                },
                Call::Read {
                    area: Area::Marker,
                    start: 3,
                    len: 3,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_range() {
        let plc = MemoryPlc::new().with_area(Area::DataBlock(1), 4);
        assert!(matches!(
            plc.read_area(Area::DataBlock(1), 2, 4).await,
            Err(TransportError::OutOfRange { .. })
        ));
        assert!(matches!(
            plc.read_area(Area::DataBlock(2), 0, 1).await,
            Err(TransportError::OutOfRange { .. })
        ));
        assert!(plc.poke(Area::DataBlock(1), 3, &[1, 2]).is_err());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let plc = MemoryPlc::new()
            .with_area(Area::Input, 4)
            .with_area(Area::Output, 4)
            .fail_writes(Area::Output)
            .short_reads(Area::Input);
        assert_eq!(plc.read_area(Area::Input, 0, 4).await.unwrap().len(), 3);
        assert!(matches!(
            plc.write_area(Area::Output, 0, &[1]).await,
            Err(TransportError::Rejected { .. })
        ));
        plc.clear_calls();
        assert!(plc.calls().is_empty());
    }

    #[tokio::test]
    async fn test_poke() {
        let plc = MemoryPlc::new().with_area_bytes(Area::Marker, vec![0xFF; 2]);
        plc.poke(Area::Marker, 1, &[0x0F]).unwrap();
        assert_eq!(plc.bytes(Area::Marker).unwrap(), vec![0xFF, 0x0F]);
        assert!(plc.calls().is_empty());
    }
}
