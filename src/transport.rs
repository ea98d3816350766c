//! Transport collaborator for area reads and writes.
//!
//! This module defines the [`Transport`] trait, the only seam between the
//! request engine and an actual controller connection. The engine knows about
//! areas and byte ranges; the transport knows about sessions and sockets.
//!
//! # Design
//!
//! - **Byte level**: a transport reads and writes raw area bytes, no typing
//! - **Concurrent**: the engine may issue several calls at once on `&self`;
//!   serializing them against one physical connection is the transport's job
//! - **No retries**: a failed call is reported as is, the engine surfaces it
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use s7_access::{Area, Transport, TransportError};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl Transport for Offline {
//!     async fn read_area(
//!         &self,
//!         _area: Area,
//!         _start: u32,
//!         _len: usize,
//!     ) -> Result<Vec<u8>, TransportError> {
//!         Err(TransportError::NotConnected)
//!     }
//!
//!     async fn write_area(
//!         &self,
//!         _area: Area,
//!         _start: u32,
//!         _data: &[u8],
//!     ) -> Result<(), TransportError> {
//!         Err(TransportError::NotConnected)
//!     }
//! }
//! ```

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::area::Area;

/// Errors reported by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error on the underlying connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Controller did not answer in time.
    #[error("Transport timeout")]
    Timeout,

    /// No connection to the controller.
    #[error("Not connected")]
    NotConnected,

    /// Requested range lies outside the area.
    #[error("Range {start}+{len} is outside {area}")]
    OutOfRange {
        /// Area accessed.
        area: Area,
        /// First byte accessed.
        start: u32,
        /// Number of bytes accessed.
        len: usize,
    },

    /// Controller refused the request.
    #[error("Request rejected: {reason}")]
    Rejected {
        /// Reason reported by the controller or transport.
        reason: String,
    },
}

impl TransportError {
    /// Creates a new `Rejected` error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Raw byte access to controller memory areas.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reads `len` bytes of `area` starting at byte `start`.
    async fn read_area(
        &self,
        area: Area,
        start: u32,
        len: usize,
    ) -> Result<Vec<u8>, TransportError>;

    /// Writes `data` to `area` starting at byte `start`.
    async fn write_area(&self, area: Area, start: u32, data: &[u8]) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn read_area(
        &self,
        area: Area,
        start: u32,
        len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).read_area(area, start, len).await
    }

    async fn write_area(&self, area: Area, start: u32, data: &[u8]) -> Result<(), TransportError> {
        (**self).write_area(area, start, data).await
    }
}
