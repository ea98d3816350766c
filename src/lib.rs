//! # S7 Access
//!
//! Symbolic addressing, data-block layout and batched reads and writes for
//! Siemens S7 PLCs.
//!
//! This is a **planning** library: it knows how controller memory is
//! addressed and laid out, and how to turn many scattered variables into few
//! transport calls. The connection itself is a [`Transport`] supplied by the
//! application. No polling, caching, retries or reconnection.
//!
//! ## Features
//!
//! - **Address model**: areas, types, bits and arrays as enums, invariants
//!   enforced at construction
//! - **Address notation**: `DB1,X14.0`, `DB1,REAL8.3`, `MW10`, `E0.1` parsed and
//!   formatted losslessly
//! - **Data-block sources**: exported `STRUCT ... END_STRUCT` text laid out
//!   with the controller's byte and bit alignment rules
//! - **Batching**: one read per area, one write per merged span, all issued
//!   concurrently; bit writes are read-modify-write
//! - **No panics**: all errors returned as [`Result<T, S7Error>`]
//!
//! ## Quick Start
//!
//! ```
//! use s7_access::simulator::MemoryPlc;
//! use s7_access::{Area, Client, ClientConfig, Value};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! // Any Transport works; MemoryPlc is an in-process controller
//! let plc = MemoryPlc::new().with_area(Area::DataBlock(1), 32);
//! let client = Client::new(plc, ClientConfig::new());
//!
//! client.write_address("DB1,INT4", 1200i16).await?;
//! client.write_address("DB1,X0.1", true).await?;
//!
//! assert_eq!(client.read_address("DB1,INT4").await?, Value::from(1200i16));
//! assert_eq!(client.read_address("DB1,X0.1").await?, Value::from(true));
//! # Ok::<(), s7_access::S7Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Address Notation
//!
//! | Text | Area | Type | Byte | Bit | Count |
//! |------|------|------|-----:|----:|------:|
//! | `DB1,X14.0` | DB1 | `Bit` | 14 | 0 | |
//! | `DB1,X14.0.8` | DB1 | `Bit` | 14 | 0 | 8 |
//! | `DB1,INT4` | DB1 | `Int16` | 4 | | |
//! | `DB1,REAL8.3` | DB1 | `Float32` | 8 | | 3 |
//! | `M4.2` | M | `Bit` | 4 | 2 | |
//! | `MW10` | M | `UInt16` | 10 | | |
//! | `IB0` / `EB0` | I | `UInt8` | 0 | | |
//! | `QD4` / `AD4` | Q | `UInt32` | 4 | | |
//!
//! See [`parse_address`] and [`format_address`].
//!
//! ## Data-Block Sources
//!
//! ```
//! use s7_access::DbSourceParser;
//!
//! let source = r#"
//! DATA_BLOCK "DB10"
//! STRUCT
//!    running : Bool;
//!    speed : Int;      // rpm
//!    axis : Array[1..2] of Struct
//!       pos : Real;
//!    END_STRUCT;
//! END_STRUCT;
//! BEGIN
//! END_DATA_BLOCK
//! "#;
//!
//! let vars = DbSourceParser::new().parse_variables(source)?;
//! let addrs: Vec<String> = vars.iter().map(|v| v.address.to_string()).collect();
//! assert_eq!(addrs, ["DB10,X0.0", "DB10,INT2", "DB10,REAL4", "DB10,REAL8"]);
//! assert_eq!(vars[3].name.as_deref(), Some("axis/2/pos"));
//! # Ok::<(), s7_access::S7Error>(())
//! ```
//!
//! ## Requests
//!
//! [`ReadRequest`] and [`WriteRequest`] validate their variables up front, so
//! bad input never reaches the transport. Execution returns the first error
//! of the request. A failed write may have landed partially: spans are
//! written independently.
//!
//! ## Error Handling
//!
//! ```
//! use s7_access::{parse_address, S7Error};
//!
//! match parse_address("DB1,INT4.0.2") {
//!     Err(S7Error::MalformedAddress { input, reason }) => {
//!         println!("{}: {}", input, reason);
//!     }
//!     Err(e) => println!("Error: {}", e),
//!     Ok(addr) => println!("{}", addr),
//! }
//! ```
//!
//! ## Logging
//!
//! Events are emitted through [`tracing`]: `debug` for built requests, `trace`
//! per transport call, `warn` for failed requests. Install a subscriber in the
//! application to see them.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod address;
mod area;
pub mod batch;
mod client;
pub mod codec;
mod error;
pub mod layout;
mod notation;
mod request;
pub mod simulator;
pub mod source;
mod transport;
mod types;
pub mod utils;
mod value;

pub use address::{bounds_of, Address};
pub use area::Area;
pub use client::{Client, ClientConfig, DEFAULT_LABEL};
pub use error::{Result, S7Error};
pub use layout::{parse_db_source, DbField, DbLayout, DbSourceParser};
pub use notation::{format_address, parse_address};
pub use request::{ReadRequest, WritePolicy, WriteRequest};
pub use transport::{Transport, TransportError};
pub use types::DataType;
pub use value::{BitValue, Scalar, Value, Variable};
