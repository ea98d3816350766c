//! High-level client over a [`Transport`].
//!
//! [`Client`] turns address text, variable lists and data-block sources into
//! [`ReadRequest`]s and [`WriteRequest`]s and executes them. Each call builds
//! and executes exactly one request; nothing is cached between calls.
//!
//! # Example
//!
//! ```
//! use s7_access::simulator::MemoryPlc;
//! use s7_access::{Area, Client, ClientConfig, Value};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let plc = MemoryPlc::new().with_area(Area::DataBlock(1), 16);
//! let client = Client::new(plc, ClientConfig::new().with_label("line-1"));
//!
//! client.write_address("DB1,REAL4", 21.5f32).await?;
//! assert_eq!(client.read_address("DB1,REAL4").await?, Value::from(21.5f32));
//! # Ok::<(), s7_access::S7Error>(())
//! # }).unwrap();
//! ```
//!
//! # Configuration
//!
//! [`ClientConfig`] controls:
//! - a label attached to log events
//! - the largest transport call, for controllers with a small PDU
//! - when write spans are read before writing ([`WritePolicy`])

use tracing::debug;

use crate::error::Result;
use crate::layout::DbSourceParser;
use crate::notation::parse_address;
use crate::request::{ReadRequest, WritePolicy, WriteRequest};
use crate::transport::Transport;
use crate::value::{Value, Variable};

/// Label used when none is configured.
pub const DEFAULT_LABEL: &str = "s7";

/// Configuration for a [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Name attached to log events.
    pub label: String,
    /// Largest transport call in bytes, `None` for one call per group or span.
    pub max_bytes_per_call: Option<usize>,
    /// When write spans are read first.
    pub write_policy: WritePolicy,
}

impl ClientConfig {
    /// Creates a configuration with default settings.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::{ClientConfig, WritePolicy};
    ///
    /// let config = ClientConfig::new();
    /// assert_eq!(config.max_bytes_per_call, None);
    /// assert_eq!(config.write_policy, WritePolicy::BitSpans);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Caps the size of a single transport call.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::ClientConfig;
    ///
    /// // 240 byte PDU minus read response overhead
    /// let config = ClientConfig::new().with_max_bytes_per_call(222);
    /// assert_eq!(config.max_bytes_per_call, Some(222));
    /// ```
    pub fn with_max_bytes_per_call(mut self, max: usize) -> Self {
        self.max_bytes_per_call = Some(max);
        self
    }

    /// Sets when write spans are read before writing.
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            max_bytes_per_call: None,
            write_policy: WritePolicy::default(),
        }
    }
}

/// S7 client executing batched requests over a transport.
///
/// `Client` holds no state besides its transport and configuration, so it can
/// be shared (`&Client` or `Arc<Client>`) and used from several tasks at once.
pub struct Client<T> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> Client<T> {
    /// Creates a client over `transport`.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Consumes the client and returns the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Reads `variables` and returns them in the same order with values set.
    ///
    /// # Errors
    ///
    /// See [`ReadRequest::new`] and [`ReadRequest::execute`].
    pub async fn read(&self, variables: Vec<Variable>) -> Result<Vec<Variable>> {
        debug!(client = %self.config.label, variables = variables.len(), "read");
        ReadRequest::new(variables)?
            .with_max_bytes_per_call(self.config.max_bytes_per_call)
            .execute(&self.transport)
            .await
    }

    /// Writes `variables`.
    ///
    /// # Errors
    ///
    /// See [`WriteRequest::new`] and [`WriteRequest::execute`]. On a transport
    /// error some spans may already be written.
    pub async fn write(&self, variables: Vec<Variable>) -> Result<()> {
        debug!(client = %self.config.label, variables = variables.len(), "write");
        WriteRequest::new(variables)?
            .with_max_bytes_per_call(self.config.max_bytes_per_call)
            .with_write_policy(self.config.write_policy)
            .execute(&self.transport)
            .await
    }

    /// Reads a single address given in text notation.
    ///
    /// # Errors
    ///
    /// `MalformedAddress` or `UnknownType` for bad text, otherwise as
    /// [`Client::read`].
    pub async fn read_address(&self, address: &str) -> Result<Value> {
        debug!(client = %self.config.label, address, "read address");
        let mut values = ReadRequest::new(vec![Variable::new(parse_address(address)?)])?
            .with_max_bytes_per_call(self.config.max_bytes_per_call)
            .execute_values(&self.transport)
            .await?;
        // one value per requested variable
        Ok(values.swap_remove(0))
    }

    /// Writes a single address given in text notation.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_access::simulator::MemoryPlc;
    /// use s7_access::{Area, BitValue, Client, ClientConfig};
    ///
    /// # let rt = tokio::runtime::Builder::new_current_thread()
    /// #     .enable_all()
    /// #     .build()
    /// #     .unwrap();
    /// # rt.block_on(async {
    /// let plc = MemoryPlc::new().with_area(Area::Marker, 1);
    /// let client = Client::new(plc, ClientConfig::new());
    /// client.write_address("M0.2", BitValue::Toggle).await?;
    /// assert_eq!(client.transport().bytes(Area::Marker), Some(vec![0b100]));
    /// # Ok::<(), s7_access::S7Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn write_address(&self, address: &str, value: impl Into<Value>) -> Result<()> {
        let var = Variable::new(parse_address(address)?).with_value(value);
        self.write(vec![var]).await
    }

    /// Lays out a data-block source, stamps it with `db_number` and reads
    /// every field.
    ///
    /// # Errors
    ///
    /// Any parse error of [`DbSourceParser::parse`], otherwise as
    /// [`Client::read`].
    pub async fn read_db_source(&self, source: &str, db_number: u16) -> Result<Vec<Variable>> {
        let variables = DbSourceParser::new()
            .with_db_number(db_number)
            .parse_variables(source)?;
        self.read(variables).await
    }
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
