//! Batched read and write requests.
//!
//! A request is built from an ordered list of [`Variable`]s, validated up front
//! and then executed against a [`Transport`]:
//!
//! - [`ReadRequest`] issues one read per memory area (one per data block),
//!   covering all requested bytes of that area, and decodes each variable out
//!   of the returned buffer.
//! - [`WriteRequest`] merges each area's variables into spans and issues one
//!   write per span. Spans holding bits are read first, so untouched bits of
//!   the same byte survive.
//!
//! All transport calls of one request run concurrently. The request settles
//! once every call has finished and reports the first failure. No call is
//! retried.
//!
//! # Partial writes
//!
//! Spans are independent writes. When a [`WriteRequest`] fails, other spans of
//! the same request may already have landed on the controller.
//!
//! # Example
//!
//! ```
//! use s7_access::simulator::MemoryPlc;
//! use s7_access::{parse_address, Area, ReadRequest, Value, Variable, WriteRequest};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let plc = MemoryPlc::new().with_area(Area::DataBlock(1), 32);
//!
//! let write = WriteRequest::new(vec![
//!     Variable::new(parse_address("DB1,INT2")?).with_value(-7i16),
//!     Variable::new(parse_address("DB1,X0.3")?).with_value(true),
//! ])?;
//! write.execute(&plc).await?;
//!
//! let read = ReadRequest::new(vec![
//!     Variable::new(parse_address("DB1,X0.3")?),
//!     Variable::new(parse_address("DB1,INT2")?),
//! ])?;
//! let vars = read.execute(&plc).await?;
//! assert_eq!(vars[0].value, Some(Value::from(true)));
//! assert_eq!(vars[1].value, Some(Value::from(-7i16)));
//! # Ok::<(), s7_access::S7Error>(())
//! # }).unwrap();
//! ```

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, trace, warn};

use crate::address::Address;
use crate::area::Area;
use crate::batch::{partition, AreaGroup, CombinedSpan};
use crate::codec;
use crate::error::{Result, S7Error};
use crate::transport::Transport;
use crate::utils::{apply_bit, apply_bits, format_hex, get_bit, read_bits};
use crate::value::{BitValue, Value, Variable};

/// When a write span is read before it is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WritePolicy {
    /// Read spans that contain a bit member; zero-fill all others.
    ///
    /// Bytes between merged members of a bit-free span are written as zero.
    #[default]
    BitSpans,
    /// Also read spans whose members leave bytes uncovered.
    GapOrBitSpans,
}

/// Validated read request.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    variables: Vec<Variable>,
    addresses: Vec<Address>,
    groups: Vec<AreaGroup>,
    max_bytes_per_call: Option<usize>,
}

impl ReadRequest {
    /// Validates `variables` and groups them by area.
    ///
    /// Values on the input are ignored and replaced by the values read.
    ///
    /// # Errors
    ///
    /// Returns `InvalidVariable` naming the first variable whose address
    /// breaks the address model.
    pub fn new(variables: Vec<Variable>) -> Result<Self> {
        let addresses = validated_addresses(&variables)?;
        let groups = partition(&addresses);
        debug!(
            variables = variables.len(),
            groups = groups.len(),
            "built read request"
        );
        Ok(Self {
            variables,
            addresses,
            groups,
            max_bytes_per_call: None,
        })
    }

    /// Splits transport reads larger than `max` bytes into consecutive calls.
    ///
    /// A limit of 0 is treated as no limit.
    pub fn with_max_bytes_per_call(mut self, max: Option<usize>) -> Self {
        self.max_bytes_per_call = max.filter(|&m| m > 0);
        self
    }

    /// Variables in caller order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Area groups, one transport read each.
    pub fn groups(&self) -> &[AreaGroup] {
        &self.groups
    }

    /// Reads every group and returns the variables in caller order with
    /// their values set.
    ///
    /// # Errors
    ///
    /// `TransportRead` or `ShortRead` for the first group that failed, in
    /// completion order. Results of the other groups are discarded.
    pub async fn execute<T>(&self, transport: &T) -> Result<Vec<Variable>>
    where
        T: Transport + ?Sized,
    {
        let values = self.execute_values(transport).await?;
        Ok(self
            .variables
            .iter()
            .cloned()
            .zip(values)
            .map(|(mut var, value)| {
                var.value = Some(value);
                var
            })
            .collect())
    }

    /// Reads every group and returns one value per variable, in caller order.
    pub(crate) async fn execute_values<T>(&self, transport: &T) -> Result<Vec<Value>>
    where
        T: Transport + ?Sized,
    {
        let mut pending: FuturesUnordered<_> = self
            .groups
            .iter()
            .map(|group| self.read_group(transport, group))
            .collect();

        let mut decoded: Vec<(usize, Value)> = Vec::with_capacity(self.variables.len());
        let mut first_error = None;
        while let Some(result) = pending.next().await {
            match result {
                Ok(values) => decoded.extend(values),
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            warn!(error = %err, "read request failed");
            return Err(err);
        }

        // every variable belongs to exactly one group
        decoded.sort_unstable_by_key(|(index, _)| *index);
        Ok(decoded.into_iter().map(|(_, value)| value).collect())
    }

    async fn read_group<T>(&self, transport: &T, group: &AreaGroup) -> Result<Vec<(usize, Value)>>
    where
        T: Transport + ?Sized,
    {
        let (start, end) = group.bounds(&self.addresses);
        let buf = read_range(transport, group.area(), start, end, self.max_bytes_per_call).await?;
        group
            .sorted()
            .iter()
            .map(|&index| {
                decode_variable(&self.addresses[index], &buf, start).map(|value| (index, value))
            })
            .collect()
    }
}

/// Validated write request.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    variables: Vec<Variable>,
    addresses: Vec<Address>,
    spans: Vec<(Area, CombinedSpan)>,
    max_bytes_per_call: Option<usize>,
    policy: WritePolicy,
}

impl WriteRequest {
    /// Validates `variables` and merges them into write spans.
    ///
    /// # Errors
    ///
    /// - `InvalidVariable` for an address that breaks the address model or a
    ///   value whose shape does not fit its address
    /// - `MissingValue` for a variable without a value
    pub fn new(variables: Vec<Variable>) -> Result<Self> {
        let addresses = validated_addresses(&variables)?;
        for (index, var) in variables.iter().enumerate() {
            let value = var
                .value
                .as_ref()
                .ok_or(S7Error::MissingValue { index })?;
            value
                .check_shape(&var.address)
                .map_err(|reason| S7Error::invalid_variable(index, reason))?;
        }

        let spans: Vec<(Area, CombinedSpan)> = partition(&addresses)
            .iter()
            .flat_map(|group| {
                let area = group.area();
                group
                    .spans(&addresses)
                    .into_iter()
                    .map(move |span| (area, span))
            })
            .collect();
        debug!(
            variables = variables.len(),
            spans = spans.len(),
            "built write request"
        );
        Ok(Self {
            variables,
            addresses,
            spans,
            max_bytes_per_call: None,
            policy: WritePolicy::default(),
        })
    }

    /// Splits transport calls larger than `max` bytes into consecutive calls.
    ///
    /// A limit of 0 is treated as no limit.
    pub fn with_max_bytes_per_call(mut self, max: Option<usize>) -> Self {
        self.max_bytes_per_call = max.filter(|&m| m > 0);
        self
    }

    /// Sets when spans are read before they are written.
    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Variables in caller order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Write spans with their area, one transport write each.
    pub fn spans(&self) -> &[(Area, CombinedSpan)] {
        &self.spans
    }

    /// Writes every span.
    ///
    /// # Errors
    ///
    /// `TransportRead`, `ShortRead` or `TransportWrite` for the first span that
    /// failed, in completion order. Other spans may have been written.
    pub async fn execute<T>(&self, transport: &T) -> Result<()>
    where
        T: Transport + ?Sized,
    {
        let mut pending: FuturesUnordered<_> = self
            .spans
            .iter()
            .map(|(area, span)| self.write_span(transport, *area, span))
            .collect();

        let mut first_error = None;
        while let Some(result) = pending.next().await {
            if let Err(err) = result {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => {
                warn!(error = %err, "write request failed");
                Err(err)
            }
            None => Ok(()),
        }
    }

    async fn write_span<T>(&self, transport: &T, area: Area, span: &CombinedSpan) -> Result<()>
    where
        T: Transport + ?Sized,
    {
        let (start, end) = span.bounds();
        let needs_read = span.has_bits(&self.addresses)
            || (self.policy == WritePolicy::GapOrBitSpans && span.has_gap(&self.addresses));

        let mut buf = if needs_read {
            read_range(transport, area, start, end, self.max_bytes_per_call).await?
        } else {
            vec![0; span.len()]
        };

        for &index in span.members() {
            let var = &self.variables[index];
            if let Some(value) = &var.value {
                patch_variable(&mut buf, start, &var.address, value)?;
            }
        }

        write_range(transport, area, start, &buf, self.max_bytes_per_call).await
    }
}

fn validated_addresses(variables: &[Variable]) -> Result<Vec<Address>> {
    variables
        .iter()
        .enumerate()
        .map(|(index, var)| {
            var.address
                .validate()
                .map(|()| var.address)
                .map_err(|reason| S7Error::invalid_variable(index, reason))
        })
        .collect()
}

/// Reads `[start, end)`, in chunks of at most `max` bytes when given.
async fn read_range<T>(
    transport: &T,
    area: Area,
    start: u32,
    end: u32,
    max: Option<usize>,
) -> Result<Vec<u8>>
where
    T: Transport + ?Sized,
{
    let total = (end - start) as usize;
    let chunk = max.unwrap_or(total).max(1);
    let mut buf = Vec::with_capacity(total);
    let mut offset = 0usize;

    while offset < total {
        let len = chunk.min(total - offset);
        let at = start + offset as u32;
        trace!(%area, start = at, len, "transport read");
        let data = transport
            .read_area(area, at, len)
            .await
            .map_err(|source| S7Error::TransportRead {
                area,
                start,
                end,
                source,
            })?;
        if data.len() != len {
            return Err(S7Error::ShortRead {
                area,
                start: at,
                expected: len,
                received: data.len(),
            });
        }
        buf.extend_from_slice(&data);
        offset += len;
    }
    Ok(buf)
}

/// Writes `data` at `start`, in chunks of at most `max` bytes when given.
async fn write_range<T>(
    transport: &T,
    area: Area,
    start: u32,
    data: &[u8],
    max: Option<usize>,
) -> Result<()>
where
    T: Transport + ?Sized,
{
    let end = start + data.len() as u32;
    let chunk = max.unwrap_or(data.len()).max(1);
    let mut at = start;

    for part in data.chunks(chunk) {
        trace!(%area, start = at, data = %format_hex(part), "transport write");
        transport
            .write_area(area, at, part)
            .await
            .map_err(|source| S7Error::TransportWrite {
                area,
                start,
                end,
                source,
            })?;
        at += part.len() as u32;
    }
    Ok(())
}

/// Bytes of `address` within a buffer read from `start`.
fn slice_of<'a>(buf: &'a [u8], start: u32, address: &Address) -> Result<&'a [u8]> {
    let offset = (address.byte_index() - start) as usize;
    buf.get(offset..offset + address.size() as usize)
        .ok_or_else(|| S7Error::codec(format!("{} lies outside the buffer", address)))
}

fn decode_variable(address: &Address, buf: &[u8], start: u32) -> Result<Value> {
    let bytes = slice_of(buf, start, address)?;
    let bit = address.bit_index().unwrap_or(0);
    let value = match (address.data_type().is_bit(), address.count()) {
        (true, None) => Value::Bit(get_bit(bytes[0], bit).into()),
        (true, Some(count)) => Value::Bits(
            read_bits(bytes, usize::from(bit), count as usize)
                .into_iter()
                .map(BitValue::from)
                .collect(),
        ),
        (false, None) => Value::Scalar(codec::decode(bytes, address.data_type())?),
        (false, Some(count)) => {
            Value::Array(codec::decode_array(bytes, address.data_type(), count)?)
        }
    };
    Ok(value)
}

fn patch_variable(buf: &mut [u8], start: u32, address: &Address, value: &Value) -> Result<()> {
    let offset = (address.byte_index() - start) as usize;
    let len = address.size() as usize;
    let target = buf
        .get_mut(offset..offset + len)
        .ok_or_else(|| S7Error::codec(format!("{} lies outside the span", address)))?;
    let bit = address.bit_index().unwrap_or(0);

    match value {
        Value::Bit(op) => target[0] = apply_bit(target[0], bit, *op),
        Value::Bits(ops) => apply_bits(target, usize::from(bit), ops),
        Value::Scalar(scalar) => target.copy_from_slice(&codec::encode(scalar)),
        Value::Array(items) => target.copy_from_slice(&codec::encode_array(items)),
    }
    Ok(())
}
