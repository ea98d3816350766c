//! Example: data-block round trip against the in-memory controller
//!
//! Run with: cargo run --example db_roundtrip
//!
//! This example demonstrates:
//! - Laying out an exported data-block source
//! - Writing values through batched write requests
//! - Reading the whole block back in one call
//! - Log output via `RUST_LOG=s7_access=trace`

use s7_access::simulator::MemoryPlc;
use s7_access::utils::format_hex;
use s7_access::{Area, BitValue, Client, ClientConfig, DbSourceParser, Scalar, Value};
use tracing_subscriber::EnvFilter;

const SOURCE: &str = r#"
DATA_BLOCK "DB20"
{ S7_Optimized_Access := 'FALSE' }
VERSION : 0.1
NON_RETAIN
   STRUCT
      running : Bool;   // conveyor running
      fault : Bool;
      mode : Byte;
      speed : Int := 0;   // rpm
      setpoints : Array[0..2] of Real;
      stations : Array[1..2] of Struct
         present : Bool;
         count : DInt;
      END_STRUCT;
   END_STRUCT;
BEGIN
END_DATA_BLOCK
"#;

#[tokio::main]
async fn main() -> s7_access::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // =========================================================================
    // Layout
    // =========================================================================

    let layout = DbSourceParser::new().parse(SOURCE)?;
    println!(
        "=== DB{} layout ({} bytes) ===\n",
        layout.db_number().unwrap_or(0),
        layout.size()
    );
    let vars = layout.into_variables()?;
    for var in &vars {
        println!(
            "{:<20} {:<14} {}",
            var.name.as_deref().unwrap_or(""),
            var.address,
            var.comment.as_deref().unwrap_or("")
        );
    }

    // =========================================================================
    // Write
    // =========================================================================

    let plc = MemoryPlc::new().with_area(Area::DataBlock(20), 64);
    let client = Client::new(plc, ClientConfig::new().with_label("demo"));

    let mut writes = vars.clone();
    for var in writes.iter_mut() {
        let value = match var.name.as_deref() {
            Some("running") => Value::from(true),
            Some("fault") => Value::from(BitValue::Off),
            Some("mode") => Value::from(3u8),
            Some("speed") => Value::from(1450i16),
            Some("setpoints") => Value::Array(vec![
                Scalar::Float32(0.5),
                Scalar::Float32(1.0),
                Scalar::Float32(1.5),
            ]),
            Some(name) if name.ends_with("/present") => Value::from(true),
            _ => Value::from(42i32),
        };
        var.value = Some(value);
    }
    client.write(writes).await?;

    if let Some(bytes) = client.transport().bytes(Area::DataBlock(20)) {
        println!("\n=== DB20 memory ===\n\n{}", format_hex(&bytes));
    }

    // =========================================================================
    // Read back
    // =========================================================================

    println!("\n=== Read back ===\n");
    for var in client.read(vars).await? {
        println!(
            "{:<20} {:?}",
            var.name.as_deref().unwrap_or(""),
            var.value
        );
    }

    client.write_address("DB20,X0.1", BitValue::Toggle).await?;
    println!("\nfault after toggle: {:?}", client.read_address("DB20,X0.1").await?);

    Ok(())
}
