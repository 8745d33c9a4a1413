//! Minimal host-side walkthrough: write three registers over the wire,
//! mirror them into the read file, and stream them back.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p i2c-core --example register_roundtrip
//! ```

use i2c_core::{BusMaster, EngineConfig, I2cSlave, DEFAULT_REGISTER_COUNT};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn main() {
    let config = EngineConfig {
        tracing_enabled: true,
        ..EngineConfig::default()
    };
    let engine = I2cSlave::new(config).expect("default configuration is valid");
    let mut master = BusMaster::new(engine);

    let payload = [0xDE, 0xAD, 0xBE];
    let acked = master.write_transaction(1, &payload);
    println!("write {payload:02X?} at index 1: acked = {acked}");

    for index in 0..DEFAULT_REGISTER_COUNT {
        let value = master
            .simulation()
            .engine()
            .write_register(index)
            .expect("index in range");
        master
            .simulation_mut()
            .engine_mut()
            .set_read_register(index, value);
        println!("register[{index}] = {value:#04x}");
    }

    let bytes = master
        .read_transaction(DEFAULT_REGISTER_COUNT)
        .expect("address acknowledged");
    println!("readback: {bytes:02X?}");

    println!("trace ({} events):", master.simulation().trace().len());
    for event in master.simulation().trace() {
        println!("  {event:?}");
    }
}
