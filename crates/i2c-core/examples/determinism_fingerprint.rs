//! Deterministic exchange fingerprint generator used by CI cross-host comparison.

#![allow(clippy::pedantic)]

use i2c_core::{BusMaster, EngineConfig, I2cSlave, TraceEvent, DEFAULT_REGISTER_COUNT};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn hash_event(hash: &mut u64, event: &TraceEvent) {
    match event {
        TraceEvent::StartDetected => hash_bytes(hash, &[0x01]),
        TraceEvent::StopDetected => hash_bytes(hash, &[0x02]),
        TraceEvent::ResetApplied => hash_bytes(hash, &[0x03]),
        TraceEvent::StateChanged { from, to } => {
            hash_bytes(hash, &[0x04, *from as u8, *to as u8]);
        }
        TraceEvent::AddressResolved { matched, direction } => {
            hash_bytes(hash, &[0x05, u8::from(*matched), u8::from(direction.is_read())]);
        }
        TraceEvent::PointerLoaded { value } => hash_bytes(hash, &[0x06, *value]),
        TraceEvent::RegisterWritten { index, value } => {
            hash_bytes(hash, &[0x07, *index, *value]);
        }
        TraceEvent::RegisterCaptured { index, value } => {
            hash_bytes(hash, &[0x08, *index, *value]);
        }
        TraceEvent::MasterAck { acked } => hash_bytes(hash, &[0x09, u8::from(*acked)]),
        TraceEvent::DriveChanged { drive } => {
            hash_bytes(hash, &[0x0A, u8::from(drive.is_driving())]);
        }
    }
}

fn fingerprint() -> String {
    let config = EngineConfig {
        tracing_enabled: true,
        ..EngineConfig::default()
    };
    let engine = I2cSlave::new(config).expect("default configuration is valid");
    let mut master = BusMaster::new(engine);

    for index in 0..DEFAULT_REGISTER_COUNT {
        master
            .simulation_mut()
            .engine_mut()
            .set_read_register(index, (index as u8).wrapping_mul(0x3D).wrapping_add(7));
    }

    master.write_transaction(2, &[0x5A, 0xC3]);
    master.start();
    master.write_byte((0x55 << 1) | 1);
    for remaining in (0..DEFAULT_REGISTER_COUNT).rev() {
        master.read_byte(remaining > 0);
    }
    master.stop();

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    let trace = master.simulation().trace();
    hash_bytes(
        &mut hash,
        &u64::try_from(trace.len())
            .expect("trace length fits in u64")
            .to_le_bytes(),
    );
    for event in trace {
        hash_event(&mut hash, event);
    }

    let engine = master.simulation().engine();
    hash_bytes(&mut hash, &[engine.protocol_state() as u8]);
    hash_bytes(&mut hash, &[engine.index_pointer()]);
    hash_bytes(&mut hash, &[engine.bit_count()]);
    for index in 0..engine.register_count() {
        let written = engine.write_register(index).expect("index in range");
        let readable = engine.read_register(index).expect("index in range");
        hash_bytes(&mut hash, &[written, readable]);
    }

    format!("{hash:016x}")
}

fn main() {
    let first = fingerprint();
    let second = fingerprint();
    assert_eq!(first, second, "fingerprint must be stable within a process");
    println!("{first}");
}
