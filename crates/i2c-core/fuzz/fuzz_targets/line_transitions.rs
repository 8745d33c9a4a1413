#![no_main]

use i2c_core::{EngineConfig, I2cSlave, Level, ResetPolarity};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let config = EngineConfig {
        device_address: data[0] & 0x7F,
        register_count: usize::from(data[1]) + 1,
        reset_polarity: if data[0] & 0x80 == 0 {
            ResetPolarity::ActiveHigh
        } else {
            ResetPolarity::ActiveLow
        },
        tracing_enabled: false,
    };
    let Ok(mut engine) = I2cSlave::new(config) else {
        return;
    };

    for &byte in &data[2..] {
        if byte == 0xFF {
            let asserted = match engine.config().reset_polarity {
                ResetPolarity::ActiveHigh => Level::High,
                ResetPolarity::ActiveLow => Level::Low,
            };
            engine.set_reset_level(asserted);
            engine.set_reset_level(engine.config().reset_polarity.deasserted_level());
            continue;
        }

        let clk = Level::from_bool(byte & 0x01 != 0);
        let data_level = Level::from_bool(byte & 0x02 != 0);
        let _ = engine.evaluate(clk, data_level);

        assert!(engine.bit_count() <= 8);
        if engine.protocol_state() == i2c_core::ProtocolState::Idle {
            assert_eq!(engine.data_drive(), i2c_core::LineDrive::Released);
        }
    }

    let snapshot = engine.snapshot();
    let resumed = I2cSlave::from_snapshot(snapshot.clone());
    assert!(resumed.is_ok());
    if let Ok(resumed) = resumed {
        assert_eq!(resumed.snapshot(), snapshot);
    }
});
