//! Integration tests for the DRV2605 bring-up register sequence.

use crate::mock_hw::MockHapticDriver;

use hbits::config::HapticConfig;
use hbits::error::{BringUpError, DriverError};
use hbits::haptic::drv2605::{bring_up, reg, SUPPORTED_IDS};

#[test]
fn bring_up_programs_registers_in_order() {
    let mut drv = MockHapticDriver::new();
    let id = bring_up(&mut drv, &HapticConfig::default()).unwrap();
    assert_eq!(id, 7);

    assert_eq!(
        drv.write_order(),
        vec![
            reg::MODE,
            reg::FEEDBACK,
            reg::CONTROL3,
            reg::OL_LRA_PERIOD,
            reg::OD_CLAMP,
            reg::MODE,
        ]
    );
    // Leaves standby before anything else is touched.
    assert_eq!(drv.writes[0], (reg::MODE, 0x00));
    // RTP input cleared during bring-up.
    assert_eq!(drv.amplitudes, vec![0]);
}

#[test]
fn bring_up_final_register_values() {
    let mut drv = MockHapticDriver::new();
    bring_up(&mut drv, &HapticConfig::default()).unwrap();

    // LRA bit set, other feedback bits preserved.
    assert_eq!(drv.reg(reg::FEEDBACK), 0x36 | 0x80);
    // Open loop set, data format cleared, other bits preserved.
    assert_eq!(drv.reg(reg::CONTROL3), 0x81);
    assert_eq!(drv.reg(reg::OL_LRA_PERIOD), 58);
    assert_eq!(drv.reg(reg::OD_CLAMP), 0x60);
    assert_eq!(drv.reg(reg::MODE), reg::MODE_REALTIME);
}

#[test]
fn bring_up_uses_configured_frequency_and_clamp() {
    let mut drv = MockHapticDriver::new();
    let config = HapticConfig {
        lra_target_hz: 200.0,
        output_clamp: 0x40,
        ..HapticConfig::default()
    };
    bring_up(&mut drv, &config).unwrap();
    assert_eq!(drv.reg(reg::OL_LRA_PERIOD), 51);
    assert_eq!(drv.reg(reg::OD_CLAMP), 0x40);
}

#[test]
fn every_supported_part_is_accepted() {
    for id in SUPPORTED_IDS {
        let mut drv = MockHapticDriver::with_device_id(id);
        assert_eq!(bring_up(&mut drv, &HapticConfig::default()), Ok(id));
    }
}

#[test]
fn unknown_part_is_rejected_before_any_write() {
    let mut drv = MockHapticDriver::with_device_id(2);
    assert_eq!(
        bring_up(&mut drv, &HapticConfig::default()),
        Err(BringUpError::UnexpectedDevice(2))
    );
    assert!(drv.writes.is_empty());
}

#[test]
fn absent_chip_is_not_detected() {
    let mut drv = MockHapticDriver::new();
    drv.absent = true;
    assert_eq!(
        bring_up(&mut drv, &HapticConfig::default()),
        Err(BringUpError::NotDetected)
    );
}

#[test]
fn failed_write_names_the_register_and_stops() {
    let mut drv = MockHapticDriver::new();
    drv.fail_register = Some(reg::OD_CLAMP);
    assert_eq!(
        bring_up(&mut drv, &HapticConfig::default()),
        Err(BringUpError::Register { addr: reg::OD_CLAMP, cause: DriverError::Bus })
    );
    // Never switched to realtime mode.
    assert_ne!(drv.reg(reg::MODE), reg::MODE_REALTIME);
}
