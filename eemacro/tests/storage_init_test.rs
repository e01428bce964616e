pub mod common;

use common::*;
use eemacro::eeprom::QueuedEeprom;
use eemacro::{FORMAT_VERSION, KeyAction, MacroStorageConfig};

#[test]
fn test_fresh_region_initializes_empty_log() {
    let mut store = new_store();
    assert!(!store.exists(KeyAction::press(0, 0, 0)).unwrap());
    assert_eq!(store.free_bytes(), 1023 - 5);

    store.flush().unwrap();
    let eeprom = store.into_inner();
    let image = eeprom.committed();

    // Header: start/end addresses big-endian, then the version byte.
    assert_eq!(&image[0..5], &[0x00, 0x00, 0x03, 0xFF, FORMAT_VERSION]);
    // The log is a bare end marker.
    assert_eq!(image[5], 0xFF);
}

#[test]
fn test_macros_survive_remount() {
    let config = MacroStorageConfig::default();
    let trigger = KeyAction::press(1, 2, 3);

    let mut store = new_store_with(config);
    record_macro(&mut store, trigger, &sample_actions(7));
    store.flush().unwrap();
    let eeprom = store.into_inner();

    let mut store = remount(eeprom, config);
    assert_eq!(play_into(&mut store, trigger), sample_actions(7));
}

#[test]
fn test_unflushed_macros_do_not_survive_power_loss() {
    let config = MacroStorageConfig::default();
    let trigger = KeyAction::press(1, 2, 3);

    let mut store = new_store_with(config);
    store.flush().unwrap();
    record_macro(&mut store, trigger, &sample_actions(7));

    let mut eeprom = store.into_inner();
    eeprom.lose_power();

    let mut store = remount(eeprom, config);
    assert!(!store.exists(trigger).unwrap());
}

#[test]
fn test_version_mismatch_reinitializes() {
    let config = MacroStorageConfig::default();
    let mut store = new_store_with(config);
    record_macro(&mut store, KeyAction::press(0, 0, 1), &sample_actions(1));
    store.flush().unwrap();
    let mut image = *store.into_inner().committed();

    for version in [0x00, 0x02, 0xFF] {
        image[4] = version;
        let mut store = remount(QueuedEeprom::from_image(image), config);
        assert!(
            !store.exists(KeyAction::press(0, 0, 1)).unwrap(),
            "version {version:#04x} must force a wipe"
        );
        assert_eq!(store.free_bytes(), 1023 - 5);
    }
}

#[test]
fn test_relocated_region_reinitializes() {
    let full = MacroStorageConfig::default();
    let mut store = new_store_with(full);
    record_macro(&mut store, KeyAction::press(0, 0, 1), &sample_actions(1));
    store.flush().unwrap();
    let eeprom = store.into_inner();

    // Same memory, region shrunk by a config change: the stored end address
    // no longer matches, so the old log must not be trusted.
    let shrunk = MacroStorageConfig {
        start: 0,
        end: 511,
        ..Default::default()
    };
    let mut store = remount(eeprom, shrunk);
    assert!(!store.exists(KeyAction::press(0, 0, 1)).unwrap());
    assert_eq!(store.free_bytes(), 511 - 5);
}

#[test]
fn test_unknown_record_type_reinitializes() {
    let config = MacroStorageConfig::default();
    let mut store = new_store_with(config);
    record_macro(&mut store, KeyAction::press(0, 0, 1), &sample_actions(1));
    store.flush().unwrap();
    let mut image = *store.into_inner().committed();

    // Stomp the first record's type byte with a value no record starts with.
    image[5] = 0x7B;
    let mut store = remount(QueuedEeprom::from_image(image), config);
    assert!(!store.exists(KeyAction::press(0, 0, 1)).unwrap());
    assert_eq!(store.free_bytes(), 1023 - 5);
}

#[test]
fn test_unterminated_log_reinitializes() {
    let config = MacroStorageConfig::default();
    let mut image = [0xFFu8; REGION_SIZE];
    image[0..5].copy_from_slice(&[0x00, 0x00, 0x03, 0xFF, FORMAT_VERSION]);

    // A chain of maximum-length records marching straight past the region
    // boundary, with no end marker anywhere on the walk.
    let mut addr = 5;
    while addr + 1 < REGION_SIZE {
        image[addr] = 0x01;
        image[addr + 1] = 0xFF;
        addr += 0xFF;
    }

    let mut store = remount(QueuedEeprom::from_image(image), config);
    assert!(!store.exists(KeyAction::press(0, 0, 1)).unwrap());
    assert_eq!(store.free_bytes(), 1023 - 5);
}

#[test]
fn test_reinitialized_region_is_usable() {
    let config = MacroStorageConfig::default();
    let mut image = [0u8; REGION_SIZE];
    // Arbitrary garbage, not a valid header.
    for (i, byte) in image.iter_mut().enumerate() {
        *byte = i as u8;
    }

    let mut store = remount(QueuedEeprom::from_image(image), config);
    let trigger = KeyAction::press(2, 3, 4);
    record_macro(&mut store, trigger, &sample_actions(9));
    assert_eq!(play_into(&mut store, trigger), sample_actions(9));
}
