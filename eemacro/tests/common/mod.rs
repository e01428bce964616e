use eemacro::eeprom::QueuedEeprom;
use eemacro::{KeyAction, LayoutExecutor, MacroStore, MacroStorageConfig};

pub const REGION_SIZE: usize = 1024;

pub type TestEeprom = QueuedEeprom<REGION_SIZE>;
pub type TestStore = MacroStore<TestEeprom>;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn new_store() -> TestStore {
    new_store_with(MacroStorageConfig::default())
}

pub fn new_store_with(config: MacroStorageConfig) -> TestStore {
    MacroStore::new(TestEeprom::new(), config).expect("mounting a fresh region cannot fail")
}

pub fn remount(eeprom: TestEeprom, config: MacroStorageConfig) -> TestStore {
    MacroStore::new(eeprom, config).expect("remount")
}

pub fn ka(pressed: bool, layer: u8, row: u8, column: u8) -> KeyAction {
    KeyAction {
        pressed,
        layer,
        row,
        column,
    }
}

/// Layout double that just collects whatever gets replayed into it.
#[derive(Default)]
pub struct CollectingLayout {
    pub actions: Vec<KeyAction>,
}

impl CollectingLayout {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutExecutor for CollectingLayout {
    fn execute_key_action(&mut self, key_action: KeyAction) {
        self.actions.push(key_action);
    }
}

pub fn record_macro(store: &mut TestStore, trigger: KeyAction, actions: &[KeyAction]) {
    store.record_init(trigger).expect("record_init");
    for action in actions {
        store.record_action(*action).expect("record_action");
    }
    store.record_finalize().expect("record_finalize");
}

pub fn play_into(store: &mut TestStore, trigger: KeyAction) -> Vec<KeyAction> {
    let mut layout = CollectingLayout::new();
    store.play(trigger, &mut layout).expect("play");
    layout.actions
}

/// A typical short macro: presses and releases of a couple of keys.
pub fn sample_actions(seed: u8) -> Vec<KeyAction> {
    vec![
        KeyAction::press(0, seed, 1),
        KeyAction::release(0, seed, 1),
        KeyAction::press(1, 2, seed),
        KeyAction::release(1, 2, seed),
    ]
}

/// Walk the record log in `image` and return the sequence of type bytes up to
/// and including the end marker.
pub fn record_types(image: &[u8], region_start: usize) -> Vec<u8> {
    const HEADER_LEN: usize = 5;
    let mut types = Vec::new();
    let mut addr = region_start + HEADER_LEN;
    loop {
        let t = image[addr];
        types.push(t);
        if t == 0xFF {
            return types;
        }
        addr += image[addr + 1] as usize;
    }
}
