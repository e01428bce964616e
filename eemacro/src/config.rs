use crate::key_action::KeyAction;

/// Configuration of the non-volatile region owned by the macro store, plus the
/// recording policy supplied by the layout engine.
///
/// `start` and `end` are validated against the header stored on media at every
/// boot; moving the region between builds invalidates (and wipes) any stored
/// macros.
#[derive(Clone, Copy, Debug)]
pub struct MacroStorageConfig {
    /// Address of the first byte of the region.
    pub start: u16,
    /// Address of the last byte of the region, inclusive.
    pub end: u16,
    /// Returns `true` for key-actions that must not be recorded.
    ///
    /// The layout engine passes its layer-shift/layer-toggle classifier here,
    /// so that releasing the record-stop key cannot bake an unreleased layer
    /// switch into a macro.
    pub record_filter: fn(&KeyAction) -> bool,
}

impl Default for MacroStorageConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: 1023,
            record_filter: |_| false,
        }
    }
}
