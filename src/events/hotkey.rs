use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mappings::X11Keycodes;

/// Код клавиши X11 (evdev код + 8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotkeyCode(pub u8);

impl HotkeyCode {
    pub fn new(code: u8) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for HotkeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match X11Keycodes::reverse_translate(self.0) {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "KEYCODE_{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotkey_display_uses_key_name() {
        assert_eq!(HotkeyCode::new(69).to_string(), "f3 (69)");
        assert_eq!(HotkeyCode::new(255).to_string(), "KEYCODE_255");
    }
}
