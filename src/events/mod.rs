pub mod hotkey;
pub mod window;

pub use hotkey::HotkeyCode;
pub use window::{AppIdentity, WindowHandle};

use std::fmt;

/// Событие оконной системы, которое обрабатывает диспетчер
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    HotkeyPressed { code: HotkeyCode },
    WindowCreated { handle: WindowHandle },
    WindowDestroyed { handle: WindowHandle },
}

impl fmt::Display for DisplayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayEvent::HotkeyPressed { code } => write!(f, "HotkeyPressed({})", code),
            DisplayEvent::WindowCreated { handle } => write!(f, "WindowCreated({})", handle),
            DisplayEvent::WindowDestroyed { handle } => write!(f, "WindowDestroyed({})", handle),
        }
    }
}
