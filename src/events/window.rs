use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор окна X11
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowHandle(pub u32);

impl WindowHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for WindowHandle {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Ключ приложения, которому принадлежит группа окон.
///
/// Классы окон сравниваются без учёта регистра, поэтому значение
/// нормализуется при создании.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AppIdentity(String);

impl AppIdentity {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for AppIdentity {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&str> for AppIdentity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<AppIdentity> for String {
    fn from(identity: AppIdentity) -> Self {
        identity.0
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_handle_display() {
        assert_eq!(WindowHandle::new(0x3a00007).to_string(), "0x03a00007");
        assert_eq!(WindowHandle::from(42).value(), 42);
    }

    #[test]
    fn test_app_identity_is_normalized() {
        let identity = AppIdentity::new("  Gnome-Terminal-Server ");
        assert_eq!(identity.as_str(), "gnome-terminal-server");
        assert_eq!(identity, AppIdentity::from("GNOME-terminal-server"));
        assert!(AppIdentity::new("   ").is_empty());
    }
}
