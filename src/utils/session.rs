use crate::error::{Result, SwitcherError};
use std::env;
use tracing::{info, warn};

/// Проверить, что графическая сессия подходит для работы с X-сервером
pub fn check_session() -> Result<()> {
    info!("Проверка графической сессии...");

    check_display()?;
    check_not_wayland();
    check_not_root();

    info!("Проверка сессии завершена успешно");
    Ok(())
}

fn check_display() -> Result<()> {
    display_server(env::var("DISPLAY").ok())
}

fn display_server(value: Option<String>) -> Result<()> {
    match value {
        Some(server) if !server.trim().is_empty() => {
            info!("X-сервер: {}", server);
            Ok(())
        }
        _ => Err(SwitcherError::ServiceUnavailable(
            "переменная DISPLAY не задана, X-сервер недоступен".to_string(),
        )),
    }
}

fn check_not_wayland() {
    let session_type = env::var("XDG_SESSION_TYPE").unwrap_or_default();
    if is_wayland_session(&session_type, env::var_os("WAYLAND_DISPLAY").is_some()) {
        warn!("⚠️  Обнаружена сессия Wayland");
        warn!("   Видны и переключаются только окна XWayland");
    }
}

fn is_wayland_session(session_type: &str, wayland_display: bool) -> bool {
    session_type.eq_ignore_ascii_case("wayland") || wayland_display
}

fn check_not_root() {
    // Проверяем переменную окружения USER
    match env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Приложение запущено от имени root!");
            warn!("   Запущенные по горячим клавишам приложения тоже получат права root");
        }
        Ok(user) => {
            info!("Приложение запущено от имени пользователя: {}", user);
        }
        Err(_) => {
            warn!("Не удалось определить пользователя");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_variable_required() {
        assert!(display_server(Some(":0".to_string())).is_ok());
        assert!(matches!(
            display_server(Some("  ".to_string())),
            Err(SwitcherError::ServiceUnavailable(_))
        ));
        assert!(display_server(None).is_err());
    }

    #[test]
    fn test_wayland_detection() {
        assert!(is_wayland_session("wayland", false));
        assert!(is_wayland_session("Wayland", false));
        assert!(is_wayland_session("x11", true));
        assert!(!is_wayland_session("x11", false));
        assert!(!is_wayland_session("", false));
    }
}
