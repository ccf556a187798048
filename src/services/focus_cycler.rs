use crate::events::{AppIdentity, WindowHandle};
use crate::services::display::DisplayBackend;
use crate::services::registry::Registry;
use std::sync::Arc;
use tracing::{info, warn};

use crate::debug_if_enabled;

/// Итог запроса на переключение к приложению
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Группы нет, приложение нужно запустить
    NoGroup,
    Activated {
        target: WindowHandle,
        /// Курсор сдвинут (фокус уже был в группе)
        advanced: bool,
        success: bool,
    },
}

pub struct FocusCycler {
    registry: Arc<Registry>,
    backend: Arc<dyn DisplayBackend>,
}

impl FocusCycler {
    pub fn new(registry: Arc<Registry>, backend: Arc<dyn DisplayBackend>) -> Self {
        Self { registry, backend }
    }

    /// Если фокус уже на окне группы, переходит к следующему окну,
    /// иначе активирует текущее окно группы.
    pub fn cycle(&self, app: &AppIdentity) -> CycleOutcome {
        if !self.registry.contains(app) {
            debug_if_enabled!("Группы '{}' нет", app);
            return CycleOutcome::NoGroup;
        }

        // Запрос к оконной системе идёт без блокировки реестра
        let focused = match self.backend.query_focused_window() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Не удалось определить окно в фокусе: {}", e);
                None
            }
        };

        let choice = self.registry.with_group(app, |group| {
            match focused.and_then(|handle| group.advance(handle)) {
                Some(next) => Some((next, true)),
                None => group.cursor().map(|cursor| (cursor, false)),
            }
        });

        let Some((target, advanced)) = choice.flatten() else {
            debug_if_enabled!("Группа '{}' исчезла во время переключения", app);
            return CycleOutcome::NoGroup;
        };

        let success = self.backend.activate_window(target);
        if success {
            info!("Переключение на '{}': окно {} (сдвиг курсора: {})", app, target, advanced);
        } else {
            warn!("Окно {} группы '{}' активировано не полностью", target, app);
        }

        CycleOutcome::Activated {
            target,
            advanced,
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeDisplay;

    fn h(id: u32) -> WindowHandle {
        WindowHandle::new(id)
    }

    /// Группа "browser" = [10, 20] с курсором на 10
    fn browser_setup() -> (Arc<Registry>, Arc<FakeDisplay>, FocusCycler, AppIdentity) {
        let registry = Arc::new(Registry::new());
        let display = Arc::new(FakeDisplay::new());
        let browser = AppIdentity::new("browser");
        registry.get_or_create(&browser, h(20)).unwrap();
        registry.insert_into(&browser, h(10)).unwrap();

        let cycler = FocusCycler::new(Arc::clone(&registry), display.clone());
        (registry, display, cycler, browser)
    }

    #[test]
    fn test_focused_member_advances_cursor() {
        let (registry, display, cycler, browser) = browser_setup();
        display.set_focused(Some(20));

        let outcome = cycler.cycle(&browser);
        assert_eq!(
            outcome,
            CycleOutcome::Activated {
                target: h(10),
                advanced: true,
                success: true
            }
        );
        assert_eq!(display.activations(), vec![h(10)]);
        assert_eq!(registry.snapshot(&browser).unwrap().cursor, h(10));
    }

    #[test]
    fn test_focus_elsewhere_activates_cursor_without_advancing() {
        let (registry, display, cycler, browser) = browser_setup();
        display.set_focused(Some(999));

        let outcome = cycler.cycle(&browser);
        assert_eq!(
            outcome,
            CycleOutcome::Activated {
                target: h(10),
                advanced: false,
                success: true
            }
        );
        assert_eq!(display.activations(), vec![h(10)]);
        assert_eq!(registry.snapshot(&browser).unwrap().handles, vec![h(10), h(20)]);
    }

    #[test]
    fn test_repeated_presses_cycle_through_group() {
        let (_registry, display, cycler, browser) = browser_setup();
        display.set_focused(Some(10));

        cycler.cycle(&browser);
        cycler.cycle(&browser);
        cycler.cycle(&browser);
        assert_eq!(display.activations(), vec![h(20), h(10), h(20)]);
    }

    #[test]
    fn test_focus_query_failure_uses_cursor() {
        let (_registry, display, cycler, browser) = browser_setup();
        display.set_focused(None);

        assert!(matches!(
            cycler.cycle(&browser),
            CycleOutcome::Activated { target, advanced: false, .. } if target == h(10)
        ));
    }

    #[test]
    fn test_activation_failure_keeps_cursor_move() {
        let (registry, display, cycler, browser) = browser_setup();
        display.set_focused(Some(10));
        display.fail_activation();

        assert_eq!(
            cycler.cycle(&browser),
            CycleOutcome::Activated {
                target: h(20),
                advanced: true,
                success: false
            }
        );
        assert_eq!(registry.snapshot(&browser).unwrap().cursor, h(20));
    }

    #[test]
    fn test_missing_group() {
        let (_registry, display, cycler, _browser) = browser_setup();
        assert_eq!(cycler.cycle(&AppIdentity::new("editor")), CycleOutcome::NoGroup);
        assert!(display.activations().is_empty());
    }
}
