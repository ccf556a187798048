use crate::config::Config;
use crate::error::{Result, SwitcherError};
use crate::events::{AppIdentity, DisplayEvent, WindowHandle};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use super::r#trait::DisplayBackend;

/// Эмулируемый рабочий стол: открытые окна, их классы и фокус
#[derive(Debug)]
struct EmulatedDesktop {
    windows: Vec<WindowHandle>,
    classes: HashMap<WindowHandle, AppIdentity>,
    focused: Option<WindowHandle>,
    next_id: u32,
}

impl EmulatedDesktop {
    fn new() -> Self {
        Self {
            windows: Vec::new(),
            classes: HashMap::new(),
            focused: None,
            next_id: 0x0400_0001,
        }
    }

    fn open_window(&mut self, class: AppIdentity) -> WindowHandle {
        let handle = WindowHandle::new(self.next_id);
        self.next_id += 1;
        self.windows.push(handle);
        self.classes.insert(handle, class);
        self.focused = Some(handle);
        handle
    }

    fn close_oldest(&mut self) -> Option<WindowHandle> {
        if self.windows.is_empty() {
            return None;
        }
        let handle = self.windows.remove(0);
        self.classes.remove(&handle);
        if self.focused == Some(handle) {
            self.focused = self.windows.last().copied();
        }
        Some(handle)
    }
}

pub struct DryRunDisplay {
    desktop: Arc<Mutex<EmulatedDesktop>>,
    events: AsyncMutex<mpsc::UnboundedReceiver<DisplayEvent>>,
}

impl DryRunDisplay {
    pub fn new(config: Arc<Config>) -> Self {
        let desktop = Arc::new(Mutex::new(EmulatedDesktop::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::emulate(config, Arc::clone(&desktop), tx));

        Self {
            desktop,
            events: AsyncMutex::new(rx),
        }
    }

    /// По очереди для каждой привязки: нажатие клавиши и новое окно,
    /// каждый четвёртый шаг закрывается самое старое окно
    async fn emulate(
        config: Arc<Config>,
        desktop: Arc<Mutex<EmulatedDesktop>>,
        tx: mpsc::UnboundedSender<DisplayEvent>,
    ) {
        info!("Dry-run режим - оконная система работает в режиме эмуляции");

        if config.hotkeys.is_empty() {
            warn!("Dry-run: привязки клавиш не настроены, эмулировать нечего");
            return;
        }

        let mut interval = interval(Duration::from_secs(5));
        let mut step = 0usize;

        loop {
            interval.tick().await;

            let binding = &config.hotkeys[step % config.hotkeys.len()];
            step += 1;

            let Ok(code) = binding.key.keycode() else {
                continue;
            };

            let mut batch = vec![DisplayEvent::HotkeyPressed { code }];
            {
                let mut desktop = desktop.lock();
                let handle = desktop.open_window(binding.class_identity());
                batch.push(DisplayEvent::WindowCreated { handle });

                if step % 4 == 0 {
                    if let Some(handle) = desktop.close_oldest() {
                        batch.push(DisplayEvent::WindowDestroyed { handle });
                    }
                }
            }

            for event in batch {
                info!("Dry-run: эмулируем событие {}", event);
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl DisplayBackend for DryRunDisplay {
    async fn wait_for_event(&self) -> Result<DisplayEvent> {
        let mut events = self.events.lock().await;
        match events.recv().await {
            Some(event) => Ok(event),
            None => {
                // Эмуляция закончилась, ждём сигнала завершения
                std::future::pending::<()>().await;
                Err(SwitcherError::ServiceUnavailable("эмуляция завершена".to_string()))
            }
        }
    }

    async fn query_live_windows(&self) -> Result<HashSet<WindowHandle>> {
        Ok(self.desktop.lock().windows.iter().copied().collect())
    }

    fn query_window_class(&self, handle: WindowHandle) -> Result<AppIdentity> {
        match self.desktop.lock().classes.get(&handle) {
            Some(class) => Ok(class.clone()),
            None => SwitcherError::query_failed(format!("нет класса для окна {}", handle)),
        }
    }

    fn query_focused_window(&self) -> Result<WindowHandle> {
        match self.desktop.lock().focused {
            Some(handle) => Ok(handle),
            None => SwitcherError::query_failed("нет окна в фокусе"),
        }
    }

    fn activate_window(&self, handle: WindowHandle) -> bool {
        let mut desktop = self.desktop.lock();
        if !desktop.windows.contains(&handle) {
            return false;
        }
        info!("[DRY RUN] Активация окна {}", handle);
        desktop.focused = Some(handle);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulated_desktop_tracks_focus() {
        let mut desktop = EmulatedDesktop::new();
        let first = desktop.open_window(AppIdentity::new("obsidian"));
        let second = desktop.open_window(AppIdentity::new("emacs"));
        assert_eq!(desktop.focused, Some(second));

        assert_eq!(desktop.close_oldest(), Some(first));
        assert_eq!(desktop.focused, Some(second));
        assert_eq!(desktop.close_oldest(), Some(second));
        assert_eq!(desktop.focused, None);
        assert_eq!(desktop.close_oldest(), None);
    }
}
