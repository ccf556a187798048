use crate::config::{Config, HotkeyBinding};
use crate::error::Result;
use crate::events::{AppIdentity, DisplayEvent, HotkeyCode, WindowHandle};
use crate::services::display::DisplayBackend;
use crate::services::focus_cycler::{CycleOutcome, FocusCycler};
use crate::services::launcher::Launcher;
use crate::services::reconciler::Reconciler;
use crate::services::registry::Registry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::{debug_if_enabled, trace_if_enabled};

/// Приложение, запущенное по горячей клавише, окна которого ещё ожидаются
#[derive(Debug, Clone)]
struct PendingLaunch {
    app: AppIdentity,
    started_at: Instant,
}

impl PendingLaunch {
    fn new(app: AppIdentity) -> Self {
        Self {
            app,
            started_at: Instant::now(),
        }
    }
}

/// Последовательный цикл обработки событий оконной системы.
///
/// Все изменения реестра по событиям выполняются здесь по одному;
/// параллельно с диспетчером работают только задачи сверки.
pub struct Dispatcher {
    config: Arc<Config>,
    registry: Arc<Registry>,
    backend: Arc<dyn DisplayBackend>,
    launcher: Arc<dyn Launcher>,
    reconciler: Reconciler,
    cycler: FocusCycler,
    pending: Option<PendingLaunch>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<Registry>,
        backend: Arc<dyn DisplayBackend>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        let reconciler = Reconciler::new(Arc::clone(&registry), Arc::clone(&backend), config.settle_delay());
        let cycler = FocusCycler::new(Arc::clone(&registry), Arc::clone(&backend));

        Self {
            config,
            registry,
            backend,
            launcher,
            reconciler,
            cycler,
            pending: None,
        }
    }

    /// Обрабатывает события до потери соединения с оконной системой
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Диспетчер запущен: привязок {}, задержка сверки {:?}",
            self.config.hotkeys.len(),
            self.config.settle_delay()
        );

        loop {
            let event = self.backend.wait_for_event().await?;
            trace_if_enabled!("Событие: {}", event);
            self.handle_event(event);
        }
    }

    /// Обрабатывает одно событие. Возвращает задачу сверки, если она была запланирована.
    pub fn handle_event(&mut self, event: DisplayEvent) -> Option<JoinHandle<()>> {
        match event {
            DisplayEvent::HotkeyPressed { code } => self.on_hotkey(code),
            DisplayEvent::WindowCreated { handle } => self.on_window_created(handle),
            DisplayEvent::WindowDestroyed { handle } => self.on_window_destroyed(handle),
        }
    }

    fn on_hotkey(&mut self, code: HotkeyCode) -> Option<JoinHandle<()>> {
        if self.config.dump_keycode() == Some(code) {
            self.dump_groups();
            return None;
        }

        let config = Arc::clone(&self.config);
        let Some(binding) = config.binding_for(code) else {
            debug_if_enabled!("Клавиша {} не назначена", code);
            return None;
        };

        let app = binding.identity();
        debug_if_enabled!("Нажата клавиша {} для '{}'", code, app);

        match self.cycler.cycle(&app) {
            CycleOutcome::NoGroup => {
                self.launch(app, binding);
                None
            }
            // Окно могло закрыться без уведомления; сверка уберёт его,
            // и следующее нажатие запустит приложение
            CycleOutcome::Activated { success: false, .. } => Some(self.reconciler.schedule(app)),
            CycleOutcome::Activated { .. } => None,
        }
    }

    fn launch(&mut self, app: AppIdentity, binding: &HotkeyBinding) {
        let command = binding.command();
        info!("Окон '{}' нет, запускаем: {}", app, command);

        if self.launcher.launch(command) {
            self.pending = Some(PendingLaunch::new(app));
        } else {
            warn!("Запуск '{}' не удался, группа не создана", app);
        }
    }

    fn on_window_created(&mut self, handle: WindowHandle) -> Option<JoinHandle<()>> {
        let Some(app) = self.resolve_identity(handle) else {
            debug_if_enabled!("Окно {} не относится ни к одному приложению", handle);
            return None;
        };

        match self.registry.track(&app, handle) {
            Ok(snapshot) => {
                debug_if_enabled!(
                    "Группа '{}': окон {}, текущее {}",
                    app,
                    snapshot.handles.len(),
                    snapshot.cursor
                );
            }
            Err(e) => warn!("Окно {} в группе '{}': {}", handle, app, e),
        }

        Some(self.reconciler.schedule(app))
    }

    fn on_window_destroyed(&mut self, handle: WindowHandle) -> Option<JoinHandle<()>> {
        match self.registry.forget(handle) {
            Some(app) => Some(self.reconciler.schedule(app)),
            None if self.registry.is_empty() => {
                trace_if_enabled!("Закрыто неотслеживаемое окно {}", handle);
                None
            }
            // Например, рамка оконного менеджера: клиентское окно под ней
            // закрылось без собственного уведомления
            None => {
                trace_if_enabled!("Закрыто неотслеживаемое окно {}, сверяем все группы", handle);
                Some(self.reconciler.schedule_all())
            }
        }
    }

    /// Чьё это окно: по WM_CLASS, по недавнему запуску или по окну в фокусе.
    /// Недавний запуск учитывается только для окон, класс которых ещё неизвестен.
    fn resolve_identity(&mut self, handle: WindowHandle) -> Option<AppIdentity> {
        match self.backend.query_window_class(handle) {
            Ok(class) => {
                if let Some(app) = self.config.app_for_class(&class) {
                    return Some(app.clone());
                }
                trace_if_enabled!("Класс '{}' окна {} не назначен", class, handle);
            }
            Err(e) => {
                debug_if_enabled!("Класс окна {} не получен: {}", handle, e);
                if let Some(app) = self.pending_app() {
                    return Some(app);
                }
            }
        }

        // Диалоги и дочерние окна уже отслеживаемого приложения
        let focused = self.backend.query_focused_window().ok()?;
        self.registry
            .find_group_containing(focused)
            .map(|(app, _)| app)
    }

    fn pending_app(&mut self) -> Option<AppIdentity> {
        let pending = self.pending.as_ref()?;
        if pending.started_at.elapsed() <= self.config.pending_timeout() {
            return Some(pending.app.clone());
        }

        debug_if_enabled!("Ожидание окон '{}' истекло", pending.app);
        self.pending = None;
        None
    }

    fn dump_groups(&self) {
        let groups = self.registry.snapshot_all();
        info!("Отслеживается групп окон: {}", groups.len());

        for (app, snapshot) in groups {
            let handles: Vec<String> = snapshot.handles.iter().map(ToString::to_string).collect();
            info!(
                "  '{}': [{}], текущее {}, сверок в очереди {}",
                app,
                handles.join(", "),
                snapshot.cursor,
                self.reconciler.pending_for(&app)
            );
        }

        if let Some(pending) = &self.pending {
            info!(
                "  Ожидаются окна '{}' (запуск {:?} назад)",
                pending.app,
                pending.started_at.elapsed()
            );
        }
    }
}
