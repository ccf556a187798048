use crate::config::Config;
use crate::error::Result;
use crate::events::{AppIdentity, DisplayEvent, WindowHandle};
use std::collections::HashSet;
use std::sync::Arc;

/// Оконная система, с которой работает диспетчер.
///
/// Методы запросов могут блокироваться на время обмена с сервером,
/// поэтому их нельзя вызывать под блокировкой реестра.
///
/// Синхронные методы - короткие блокирующие вызовы: несколько
/// запросов к серверу с ожиданием ответа. Диспетчер вызывает их прямо из своей задачи,
/// задачи сверки при этом работают на других потоках runtime.
/// Список живых окон может потребовать запроса на каждое окно верхнего
/// уровня, поэтому он асинхронный и выполняется в пуле блокирующих задач.
#[async_trait::async_trait]
pub trait DisplayBackend: Send + Sync {
    /// Следующее событие: нажатие горячей клавиши, создание или закрытие окна
    async fn wait_for_event(&self) -> Result<DisplayEvent>;

    /// Все окна, которыми сейчас управляет оконный менеджер
    async fn query_live_windows(&self) -> Result<HashSet<WindowHandle>>;

    /// Класс окна (WM_CLASS) в нижнем регистре
    fn query_window_class(&self, handle: WindowHandle) -> Result<AppIdentity>;

    fn query_focused_window(&self) -> Result<WindowHandle>;

    /// Фокус, поднятие окна и перенос указателя в его центр.
    /// `true` только если удались все три действия.
    fn activate_window(&self, handle: WindowHandle) -> bool;
}

/// Factory function to create a display backend based on the dry_run flag
pub fn create_display_backend(
    config: Arc<Config>,
    dry_run: bool,
) -> Result<Arc<dyn DisplayBackend>> {
    if dry_run {
        Ok(Arc::new(super::dry_run::DryRunDisplay::new(config)))
    } else {
        Ok(Arc::new(super::x11::X11Display::connect(&config)?))
    }
}
