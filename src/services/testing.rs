//! Тестовые двойники оконной системы и запуска приложений

use crate::error::{Result, SwitcherError};
use crate::events::{AppIdentity, DisplayEvent, WindowHandle};
use crate::services::display::DisplayBackend;
use crate::services::launcher::Launcher;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

#[derive(Debug, Default)]
struct FakeState {
    live: HashSet<WindowHandle>,
    classes: HashMap<WindowHandle, AppIdentity>,
    focused: Option<WindowHandle>,
    activations: Vec<WindowHandle>,
    activation_fails: bool,
    live_query_fails: bool,
    live_queries: usize,
}

pub struct FakeDisplay {
    state: Mutex<FakeState>,
    tx: Mutex<Option<mpsc::UnboundedSender<DisplayEvent>>>,
    rx: AsyncMutex<mpsc::UnboundedReceiver<DisplayEvent>>,
}

impl FakeDisplay {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(FakeState::default()),
            tx: Mutex::new(Some(tx)),
            rx: AsyncMutex::new(rx),
        }
    }

    pub fn push_event(&self, event: DisplayEvent) {
        self.tx.lock().as_ref().unwrap().send(event).unwrap();
    }

    /// Закрывает поток событий, как при потере соединения
    pub fn disconnect(&self) {
        self.tx.lock().take();
    }

    pub fn set_live(&self, ids: &[u32]) {
        self.state.lock().live = ids.iter().map(|&id| WindowHandle::new(id)).collect();
    }

    pub fn open(&self, id: u32, class: &str) {
        let mut state = self.state.lock();
        state.live.insert(WindowHandle::new(id));
        state.classes.insert(WindowHandle::new(id), AppIdentity::new(class));
    }

    pub fn set_focused(&self, id: Option<u32>) {
        self.state.lock().focused = id.map(WindowHandle::new);
    }

    pub fn fail_activation(&self) {
        self.state.lock().activation_fails = true;
    }

    pub fn fail_live_query(&self) {
        self.state.lock().live_query_fails = true;
    }

    pub fn activations(&self) -> Vec<WindowHandle> {
        self.state.lock().activations.clone()
    }

    pub fn live_queries(&self) -> usize {
        self.state.lock().live_queries
    }
}

#[async_trait::async_trait]
impl DisplayBackend for FakeDisplay {
    async fn wait_for_event(&self) -> Result<DisplayEvent> {
        self.rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| SwitcherError::ServiceUnavailable("события закончились".to_string()))
    }

    async fn query_live_windows(&self) -> Result<HashSet<WindowHandle>> {
        let mut state = self.state.lock();
        state.live_queries += 1;
        if state.live_query_fails {
            return SwitcherError::query_failed("список окон недоступен");
        }
        Ok(state.live.clone())
    }

    fn query_window_class(&self, handle: WindowHandle) -> Result<AppIdentity> {
        match self.state.lock().classes.get(&handle) {
            Some(class) => Ok(class.clone()),
            None => SwitcherError::query_failed(format!("нет класса для {}", handle)),
        }
    }

    fn query_focused_window(&self) -> Result<WindowHandle> {
        match self.state.lock().focused {
            Some(handle) => Ok(handle),
            None => SwitcherError::query_failed("фокус недоступен"),
        }
    }

    fn activate_window(&self, handle: WindowHandle) -> bool {
        let mut state = self.state.lock();
        state.activations.push(handle);
        if state.activation_fails {
            return false;
        }
        state.focused = Some(handle);
        true
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<String>>,
    fails: bool,
}

impl RecordingLauncher {
    pub fn failing() -> Self {
        Self {
            launched: Mutex::new(Vec::new()),
            fails: true,
        }
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, command: &str) -> bool {
        self.launched.lock().push(command.to_string());
        !self.fails
    }
}
