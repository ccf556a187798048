use crate::config::Config;
use crate::error::{Result, SwitcherError};
use crate::events::{AppIdentity, DisplayEvent, HotkeyCode, WindowHandle};
use crate::switcher_error;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt, EventMask,
    GrabMode, InputFocus, ModMask, StackMode, Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::r#trait::DisplayBackend;

#[derive(Debug, Clone, Copy)]
struct Atoms {
    net_client_list: Atom,
    net_active_window: Atom,
    wm_state: Atom,
}

impl Atoms {
    fn intern(conn: &RustConnection) -> Result<Self> {
        let intern = |name: &[u8]| -> Result<Atom> { Ok(conn.intern_atom(false, name)?.reply()?.atom) };

        Ok(Self {
            net_client_list: intern(b"_NET_CLIENT_LIST")?,
            net_active_window: intern(b"_NET_ACTIVE_WINDOW")?,
            wm_state: intern(b"WM_STATE")?,
        })
    }
}

pub struct X11Display {
    conn: Arc<RustConnection>,
    root: Window,
    atoms: Atoms,
    events: AsyncMutex<mpsc::UnboundedReceiver<Result<DisplayEvent>>>,
}

impl X11Display {
    /// Подключение, захват клавиш и подписка на события корневого окна.
    /// Любая ошибка здесь фатальна.
    pub fn connect(config: &Config) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let root = conn.setup().roots[screen_num].root;
        info!("Подключено к X-серверу, экран {}, корневое окно 0x{:x}", screen_num, root);

        let atoms = Atoms::intern(&conn)?;
        Self::grab_hotkeys(&conn, root, &config.grabbed_keycodes())?;
        Self::subscribe_to_window_events(&conn, root)?;
        conn.flush()?;

        let conn = Arc::new(conn);
        let (tx, rx) = mpsc::unbounded_channel();
        Self::spawn_event_reader(Arc::clone(&conn), tx)?;

        Ok(Self {
            conn,
            root,
            atoms,
            events: AsyncMutex::new(rx),
        })
    }

    fn grab_hotkeys(conn: &RustConnection, root: Window, codes: &[HotkeyCode]) -> Result<()> {
        for code in codes {
            conn.grab_key(
                true,
                root,
                ModMask::ANY,
                code.value(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?
            .check()
            .map_err(|e| switcher_error!(grab, "{}: {}", code, e))?;
            info!("Захвачена клавиша {}", code);
        }
        Ok(())
    }

    fn subscribe_to_window_events(conn: &RustConnection, root: Window) -> Result<()> {
        let attributes = ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_NOTIFY);
        conn.change_window_attributes(root, &attributes)?
            .check()
            .map_err(|e| {
                switcher_error!(service_unavailable, "подписка на события окон не удалась: {}", e)
            })?;
        Ok(())
    }

    /// Блокирующее чтение событий в отдельном потоке
    fn spawn_event_reader(
        conn: Arc<RustConnection>,
        tx: mpsc::UnboundedSender<Result<DisplayEvent>>,
    ) -> Result<()> {
        std::thread::Builder::new()
            .name("x11-events".to_string())
            .spawn(move || loop {
                match conn.wait_for_event() {
                    Ok(event) => {
                        if let Some(event) = Self::translate(event) {
                            if tx.send(Ok(event)).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        error!("Ошибка чтения событий X11: {}", e);
                        let _ = tx.send(Err(e.into()));
                        break;
                    }
                }
            })?;
        Ok(())
    }

    fn translate(event: Event) -> Option<DisplayEvent> {
        match event {
            // Реагируем на отпускание: захват с ModMask::ANY присылает и нажатие, и отпускание
            Event::KeyRelease(e) => Some(DisplayEvent::HotkeyPressed {
                code: HotkeyCode::new(e.detail),
            }),
            Event::CreateNotify(e) if !e.override_redirect => Some(DisplayEvent::WindowCreated {
                handle: WindowHandle::new(e.window),
            }),
            Event::DestroyNotify(e) => Some(DisplayEvent::WindowDestroyed {
                handle: WindowHandle::new(e.window),
            }),
            Event::Error(e) => {
                debug!("Асинхронная ошибка X11: {:?}", e);
                None
            }
            _ => None,
        }
    }

    fn live_windows(conn: &RustConnection, root: Window, atoms: Atoms) -> Result<HashSet<WindowHandle>> {
        let clients = conn
            .get_property(false, root, atoms.net_client_list, AtomEnum::WINDOW, 0, u32::MAX)?
            .reply()?;
        if let Some(windows) = clients.value32() {
            return Ok(windows.map(WindowHandle::new).collect());
        }

        // Оконный менеджер без EWMH: берём окна верхнего уровня с WM_STATE
        debug!("_NET_CLIENT_LIST недоступен, перебираем дерево окон");
        let tree = conn.query_tree(root)?.reply()?;
        let mut live = HashSet::new();
        for window in tree.children {
            let state = conn
                .get_property(false, window, atoms.wm_state, AtomEnum::ANY, 0, 1)?
                .reply();
            if matches!(state, Ok(ref prop) if !prop.value.is_empty()) {
                live.insert(WindowHandle::new(window));
            }
        }
        Ok(live)
    }

    fn set_focus(&self, window: Window) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::PARENT, window, x11rb::CURRENT_TIME)?
            .check()?;
        Ok(())
    }

    fn raise(&self, window: Window) -> Result<()> {
        let aux = ConfigureWindowAux::new().stack_mode(StackMode::ABOVE);
        self.conn.configure_window(window, &aux)?.check()?;
        Ok(())
    }

    fn center_pointer(&self, window: Window) -> Result<()> {
        let geometry = self.conn.get_geometry(window)?.reply()?;
        // Координаты относительно самого окна
        let x = (geometry.width / 2) as i16;
        let y = (geometry.height / 2) as i16;
        self.conn
            .warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, x, y)?
            .check()?;
        Ok(())
    }
}

/// Класс из WM_CLASS: вторая из двух строк, разделённых нулевым байтом
fn parse_wm_class(value: &[u8]) -> Option<AppIdentity> {
    let mut parts = value.split(|&b| b == 0).filter(|part| !part.is_empty());
    let instance = parts.next()?;
    let class = parts.next().unwrap_or(instance);
    Some(AppIdentity::new(String::from_utf8_lossy(class)))
}

#[async_trait::async_trait]
impl DisplayBackend for X11Display {
    async fn wait_for_event(&self) -> Result<DisplayEvent> {
        let mut events = self.events.lock().await;
        events.recv().await.unwrap_or_else(|| {
            Err(switcher_error!(service_unavailable, "поток событий X11 завершился"))
        })
    }

    async fn query_live_windows(&self) -> Result<HashSet<WindowHandle>> {
        let conn = Arc::clone(&self.conn);
        let root = self.root;
        let atoms = self.atoms;

        tokio::task::spawn_blocking(move || Self::live_windows(&conn, root, atoms))
            .await
            .map_err(|e| switcher_error!(internal, "запрос списка окон прерван: {}", e))?
    }

    fn query_window_class(&self, handle: WindowHandle) -> Result<AppIdentity> {
        let reply = self
            .conn
            .get_property(false, handle.value(), AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)?
            .reply()?;

        match parse_wm_class(&reply.value) {
            Some(class) => Ok(class),
            None => SwitcherError::query_failed(format!("WM_CLASS не задан для окна {}", handle)),
        }
    }

    fn query_focused_window(&self) -> Result<WindowHandle> {
        let active = self
            .conn
            .get_property(false, self.root, self.atoms.net_active_window, AtomEnum::WINDOW, 0, 1)?
            .reply()?;

        let active_window = active
            .value32()
            .and_then(|mut windows| windows.next())
            .filter(|&window| window != x11rb::NONE);
        if let Some(window) = active_window {
            return Ok(WindowHandle::new(window));
        }

        let focus = self.conn.get_input_focus()?.reply()?.focus;
        Ok(WindowHandle::new(focus))
    }

    fn activate_window(&self, handle: WindowHandle) -> bool {
        let window = handle.value();
        let steps = [
            ("фокус", self.set_focus(window)),
            ("поднятие", self.raise(window)),
            ("перенос указателя", self.center_pointer(window)),
        ];

        let mut success = true;
        for (step, result) in steps {
            if let Err(e) = result {
                warn!("Активация окна {}: {} не удалось: {}", handle, step, e);
                success = false;
            }
        }
        success
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        info!("Освобождение захваченных клавиш");
        // Код 0 означает AnyKey
        let released = self
            .conn
            .ungrab_key(0u8, self.root, ModMask::ANY)
            .map_err(SwitcherError::from)
            .and_then(|_| self.conn.flush().map_err(SwitcherError::from));
        if let Err(e) = released {
            error!("Не удалось освободить клавиши: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wm_class_takes_class_part() {
        assert_eq!(
            parse_wm_class(b"gnome-terminal-server\0Gnome-terminal-server\0"),
            Some(AppIdentity::new("gnome-terminal-server"))
        );
        assert_eq!(
            parse_wm_class(b"Navigator\0Vivaldi-stable\0"),
            Some(AppIdentity::new("vivaldi-stable"))
        );
    }

    #[test]
    fn test_parse_wm_class_without_class_part() {
        assert_eq!(parse_wm_class(b"obsidian\0"), Some(AppIdentity::new("obsidian")));
        assert_eq!(parse_wm_class(b""), None);
        assert_eq!(parse_wm_class(b"\0\0"), None);
    }

    #[test]
    #[ignore] // Requires X11 display
    fn test_live_windows_on_real_display() {
        let (conn, screen_num) = x11rb::connect(None).unwrap();
        let root = conn.setup().roots[screen_num].root;
        let atoms = Atoms::intern(&conn).unwrap();
        let live = X11Display::live_windows(&conn, root, atoms).unwrap();
        println!("Live windows: {}", live.len());
    }
}
