use crate::error::{Result, SwitcherError};
use crate::events::{AppIdentity, WindowHandle};
use crate::services::window_group::WindowGroup;
use crate::switcher_error;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::debug_if_enabled;

/// Копия состояния группы, которую можно отдать за пределы блокировки
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub handles: Vec<WindowHandle>,
    pub cursor: WindowHandle,
}

impl GroupSnapshot {
    fn of(group: &WindowGroup) -> Option<Self> {
        Some(Self {
            handles: group.snapshot(),
            cursor: group.cursor()?,
        })
    }
}

/// Результат сверки группы с реальным набором окон
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Группа уже удалена
    GroupMissing,
    Unchanged,
    Pruned {
        removed: SmallVec<[WindowHandle; 4]>,
        group_deleted: bool,
    },
}

/// Все группы окон, доступ к которым идёт только через один мьютекс.
///
/// Пустые группы в реестре не хранятся: группа удаляется в той же
/// операции, которая удалила её последнее окно.
#[derive(Debug, Default)]
pub struct Registry {
    groups: Mutex<HashMap<AppIdentity, WindowGroup>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.lock().is_empty()
    }

    pub fn contains(&self, app: &AppIdentity) -> bool {
        self.groups.lock().contains_key(app)
    }

    #[allow(dead_code)]
    pub fn snapshot(&self, app: &AppIdentity) -> Option<GroupSnapshot> {
        self.groups.lock().get(app).and_then(GroupSnapshot::of)
    }

    /// Все группы, отсортированные по имени приложения
    pub fn snapshot_all(&self) -> Vec<(AppIdentity, GroupSnapshot)> {
        let groups = self.groups.lock();
        let mut all: Vec<_> = groups
            .iter()
            .filter_map(|(app, group)| GroupSnapshot::of(group).map(|s| (app.clone(), s)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Приложения, у которых есть группы, по имени
    pub fn apps(&self) -> Vec<AppIdentity> {
        let mut apps: Vec<_> = self.groups.lock().keys().cloned().collect();
        apps.sort();
        apps
    }

    /// Возвращает существующую группу или создаёт новую из одного окна
    #[allow(dead_code)]
    pub fn get_or_create(&self, app: &AppIdentity, first: WindowHandle) -> Result<GroupSnapshot> {
        let mut groups = self.groups.lock();
        let group = groups.entry(app.clone()).or_insert_with(|| {
            info!("Создана группа '{}' с окном {}", app, first);
            WindowGroup::with_window(first)
        });
        Self::snapshot_of(app, group)
    }

    /// Добавляет окно в существующую группу
    #[allow(dead_code)]
    pub fn insert_into(&self, app: &AppIdentity, handle: WindowHandle) -> Result<GroupSnapshot> {
        let mut groups = self.groups.lock();
        let group = groups
            .get_mut(app)
            .ok_or_else(|| SwitcherError::UnknownGroup(app.clone()))?;
        group.insert_before_cursor(handle);
        Self::snapshot_of(app, group)
    }

    /// Добавляет окно в группу приложения, создавая её при необходимости.
    /// Проверка и вставка выполняются под одной блокировкой.
    pub fn track(&self, app: &AppIdentity, handle: WindowHandle) -> Result<GroupSnapshot> {
        let mut groups = self.groups.lock();
        let group = match groups.entry(app.clone()) {
            Entry::Occupied(entry) => {
                let group = entry.into_mut();
                if group.insert_before_cursor(handle) {
                    info!("Окно {} добавлено в группу '{}'", handle, app);
                }
                group
            }
            Entry::Vacant(entry) => {
                info!("Создана группа '{}' с окном {}", app, handle);
                entry.insert(WindowGroup::with_window(handle))
            }
        };
        Self::snapshot_of(app, group)
    }

    /// Группа, в которой есть данное окно
    pub fn find_group_containing(&self, handle: WindowHandle) -> Option<(AppIdentity, GroupSnapshot)> {
        let groups = self.groups.lock();
        groups
            .iter()
            .find(|(_, group)| group.contains(handle))
            .and_then(|(app, group)| GroupSnapshot::of(group).map(|s| (app.clone(), s)))
    }

    #[allow(dead_code)]
    pub fn remove_handle(&self, app: &AppIdentity, handle: WindowHandle) -> bool {
        Self::remove_from(&mut self.groups.lock(), app, handle)
    }

    /// Удаляет закрытое окно из той группы, где оно было
    pub fn forget(&self, handle: WindowHandle) -> Option<AppIdentity> {
        let mut groups = self.groups.lock();
        let app = groups
            .iter()
            .find(|(_, group)| group.contains(handle))
            .map(|(app, _)| app.clone())?;

        Self::remove_from(&mut groups, &app, handle);
        Some(app)
    }

    /// Удаляет из группы окна, которых нет в `live`, и саму группу, если она опустела
    pub fn reconcile(&self, app: &AppIdentity, live: &HashSet<WindowHandle>) -> ReconcileOutcome {
        let mut groups = self.groups.lock();
        let Some(group) = groups.get_mut(app) else {
            return ReconcileOutcome::GroupMissing;
        };

        let stale: SmallVec<[WindowHandle; 4]> = group
            .snapshot()
            .into_iter()
            .filter(|handle| !live.contains(handle))
            .collect();

        if stale.is_empty() {
            return ReconcileOutcome::Unchanged;
        }

        for handle in &stale {
            group.remove(*handle);
        }

        let group_deleted = group.is_empty();
        if group_deleted {
            groups.remove(app);
        }

        ReconcileOutcome::Pruned {
            removed: stale,
            group_deleted,
        }
    }

    /// Выполняет `f` над группой под блокировкой реестра.
    /// `f` не должна опустошать группу.
    pub fn with_group<R>(&self, app: &AppIdentity, f: impl FnOnce(&mut WindowGroup) -> R) -> Option<R> {
        let mut groups = self.groups.lock();
        let group = groups.get_mut(app)?;
        let result = f(group);
        debug_assert!(!group.is_empty(), "группа '{}' опустела внутри with_group", app);
        Some(result)
    }

    /// Удаляет окно и саму группу, если она опустела
    fn remove_from(
        groups: &mut HashMap<AppIdentity, WindowGroup>,
        app: &AppIdentity,
        handle: WindowHandle,
    ) -> bool {
        let Some(group) = groups.get_mut(app) else {
            return false;
        };
        let removed = group.remove(handle);
        if removed {
            debug_if_enabled!("Окно {} удалено из группы '{}'", handle, app);
        }
        if group.is_empty() {
            groups.remove(app);
            info!("Группа '{}' удалена: окон не осталось", app);
        }
        removed
    }

    fn snapshot_of(app: &AppIdentity, group: &WindowGroup) -> Result<GroupSnapshot> {
        GroupSnapshot::of(group)
            .ok_or_else(|| switcher_error!(internal, "у группы '{}' нет текущего окна", app))
    }
}
