//! Циклический список окон одного приложения с курсором.
//!
//! Узлы хранятся в арене (`SlotMap`) и ссылаются друг на друга ключами,
//! курсор и голова списка тоже являются ключами. Любой поиск по кольцу
//! ограничен числом элементов, поэтому отсутствующее окно не может
//! зациклить обход.

use crate::events::WindowHandle;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct NodeId;
}

#[derive(Debug, Clone)]
struct Node {
    handle: WindowHandle,
    prev: NodeId,
    next: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct WindowGroup {
    nodes: SlotMap<NodeId, Node>,
    /// Текущее окно группы
    cursor: Option<NodeId>,
    /// Начало упорядоченного обхода для snapshot()
    head: Option<NodeId>,
}

impl WindowGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(handle: WindowHandle) -> Self {
        let mut group = Self::new();
        group.insert_before_cursor(handle);
        group
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cursor(&self) -> Option<WindowHandle> {
        self.cursor.map(|id| self.nodes[id].handle)
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.find(handle).is_some()
    }

    /// Вставляет окно перед курсором и делает его текущим.
    ///
    /// Возвращает `false`, если окно уже было в группе: в этом случае
    /// на него только переносится курсор.
    pub fn insert_before_cursor(&mut self, handle: WindowHandle) -> bool {
        if let Some(existing) = self.find(handle) {
            self.cursor = Some(existing);
            return false;
        }

        let Some(cursor) = self.cursor else {
            let id = self.nodes.insert_with_key(|id| Node {
                handle,
                prev: id,
                next: id,
            });
            self.cursor = Some(id);
            self.head = Some(id);
            return true;
        };

        let prev = self.nodes[cursor].prev;
        let id = self.nodes.insert(Node {
            handle,
            prev,
            next: cursor,
        });
        self.nodes[prev].next = id;
        self.nodes[cursor].prev = id;

        if self.head == Some(cursor) {
            self.head = Some(id);
        }
        self.cursor = Some(id);
        true
    }

    /// Переводит курсор на окно, следующее за `reference`, и возвращает его.
    ///
    /// Если `reference` в группе нет, группа не меняется и возвращается `None`.
    pub fn advance(&mut self, reference: WindowHandle) -> Option<WindowHandle> {
        let id = self.find(reference)?;
        let next = self.nodes[id].next;
        self.cursor = Some(next);
        Some(self.nodes[next].handle)
    }

    /// Удаляет окно из группы. Курсор и голова, указывавшие на него,
    /// переходят к следующему окну; у опустевшей группы курсора нет.
    pub fn remove(&mut self, handle: WindowHandle) -> bool {
        let Some(id) = self.find(handle) else {
            return false;
        };

        let Some(node) = self.nodes.remove(id) else {
            return false;
        };

        if self.nodes.is_empty() {
            self.cursor = None;
            self.head = None;
            return true;
        }

        self.nodes[node.prev].next = node.next;
        self.nodes[node.next].prev = node.prev;

        if self.cursor == Some(id) {
            self.cursor = Some(node.next);
        }
        if self.head == Some(id) {
            self.head = Some(node.next);
        }

        debug_assert!(self.cursor.is_some_and(|c| self.nodes.contains_key(c)));
        true
    }

    /// Окна группы по порядку, начиная с головы списка
    pub fn snapshot(&self) -> Vec<WindowHandle> {
        self.iter().collect()
    }

    fn iter(&self) -> impl Iterator<Item = WindowHandle> + '_ {
        let mut current = self.head;
        (0..self.len()).map_while(move |_| {
            let id = current?;
            let node = &self.nodes[id];
            current = Some(node.next);
            Some(node.handle)
        })
    }

    fn find(&self, handle: WindowHandle) -> Option<NodeId> {
        let mut current = self.head?;
        for _ in 0..self.len() {
            let node = &self.nodes[current];
            if node.handle == handle {
                return Some(current);
            }
            current = node.next;
        }
        None
    }
}
