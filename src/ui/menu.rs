//! Headless application menu built from cache records.
//!
//! A [`MenuList`] owns its [`MenuEntry`] rows; records only keep weak
//! references to them. When a record is reloaded its rows redraw from it,
//! and when it is removed they detach themselves from the list.

use crate::desktop_files::{DependentEntry, EntryContainer, EntryKey, EntryRecord};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Predicate deciding which rows are visible.
pub type RowFilter = Box<dyn Fn(&MenuRow) -> bool>;

/// Callback run after the filter is re-applied, with the visible row count.
pub type InvalidateCallback = Box<dyn Fn(usize)>;

/// Displayed contents of a menu row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuRow {
    /// Label shown to the user.
    pub label: String,
    /// Icon, preferring the entry's own over its context's.
    pub icon: Option<String>,
    /// Logical name of the launcher.
    pub logical_name: String,
    /// Context the launcher runs in.
    pub context: Option<String>,
    /// Command to run.
    pub command: Vec<String>,
}

impl MenuRow {
    fn from_record(record: &EntryRecord) -> Self {
        Self {
            label: record.display_name().to_string(),
            icon: record
                .entry_icon()
                .or(record.context_icon())
                .map(str::to_string),
            logical_name: record.logical_name().to_string(),
            context: record.owning_context().map(|c| c.name.clone()),
            command: record.exec_tokens().to_vec(),
        }
    }
}

/// A single launcher row in a [`MenuList`].
#[derive(Debug)]
pub struct MenuEntry {
    key: EntryKey,
    parent: Weak<MenuList>,
    row: RefCell<MenuRow>,
}

impl MenuEntry {
    /// Current contents of the row.
    pub fn row(&self) -> MenuRow {
        self.row.borrow().clone()
    }

    /// Label shown to the user.
    pub fn label(&self) -> String {
        self.row.borrow().label.clone()
    }
}

impl DependentEntry for MenuEntry {
    fn key(&self) -> EntryKey {
        self.key
    }

    fn update_contents(&self, record: &EntryRecord) {
        *self.row.borrow_mut() = MenuRow::from_record(record);
    }

    fn parent(&self) -> Option<Rc<dyn EntryContainer>> {
        let parent: Rc<dyn EntryContainer> = self.parent.upgrade()?;
        Some(parent)
    }
}

/// Flat list of launcher rows with a visibility filter.
pub struct MenuList {
    rows: RefCell<IndexMap<EntryKey, Rc<MenuEntry>>>,
    visible: RefCell<Vec<EntryKey>>,
    next_key: Cell<u64>,
    filter: RefCell<Option<RowFilter>>,
    invalidate_cb: Option<InvalidateCallback>,
    invalidations: Cell<usize>,
}

impl MenuList {
    /// Create an empty list showing every row.
    pub fn new() -> Rc<Self> {
        MenuListBuilder::new().build()
    }

    /// Create a row for `record`, add it to the list and register it with
    /// the record.
    ///
    /// Meant to be called from a cache observer.
    pub fn append_for(self: &Rc<Self>, record: &mut EntryRecord) -> Rc<MenuEntry> {
        let key = EntryKey(self.next_key.get());
        self.next_key.set(key.0 + 1);

        let entry = Rc::new(MenuEntry {
            key,
            parent: Rc::downgrade(self),
            row: RefCell::new(MenuRow::from_record(record)),
        });
        self.rows.borrow_mut().insert(key, entry.clone());
        record.add_dependent(&entry);
        self.invalidate_filter();
        entry
    }

    /// Replace the visibility filter and re-apply it.
    pub fn set_filter(&self, filter: RowFilter) {
        *self.filter.borrow_mut() = Some(filter);
        self.invalidate_filter();
    }

    /// Number of rows, visible or not.
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    /// Whether the list has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// Row with `key`, if present.
    pub fn get(&self, key: EntryKey) -> Option<Rc<MenuEntry>> {
        self.rows.borrow().get(&key).cloned()
    }

    /// Labels of the rows that passed the filter at the last invalidation.
    pub fn visible_labels(&self) -> Vec<String> {
        let rows = self.rows.borrow();
        self.visible
            .borrow()
            .iter()
            .filter_map(|key| rows.get(key))
            .map(|entry| entry.label())
            .collect()
    }

    /// How many times the filter has been re-applied.
    pub fn invalidation_count(&self) -> usize {
        self.invalidations.get()
    }
}

impl EntryContainer for MenuList {
    fn remove(&self, key: EntryKey) {
        if self.rows.borrow_mut().shift_remove(&key).is_none() {
            tracing::debug!("Menu row {:?} was already removed", key);
        }
    }

    fn invalidate_filter(&self) {
        let visible: Vec<EntryKey> = {
            let rows = self.rows.borrow();
            let filter = self.filter.borrow();
            rows.iter()
                .filter(|(_, entry)| match filter.as_ref() {
                    Some(filter) => filter(&*entry.row.borrow()),
                    None => true,
                })
                .map(|(key, _)| *key)
                .collect()
        };
        let count = visible.len();
        *self.visible.borrow_mut() = visible;
        self.invalidations.set(self.invalidations.get() + 1);

        if let Some(ref cb) = self.invalidate_cb {
            cb(count);
        }
    }
}

impl std::fmt::Debug for MenuList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuList")
            .field("rows", &self.rows.borrow().len())
            .field("visible", &self.visible.borrow().len())
            .field("invalidations", &self.invalidations.get())
            .finish()
    }
}

/// Builder for [`MenuList`] with optional filter and callbacks.
#[derive(Default)]
pub struct MenuListBuilder {
    filter: Option<RowFilter>,
    invalidate_cb: Option<InvalidateCallback>,
}

impl MenuListBuilder {
    /// Builder for a list with no filter and no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the visibility filter.
    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the callback run after each filter invalidation.
    pub fn on_invalidate(mut self, cb: InvalidateCallback) -> Self {
        self.invalidate_cb = Some(cb);
        self
    }

    /// Build the list.
    pub fn build(self) -> Rc<MenuList> {
        Rc::new(MenuList {
            rows: RefCell::new(IndexMap::new()),
            visible: RefCell::new(Vec::new()),
            next_key: Cell::new(0),
            filter: RefCell::new(self.filter),
            invalidate_cb: self.invalidate_cb,
            invalidations: Cell::new(0),
        })
    }
}
