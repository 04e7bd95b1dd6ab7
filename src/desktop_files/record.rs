//! In-memory record for a single entry file.
//!
//! An [`EntryRecord`] is created the first time its path loads successfully
//! and is then updated in place, so anything holding on to it by path (menu
//! rows, favorites) stays valid across edits of the file.

use crate::desktop_files::context::{ContextHandle, ContextRegistry};
use crate::desktop_files::entry::ParsedEntry;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

/// Prefix marking the logical name of entries that run in disposable contexts.
pub const DISPOSABLE_PREFIX: &str = "@disp:";

/// Category carried by entries generated for a specific context.
pub const CONTEXT_CATEGORY: &str = "X-Qubes-VM";

/// Index of the context name in generated commands
/// (`qvm-run -q -a --service -- <context> ...`).
const CONTEXT_TOKEN_POSITION: usize = 5;

/// Identifier of a dependent entry within its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(pub u64);

/// A UI container holding dependent entries.
pub trait EntryContainer {
    /// Drop the child with `key`.
    fn remove(&self, key: EntryKey);

    /// Re-apply the container's visibility filter.
    fn invalidate_filter(&self);
}

/// A UI element created for a record and owned outside the cache.
pub trait DependentEntry {
    /// Key of this element within its parent.
    fn key(&self) -> EntryKey;

    /// Refresh displayed data from the (possibly updated) record.
    fn update_contents(&self, record: &EntryRecord);

    /// Container currently holding this element, if any.
    fn parent(&self) -> Option<Rc<dyn EntryContainer>>;
}

/// Fields derived from a parsed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EntryData {
    owning_context_name: Option<String>,
    owning_context: Option<ContextHandle>,
    display_name: String,
    context_icon: Option<String>,
    entry_icon: Option<String>,
    disposable: bool,
    logical_name: String,
    exec_tokens: Vec<String>,
    categories: Vec<String>,
}

impl EntryData {
    fn derive(path: &Path, entry: &ParsedEntry, contexts: &dyn ContextRegistry) -> Self {
        let owning_context = entry
            .context_name
            .as_deref()
            .and_then(|name| contexts.resolve(name));

        let raw_name = entry.name.clone().unwrap_or_default();
        let display_name = match &owning_context {
            Some(context) => raw_name
                .strip_prefix(&format!("{}: ", context.name))
                .map(str::to_string)
                .unwrap_or(raw_name),
            None => raw_name,
        };

        let disposable = entry.is_disposable();
        let base_name = entry.app_name.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let logical_name = if disposable {
            format!("{DISPOSABLE_PREFIX}{base_name}")
        } else {
            base_name
        };

        Self {
            owning_context_name: entry.context_name.clone(),
            context_icon: owning_context.as_ref().and_then(|c| c.icon.clone()),
            owning_context,
            display_name,
            entry_icon: entry.icon.clone(),
            disposable,
            logical_name,
            exec_tokens: entry
                .exec
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            categories: entry.categories.clone(),
        }
    }
}

/// One cached launcher, keyed by the path of its entry file.
#[derive(Debug)]
pub struct EntryRecord {
    source_path: PathBuf,
    data: EntryData,
    dependent_entries: Vec<Weak<dyn DependentEntry>>,
}

impl EntryRecord {
    pub(crate) fn new(source_path: PathBuf) -> Self {
        Self {
            source_path,
            data: EntryData::default(),
            dependent_entries: Vec::new(),
        }
    }

    /// Re-derive all fields from `entry`, resolving the owning context again.
    ///
    /// Returns whether any derived field changed.
    pub(crate) fn refresh(&mut self, entry: &ParsedEntry, contexts: &dyn ContextRegistry) -> bool {
        let data = EntryData::derive(&self.source_path, entry, contexts);
        if data == self.data {
            return false;
        }
        self.data = data;
        true
    }

    /// Ask every live dependent to redraw from this record.
    pub(crate) fn refresh_dependents(&mut self) {
        self.dependent_entries.retain(|entry| entry.strong_count() > 0);
        let live: Vec<_> = self
            .dependent_entries
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for entry in live {
            entry.update_contents(self);
        }
    }

    /// Detach every live dependent from its container.
    pub(crate) fn detach_dependents(&mut self) {
        for child in self.dependent_entries.drain(..).filter_map(|w| w.upgrade()) {
            if let Some(parent) = child.parent() {
                parent.remove(child.key());
                parent.invalidate_filter();
            }
        }
    }

    /// Track a UI element created for this record.
    ///
    /// Only a weak reference is kept; the caller owns the element.
    pub fn add_dependent<D: DependentEntry + 'static>(&mut self, entry: &Rc<D>) {
        let weak: Weak<D> = Rc::downgrade(entry);
        self.dependent_entries.push(weak);
    }

    /// Number of dependents that are still alive.
    pub fn dependent_count(&self) -> usize {
        self.dependent_entries
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Path of the backing entry file.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Context name as written in the entry.
    pub fn owning_context_name(&self) -> Option<&str> {
        self.data.owning_context_name.as_deref()
    }

    /// Context resolved at the last load.
    pub fn owning_context(&self) -> Option<&ContextHandle> {
        self.data.owning_context.as_ref()
    }

    /// Name shown to the user, without a redundant `"<context>: "` prefix.
    pub fn display_name(&self) -> &str {
        &self.data.display_name
    }

    /// Icon of the owning context.
    pub fn context_icon(&self) -> Option<&str> {
        self.data.context_icon.as_deref()
    }

    /// Icon declared by the entry.
    pub fn entry_icon(&self) -> Option<&str> {
        self.data.entry_icon.as_deref()
    }

    /// Whether the entry can launch in a disposable context.
    pub fn is_disposable(&self) -> bool {
        self.data.disposable
    }

    /// Stable identifier, prefixed with [`DISPOSABLE_PREFIX`] for disposable entries.
    pub fn logical_name(&self) -> &str {
        &self.data.logical_name
    }

    /// Tokenized `Exec` command.
    pub fn exec_tokens(&self) -> &[String] {
        &self.data.exec_tokens
    }

    /// Categories of the entry.
    pub fn categories(&self) -> &[String] {
        &self.data.categories
    }

    /// Whether the entry was generated for a particular context.
    pub fn is_context_specific(&self) -> bool {
        self.data.categories.iter().any(|c| c == CONTEXT_CATEGORY)
    }

    /// Command to launch this entry in `target`.
    ///
    /// Without a target, or when the target is the owning context, the
    /// command is returned as is. Otherwise every token naming the owning
    /// context is replaced by the target's name. This is how applications of
    /// a disposable template are started in a freshly created disposable,
    /// which has no entry files of its own.
    pub fn command_for_context(&self, target: Option<&ContextHandle>) -> Vec<String> {
        let command = &self.data.exec_tokens;
        let Some(target) = target else {
            return command.clone();
        };
        let Some(current) = self.data.owning_context.as_ref() else {
            tracing::warn!(
                "Cannot run {} in {}: entry has no resolved context",
                self.source_path.display(),
                target
            );
            return command.clone();
        };
        if current.name == target.name {
            return command.clone();
        }

        check_context_token(command, &current.name);
        command
            .iter()
            .map(|token| {
                if *token == current.name {
                    target.name.clone()
                } else {
                    token.clone()
                }
            })
            .collect()
    }
}

fn check_context_token(command: &[String], context: &str) {
    match command.get(CONTEXT_TOKEN_POSITION) {
        Some(token) if token == context => {}
        Some(_) => tracing::warn!("Unexpected command for a disposable context: {:?}", command),
        None => tracing::debug!(
            "Command too short to check context position, substituting anyway: {:?}",
            command
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop_files::context::StaticContextRegistry;
    use std::cell::Cell;

    fn registry() -> StaticContextRegistry {
        [
            ContextHandle::new("personal", Some("appvm-green".into())),
            ContextHandle::new("tmpl", None),
        ]
        .into_iter()
        .collect()
    }

    fn firefox() -> ParsedEntry {
        ParsedEntry {
            name: Some("personal: Firefox".into()),
            icon: Some("firefox".into()),
            exec: Some("qvm-run -q -a --service -- personal qubes.StartApp+firefox".into()),
            categories: vec!["Network".into(), CONTEXT_CATEGORY.into()],
            context_name: Some("personal".into()),
            ..ParsedEntry::default()
        }
    }

    fn loaded(path: &str, entry: &ParsedEntry, contexts: &StaticContextRegistry) -> EntryRecord {
        let mut record = EntryRecord::new(PathBuf::from(path));
        record.refresh(entry, contexts);
        record
    }

    #[test]
    fn test_refresh_derives_fields() {
        let record = loaded("/apps/personal-firefox.desktop", &firefox(), &registry());

        assert_eq!(record.display_name(), "Firefox");
        assert_eq!(record.owning_context_name(), Some("personal"));
        assert_eq!(record.owning_context().map(|c| c.name.as_str()), Some("personal"));
        assert_eq!(record.context_icon(), Some("appvm-green"));
        assert_eq!(record.entry_icon(), Some("firefox"));
        assert_eq!(record.logical_name(), "personal-firefox.desktop");
        assert_eq!(record.exec_tokens().len(), 7);
        assert!(record.is_context_specific());
        assert!(!record.is_disposable());
    }

    #[test]
    fn test_unresolved_context_keeps_name() {
        let record = loaded(
            "/apps/personal-firefox.desktop",
            &firefox(),
            &StaticContextRegistry::new(),
        );

        assert!(record.owning_context().is_none());
        assert_eq!(record.owning_context_name(), Some("personal"));
        assert_eq!(record.display_name(), "personal: Firefox");
        assert_eq!(record.context_icon(), None);
        assert_eq!(record.entry_icon(), Some("firefox"));
    }

    #[test]
    fn test_disposable_logical_name() {
        let entry = ParsedEntry {
            app_name: Some("xterm".into()),
            non_disposable_exec: Some("qvm-run -- tmpl xterm".into()),
            ..firefox()
        };
        let record = loaded("/apps/tmpl-xterm.desktop", &entry, &registry());

        assert!(record.is_disposable());
        assert_eq!(record.logical_name(), "@disp:xterm");
    }

    #[test]
    fn test_refresh_reports_changes() {
        let contexts = registry();
        let mut record = loaded("/apps/personal-firefox.desktop", &firefox(), &contexts);

        assert!(!record.refresh(&firefox(), &contexts));

        let renamed = ParsedEntry {
            name: Some("personal: Firefox ESR".into()),
            ..firefox()
        };
        assert!(record.refresh(&renamed, &contexts));
        assert_eq!(record.display_name(), "Firefox ESR");
    }

    #[test]
    fn test_refresh_re_resolves_context() {
        let contexts = registry();
        let mut record = loaded("/apps/personal-firefox.desktop", &firefox(), &contexts);
        assert!(record.owning_context().is_some());

        contexts.remove("personal");
        assert!(record.refresh(&firefox(), &contexts));
        assert!(record.owning_context().is_none());
    }

    fn template_record() -> EntryRecord {
        let entry = ParsedEntry {
            exec: Some("run --ctx tmpl -e cmd".into()),
            context_name: Some("tmpl".into()),
            ..ParsedEntry::default()
        };
        loaded("/apps/tmpl-cmd.desktop", &entry, &registry())
    }

    #[test]
    fn test_command_without_target() {
        let record = template_record();
        assert_eq!(record.command_for_context(None), record.exec_tokens());
    }

    #[test]
    fn test_command_for_same_context() {
        let record = template_record();
        let same = ContextHandle::new("tmpl", None);
        assert_eq!(record.command_for_context(Some(&same)), record.exec_tokens());
    }

    #[test]
    fn test_command_substitutes_context() {
        let record = template_record();
        let child = ContextHandle::new("child", None);

        assert_eq!(
            record.command_for_context(Some(&child)),
            vec!["run", "--ctx", "child", "-e", "cmd"]
        );
        // The record itself is untouched.
        assert_eq!(record.exec_tokens()[2], "tmpl");
    }

    #[test]
    fn test_command_substitutes_despite_unexpected_position() {
        let entry = ParsedEntry {
            exec: Some("qvm-run -q -a --service -- other tmpl".into()),
            context_name: Some("tmpl".into()),
            ..ParsedEntry::default()
        };
        let record = loaded("/apps/odd.desktop", &entry, &registry());
        let child = ContextHandle::new("disp42", None);

        assert_eq!(
            record.command_for_context(Some(&child)),
            vec!["qvm-run", "-q", "-a", "--service", "--", "other", "disp42"]
        );
    }

    #[test]
    fn test_command_without_resolved_context() {
        let record = loaded(
            "/apps/tmpl-cmd.desktop",
            &ParsedEntry {
                exec: Some("run --ctx tmpl".into()),
                context_name: Some("tmpl".into()),
                ..ParsedEntry::default()
            },
            &StaticContextRegistry::new(),
        );
        let child = ContextHandle::new("child", None);

        assert_eq!(
            record.command_for_context(Some(&child)),
            vec!["run", "--ctx", "tmpl"]
        );
    }

    struct Counter {
        updates: Cell<usize>,
    }

    impl DependentEntry for Counter {
        fn key(&self) -> EntryKey {
            EntryKey(0)
        }

        fn update_contents(&self, _record: &EntryRecord) {
            self.updates.set(self.updates.get() + 1);
        }

        fn parent(&self) -> Option<Rc<dyn EntryContainer>> {
            None
        }
    }

    #[test]
    fn test_dead_dependents_are_skipped() {
        let mut record = template_record();
        let kept = Rc::new(Counter { updates: Cell::new(0) });
        let dropped = Rc::new(Counter { updates: Cell::new(0) });
        record.add_dependent(&kept);
        record.add_dependent(&dropped);
        drop(dropped);

        record.refresh_dependents();

        assert_eq!(kept.updates.get(), 1);
        assert_eq!(record.dependent_count(), 1);
    }
}
