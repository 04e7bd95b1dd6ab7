//! Visibility rules for entries in the current desktop environment.

use crate::desktop_files::entry::ParsedEntry;

/// Decide whether `entry` should be shown under `current_environments`.
///
/// The first matching rule wins:
/// 1. `Hidden` entries are never shown.
/// 2. A non-empty `OnlyShowIn` must intersect the current environments.
/// 3. A non-empty `NotShowIn` must not intersect them.
/// 4. Everything else is shown.
///
/// `OnlyShowIn` is checked before `NotShowIn`, so it wins when an entry
/// carries both.
pub fn is_eligible<S: AsRef<str>>(entry: &ParsedEntry, current_environments: &[S]) -> bool {
    if entry.hidden {
        return false;
    }
    if !entry.only_show_in.is_empty() {
        return intersects(&entry.only_show_in, current_environments);
    }
    if !entry.not_show_in.is_empty() {
        return !intersects(&entry.not_show_in, current_environments);
    }
    true
}

fn intersects<S: AsRef<str>>(tags: &[String], current_environments: &[S]) -> bool {
    tags.iter()
        .any(|tag| current_environments.iter().any(|env| env.as_ref() == tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(only: &[&str], not: &[&str]) -> ParsedEntry {
        ParsedEntry {
            only_show_in: only.iter().map(|s| s.to_string()).collect(),
            not_show_in: not.iter().map(|s| s.to_string()).collect(),
            ..ParsedEntry::default()
        }
    }

    #[test]
    fn test_plain_entry_is_eligible() {
        assert!(is_eligible(&entry(&[], &[]), &["XFCE"]));
        assert!(is_eligible(&entry(&[], &[]), &[] as &[&str]));
    }

    #[test]
    fn test_hidden_entry_is_never_eligible() {
        let mut hidden = entry(&["XFCE"], &[]);
        hidden.hidden = true;
        assert!(!is_eligible(&hidden, &["XFCE"]));
    }

    #[test]
    fn test_only_show_in() {
        let e = entry(&["GNOME", "KDE"], &[]);
        assert!(is_eligible(&e, &["ubuntu", "GNOME"]));
        assert!(!is_eligible(&e, &["XFCE"]));
        assert!(!is_eligible(&e, &[] as &[&str]));
    }

    #[test]
    fn test_not_show_in() {
        let e = entry(&[], &["KDE"]);
        assert!(!is_eligible(&e, &["KDE"]));
        assert!(is_eligible(&e, &["XFCE"]));
    }

    #[test]
    fn test_only_show_in_takes_precedence() {
        let e = entry(&["A"], &["A"]);
        assert!(is_eligible(&e, &["A"]));
    }
}
