//! Navigation history ledger
//!
//! The host owns the real history; the navigator only keeps the keys it
//! stamped on the entries it created, in order, plus the position of the
//! current one. When a pop lands on an entry the ledger can tell how far
//! the host moved, which is what it takes to undo a refused move.
//!
//! - pushing truncates any forward keys, like the host does;
//! - an unknown key has no position; the navigator decides what it means.

/// Keys of the history entries created while listening
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLedger {
    keys: Vec<String>,
    index: usize,
}

impl HistoryLedger {
    /// A ledger with one unnamed entry, the one current when listening began
    pub fn new() -> Self {
        Self {
            keys: vec![String::new()],
            index: 0,
        }
    }

    /// Position of the current entry
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn current_key(&self) -> &str {
        &self.keys[self.index]
    }

    /// Record a new entry after the current one, dropping forward keys
    pub fn push(&mut self, key: String) {
        self.keys.truncate(self.index + 1);
        self.keys.push(key);
        self.index += 1;
    }

    /// Rename the current entry
    pub fn replace(&mut self, key: String) {
        self.keys[self.index] = key;
    }

    /// Position of the last entry with `key`
    pub fn position(&self, key: Option<&str>) -> Option<usize> {
        key.and_then(|key| self.keys.iter().rposition(|k| k == key))
    }

    /// Make `index` current; out-of-range positions are clamped.
    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.keys.len() - 1);
    }

    /// Host delta that moves from the current entry to `target`
    pub fn delta_to(&self, target: usize) -> isize {
        target as isize - self.index as isize
    }
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(keys: &[&str]) -> HistoryLedger {
        let mut ledger = HistoryLedger::new();
        for key in keys {
            ledger.push(key.to_string());
        }
        ledger
    }

    #[test]
    fn test_new_ledger() {
        let ledger = HistoryLedger::new();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.index(), 0);
        assert_eq!(ledger.current_key(), "");
    }

    #[test]
    fn test_push_moves_forward() {
        let ledger = ledger(&["a", "b"]);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.index(), 2);
        assert_eq!(ledger.current_key(), "b");
    }

    #[test]
    fn test_push_truncates_forward_keys() {
        let mut ledger = ledger(&["a", "b", "c"]);
        ledger.set_index(1);
        ledger.push("d".to_string());

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.index(), 2);
        assert_eq!(ledger.position(Some("c")), None);
        assert_eq!(ledger.position(Some("d")), Some(2));
    }

    #[test]
    fn test_replace_renames_current() {
        let mut ledger = HistoryLedger::new();
        ledger.replace("start".to_string());
        assert_eq!(ledger.current_key(), "start");
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_position_uses_last_occurrence() {
        let mut ledger = ledger(&["a", "b"]);
        ledger.push("a".to_string());
        assert_eq!(ledger.position(Some("a")), Some(3));
    }

    #[test]
    fn test_unknown_key_has_no_position() {
        let ledger = ledger(&["a"]);
        assert_eq!(ledger.position(Some("zzz")), None);
        assert_eq!(ledger.position(None), None);
    }

    #[test]
    fn test_delta_and_clamp() {
        let mut ledger = ledger(&["a", "b", "c"]);
        assert_eq!(ledger.delta_to(1), -2);

        ledger.set_index(1);
        assert_eq!(ledger.delta_to(3), 2);

        ledger.set_index(99);
        assert_eq!(ledger.index(), 3);
    }
}
