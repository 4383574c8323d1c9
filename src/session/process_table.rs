//! Pid to process name mapping built from PROCESS notify records.

use ahash::AHashMap as HashMap;
use std::collections::BTreeMap;

/// Process names seen during one decoding session. Last write for a pid wins.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    names: HashMap<u32, String>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `name` for `pid`, returning the previous name if any.
    pub fn insert(&mut self, pid: u32, name: impl Into<String>) -> Option<String> {
        self.names.insert(pid, name.into())
    }

    pub fn name_of(&self, pid: u32) -> Option<&str> {
        self.names.get(&pid).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(pid, name)| (*pid, name.as_str()))
    }

    /// Entries ordered by pid.
    pub fn sorted(&self) -> BTreeMap<u32, &str> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut table = ProcessTable::new();
        assert!(table.insert(42, "bash").is_none());
        assert_eq!(table.insert(42, "fio").as_deref(), Some("bash"));
        assert_eq!(table.name_of(42), Some("fio"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unknown_pid() {
        let table = ProcessTable::new();
        assert!(table.is_empty());
        assert_eq!(table.name_of(1), None);
    }

    #[test]
    fn test_sorted_by_pid() {
        let mut table = ProcessTable::new();
        table.insert(300, "c");
        table.insert(1, "a");
        table.insert(20, "b");
        let pids: Vec<u32> = table.sorted().keys().copied().collect();
        assert_eq!(pids, vec![1, 20, 300]);
    }
}
