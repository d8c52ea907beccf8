//! The local breakpoint table.
//!
//! Breakpoints are identified by file and line; the table never holds
//! two entries for the same position. The server's view is synced
//! elsewhere, so this stays a plain collection.

use ensign_config::Breakpoint;

#[derive(Debug, Clone, Default)]
pub struct BreakpointSet {
    entries: Vec<Breakpoint>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        BreakpointSet::default()
    }

    pub fn contains(&self, file_name: &str, line: i64) -> bool {
        self.entries
            .iter()
            .any(|b| b.file_name == file_name && b.line == line)
    }

    /// Add a breakpoint. Returns false if it was already present.
    pub fn add(&mut self, file_name: &str, line: i64) -> bool {
        if self.contains(file_name, line) {
            return false;
        }
        self.entries.push(Breakpoint {
            file_name: file_name.to_string(),
            line,
        });
        true
    }

    /// Remove a breakpoint. Returns false if it was not present.
    pub fn remove(&mut self, file_name: &str, line: i64) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|b| !(b.file_name == file_name && b.line == line));
        self.entries.len() != before
    }

    /// Flip the breakpoint at a position. Returns true if it is now set.
    pub fn toggle(&mut self, file_name: &str, line: i64) -> bool {
        if self.remove(file_name, line) {
            false
        } else {
            self.add(file_name, line);
            true
        }
    }

    pub fn all(&self) -> &[Breakpoint] {
        &self.entries
    }

    pub fn for_file<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a Breakpoint> {
        self.entries.iter().filter(move |b| b.file_name == file_name)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the whole table, dropping duplicate positions.
    pub fn replace(&mut self, breakpoints: Vec<Breakpoint>) {
        self.entries.clear();
        for b in breakpoints {
            if !self.contains(&b.file_name, b.line) {
                self.entries.push(b);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_deduplicates() {
        let mut set = BreakpointSet::new();
        assert!(set.add("A.scala", 10));
        assert!(!set.add("A.scala", 10));
        assert!(set.add("A.scala", 11));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn toggle_flips() {
        let mut set = BreakpointSet::new();
        assert!(set.toggle("A.scala", 10));
        assert!(set.contains("A.scala", 10));
        assert!(!set.toggle("A.scala", 10));
        assert!(set.is_empty());
    }

    #[test]
    fn for_file_filters() {
        let mut set = BreakpointSet::new();
        set.add("A.scala", 1);
        set.add("B.scala", 2);
        set.add("A.scala", 3);
        let lines: Vec<i64> = set.for_file("A.scala").map(|b| b.line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn replace_drops_duplicates() {
        let mut set = BreakpointSet::new();
        set.replace(vec![
            Breakpoint {
                file_name: "A.scala".to_string(),
                line: 5,
            },
            Breakpoint {
                file_name: "A.scala".to_string(),
                line: 5,
            },
        ]);
        assert_eq!(set.len(), 1);
    }
}
