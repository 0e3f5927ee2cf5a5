//! The error console: an ordered, append-only log of fault records.

use compbridge_types::{FaultKind, FaultRecord};

/// Fault records in arrival order, plus collapsible visibility.
///
/// Records are only appended by the session's listener; they leave the
/// console only through [`ErrorConsole::clear`].
#[derive(Debug, Default)]
pub struct ErrorConsole {
    records: Vec<FaultRecord>,
    collapsed: bool,
}

impl ErrorConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: FaultRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[FaultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records of one kind.
    pub fn count(&self, kind: FaultKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Flip visibility; returns the new collapsed state.
    pub fn toggle(&mut self) -> bool {
        self.collapsed = !self.collapsed;
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let mut console = ErrorConsole::new();
        console.append(FaultRecord::new(FaultKind::Runtime, "first", Some(1)));
        console.append(FaultRecord::new(FaultKind::Runtime, "first", Some(1)));
        console.append(FaultRecord::new(FaultKind::EmptyOutput, "second", None));
        let messages: Vec<_> = console.records().iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["first", "first", "second"]);
        assert_eq!(console.count(FaultKind::Runtime), 2);
    }

    #[test]
    fn test_visibility_is_independent_of_contents() {
        let mut console = ErrorConsole::new();
        console.append(FaultRecord::new(FaultKind::Compile, "x", None));
        assert!(console.toggle());
        assert!(console.is_collapsed());
        console.clear();
        assert!(console.is_empty());
        assert!(console.is_collapsed());
        console.set_collapsed(false);
        assert!(!console.is_collapsed());
    }
}
