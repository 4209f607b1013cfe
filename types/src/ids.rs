use std::fmt;

/// Session-unique identifier of a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of [`EntryId`]s, owned by a session.
#[derive(Debug, Default)]
pub struct EntryIdGenerator {
    next: u64,
}

impl EntryIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> EntryId {
        let id = EntryId(self.next);
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::EntryIdGenerator;

    #[test]
    fn ids_are_monotonic() {
        let mut ids = EntryIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(b > a);
        assert_eq!(b.value(), a.value() + 1);
    }
}
