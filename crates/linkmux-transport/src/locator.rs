use std::fmt;

/// Opaque handle addressing one registered channel.
///
/// Negative values are reserved as error codes at the C boundary and are
/// never assigned to a live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocatorId(i32);

impl LocatorId {
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// True for ids that can name a live channel.
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl From<i32> for LocatorId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<LocatorId> for i32 {
    fn from(id: LocatorId) -> Self {
        id.0
    }
}

impl fmt::Display for LocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
