use serde::{Deserialize, Serialize};

/// Number of robots that can feed point clouds into the dispatcher.
pub const MAX_SOURCES: usize = 4;

/// Robot index of a point-cloud stream, always within `1..=MAX_SOURCES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SourceId(u8);

impl SourceId {
    pub fn new(id: u8) -> anyhow::Result<Self> {
        if id == 0 || id as usize > MAX_SOURCES {
            anyhow::bail!("Point cloud source id must be within 1..={}, got {}", MAX_SOURCES, id);
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based slot index.
    pub fn index(&self) -> usize {
        self.0 as usize - 1
    }

    /// The first `n` source ids, in order.
    pub fn first(n: u8) -> impl Iterator<Item = SourceId> {
        (1..=n.min(MAX_SOURCES as u8)).map(SourceId)
    }
}

impl TryFrom<u8> for SourceId {
    type Error = anyhow::Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<SourceId> for u8 {
    fn from(id: SourceId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "robot{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(SourceId::new(0).is_err());
        assert!(SourceId::new(5).is_err());
        assert_eq!(SourceId::new(4).unwrap().index(), 3);
    }

    #[test]
    fn first_is_capped() {
        assert_eq!(SourceId::first(9).count(), MAX_SOURCES);
        assert_eq!(SourceId::first(2).map(|s| s.get()).collect::<Vec<_>>(), vec![1, 2]);
    }
}
