use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster-unique identity of a server process.
///
/// The index names a slot in the server list; the generation distinguishes
/// successive occupants of that slot. On the wire both are packed into a
/// single `u64` with the generation in the high half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct ServerId {
    index: u32,
    generation: u32,
}

impl ServerId {
    pub const INVALID: ServerId = ServerId {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn as_u64(&self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl From<u64> for ServerId {
    fn from(id: u64) -> Self {
        Self {
            index: id as u32,
            generation: (id >> 32) as u32,
        }
    }
}

impl From<ServerId> for u64 {
    fn from(id: ServerId) -> Self {
        id.as_u64()
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_and_unpack() {
        let id = ServerId::new(3, 7);
        assert_eq!(id.as_u64(), (7u64 << 32) | 3);
        assert_eq!(ServerId::from(id.as_u64()), id);
    }

    #[test]
    fn test_display() {
        assert_eq!(ServerId::new(12, 1).to_string(), "12.1");
    }

    #[test]
    fn test_default_is_invalid() {
        assert!(!ServerId::default().is_valid());
        assert!(ServerId::new(0, 0).is_valid());
    }

    #[test]
    fn test_serializes_as_integer() -> anyhow::Result<()> {
        let json = serde_json::to_string(&ServerId::new(1, 2))?;
        assert_eq!(json, ((2u64 << 32) | 1).to_string());

        let back: ServerId = serde_json::from_str(&json)?;
        assert_eq!(back, ServerId::new(1, 2));
        Ok(())
    }
}
