use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

use crate::constants::FACE_COUNT;

/// One of the six die outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Face {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
}

impl Face {
    pub const ALL: [Self; FACE_COUNT] = [
        Self::One,
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
    ];

    /// Face value in `1..=6`.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Zero-based slot used by the per-face arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    /// Resolve a raw outcome, `None` outside `1..=6`.
    #[must_use]
    pub const fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            4 => Some(Self::Four),
            5 => Some(Self::Five),
            6 => Some(Self::Six),
            _ => None,
        }
    }
}

impl TryFrom<i64> for Face {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| format!("face out of range: {value}"))
    }
}

impl From<Face> for i64 {
    fn from(face: Face) -> Self {
        Self::from(face.value())
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value(), f)
    }
}

/// Cumulative per-face totals, indexed by [`Face`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceCounts([u64; FACE_COUNT]);

impl FaceCounts {
    #[must_use]
    pub const fn new(counts: [u64; FACE_COUNT]) -> Self {
        Self(counts)
    }

    #[must_use]
    pub const fn get(&self, face: Face) -> u64 {
        self.0[face.index()]
    }

    pub fn increment(&mut self, face: Face) {
        let slot = &mut self.0[face.index()];
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().copied().fold(0_u64, u64::saturating_add)
    }

    #[must_use]
    pub const fn as_array(&self) -> &[u64; FACE_COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Face, u64)> + '_ {
        Face::ALL.into_iter().map(|face| (face, self.get(face)))
    }
}

impl Index<Face> for FaceCounts {
    type Output = u64;

    fn index(&self, face: Face) -> &Self::Output {
        &self.0[face.index()]
    }
}

impl From<[u64; FACE_COUNT]> for FaceCounts {
    fn from(counts: [u64; FACE_COUNT]) -> Self {
        Self(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_roundtrip_through_raw_values() {
        for face in Face::ALL {
            assert_eq!(Face::from_value(i64::from(face.value())), Some(face));
        }
        assert_eq!(Face::from_value(0), None);
        assert_eq!(Face::from_value(7), None);
        assert!(Face::try_from(-1).is_err());
    }

    #[test]
    fn face_indices_are_dense() {
        let indices: Vec<usize> = Face::ALL.iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn counts_increment_and_total() {
        let mut counts = FaceCounts::default();
        counts.increment(Face::Three);
        counts.increment(Face::Three);
        counts.increment(Face::Six);
        assert_eq!(counts[Face::Three], 2);
        assert_eq!(counts.get(Face::Six), 1);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.as_array(), &[0, 0, 2, 0, 0, 1]);
    }

    #[test]
    fn face_serializes_as_integer() {
        let json = serde_json::to_string(&Face::Four).unwrap();
        assert_eq!(json, "4");
        let parsed: Face = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, Face::Two);
        assert!(serde_json::from_str::<Face>("9").is_err());
    }
}
