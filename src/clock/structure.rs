//! Read model of a tournament's blind schedule.

use thiserror::Error;

use crate::dao::models::BlindLevelEntity;

/// Blinds in effect during a play level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    /// Regular play with forced bets.
    Play {
        /// Small blind.
        small_blind: u64,
        /// Big blind.
        big_blind: u64,
        /// Big-blind ante, when the structure uses one.
        ante: Option<u64>,
    },
    /// No cards dealt; the clock still runs.
    Break,
}

/// A single level of the structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlindLevel {
    /// Position in the structure (0-based).
    pub index: usize,
    /// Length of the level in minutes, always > 0.
    pub duration_minutes: u32,
    /// Play blinds or break.
    pub kind: LevelKind,
}

impl BlindLevel {
    /// Full length of the level in seconds.
    pub fn duration_secs(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }

    /// Whether the level is a break.
    pub fn is_break(&self) -> bool {
        matches!(self.kind, LevelKind::Break)
    }
}

/// Reasons a persisted structure cannot drive a clock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// No levels configured.
    #[error("blind structure is empty")]
    Empty,
    /// A level has a zero duration.
    #[error("level {index} has a zero duration")]
    ZeroDuration {
        /// Offending position.
        index: usize,
    },
    /// A play level lacks its blinds or declares a non-positive one.
    #[error("level {index} is missing positive blinds")]
    MissingBlinds {
        /// Offending position.
        index: usize,
    },
    /// Small blind larger than the big blind.
    #[error("level {index} has a small blind above its big blind")]
    InvertedBlinds {
        /// Offending position.
        index: usize,
    },
}

/// Ordered, non-empty sequence of levels; immutable once the tournament starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlindStructure {
    levels: Vec<BlindLevel>,
}

impl BlindStructure {
    /// Build a structure from already validated levels.
    pub fn new(levels: Vec<BlindLevel>) -> Result<Self, StructureError> {
        if levels.is_empty() {
            return Err(StructureError::Empty);
        }
        if let Some(level) = levels.iter().find(|level| level.duration_minutes == 0) {
            return Err(StructureError::ZeroDuration { index: level.index });
        }
        Ok(Self { levels })
    }

    /// Index of the final level.
    pub fn last_index(&self) -> usize {
        self.levels.len() - 1
    }

    /// Level at `index`, if any.
    pub fn level(&self, index: usize) -> Option<&BlindLevel> {
        self.levels.get(index)
    }

    /// Full duration in seconds of the level at `index`, or 0 past the end.
    pub fn duration_secs(&self, index: usize) -> u32 {
        self.level(index).map(BlindLevel::duration_secs).unwrap_or(0)
    }

    /// Clamp an index read from storage into the structure.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.last_index())
    }
}

impl TryFrom<&[BlindLevelEntity]> for BlindStructure {
    type Error = StructureError;

    fn try_from(rows: &[BlindLevelEntity]) -> Result<Self, Self::Error> {
        // Stored indexes are informational; the sequence order is authoritative.
        let levels = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let kind = if row.is_break {
                    LevelKind::Break
                } else {
                    let (Some(small_blind), Some(big_blind)) = (row.small_blind, row.big_blind)
                    else {
                        return Err(StructureError::MissingBlinds { index });
                    };
                    if small_blind == 0 || big_blind == 0 {
                        return Err(StructureError::MissingBlinds { index });
                    }
                    if small_blind > big_blind {
                        return Err(StructureError::InvertedBlinds { index });
                    }
                    LevelKind::Play {
                        small_blind,
                        big_blind,
                        ante: row.big_blind_ante.filter(|&ante| ante > 0),
                    }
                };
                Ok(BlindLevel {
                    index,
                    duration_minutes: row.duration_minutes,
                    kind,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(levels)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn play_row(index: usize, minutes: u32, small: u64, big: u64) -> BlindLevelEntity {
        BlindLevelEntity {
            index,
            is_break: false,
            small_blind: Some(small),
            big_blind: Some(big),
            big_blind_ante: None,
            duration_minutes: minutes,
        }
    }

    pub(crate) fn break_row(index: usize, minutes: u32) -> BlindLevelEntity {
        BlindLevelEntity {
            index,
            is_break: true,
            small_blind: None,
            big_blind: None,
            big_blind_ante: None,
            duration_minutes: minutes,
        }
    }

    /// Structure of play levels with the given minute durations.
    pub(crate) fn structure_of(minutes: &[u32]) -> BlindStructure {
        let rows: Vec<_> = minutes
            .iter()
            .enumerate()
            .map(|(index, &m)| play_row(index, m, 25 << index, 50 << index))
            .collect();
        BlindStructure::try_from(rows.as_slice()).unwrap()
    }

    #[test]
    fn converts_play_and_break_rows() {
        let mut ante = play_row(2, 20, 100, 200);
        ante.big_blind_ante = Some(200);
        let rows = vec![play_row(0, 15, 25, 50), break_row(1, 10), ante];

        let structure = BlindStructure::try_from(rows.as_slice()).unwrap();
        assert_eq!(structure.last_index(), 2);
        assert!(structure.level(1).unwrap().is_break());
        assert_eq!(structure.duration_secs(2), 1200);
        assert_eq!(
            structure.level(2).unwrap().kind,
            LevelKind::Play {
                small_blind: 100,
                big_blind: 200,
                ante: Some(200)
            }
        );
    }

    #[test]
    fn rejects_malformed_rows() {
        let empty: [BlindLevelEntity; 0] = [];
        assert_eq!(
            BlindStructure::try_from(empty.as_slice()),
            Err(StructureError::Empty)
        );
        assert_eq!(
            BlindStructure::try_from([play_row(0, 0, 25, 50)].as_slice()),
            Err(StructureError::ZeroDuration { index: 0 })
        );

        let mut missing = play_row(1, 10, 25, 50);
        missing.big_blind = None;
        assert_eq!(
            BlindStructure::try_from([play_row(0, 10, 25, 50), missing].as_slice()),
            Err(StructureError::MissingBlinds { index: 1 })
        );
        assert_eq!(
            BlindStructure::try_from([play_row(0, 10, 100, 50)].as_slice()),
            Err(StructureError::InvertedBlinds { index: 0 })
        );
    }

    #[test]
    fn clamps_out_of_range_indexes() {
        let structure = structure_of(&[10, 10]);
        assert_eq!(structure.clamp_index(7), 1);
        assert_eq!(structure.duration_secs(7), 0);
    }
}
