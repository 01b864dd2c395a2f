//! Identifier ranges and their partition into waves

use crate::models::PersonId;
use swapi_common::ConfigError;

/// Inclusive, contiguous range of identifiers to ingest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    first: PersonId,
    last: PersonId,
}

impl IdRange {
    /// Create a range `[first, last]`; identifiers start at 1
    pub fn new(first: PersonId, last: PersonId) -> Result<Self, ConfigError> {
        if first < 1 {
            return Err(ConfigError::invalid(format!(
                "range must start at 1 or above, got {}",
                first
            )));
        }
        if first > last {
            return Err(ConfigError::invalid(format!(
                "range start {} is after range end {}",
                first, last
            )));
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> PersonId {
        self.first
    }

    pub fn last(&self) -> PersonId {
        self.last
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split into consecutive waves of at most `wave_size` identifiers
    ///
    /// Waves come back in range order; only the last one may be short.
    pub fn waves(&self, wave_size: usize) -> Result<Vec<Wave>, ConfigError> {
        if wave_size == 0 {
            return Err(ConfigError::invalid("wave size must be at least 1"));
        }

        let total = self.len();
        let waves = (0..total.div_ceil(wave_size))
            .map(|index| {
                let offset = index * wave_size;
                Wave {
                    index,
                    first: self.first + offset as PersonId,
                    len: wave_size.min(total - offset),
                }
            })
            .collect();

        Ok(waves)
    }
}

/// One round of parallel fetches
///
/// A wave only ever covers contiguous identifiers, so position `i` of its
/// results always belongs to `first + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wave {
    index: usize,
    first: PersonId,
    len: usize,
}

impl Wave {
    /// Zero-based position of this wave within the run
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn first(&self) -> PersonId {
        self.first
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Identifiers in dispatch order
    pub fn ids(&self) -> impl Iterator<Item = PersonId> {
        // Inclusive end so a wave ending at PersonId::MAX does not overflow
        let last = self.first + (self.len as PersonId - 1);
        self.first..=last
    }
}
