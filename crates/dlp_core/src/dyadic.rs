//! Dyadic characters: the Chern character attached to a rational slope `p / 2^m`.
//!
//! The characters are produced by the exceptional-bundle recurrence on P^2.
//! Integral indices resolve to line bundles; odd numerators combine the two
//! neighboring characters at the same precision; even numerators drop to a
//! coarser precision without reducing the fraction first.

use crate::chern::ChernCharacter;
use crate::error::{DlpError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The rational `p / 2^m`, kept exactly as given (never reduced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DyadicIndex {
    pub p: i64,
    pub m: u32,
}

impl DyadicIndex {
    pub fn new(p: i64, m: u32) -> Self {
        Self { p, m }
    }

    /// Validates a signed exponent before building the index.
    pub fn try_new(p: i64, m: i64) -> Result<Self> {
        let exponent = u32::try_from(m).map_err(|_| DlpError::InvalidIndex {
            p,
            m,
            reason: "exponent m must satisfy 0 <= m <= u32::MAX".to_string(),
        })?;
        Ok(Self::new(p, exponent))
    }

    pub fn value(&self) -> f64 {
        self.p as f64 * (-f64::from(self.m)).exp2()
    }

    /// `Some(p / 2^m)` when the index is an integer at its own precision.
    pub fn integral_part(&self) -> Option<i64> {
        if self.p == 0 {
            Some(0)
        } else if self.p.trailing_zeros() >= self.m {
            Some(self.p >> self.m)
        } else {
            None
        }
    }

    fn offset(&self, delta: i64) -> Result<Self> {
        let p = self.p.checked_add(delta).ok_or_else(|| DlpError::InvalidIndex {
            p: self.p,
            m: i64::from(self.m),
            reason: format!("neighbor index p{delta:+} overflows i64"),
        })?;
        Ok(Self::new(p, self.m))
    }
}

/// One level of the recurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Base(ChernCharacter),
    /// `3 * ch0(rank_of) * scaled - subtracted`
    Recurrence {
        rank_of: DyadicIndex,
        scaled: DyadicIndex,
        subtracted: DyadicIndex,
    },
    Reduce(DyadicIndex),
}

fn classify(index: DyadicIndex) -> Result<Step> {
    if let Some(d) = index.integral_part() {
        return Ok(Step::Base(ChernCharacter::line_bundle(i128::from(d))));
    }
    // Divisibility by 2^m failed, so m >= 1 here, and m >= 3 whenever 4 | p.
    match index.p.rem_euclid(4) {
        3 => Ok(Step::Recurrence {
            rank_of: index.offset(1)?,
            scaled: index.offset(-1)?,
            subtracted: index.offset(-3)?,
        }),
        1 => Ok(Step::Recurrence {
            rank_of: index.offset(-1)?,
            scaled: index.offset(1)?,
            subtracted: index.offset(3)?,
        }),
        2 => Ok(Step::Reduce(DyadicIndex::new(index.p / 2, index.m - 1))),
        _ => Ok(Step::Reduce(DyadicIndex::new(index.p / 4, index.m - 2))),
    }
}

fn combine(
    index: DyadicIndex,
    rank_of: &ChernCharacter,
    scaled: &ChernCharacter,
    subtracted: &ChernCharacter,
) -> Result<ChernCharacter> {
    let overflow = || DlpError::CharacterOverflow {
        p: index.p,
        m: index.m,
    };
    let coefficient = rank_of.ch0.checked_mul(3).ok_or_else(overflow)?;
    scaled
        .checked_scale(coefficient)
        .and_then(|c| c.checked_sub(subtracted))
        .ok_or_else(overflow)
}

/// Memoizing resolver. One instance is meant to live for a single curve
/// construction; the cache is dropped with it.
#[derive(Debug, Default)]
pub struct DyadicResolver {
    cache: HashMap<DyadicIndex, ChernCharacter>,
    hits: usize,
}

impl DyadicResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `p / 2^m`, rejecting negative exponents.
    pub fn resolve(&mut self, p: i64, m: i64) -> Result<ChernCharacter> {
        self.resolve_index(DyadicIndex::try_new(p, m)?)
    }

    pub fn resolve_index(&mut self, index: DyadicIndex) -> Result<ChernCharacter> {
        if let Some(character) = self.cache.get(&index) {
            self.hits += 1;
            return Ok(*character);
        }
        let character = match classify(index)? {
            Step::Base(character) => character,
            Step::Recurrence {
                rank_of,
                scaled,
                subtracted,
            } => {
                let rank_of = self.resolve_index(rank_of)?;
                let scaled = self.resolve_index(scaled)?;
                let subtracted = self.resolve_index(subtracted)?;
                combine(index, &rank_of, &scaled, &subtracted)?
            }
            Step::Reduce(coarser) => self.resolve_index(coarser)?,
        };
        self.cache.insert(index, character);
        Ok(character)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn cache_hits(&self) -> usize {
        self.hits
    }
}

/// Plain recursive resolution without a cache. Exponential in `m`; kept as
/// the reference the memoized resolver is checked against.
pub fn resolve_uncached(index: DyadicIndex) -> Result<ChernCharacter> {
    match classify(index)? {
        Step::Base(character) => Ok(character),
        Step::Recurrence {
            rank_of,
            scaled,
            subtracted,
        } => combine(
            index,
            &resolve_uncached(rank_of)?,
            &resolve_uncached(scaled)?,
            &resolve_uncached(subtracted)?,
        ),
        Step::Reduce(coarser) => resolve_uncached(coarser),
    }
}
