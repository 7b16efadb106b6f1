//! Priority level fixtures.

use eqrel_engine::{Engine, PriorityLevel, Result};

/// Priority levels ordered from lowest to highest.
#[derive(Debug)]
pub struct PriorityLadder {
    levels: Vec<PriorityLevel>,
}

impl PriorityLadder {
    /// Creates `n` levels, each ranked strictly above the previous one.
    pub fn new(engine: &Engine, n: usize) -> Result<Self> {
        let levels = (0..n)
            .map(|_| engine.priority_level())
            .collect::<Result<Vec<PriorityLevel>>>()?;
        for pair in levels.windows(2) {
            pair[1].above(&pair[0])?;
        }
        Ok(Self { levels })
    }

    /// Level `i`, counting from the lowest.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    pub fn level(&self, i: usize) -> &PriorityLevel {
        &self.levels[i]
    }

    pub fn lowest(&self) -> Option<&PriorityLevel> {
        self.levels.first()
    }

    pub fn highest(&self) -> Option<&PriorityLevel> {
        self.levels.last()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
