//! Box fixtures.
//!
//! A box has a top and a bottom edge and a non-negative height; stacking
//! boxes exercises joint linear solving across merged domains.

use eqrel_engine::{Engine, Result, Var};

/// A box whose height is tied to its edges by mandatory relations.
#[derive(Debug)]
pub struct BoxShape {
    pub top: Var,
    pub bottom: Var,
    pub height: Var,
}

impl BoxShape {
    /// Creates a box with `height == top - bottom` and `height >= 0`.
    pub fn new(engine: &Engine) -> Result<Self> {
        let top = engine.int_var()?;
        let bottom = engine.int_var()?;
        let height = engine.int_var()?;
        engine.relate(height.equals(&top - &bottom))?;
        engine.relate(height.greater_eq(0))?;
        Ok(Self {
            top,
            bottom,
            height,
        })
    }

    /// Places `self` directly on top of `below` with the same height.
    pub fn stack_on(&self, engine: &Engine, below: &BoxShape) -> Result<()> {
        engine.relate(self.bottom.equals(&below.top).and(self.height.equals(&below.height)))?;
        Ok(())
    }

    /// Resolved `(top, bottom, height)`.
    pub fn extent(&self) -> Result<(i64, i64, i64)> {
        let read = |v: &Var| -> Result<i64> { Ok(v.value()?.as_i64().unwrap_or_default()) };
        Ok((read(&self.top)?, read(&self.bottom)?, read(&self.height)?))
    }
}
