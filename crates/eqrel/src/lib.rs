//! eqrel - Priority-arbitrated constraint resolution in Rust
//!
//! Declare variables, relate them with expressions, and read values back.
//! Relations are either mandatory or tagged with a priority level; when
//! conditional relations conflict, the higher-ranked one wins.
//!
//! # Example
//!
//! ```rust
//! use eqrel::prelude::*;
//!
//! let engine = Engine::new();
//! let low = engine.priority_level().unwrap();
//! let high = engine.priority_level().unwrap();
//! high.above(&low).unwrap();
//!
//! let x = engine.int_var().unwrap();
//! let y = engine.int_var().unwrap();
//! engine.relate((&x * &x).equals(144)).unwrap();
//! engine.relate_with(x.greater(0), &low).unwrap();
//! engine.relate_with(x.less(10), &high).unwrap();
//! engine.relate_with(y.equals(2 * &x), &low).unwrap();
//!
//! assert_eq!(x.value().unwrap(), Value::Int(12));
//! assert_eq!(y.value().unwrap(), Value::Int(24));
//! ```

// Engine and handles
pub use eqrel_engine::{DomainState, Engine, Handle, PriorityLevel, Var};

// Expressions and values
pub use eqrel_core::{
    Category, CompareOp, DomainId, EqError, Expr, RelationId, Result, Value, ValueKind, VarId,
};

// Configuration
pub use eqrel_config::{AssertMode, ConfigError, EngineConfig, RootOrder};

/// Console output, available with the `console` feature.
#[cfg(feature = "console")]
pub use eqrel_console as console;

pub mod prelude {
    pub use super::{CompareOp, Engine, EngineConfig, EqError, Expr, PriorityLevel, Value, Var};
}
