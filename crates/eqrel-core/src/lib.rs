//! eqrel Core - Core types for the eqrel constraint resolution engine
//!
//! This crate provides the fundamental abstractions for eqrel:
//! - Identifier types for variables, relations and domains
//! - Value kinds and categories
//! - The expression builder used to declare relations
//! - Formulas and polynomials consumed by the resolver

pub mod error;
pub mod expr;
pub mod id;
pub mod value;


pub use error::{EqError, Result};
pub use expr::{Atom, CompareOp, Expr, Formula, Poly, VarRef};
pub use id::{DomainId, RelationId, VarId};
pub use value::{Category, Value, ValueKind};
