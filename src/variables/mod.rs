//! Scoped variables and placeholder resolution
//!
//! - [`store`] - global, environment and local scopes with soft-delete
//! - [`dynamic`] - generated `{{$token}}` values
//! - [`resolver`] - `{{name}}` substitution over a scope chain

pub mod dynamic;
pub mod resolver;
pub mod store;

pub use resolver::{placeholders, resolve, unresolved, Resolver, VariableLookup};
pub use store::{Change, Environment, ScopeChain, Variable, VariableScope, VariableStore};
