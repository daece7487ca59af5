//! Expectation DSL used by test scripts
//!
//! The fluent `pm.expect(x).to.not.have.property('id')` chain in scripts
//! reduces to a [`Subject`], a negation flag and one [`Assertion`]; the
//! evaluation itself happens here so it can be exercised without a
//! JavaScript engine.

#[allow(clippy::module_inception)]
mod assertion;
mod expectation;
mod subject;

pub use assertion::{Assertion, AssertionError};
pub use expectation::{expect, Expectation};
pub use subject::Subject;
