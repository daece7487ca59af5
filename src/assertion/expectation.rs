//! Fluent expectation builder

use super::assertion::{Assertion, AssertionError};
use super::subject::Subject;

/// The result of `expect(value)`: a subject plus a negation flag
///
/// Every terminal method returns the pass message on success so the caller
/// can log it, or an [`AssertionError`] naming expected against actual.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    subject: Subject,
    negated: bool,
}

pub fn expect(subject: impl Into<Subject>) -> Expectation {
    Expectation::new(subject)
}

impl Expectation {
    pub fn new(subject: impl Into<Subject>) -> Self {
        Self {
            subject: subject.into(),
            negated: false,
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Flip negation; `not.not` cancels out
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn check(&self, assertion: &Assertion) -> Result<String, AssertionError> {
        let verdict = assertion.evaluate(&self.subject)?;
        let phrase = if self.negated { "not to" } else { "to" };
        let statement = format!("expected {} {} {}", self.subject, phrase, assertion.describe());

        if verdict.holds != self.negated {
            return Ok(format!("Assertion passed: {}", statement));
        }

        match verdict.actual {
            Some(actual) if !self.negated => Err(AssertionError::new(format!("{} but got {}", statement, actual))),
            _ => Err(AssertionError::new(statement)),
        }
    }

    pub fn ok(&self) -> Result<String, AssertionError> {
        self.check(&Assertion::Ok)
    }

    pub fn is_true(&self) -> Result<String, AssertionError> {
        self.check(&Assertion::True)
    }

    pub fn is_false(&self) -> Result<String, AssertionError> {
        self.check(&Assertion::False)
    }

    pub fn null(&self) -> Result<String, AssertionError> {
        self.check(&Assertion::Null)
    }

    pub fn undefined(&self) -> Result<String, AssertionError> {
        self.check(&Assertion::Undefined)
    }

    pub fn empty(&self) -> Result<String, AssertionError> {
        self.check(&Assertion::Empty)
    }

    /// `an('array')`, `a('string')`
    pub fn a(&self, type_name: &str) -> Result<String, AssertionError> {
        self.check(&Assertion::Type(type_name.to_lowercase()))
    }

    pub fn eql(&self, expected: impl Into<Subject>) -> Result<String, AssertionError> {
        self.check(&Assertion::Eql(expected.into()))
    }

    pub fn above(&self, n: f64) -> Result<String, AssertionError> {
        self.check(&Assertion::Above(n))
    }

    pub fn below(&self, n: f64) -> Result<String, AssertionError> {
        self.check(&Assertion::Below(n))
    }

    pub fn include(&self, needle: impl Into<Subject>) -> Result<String, AssertionError> {
        self.check(&Assertion::Include(needle.into()))
    }

    pub fn contain(&self, needle: impl Into<Subject>) -> Result<String, AssertionError> {
        self.check(&Assertion::Contain(needle.into()))
    }

    pub fn property(&self, name: &str) -> Result<String, AssertionError> {
        self.check(&Assertion::Property(name.to_string()))
    }

    pub fn property_value(&self, name: &str, value: impl Into<Subject>) -> Result<String, AssertionError> {
        self.check(&Assertion::PropertyValue(name.to_string(), value.into()))
    }

    pub fn keys(&self, keys: &[&str]) -> Result<String, AssertionError> {
        self.check(&Assertion::Keys(keys.iter().map(|k| k.to_string()).collect()))
    }

    pub fn length(&self, n: usize) -> Result<String, AssertionError> {
        self.check(&Assertion::Length(n))
    }

    pub fn matches(&self, source: &str, flags: &str) -> Result<String, AssertionError> {
        self.check(&Assertion::Match {
            source: source.to_string(),
            flags: flags.to_string(),
        })
    }

    pub fn status(&self, code: u16) -> Result<String, AssertionError> {
        self.check(&Assertion::Status(code))
    }
}
