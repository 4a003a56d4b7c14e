//! Engine error taxonomy.
use thiserror::Error;

/// Source position of the sub-expression that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct At {
    pub module: String,
    pub line: usize,
    pub col: usize,
    pub text: String,
}

/// Values with no schema equivalent. Not an error for callers that can elide
/// the value (object properties, union members); always fatal otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrepresentable {
    Undefined,
    Symbol,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unsupported expression: {kind}{}", suffix(.at))]
    UnsupportedExpression { kind: String, at: Option<At> },

    #[error("unknown identifier `{name}` in {module}{}", suffix(.at))]
    UnknownIdentifier {
        name: String,
        module: String,
        at: Option<At>,
    },

    #[error("unresolved import `{specifier}` from {module}{}", suffix(.at))]
    UnresolvedImport {
        specifier: String,
        module: String,
        at: Option<At>,
    },

    #[error("malformed use of `{combinator}`: {reason}{}", suffix(.at))]
    MalformedCombinatorUsage {
        combinator: String,
        reason: String,
        at: Option<At>,
    },

    #[error("`{name}` in {module} is defined in terms of itself")]
    CircularDefinition { name: String, module: String },

    #[error("value has no schema representation ({kind:?}){}", suffix(.at))]
    Unrepresentable { kind: Unrepresentable, at: Option<At> },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn suffix(at: &Option<At>) -> String {
    match at {
        Some(at) => format!(" at {at}"),
        None => String::new(),
    }
}

impl std::fmt::Display for At {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.module, self.line, self.col)?;
        if !self.text.is_empty() {
            write!(f, " `{}`", self.text)?;
        }
        Ok(())
    }
}

impl Error {
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Error::UnsupportedExpression { kind: kind.into(), at: None }
    }

    pub fn malformed(combinator: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedCombinatorUsage {
            combinator: combinator.into(),
            reason: reason.into(),
            at: None,
        }
    }

    pub fn unrepresentable(kind: Unrepresentable) -> Self {
        Error::Unrepresentable { kind, at: None }
    }

    /// Attach a location unless a deeper one is already recorded.
    pub fn at(mut self, location: At) -> Self {
        let slot = match &mut self {
            Error::UnsupportedExpression { at, .. }
            | Error::UnknownIdentifier { at, .. }
            | Error::UnresolvedImport { at, .. }
            | Error::MalformedCombinatorUsage { at, .. }
            | Error::Unrepresentable { at, .. } => at,
            Error::CircularDefinition { .. } => return self,
        };
        if slot.is_none() {
            *slot = Some(location);
        }
        self
    }

    pub fn is_unrepresentable_undefined(&self) -> bool {
        matches!(self, Error::Unrepresentable { kind: Unrepresentable::Undefined, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_location_wins() {
        let inner = At { module: "a.ts".into(), line: 3, col: 7, text: "x + 1".into() };
        let outer = At { module: "a.ts".into(), line: 1, col: 1, text: "t.type({...})".into() };
        let err = Error::unsupported("binary expression").at(inner.clone()).at(outer);
        assert_eq!(
            err,
            Error::UnsupportedExpression { kind: "binary expression".into(), at: Some(inner) }
        );
        assert_eq!(
            err.to_string(),
            "unsupported expression: binary expression at a.ts:3:7 `x + 1`"
        );
    }
}
