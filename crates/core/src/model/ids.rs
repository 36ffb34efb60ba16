use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an identifier from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw identifier value.
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a quiz.
    QuizId
);

id_newtype!(
    /// Unique identifier for a question within a quiz.
    QuestionId
);

id_newtype!(
    /// Server-assigned identifier for one attempt at a quiz.
    AttemptId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_raw_value() {
        assert_eq!(QuizId::new(42).to_string(), "42");
        assert_eq!(AttemptId::new(7).to_string(), "7");
    }

    #[test]
    fn parses_from_string() {
        let id: QuestionId = "123".parse().unwrap();
        assert_eq!(id, QuestionId::new(123));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!("not-a-number".parse::<QuizId>().is_err());
    }

    #[test]
    fn debug_names_the_type() {
        assert_eq!(format!("{:?}", QuizId::new(5)), "QuizId(5)");
    }
}
