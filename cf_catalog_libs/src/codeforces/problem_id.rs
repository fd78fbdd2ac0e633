use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, str::FromStr};
use thiserror::Error;

// A problem code is a contest number followed by an index letter sequence, e.g. `2184G`.
static PROBLEM_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([A-Za-z]+)$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid problem id [{0}]: expected a contest number followed by an index, e.g. 2184G")]
pub struct InvalidProblemId(pub String);

/// Normalized Codeforces problem identifier.
///
/// Parsing trims whitespace and uppercases the index, so `" 2184g "` and
/// `"2184G"` denote the same problem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemId {
    contest_id: i32,
    index: String,
}

impl ProblemId {
    pub fn parse(input: &str) -> Result<Self, InvalidProblemId> {
        let normalized = input.trim().to_uppercase();
        let captures = PROBLEM_ID_PATTERN
            .captures(&normalized)
            .ok_or_else(|| InvalidProblemId(input.trim().to_string()))?;
        let contest_id = captures[1]
            .parse::<i32>()
            .map_err(|_| InvalidProblemId(normalized.clone()))?;

        Ok(Self {
            contest_id,
            index: captures[2].to_string(),
        })
    }

    pub fn contest_id(&self) -> i32 {
        self.contest_id
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.contest_id, self.index)
    }
}

impl FromStr for ProblemId {
    type Err = InvalidProblemId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_valid_id() {
        let id = ProblemId::parse("2184G").unwrap();
        assert_eq!(id.contest_id(), 2184);
        assert_eq!(id.index(), "G");
        assert_eq!(id.to_string(), "2184G");
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let id = ProblemId::parse("  2184g ").unwrap();
        assert_eq!(id.to_string(), "2184G");

        assert_eq!(ProblemId::parse("1873ab").unwrap().index(), "AB");
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        assert!(ProblemId::parse("G2184").is_err());
        assert!(ProblemId::parse("2184").is_err());
        assert!(ProblemId::parse("").is_err());
        assert!(ProblemId::parse("21 84G").is_err());
    }

    #[test]
    fn parse_rejects_contest_number_overflow() {
        assert!(ProblemId::parse("99999999999999999999A").is_err());
    }
}
