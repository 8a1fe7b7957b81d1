//! Passcodes and the stored/duress pair derived from them.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digits in a code.
pub const CODE_LEN: usize = 4;

#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum CodeError {
    #[error("expected 4 digits, found {0}")]
    WrongLength(usize),
    #[error("'{0}' is not a digit")]
    NotADigit(char),
}

/// A passcode of exactly [CODE_LEN] ASCII digits.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code([char; CODE_LEN]);

impl Code {
    pub fn new(digits: [char; CODE_LEN]) -> Result<Self, CodeError> {
        match digits.iter().find(|c| !c.is_ascii_digit()) {
            Some(&c) => Err(CodeError::NotADigit(c)),
            None => Ok(Code(digits)),
        }
    }

    pub fn digits(&self) -> &[char; CODE_LEN] {
        &self.0
    }

    /// The same digits in reverse order. Reversing twice gives the original code back.
    pub fn reversed(&self) -> Code {
        let mut digits = self.0;
        digits.reverse();
        Code(digits)
    }

    pub fn is_palindrome(&self) -> bool {
        self.reversed() == *self
    }
}

impl Default for Code {
    fn default() -> Self {
        Code(['1', '2', '3', '4'])
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|c| write!(f, "{c}"))
    }
}

/// Parses `1234` as well as separated forms like `1,2,3,4` or `1 2 3 4`.
impl FromStr for Code {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',' && *c != ';')
            .collect();
        let digits: [char; CODE_LEN] = chars
            .as_slice()
            .try_into()
            .map_err(|_| CodeError::WrongLength(chars.len()))?;
        Code::new(digits)
    }
}

impl TryFrom<String> for Code {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.to_string()
    }
}

/// Outcome of checking a complete entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The stored code: release the door.
    Unlock,
    /// The duress code: raise the silent alarm.
    Alarm,
    /// Anything else.
    Reject,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Unlock => write!(f, "unlock"),
            Verdict::Alarm => write!(f, "alarm"),
            Verdict::Reject => write!(f, "reject"),
        }
    }
}

/// The enrolled code together with its duress variant.
///
/// The duress code is always the stored code reversed; it is only ever derived here and never
/// persisted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CodePair {
    stored: Code,
    duress: Code,
}

impl CodePair {
    pub fn new(stored: Code) -> Self {
        CodePair {
            stored,
            duress: stored.reversed(),
        }
    }

    #[cfg(test)]
    pub fn stored(&self) -> &Code {
        &self.stored
    }

    #[cfg(test)]
    pub fn duress(&self) -> &Code {
        &self.duress
    }

    /// Checks an entry against the stored code first, so a palindromic code always unlocks and
    /// never alarms.
    pub fn verify(&self, entry: &Code) -> Verdict {
        if *entry == self.stored {
            Verdict::Unlock
        } else if *entry == self.duress {
            Verdict::Alarm
        } else {
            Verdict::Reject
        }
    }
}
