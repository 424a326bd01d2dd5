//! Validated guard keys.
//!
//! A key names the scope of mutual exclusion. It is either taken verbatim
//! (`GuardKey::new("shared-key")`) or composed from an action and identity
//! parts joined with `:` (`ticket_create:1234`, `notify:555:1234`).

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidKey;

/// Longest key accepted, in bytes.
pub const MAX_KEY_LEN: usize = 256;

const SEPARATOR: char = ':';

/// Identity under which mutual exclusion is enforced.
///
/// Construction validates the string, so every `GuardKey` that reaches the
/// guard is non-empty, printable and bounded in length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GuardKey(String);

impl GuardKey {
    pub fn new(key: impl Into<String>) -> Result<Self, InvalidKey> {
        let key = key.into();
        validate(&key)?;
        Ok(Self(key))
    }

    /// Builds `action:part1:part2…`. Every part must render to a non-empty
    /// string; the action itself is validated like a plain key.
    pub fn compose<I, P>(action: &str, parts: I) -> Result<Self, InvalidKey>
    where
        I: IntoIterator<Item = P>,
        P: fmt::Display,
    {
        if action.trim().is_empty() {
            return Err(InvalidKey::EmptyPart { position: 0 });
        }
        let mut key = String::from(action);
        for (i, part) in parts.into_iter().enumerate() {
            let rendered = part.to_string();
            if rendered.trim().is_empty() {
                return Err(InvalidKey::EmptyPart { position: i + 1 });
            }
            key.push(SEPARATOR);
            key.push_str(&rendered);
        }
        Self::new(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading `action` segment of a composed key (the whole key otherwise).
    pub fn action(&self) -> &str {
        self.0.split(SEPARATOR).next().unwrap_or(&self.0)
    }
}

fn validate(key: &str) -> Result<(), InvalidKey> {
    if key.is_empty() {
        return Err(InvalidKey::Empty);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(InvalidKey::TooLong {
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }
    if let Some((index, _)) = key.char_indices().find(|(_, c)| c.is_control()) {
        return Err(InvalidKey::ControlCharacter { index });
    }
    if key.trim().is_empty() {
        return Err(InvalidKey::Blank);
    }
    Ok(())
}

impl fmt::Display for GuardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GuardKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for GuardKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GuardKey {
    type Error = InvalidKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for GuardKey {
    type Error = InvalidKey;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GuardKey> for String {
    fn from(key: GuardKey) -> Self {
        key.0
    }
}
