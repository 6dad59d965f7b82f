use std::fmt;
use std::str::FromStr;

use crate::TunnelError;

/// Validated identifier for a tunnel configuration, also used as the filename
/// stem under the configuration directory.
///
/// Accepted names match `[A-Za-z0-9_.-]+`. Anything else is rejected before
/// any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TunnelName(String);

impl TunnelName {
    pub fn new(name: &str) -> Result<Self, TunnelError> {
        if is_valid(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(TunnelError::InvalidName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl fmt::Display for TunnelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TunnelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TunnelName {
    type Err = TunnelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
