use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifies one captured session: the tool that recorded it plus the
/// tool's own session id.
///
/// Written as `tool/id` on the command line and in log output.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub tool: String,
    pub id: String,
}

impl SessionKey {
    pub fn new(tool: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            id: id.into(),
        }
    }

    /// Validate that both halves are usable as tree entry names.
    pub fn validate(&self) -> Result<(), TypeError> {
        for part in [&self.tool, &self.id] {
            if part.is_empty()
                || part.contains('/')
                || part.contains('\0')
                || part == "."
                || part == ".."
            {
                return Err(TypeError::InvalidSessionKey(self.to_string()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tool, self.id)
    }
}

impl FromStr for SessionKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tool, id) = s
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidSessionKey(s.to_string()))?;
        let key = Self::new(tool, id);
        key.validate()?;
        Ok(key)
    }
}
