//! Document kind discriminator used to dispatch the second parse pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported catalog document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Detection,
    Alert,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Detection => write!(f, "Detection"),
            DocumentKind::Alert => write!(f, "Alert"),
        }
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Detection" => Ok(DocumentKind::Detection),
            "Alert" => Ok(DocumentKind::Alert),
            other => Err(format!("unknown document kind: '{}'", other)),
        }
    }
}
