use std::fmt;

use serde::{Deserialize, Serialize};

/// Secret bound to a session.
///
/// Persistence and refresh belong to the caller; a session only checks that
/// the variant fits its protocol.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    #[default]
    None,
    OAuth {
        token: String,
    },
    Globus {
        token: String,
    },
}

impl Credential {
    pub fn oauth(token: impl Into<String>) -> Self {
        Credential::OAuth {
            token: token.into(),
        }
    }

    pub fn globus(token: impl Into<String>) -> Self {
        Credential::Globus {
            token: token.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Credential::None => "none",
            Credential::OAuth { .. } => "oauth",
            Credential::Globus { .. } => "globus",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("type", &self.kind())
            .finish_non_exhaustive()
    }
}
