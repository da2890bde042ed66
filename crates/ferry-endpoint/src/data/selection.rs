use serde::{Deserialize, Serialize};

/// Maps an opaque provider id to a path, as supplied by the caller's file picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMap {
    #[serde(default)]
    pub id:   Option<String>,
    pub path: String,
}

impl IdMap {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            id:   None,
            path: path.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// What to resolve when selecting a resource from a session.
///
/// Protocols ignore the hints they have no use for; HTTP, for one, always
/// resolves to the session URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub path:   String,
    pub id:     Option<String>,
    pub id_map: Vec<IdMap>,
}

impl Selection {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Select the location named by the session URI itself.
    pub fn root() -> Self { Self::default() }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn id_map(mut self, id_map: Vec<IdMap>) -> Self {
        self.id_map = id_map;
        self
    }

    /// Id registered for `path` in the id map, falling back to the selection id.
    pub fn id_for(&self, path: &str) -> Option<&str> {
        self.id_map
            .iter()
            .find(|entry| entry.path == path)
            .and_then(|entry| entry.id.as_deref())
            .or(self.id.as_deref())
    }
}
