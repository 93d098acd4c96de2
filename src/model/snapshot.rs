use super::CollectionKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// All three collections, as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub escuelas: Vec<Value>,
    #[serde(default)]
    pub carreras: Vec<Value>,
    #[serde(default)]
    pub users: Vec<Value>,
}

impl Snapshot {
    pub fn collection(&self, kind: CollectionKind) -> &[Value] {
        match kind {
            CollectionKind::Institutions => &self.escuelas,
            CollectionKind::Programs => &self.carreras,
            CollectionKind::Users => &self.users,
        }
    }

    pub fn collection_mut(&mut self, kind: CollectionKind) -> &mut Vec<Value> {
        match kind {
            CollectionKind::Institutions => &mut self.escuelas,
            CollectionKind::Programs => &mut self.carreras,
            CollectionKind::Users => &mut self.users,
        }
    }

    pub fn record_count(&self) -> usize {
        self.escuelas.len() + self.carreras.len() + self.users.len()
    }
}

/// Input to a bulk overwrite; collections left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escuelas: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carreras: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<Value>>,
}

impl CollectionSet {
    pub fn with(mut self, kind: CollectionKind, records: Vec<Value>) -> Self {
        *self.slot(kind) = Some(records);
        self
    }

    pub fn take(&mut self, kind: CollectionKind) -> Option<Vec<Value>> {
        self.slot(kind).take()
    }

    fn slot(&mut self, kind: CollectionKind) -> &mut Option<Vec<Value>> {
        match kind {
            CollectionKind::Institutions => &mut self.escuelas,
            CollectionKind::Programs => &mut self.carreras,
            CollectionKind::Users => &mut self.users,
        }
    }
}

impl From<Snapshot> for CollectionSet {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            escuelas: Some(snapshot.escuelas),
            carreras: Some(snapshot.carreras),
            users: Some(snapshot.users),
        }
    }
}
