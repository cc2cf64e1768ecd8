use crate::core::Value;
use crate::record::Record;
use uuid::Uuid;

/// A staged write, applied on flush and discarded otherwise.
#[derive(Debug, Clone)]
pub enum Change {
    Insert { record: Record },
    Update { record: Record },
    Delete { entity_ref: String, id: Value, uid: Uuid },
}

impl Change {
    pub fn entity_ref(&self) -> &str {
        match self {
            Change::Insert { record } | Change::Update { record } => record.entity_ref(),
            Change::Delete { entity_ref, .. } => entity_ref,
        }
    }

    pub fn uid(&self) -> Uuid {
        match self {
            Change::Insert { record } | Change::Update { record } => record.uid(),
            Change::Delete { uid, .. } => *uid,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, Change::Delete { .. })
    }

    /// The record as it will be stored, for inserts and updates.
    pub fn pending_record(&self) -> Option<&Record> {
        match self {
            Change::Insert { record } | Change::Update { record } => Some(record),
            Change::Delete { .. } => None,
        }
    }
}
