// ============================================================================
// In-Memory Unit of Work
// ============================================================================
//
// Reference persistence context: one table per mapped entity, an identity
// map keyed by record uid, and a list of staged changes applied in order on
// flush. Identifiers come from a per-entity sequence at persist time.
//
// ============================================================================

use super::{Change, EntityState, PersistenceContext};
use crate::core::{ManagerError, Result, Row, Value};
use crate::query::{Order, QueryBuilder};
use crate::record::Record;
use async_trait::async_trait;
use log::debug;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::{Level, event, info_span};
use uuid::Uuid;

static NULL: Value = Value::Null;

#[derive(Debug)]
struct EntityTable {
    fields: Vec<String>,
    rows: BTreeMap<i64, Record>,
    next_id: i64,
}

impl EntityTable {
    fn is_mapped_field(&self, field: &str) -> bool {
        field == "id" || self.fields.iter().any(|f| f == field)
    }
}

/// Identity map entry: state plus the identifier the record was tracked with.
#[derive(Debug, Clone, Copy)]
struct Tracked {
    state: EntityState,
    id: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryContext {
    tables: HashMap<String, EntityTable>,
    identity: HashMap<Uuid, Tracked>,
    pending: Vec<Change>,
    flushes: usize,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps an entity reference with its fields.
    pub fn register_entity<I, S>(&mut self, entity_ref: &str, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables.insert(
            entity_ref.to_string(),
            EntityTable {
                fields: fields.into_iter().map(Into::into).collect(),
                rows: BTreeMap::new(),
                next_id: 1,
            },
        );
        self
    }

    /// Builder form of [`InMemoryContext::register_entity`].
    pub fn with_entity<I, S>(mut self, entity_ref: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_entity(entity_ref, fields);
        self
    }

    /// Number of flushes performed so far.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn pending_changes(&self) -> &[Change] {
        &self.pending
    }

    /// Committed rows of an entity.
    pub fn stored_count(&self, entity_ref: &str) -> usize {
        self.tables.get(entity_ref).map_or(0, |t| t.rows.len())
    }

    fn table(&self, entity_ref: &str) -> Result<&EntityTable> {
        self.tables
            .get(entity_ref)
            .ok_or_else(|| ManagerError::UnknownEntity(entity_ref.to_string()))
    }

    fn table_mut(&mut self, entity_ref: &str) -> Result<&mut EntityTable> {
        self.tables
            .get_mut(entity_ref)
            .ok_or_else(|| ManagerError::UnknownEntity(entity_ref.to_string()))
    }

    fn has_pending_insert(&self, uid: Uuid) -> bool {
        self.pending
            .iter()
            .any(|c| matches!(c, Change::Insert { record } if record.uid() == uid))
    }

    /// Whether `id` is committed or staged for insert for `entity_ref`.
    fn id_in_use(&self, entity_ref: &str, id: i64) -> Result<bool> {
        if self.table(entity_ref)?.rows.contains_key(&id) {
            return Ok(true);
        }
        Ok(self.pending.iter().any(|c| {
            matches!(c, Change::Insert { record }
                if record.entity_ref() == entity_ref
                    && record.id().and_then(Value::as_i64) == Some(id))
        }))
    }

    /// Rejects a managed record whose identifier was edited after tracking.
    fn check_tracked_id(&self, record: &Record, tracked: Tracked) -> Result<()> {
        let id = record_key(record)?;
        if id != tracked.id {
            return Err(ManagerError::Query(format!(
                "Identifier of managed {} #{} cannot change to {}",
                record.entity_ref(),
                tracked.id,
                id
            )));
        }
        Ok(())
    }

    fn matching(&self, query: &QueryBuilder) -> Result<Vec<Record>> {
        let table = self.table(query.entity_ref())?;

        let referenced = query
            .criteria()
            .iter()
            .map(|(f, _)| f)
            .chain(query.ordering().iter().map(|(f, _)| f));
        for field in referenced {
            if !table.is_mapped_field(field) {
                return Err(unrecognized(field, query.entity_ref()));
            }
        }

        let mut records: Vec<Record> = table
            .rows
            .values()
            .filter(|record| {
                query.criteria().iter().all(|(field, expected)| {
                    record.get(field).unwrap_or(&NULL) == expected
                })
            })
            .cloned()
            .collect();

        if !query.ordering().is_empty() {
            let mut failure = None;
            records.sort_by(|a, b| {
                for (field, order) in query.ordering() {
                    let left = a.get(field).unwrap_or(&NULL);
                    let right = b.get(field).unwrap_or(&NULL);
                    let ord = match left.compare(right) {
                        Ok(ord) => ord,
                        Err(err) => {
                            failure.get_or_insert(err);
                            Ordering::Equal
                        }
                    };
                    let ord = match order {
                        Order::Asc => ord,
                        Order::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
            if let Some(err) = failure {
                return Err(err);
            }
        }

        Ok(records)
    }

    fn apply_pending(&mut self) -> Result<usize> {
        let span = info_span!("memory.flush", pending = self.pending.len());
        let _enter = span.enter();

        // Every change is checked before any table is touched, so a failed
        // flush leaves the store and the staged changes as they were.
        let mut keys = Vec::with_capacity(self.pending.len());
        for change in &self.pending {
            self.table(change.entity_ref())?;
            let key = match change {
                Change::Insert { record } | Change::Update { record } => record_key(record)?,
                Change::Delete { id, .. } => id.as_i64().ok_or_else(|| invalid_id(id))?,
            };
            keys.push(key);
        }

        let changes = std::mem::take(&mut self.pending);
        let applied = changes.len();
        for (change, key) in changes.into_iter().zip(keys) {
            match change {
                Change::Insert { record } | Change::Update { record } => {
                    self.table_mut(record.entity_ref())?.rows.insert(key, record);
                }
                Change::Delete { entity_ref, uid, .. } => {
                    self.table_mut(&entity_ref)?.rows.remove(&key);
                    self.identity.remove(&uid);
                }
            }
        }

        self.flushes += 1;
        event!(Level::DEBUG, applied, "unit of work flushed");
        Ok(applied)
    }
}

#[async_trait]
impl PersistenceContext for InMemoryContext {
    fn is_mapped(&self, entity_ref: &str) -> bool {
        self.tables.contains_key(entity_ref)
    }

    fn fields(&self, entity_ref: &str) -> Result<Vec<String>> {
        Ok(self.table(entity_ref)?.fields.clone())
    }

    fn entity_state(&self, record: &Record) -> EntityState {
        self.identity
            .get(&record.uid())
            .map_or(EntityState::New, |tracked| tracked.state)
    }

    async fn persist(&mut self, record: &mut Record) -> Result<()> {
        let uid = record.uid();
        let Some(tracked) = self.identity.get(&uid).copied() else {
            let requested = match record.id() {
                Some(id) => Some(id.as_i64().ok_or_else(|| invalid_id(id))?),
                None => None,
            };
            if let Some(key) = requested {
                if self.id_in_use(record.entity_ref(), key)? {
                    return Err(ManagerError::Query(format!(
                        "Duplicate identifier {} for entity '{}'",
                        key,
                        record.entity_ref()
                    )));
                }
            }

            let table = self.table_mut(record.entity_ref())?;
            let key = requested.unwrap_or(table.next_id);
            table.next_id = table.next_id.max(key + 1);
            record.set_id(key);

            debug!("staging insert of {} #{}", record.entity_ref(), key);
            self.identity.insert(
                uid,
                Tracked {
                    state: EntityState::Managed,
                    id: key,
                },
            );
            self.pending.push(Change::Insert {
                record: record.clone(),
            });
            return Ok(());
        };

        self.check_tracked_id(record, tracked)?;
        if tracked.state == EntityState::Removed {
            self.pending.retain(|c| !(c.uid() == uid && c.is_removal()));
            self.identity.insert(
                uid,
                Tracked {
                    state: EntityState::Managed,
                    ..tracked
                },
            );
            self.pending.push(Change::Update {
                record: record.clone(),
            });
            return Ok(());
        }

        // Re-persisting an unflushed insert only refreshes its payload.
        if let Some(staged) = self.pending.iter_mut().find_map(|c| match c {
            Change::Insert { record: r } if r.uid() == uid => Some(r),
            _ => None,
        }) {
            *staged = record.clone();
        } else {
            self.pending
                .retain(|c| !(c.uid() == uid && matches!(c, Change::Update { .. })));
            self.pending.push(Change::Update {
                record: record.clone(),
            });
        }
        Ok(())
    }

    async fn remove(&mut self, record: &Record) -> Result<()> {
        let uid = record.uid();
        let Some(tracked) = self.identity.get(&uid).copied() else {
            debug!("remove ignored for untracked {}", record.entity_ref());
            return Ok(());
        };
        match tracked.state {
            EntityState::New | EntityState::Removed => {}
            EntityState::Managed if self.has_pending_insert(uid) => {
                self.pending.retain(|c| c.uid() != uid);
                self.identity.remove(&uid);
            }
            EntityState::Managed => {
                self.pending.retain(|c| c.uid() != uid);
                self.identity.insert(
                    uid,
                    Tracked {
                        state: EntityState::Removed,
                        ..tracked
                    },
                );
                self.pending.push(Change::Delete {
                    entity_ref: record.entity_ref().to_string(),
                    id: Value::Integer(tracked.id),
                    uid,
                });
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        self.apply_pending()?;
        Ok(())
    }

    async fn find(&mut self, entity_ref: &str, id: &Value) -> Result<Option<Record>> {
        let table = self.table(entity_ref)?;
        let Some(key) = id.as_i64() else {
            return Ok(None);
        };

        let staged = self
            .pending
            .iter()
            .rev()
            .filter_map(Change::pending_record)
            .find(|r| r.entity_ref() == entity_ref && r.id().and_then(Value::as_i64) == Some(key));

        Ok(staged.or_else(|| table.rows.get(&key)).cloned())
    }

    async fn load(&mut self, query: &QueryBuilder) -> Result<Vec<Record>> {
        let records = self.matching(query)?;
        let window = records.into_iter().skip(query.first_result());
        Ok(match query.max_results() {
            Some(limit) => window.take(limit).collect(),
            None => window.collect(),
        })
    }

    async fn select_rows(&mut self, query: &QueryBuilder) -> Result<Vec<Row>> {
        if query.selection().is_empty() {
            return Err(ManagerError::Query(
                "Scalar query requires at least one selected field".to_string(),
            ));
        }
        let table = self.table(query.entity_ref())?;
        if let Some(field) = query
            .selection()
            .iter()
            .find(|f| !table.is_mapped_field(f))
        {
            return Err(unrecognized(field, query.entity_ref()));
        }

        let records = self.load(query).await?;
        Ok(records
            .iter()
            .map(|record| {
                query
                    .selection()
                    .iter()
                    .map(|field| record.get(field).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect())
    }

    async fn count(&mut self, query: &QueryBuilder) -> Result<usize> {
        Ok(self.matching(query)?.len())
    }
}

fn record_key(record: &Record) -> Result<i64> {
    let id = record.id().cloned().unwrap_or(Value::Null);
    id.as_i64().ok_or_else(|| invalid_id(&id))
}

fn invalid_id(id: &Value) -> ManagerError {
    ManagerError::Query(format!("Invalid identifier: {}", id))
}

fn unrecognized(field: &str, entity_ref: &str) -> ManagerError {
    ManagerError::Query(format!(
        "Unrecognized field: {} for entity '{}'",
        field, entity_ref
    ))
}
