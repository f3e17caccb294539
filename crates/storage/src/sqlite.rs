use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use metaprop_core::{
    field_value::{FieldType, FieldValue},
    group::DisplayGroup,
    ids::*,
};

use crate::error::StorageError;
use crate::traits::{
    BindingRecord, DefinitionRecord, FieldRecord, FieldSource, GroupRecord, Host, ItemRecord,
};
use crate::undo::{Change, UndoManager};

const DEFAULT_UNDO_DEPTH: usize = 100;
const GROUP_SAVEPOINT: &str = "metaprop_group";

fn encode(value: &FieldValue) -> Result<Vec<u8>, StorageError> {
    value
        .to_msgpack()
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<FieldValue, StorageError> {
    FieldValue::from_msgpack(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn parse_definition_id(s: &str) -> Result<DefinitionId, StorageError> {
    DefinitionId::parse(s).map_err(|e| StorageError::Serialization(format!("definition id: {e}")))
}

fn parse_display_group(s: &str) -> Result<DisplayGroup, StorageError> {
    DisplayGroup::resolve(s, &Default::default())
        .ok_or_else(|| StorageError::Serialization(format!("unknown display group: {s}")))
}

fn value_fits(field_type: FieldType, value: &FieldValue) -> bool {
    matches!(
        (field_type, value),
        (FieldType::Text, FieldValue::Text(_))
            | (FieldType::Integer, FieldValue::Integer(_))
            | (FieldType::Number, FieldValue::Number(_))
            | (FieldType::Reference, FieldValue::Reference(_) | FieldValue::Null)
    )
}

fn phase_savepoint(depth: usize) -> String {
    format!("metaprop_phase_{depth}")
}

struct OpenPhase {
    name: String,
    changes: Vec<Change>,
}

struct OpenGroup {
    name: String,
    changes: Vec<Change>,
    phases: Vec<OpenPhase>,
}

/// A target model kept in SQLite, with its schema store in a separate file.
pub struct SqliteHost {
    conn: Connection,
    schema_store: Option<PathBuf>,
    group: Option<OpenGroup>,
    undo_manager: UndoManager,
}

impl SqliteHost {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        crate::schema::init_model_schema(&conn)?;
        Ok(Self {
            conn,
            schema_store: None,
            group: None,
            undo_manager: UndoManager::new(DEFAULT_UNDO_DEPTH),
        })
    }

    // ========================================================================
    // Model authoring (outside the import transaction machinery)
    // ========================================================================

    pub fn add_category(&self, category: &str, allows_bound_fields: bool) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO categories (category, allows_bound_fields) VALUES (?1, ?2)
             ON CONFLICT(category) DO UPDATE SET allows_bound_fields = excluded.allows_bound_fields",
            rusqlite::params![category, allows_bound_fields],
        )?;
        Ok(())
    }

    pub fn add_item(&self, item_id: &str, category: &str) -> Result<ItemRecord, StorageError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO categories (category) VALUES (?1)",
            rusqlite::params![category],
        )?;
        self.conn.execute(
            "INSERT INTO items (item_id, category) VALUES (?1, ?2)",
            rusqlite::params![item_id, category],
        )?;
        Ok(ItemRecord {
            item_id: ItemId::new(item_id),
            category: Category::new(category),
        })
    }

    /// Add a field owned by the item itself. Returns its slot.
    pub fn add_field(
        &self,
        item_id: &str,
        name: &str,
        field_type: FieldType,
        read_only: bool,
        value: FieldValue,
    ) -> Result<i64, StorageError> {
        if !value_fits(field_type, &value) {
            return Err(StorageError::ValueTypeMismatch {
                field: name.to_string(),
                expected: field_type.to_string(),
            });
        }
        self.conn.execute(
            "INSERT INTO item_fields (item_id, name, field_type, read_only, value) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![item_id, name, field_type.as_str(), read_only, encode(&value)?],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Every field the item carries, intrinsic first, then bound.
    pub fn all_fields(&self, item: &ItemRecord) -> Result<Vec<FieldRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM item_fields WHERE item_id = ?1 ORDER BY rowid")?;
        let mut names: Vec<String> = stmt
            .query_map(rusqlite::params![item.item_id.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM bindings WHERE category = ?1 ORDER BY name")?;
        let bound: Vec<String> = stmt
            .query_map(rusqlite::params![item.category.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        names.extend(bound);
        names.dedup();

        let mut seen = BTreeSet::new();
        let mut fields = Vec::new();
        for name in names {
            if seen.insert(name.clone()) {
                fields.extend(self.get_fields(item, &name)?);
            }
        }
        Ok(fields)
    }

    pub fn bindings(&self) -> Result<Vec<BindingRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT definition_id, name, field_type, display_group, category FROM bindings ORDER BY name, category",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (definition_id, name, field_type, display_group, category) = row?;
            result.push(BindingRecord {
                definition_id: parse_definition_id(&definition_id)?,
                name,
                field_type: FieldType::parse(&field_type)?,
                display_group: parse_display_group(&display_group)?,
                category: Category::new(category),
            });
        }
        Ok(result)
    }

    // ========================================================================
    // Undo
    // ========================================================================

    pub fn undo_depth(&self) -> usize {
        self.undo_manager.undo_depth()
    }

    pub fn undo_step_names(&self) -> Vec<&str> {
        self.undo_manager.step_names()
    }

    /// Revert the most recent committed group. Returns its name.
    pub fn undo(&mut self) -> Result<Option<String>, StorageError> {
        if self.group.is_some() {
            return Err(StorageError::TransactionState(
                "cannot undo while a group is open".to_string(),
            ));
        }
        let Some(entry) = self.undo_manager.pop_undo() else {
            return Ok(None);
        };

        let tx = self.conn.transaction()?;
        for change in entry.changes.iter().rev() {
            match change {
                Change::FieldWritten {
                    source: FieldSource::Intrinsic(slot),
                    previous: Some(previous),
                    ..
                } => {
                    tx.execute(
                        "UPDATE item_fields SET value = ?1 WHERE rowid = ?2",
                        rusqlite::params![encode(previous)?, slot],
                    )?;
                }
                Change::FieldWritten {
                    source: FieldSource::Intrinsic(_),
                    previous: None,
                    ..
                } => {}
                Change::FieldWritten {
                    item_id,
                    source: FieldSource::Bound(definition_id),
                    previous: Some(previous),
                } => {
                    tx.execute(
                        "UPDATE bound_values SET value = ?1 WHERE item_id = ?2 AND definition_id = ?3",
                        rusqlite::params![
                            encode(previous)?,
                            item_id.as_str(),
                            definition_id.to_string()
                        ],
                    )?;
                }
                Change::FieldWritten {
                    item_id,
                    source: FieldSource::Bound(definition_id),
                    previous: None,
                } => {
                    tx.execute(
                        "DELETE FROM bound_values WHERE item_id = ?1 AND definition_id = ?2",
                        rusqlite::params![item_id.as_str(), definition_id.to_string()],
                    )?;
                }
                Change::BindingAdded {
                    definition_id,
                    category,
                } => {
                    tx.execute(
                        "DELETE FROM bindings WHERE definition_id = ?1 AND category = ?2",
                        rusqlite::params![definition_id.to_string(), category.as_str()],
                    )?;
                }
            }
        }
        tx.commit()?;
        info!(step = %entry.name, changes = entry.changes.len(), "undid transaction group");
        Ok(Some(entry.name))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn record_change(&mut self, change: Change) -> Result<(), StorageError> {
        let group = self.group.as_mut().ok_or(StorageError::NoTransaction)?;
        match group.phases.last_mut() {
            Some(phase) => phase.changes.push(change),
            None => group.changes.push(change),
        }
        Ok(())
    }

    fn require_group(&self) -> Result<(), StorageError> {
        match self.group {
            Some(_) => Ok(()),
            None => Err(StorageError::NoTransaction),
        }
    }

    fn open_store(&self) -> Result<Connection, StorageError> {
        let path = self.schema_store.as_ref().ok_or(StorageError::NoSchemaStore)?;
        let conn = Connection::open(path)?;
        crate::schema::init_store_schema(&conn)?;
        Ok(conn)
    }

    fn check_binding(
        &self,
        definition: &DefinitionRecord,
        category: &Category,
    ) -> Result<(), StorageError> {
        let rejected = |reason: String| StorageError::BindingRejected {
            name: definition.name.clone(),
            reason,
        };

        let allows: Option<bool> = self
            .conn
            .query_row(
                "SELECT allows_bound_fields FROM categories WHERE category = ?1",
                rusqlite::params![category.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match allows {
            None => return Err(rejected(format!("unknown category {category}"))),
            Some(false) => {
                return Err(rejected(format!("category {category} does not allow bound fields")));
            }
            Some(true) => {}
        }

        let other: Option<String> = self
            .conn
            .query_row(
                "SELECT definition_id FROM bindings WHERE name = ?1 AND category = ?2 AND definition_id != ?3",
                rusqlite::params![
                    definition.name,
                    category.as_str(),
                    definition.definition_id.to_string()
                ],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(other) = other {
            return Err(rejected(format!(
                "category {category} already carries a different field of that name ({other})"
            )));
        }

        let clashes: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM item_fields f JOIN items i ON f.item_id = i.item_id
             WHERE i.category = ?1 AND f.name = ?2",
            rusqlite::params![category.as_str(), definition.name],
            |row| row.get(0),
        )?;
        if clashes > 0 {
            return Err(rejected(format!(
                "{clashes} item field(s) of category {category} already use that name"
            )));
        }
        Ok(())
    }
}

impl Host for SqliteHost {
    fn lookup_item(&self, item_id: &ItemId) -> Result<Option<ItemRecord>, StorageError> {
        let category: Option<String> = self
            .conn
            .query_row(
                "SELECT category FROM items WHERE item_id = ?1",
                rusqlite::params![item_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(category.map(|category| ItemRecord {
            item_id: item_id.clone(),
            category: Category::new(category),
        }))
    }

    fn get_fields(&self, item: &ItemRecord, name: &str) -> Result<Vec<FieldRecord>, StorageError> {
        let mut fields = Vec::new();

        let mut stmt = self.conn.prepare(
            "SELECT rowid, field_type, read_only FROM item_fields WHERE item_id = ?1 AND name = ?2 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(rusqlite::params![item.item_id.as_str(), name], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;
        for row in rows {
            let (slot, field_type, read_only) = row?;
            fields.push(FieldRecord {
                item_id: item.item_id.clone(),
                name: name.to_string(),
                field_type: FieldType::parse(&field_type)?,
                read_only,
                source: FieldSource::Intrinsic(slot),
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT definition_id, field_type FROM bindings WHERE name = ?1 AND category = ?2 ORDER BY definition_id",
        )?;
        let rows = stmt.query_map(rusqlite::params![name, item.category.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (definition_id, field_type) = row?;
            fields.push(FieldRecord {
                item_id: item.item_id.clone(),
                name: name.to_string(),
                field_type: FieldType::parse(&field_type)?,
                read_only: false,
                source: FieldSource::Bound(parse_definition_id(&definition_id)?),
            });
        }

        Ok(fields)
    }

    fn field_value(&self, field: &FieldRecord) -> Result<Option<FieldValue>, StorageError> {
        let bytes: Option<Vec<u8>> = match &field.source {
            FieldSource::Intrinsic(slot) => self
                .conn
                .query_row(
                    "SELECT value FROM item_fields WHERE rowid = ?1",
                    rusqlite::params![slot],
                    |row| row.get(0),
                )
                .optional()?,
            FieldSource::Bound(definition_id) => self
                .conn
                .query_row(
                    "SELECT value FROM bound_values WHERE item_id = ?1 AND definition_id = ?2",
                    rusqlite::params![field.item_id.as_str(), definition_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?,
        };
        bytes.map(|b| decode(&b)).transpose()
    }

    fn set_field_value(&mut self, field: &FieldRecord, value: FieldValue) -> Result<(), StorageError> {
        self.require_group()?;
        if field.read_only {
            return Err(StorageError::ReadOnlyField(field.name.clone()));
        }
        if !value_fits(field.field_type, &value) {
            return Err(StorageError::ValueTypeMismatch {
                field: field.name.clone(),
                expected: field.field_type.to_string(),
            });
        }

        let previous = self.field_value(field)?;
        let bytes = encode(&value)?;
        match &field.source {
            FieldSource::Intrinsic(slot) => {
                self.conn.execute(
                    "UPDATE item_fields SET value = ?1 WHERE rowid = ?2",
                    rusqlite::params![bytes, slot],
                )?;
            }
            FieldSource::Bound(definition_id) => {
                self.conn.execute(
                    "INSERT INTO bound_values (item_id, definition_id, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(item_id, definition_id) DO UPDATE SET value = excluded.value",
                    rusqlite::params![field.item_id.as_str(), definition_id.to_string(), bytes],
                )?;
            }
        }
        debug!(item = %field.item_id, field = %field.name, %value, "field value set");

        self.record_change(Change::FieldWritten {
            item_id: field.item_id.clone(),
            source: field.source.clone(),
            previous,
        })
    }

    fn resolve_or_create_group(&mut self, name: &str) -> Result<GroupRecord, StorageError> {
        let store = self.open_store()?;
        let created = store.execute(
            "INSERT OR IGNORE INTO groups (name) VALUES (?1)",
            rusqlite::params![name],
        )?;
        if created > 0 {
            debug!(group = name, "schema group created");
        }
        Ok(GroupRecord {
            name: name.to_string(),
        })
    }

    fn resolve_or_create_definition(
        &mut self,
        group: &GroupRecord,
        name: &str,
        field_type: FieldType,
    ) -> Result<DefinitionRecord, StorageError> {
        let store = self.open_store()?;
        let existing: Option<(String, String)> = store
            .query_row(
                "SELECT definition_id, field_type FROM definitions WHERE group_name = ?1 AND name = ?2",
                rusqlite::params![group.name, name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((definition_id, existing_type)) = existing {
            let existing_type = FieldType::parse(&existing_type)?;
            if existing_type != field_type {
                return Err(StorageError::DefinitionTypeConflict {
                    name: name.to_string(),
                    existing: existing_type.to_string(),
                    requested: field_type.to_string(),
                });
            }
            return Ok(DefinitionRecord {
                definition_id: parse_definition_id(&definition_id)?,
                group: group.name.clone(),
                name: name.to_string(),
                field_type,
            });
        }

        let definition_id = DefinitionId::new();
        store.execute(
            "INSERT INTO definitions (definition_id, group_name, name, field_type) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![definition_id.to_string(), group.name, name, field_type.as_str()],
        )?;
        debug!(group = %group.name, definition = name, %field_type, "schema definition created");
        Ok(DefinitionRecord {
            definition_id,
            group: group.name.clone(),
            name: name.to_string(),
            field_type,
        })
    }

    fn bind_definition(
        &mut self,
        definition: &DefinitionRecord,
        display_group: DisplayGroup,
        categories: &BTreeSet<Category>,
    ) -> Result<(), StorageError> {
        self.require_group()?;
        for category in categories {
            self.check_binding(definition, category)?;
        }

        for category in categories {
            let inserted = self.conn.execute(
                "INSERT OR IGNORE INTO bindings (definition_id, name, field_type, display_group, category) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    definition.definition_id.to_string(),
                    definition.name,
                    definition.field_type.as_str(),
                    display_group.as_str(),
                    category.as_str(),
                ],
            )?;
            if inserted > 0 {
                self.record_change(Change::BindingAdded {
                    definition_id: definition.definition_id,
                    category: category.clone(),
                })?;
            }
        }
        Ok(())
    }

    fn schema_store_pointer(&self) -> Option<PathBuf> {
        self.schema_store.clone()
    }

    fn set_schema_store_pointer(&mut self, path: Option<&Path>) -> Result<(), StorageError> {
        self.schema_store = path.map(Path::to_path_buf);
        if self.schema_store.is_some() {
            // Creates the store file on first use.
            self.open_store()?;
        }
        Ok(())
    }

    fn begin_group(&mut self, name: &str) -> Result<(), StorageError> {
        if let Some(open) = &self.group {
            return Err(StorageError::TransactionState(format!(
                "group {:?} is already open",
                open.name
            )));
        }
        self.conn
            .execute_batch(&format!("SAVEPOINT {GROUP_SAVEPOINT}"))?;
        self.group = Some(OpenGroup {
            name: name.to_string(),
            changes: Vec::new(),
            phases: Vec::new(),
        });
        debug!(group = name, "transaction group started");
        Ok(())
    }

    fn begin_phase(&mut self, name: &str) -> Result<(), StorageError> {
        let group = self.group.as_mut().ok_or(StorageError::NoTransaction)?;
        let savepoint = phase_savepoint(group.phases.len());
        self.conn.execute_batch(&format!("SAVEPOINT {savepoint}"))?;
        group.phases.push(OpenPhase {
            name: name.to_string(),
            changes: Vec::new(),
        });
        debug!(phase = name, "transaction phase started");
        Ok(())
    }

    fn commit_phase(&mut self) -> Result<(), StorageError> {
        let group = self.group.as_mut().ok_or(StorageError::NoTransaction)?;
        let phase = group
            .phases
            .pop()
            .ok_or_else(|| StorageError::TransactionState("no open phase".to_string()))?;
        let savepoint = phase_savepoint(group.phases.len());
        self.conn
            .execute_batch(&format!("RELEASE SAVEPOINT {savepoint}"))?;
        debug!(phase = %phase.name, changes = phase.changes.len(), "transaction phase committed");
        match group.phases.last_mut() {
            Some(parent) => parent.changes.extend(phase.changes),
            None => group.changes.extend(phase.changes),
        }
        Ok(())
    }

    fn rollback_phase(&mut self) -> Result<(), StorageError> {
        let group = self.group.as_mut().ok_or(StorageError::NoTransaction)?;
        let phase = group
            .phases
            .pop()
            .ok_or_else(|| StorageError::TransactionState("no open phase".to_string()))?;
        let savepoint = phase_savepoint(group.phases.len());
        self.conn.execute_batch(&format!(
            "ROLLBACK TO SAVEPOINT {savepoint}; RELEASE SAVEPOINT {savepoint}"
        ))?;
        debug!(phase = %phase.name, "transaction phase rolled back");
        Ok(())
    }

    fn assimilate_group(&mut self) -> Result<(), StorageError> {
        let group = self.group.take().ok_or(StorageError::NoTransaction)?;
        if let Some(phase) = group.phases.last() {
            let message = format!("phase {:?} is still open", phase.name);
            self.group = Some(group);
            return Err(StorageError::TransactionState(message));
        }
        self.conn
            .execute_batch(&format!("RELEASE SAVEPOINT {GROUP_SAVEPOINT}"))?;
        info!(group = %group.name, changes = group.changes.len(), "transaction group committed");
        if !group.changes.is_empty() {
            self.undo_manager.push_undo(group.name, group.changes);
        }
        Ok(())
    }

    fn rollback_group(&mut self) -> Result<(), StorageError> {
        let group = self.group.take().ok_or(StorageError::NoTransaction)?;
        self.conn.execute_batch(&format!(
            "ROLLBACK TO SAVEPOINT {GROUP_SAVEPOINT}; RELEASE SAVEPOINT {GROUP_SAVEPOINT}"
        ))?;
        info!(group = %group.name, "transaction group rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with_wall() -> SqliteHost {
        let host = SqliteHost::open_in_memory().unwrap();
        host.add_category("Walls", true).unwrap();
        host.add_item("W1", "Walls").unwrap();
        host
    }

    fn store_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("store.db")
    }

    #[test]
    fn writes_require_open_group() {
        let mut host = host_with_wall();
        host.add_field("W1", "Mark", FieldType::Text, false, FieldValue::Text("A".into()))
            .unwrap();
        let item = host.lookup_item(&ItemId::new("W1")).unwrap().unwrap();
        let field = host.get_fields(&item, "Mark").unwrap().remove(0);
        let err = host.set_field_value(&field, FieldValue::Text("B".into()));
        assert!(matches!(err, Err(StorageError::NoTransaction)));
    }

    #[test]
    fn rolled_back_phase_discards_writes() {
        let mut host = host_with_wall();
        host.add_field("W1", "Mark", FieldType::Text, false, FieldValue::Text("A".into()))
            .unwrap();
        let item = host.lookup_item(&ItemId::new("W1")).unwrap().unwrap();
        let field = host.get_fields(&item, "Mark").unwrap().remove(0);

        host.begin_group("test").unwrap();
        host.begin_phase("one").unwrap();
        host.set_field_value(&field, FieldValue::Text("B".into())).unwrap();
        host.rollback_phase().unwrap();
        host.assimilate_group().unwrap();

        assert_eq!(host.field_value(&field).unwrap(), Some(FieldValue::Text("A".into())));
        assert_eq!(host.undo_depth(), 0);
    }

    #[test]
    fn assimilate_refuses_open_phase() {
        let mut host = host_with_wall();
        host.begin_group("test").unwrap();
        host.begin_phase("one").unwrap();
        assert!(matches!(host.assimilate_group(), Err(StorageError::TransactionState(_))));
        host.commit_phase().unwrap();
        host.assimilate_group().unwrap();
    }

    #[test]
    fn definitions_need_a_store() {
        let mut host = host_with_wall();
        let group = GroupRecord { name: "Data".into() };
        assert!(matches!(
            host.resolve_or_create_definition(&group, "Cost", FieldType::Integer),
            Err(StorageError::NoSchemaStore)
        ));
    }

    #[test]
    fn definition_is_resolved_by_group_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = host_with_wall();
        host.set_schema_store_pointer(Some(&store_path(&dir))).unwrap();

        let group = host.resolve_or_create_group("Data").unwrap();
        let first = host.resolve_or_create_definition(&group, "Cost", FieldType::Integer).unwrap();
        let again = host.resolve_or_create_definition(&group, "Cost", FieldType::Integer).unwrap();
        assert_eq!(first.definition_id, again.definition_id);

        let conflict = host.resolve_or_create_definition(&group, "Cost", FieldType::Text);
        assert!(matches!(conflict, Err(StorageError::DefinitionTypeConflict { .. })));
    }

    #[test]
    fn binding_to_closed_category_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = host_with_wall();
        host.add_category("Views", false).unwrap();
        host.set_schema_store_pointer(Some(&store_path(&dir))).unwrap();
        let group = host.resolve_or_create_group("Data").unwrap();
        let definition = host.resolve_or_create_definition(&group, "Cost", FieldType::Integer).unwrap();

        let categories: BTreeSet<Category> =
            [Category::new("Walls"), Category::new("Views")].into_iter().collect();
        host.begin_group("test").unwrap();
        let result = host.bind_definition(&definition, DisplayGroup::Data, &categories);
        assert!(matches!(result, Err(StorageError::BindingRejected { .. })));
        host.assimilate_group().unwrap();

        assert!(host.bindings().unwrap().is_empty());
    }

    #[test]
    fn undo_reverts_bound_values_and_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = host_with_wall();
        host.set_schema_store_pointer(Some(&store_path(&dir))).unwrap();
        let group = host.resolve_or_create_group("Data").unwrap();
        let definition = host.resolve_or_create_definition(&group, "Cost", FieldType::Integer).unwrap();
        let categories: BTreeSet<Category> = [Category::new("Walls")].into_iter().collect();

        host.begin_group("import").unwrap();
        host.begin_phase("bind").unwrap();
        host.bind_definition(&definition, DisplayGroup::Data, &categories).unwrap();
        host.commit_phase().unwrap();
        host.begin_phase("apply").unwrap();
        let item = host.lookup_item(&ItemId::new("W1")).unwrap().unwrap();
        let field = host.get_fields(&item, "Cost").unwrap().remove(0);
        host.set_field_value(&field, FieldValue::Integer(150)).unwrap();
        host.commit_phase().unwrap();
        host.assimilate_group().unwrap();

        assert_eq!(host.undo_depth(), 1);
        assert_eq!(host.field_value(&field).unwrap(), Some(FieldValue::Integer(150)));

        assert_eq!(host.undo().unwrap(), Some("import".to_string()));
        assert!(host.get_fields(&item, "Cost").unwrap().is_empty());
        assert_eq!(host.field_value(&field).unwrap(), None);
        assert_eq!(host.undo().unwrap(), None);
    }
}
