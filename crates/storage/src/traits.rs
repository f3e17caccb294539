use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use metaprop_core::{
    field_value::{FieldType, FieldValue},
    group::DisplayGroup,
    ids::*,
};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub item_id: ItemId,
    pub category: Category,
}

/// Where a field on an item comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    /// Owned by the item itself, addressed by a host-assigned slot.
    Intrinsic(i64),
    /// Carried because a schema definition is bound to the item's category.
    Bound(DefinitionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub item_id: ItemId,
    pub name: String,
    pub field_type: FieldType,
    pub read_only: bool,
    pub source: FieldSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionRecord {
    pub definition_id: DefinitionId,
    pub group: String,
    pub name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRecord {
    pub definition_id: DefinitionId,
    pub name: String,
    pub field_type: FieldType,
    pub display_group: DisplayGroup,
    pub category: Category,
}

/// The host application's object model as seen by the import engine.
///
/// Mutating calls are only valid inside an open transaction group. The
/// schema-store pointer is process-wide host state: whoever redirects it
/// must put it back.
pub trait Host {
    fn lookup_item(&self, item_id: &ItemId) -> Result<Option<ItemRecord>, StorageError>;

    /// All fields named `name` that `item` carries, intrinsic and bound.
    fn get_fields(&self, item: &ItemRecord, name: &str) -> Result<Vec<FieldRecord>, StorageError>;

    fn field_value(&self, field: &FieldRecord) -> Result<Option<FieldValue>, StorageError>;

    fn set_field_value(&mut self, field: &FieldRecord, value: FieldValue) -> Result<(), StorageError>;

    fn resolve_or_create_group(&mut self, name: &str) -> Result<GroupRecord, StorageError>;

    fn resolve_or_create_definition(
        &mut self,
        group: &GroupRecord,
        name: &str,
        field_type: FieldType,
    ) -> Result<DefinitionRecord, StorageError>;

    /// Bind a definition to every category in `categories`. Either all
    /// bindings are made or none are.
    fn bind_definition(
        &mut self,
        definition: &DefinitionRecord,
        display_group: DisplayGroup,
        categories: &BTreeSet<Category>,
    ) -> Result<(), StorageError>;

    fn schema_store_pointer(&self) -> Option<PathBuf>;

    fn set_schema_store_pointer(&mut self, path: Option<&Path>) -> Result<(), StorageError>;

    fn begin_group(&mut self, name: &str) -> Result<(), StorageError>;

    fn begin_phase(&mut self, name: &str) -> Result<(), StorageError>;

    fn commit_phase(&mut self) -> Result<(), StorageError>;

    fn rollback_phase(&mut self) -> Result<(), StorageError>;

    /// Commit the group, merging all of its phases into one undo step.
    fn assimilate_group(&mut self) -> Result<(), StorageError>;

    fn rollback_group(&mut self) -> Result<(), StorageError>;
}
