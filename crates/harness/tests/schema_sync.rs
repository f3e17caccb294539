use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use metaprop_core::{field_value::*, group::DisplayGroup, ids::*};
use metaprop_engine::{FixedInput, ImportOutcome, Importer, ScratchStore};
use metaprop_harness::TestModel;
use metaprop_storage::{
    DefinitionRecord, FieldRecord, GroupRecord, Host, ItemRecord, SqliteHost, StorageError,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn failed_binding_skips_only_that_field() -> TestResult {
    let mut model = TestModel::new()?;
    model.host.add_category("Views", false)?;
    model.item("W1", "Walls")?;
    model.item("V1", "Views")?;
    let input = model.write_csv(
        "props.csv",
        &[
            "V1,Level 1 Plan,Data,Approved,yes,Text,",
            "W1,Wall 1,Data,Cost,150,Int,",
            "W1,Wall 1,Data,Approved,no,Text,",
        ],
    )?;

    let report = match model.import(&input) {
        ImportOutcome::Succeeded(report) => report,
        other => panic!("expected success, got {other:?}"),
    };

    // Approved is bound to {Views, Walls} and Views refuses bound fields.
    assert_eq!(report.schema_requests, 2);
    assert_eq!(report.fields_created, vec!["Cost".to_string()]);
    assert_eq!(report.binding_failures.len(), 1);
    assert_eq!(report.binding_failures[0].field_name, "Approved");
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(model.value("W1", "Cost")?, Some(FieldValue::Integer(150)));
    assert!(model.fields("W1", "Approved")?.is_empty());
    Ok(())
}

#[test]
fn fields_are_created_in_name_order() -> TestResult {
    let mut model = TestModel::new()?;
    model.item("W1", "Walls")?;
    let input = model.write_csv(
        "props.csv",
        &[
            "W1,Wall 1,Data,Zeta,1,Int,",
            "W1,Wall 1,Data,Alpha,a,Text,",
            "W1,Wall 1,Dimensions,Mid,2.5,Double,",
        ],
    )?;

    let outcome = model.import(&input);
    let report = outcome.report().ok_or("import did not succeed")?;

    assert_eq!(report.fields_created, vec!["Alpha", "Mid", "Zeta"]);
    Ok(())
}

#[test]
fn schema_store_pointer_is_restored_after_run() -> TestResult {
    let mut model = TestModel::new()?;
    let shared = model.path("shared.db");
    model.host.set_schema_store_pointer(Some(&shared))?;
    model.item("W1", "Walls")?;
    let input = model.write_csv("props.csv", &["W1,Wall 1,Data,Cost,150,Int,"])?;

    assert!(model.import(&input).is_success());

    assert_eq!(model.host.schema_store_pointer(), Some(shared));
    Ok(())
}

#[test]
fn schema_store_pointer_is_restored_when_redirect_fails() -> TestResult {
    let mut model = TestModel::new()?;
    let shared = model.path("shared.db");
    model.host.set_schema_store_pointer(Some(&shared))?;
    model.config.scratch_store = model.path("no/such/dir/store.db");
    model.item("W1", "Walls")?;
    let input = model.write_csv("props.csv", &["W1,Wall 1,Data,Cost,150,Int,"])?;

    assert!(matches!(model.import(&input), ImportOutcome::Failed(_)));

    assert_eq!(model.host.schema_store_pointer(), Some(shared));
    assert_eq!(model.host.undo_depth(), 0);
    Ok(())
}

#[test]
fn scratch_store_guard_restores_on_drop() -> TestResult {
    let dir = tempfile::tempdir()?;
    let mut host = SqliteHost::open_in_memory()?;
    assert_eq!(host.schema_store_pointer(), None);

    {
        let mut store = ScratchStore::redirect(&mut host, &dir.path().join("scratch.db"))?;
        let group = store.host().resolve_or_create_group("Data")?;
        store
            .host()
            .resolve_or_create_definition(&group, "Cost", FieldType::Integer)?;
        // Dropped without an explicit restore.
    }

    assert_eq!(host.schema_store_pointer(), None);
    Ok(())
}

// ============================================================================
// Integrity check
// ============================================================================

/// Reports every field twice once anything has been bound, the way a host
/// with a broken binding table would.
struct DuplicatingHost {
    inner: SqliteHost,
    bound: bool,
}

impl Host for DuplicatingHost {
    fn lookup_item(&self, item_id: &ItemId) -> Result<Option<ItemRecord>, StorageError> {
        self.inner.lookup_item(item_id)
    }

    fn get_fields(&self, item: &ItemRecord, name: &str) -> Result<Vec<FieldRecord>, StorageError> {
        let fields = self.inner.get_fields(item, name)?;
        if self.bound {
            Ok(fields.iter().chain(fields.iter()).cloned().collect())
        } else {
            Ok(fields)
        }
    }

    fn field_value(&self, field: &FieldRecord) -> Result<Option<FieldValue>, StorageError> {
        self.inner.field_value(field)
    }

    fn set_field_value(&mut self, field: &FieldRecord, value: FieldValue) -> Result<(), StorageError> {
        self.inner.set_field_value(field, value)
    }

    fn resolve_or_create_group(&mut self, name: &str) -> Result<GroupRecord, StorageError> {
        self.inner.resolve_or_create_group(name)
    }

    fn resolve_or_create_definition(
        &mut self,
        group: &GroupRecord,
        name: &str,
        field_type: FieldType,
    ) -> Result<DefinitionRecord, StorageError> {
        self.inner.resolve_or_create_definition(group, name, field_type)
    }

    fn bind_definition(
        &mut self,
        definition: &DefinitionRecord,
        display_group: DisplayGroup,
        categories: &BTreeSet<Category>,
    ) -> Result<(), StorageError> {
        self.bound = true;
        self.inner.bind_definition(definition, display_group, categories)
    }

    fn schema_store_pointer(&self) -> Option<PathBuf> {
        self.inner.schema_store_pointer()
    }

    fn set_schema_store_pointer(&mut self, path: Option<&Path>) -> Result<(), StorageError> {
        self.inner.set_schema_store_pointer(path)
    }

    fn begin_group(&mut self, name: &str) -> Result<(), StorageError> {
        self.inner.begin_group(name)
    }

    fn begin_phase(&mut self, name: &str) -> Result<(), StorageError> {
        self.inner.begin_phase(name)
    }

    fn commit_phase(&mut self) -> Result<(), StorageError> {
        self.inner.commit_phase()
    }

    fn rollback_phase(&mut self) -> Result<(), StorageError> {
        self.inner.rollback_phase()
    }

    fn assimilate_group(&mut self) -> Result<(), StorageError> {
        self.inner.assimilate_group()
    }

    fn rollback_group(&mut self) -> Result<(), StorageError> {
        self.inner.rollback_group()
    }
}

#[test]
fn duplicate_fields_at_apply_abort_the_batch() -> TestResult {
    let model = TestModel::new()?;
    let input = model.write_csv("props.csv", &["W1,Wall 1,Data,Cost,150,Int,"])?;
    let mut host = DuplicatingHost {
        inner: SqliteHost::open_in_memory()?,
        bound: false,
    };
    host.inner.add_item("W1", "Walls")?;
    let mut importer = Importer::new(model.config.clone());

    let outcome = importer.run(&mut host, &mut FixedInput(Some(input)));

    match outcome {
        ImportOutcome::Failed(message) => assert!(message.contains("integrity"), "{message}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(host.inner.bindings()?.is_empty());
    assert_eq!(host.inner.undo_depth(), 0);
    Ok(())
}
