use std::path::{Path, PathBuf};

use metaprop_core::{field_value::*, ids::*};
use metaprop_engine::{FixedInput, ImportConfig, ImportOutcome, Importer};
use metaprop_storage::{FieldRecord, Host, SqliteHost, StorageError};
use tempfile::TempDir;

pub const CSV_HEADER: &str =
    "externalId,component,displayCategory,displayName,displayValue,metaType,filelink,filename,link";

/// An in-memory target model plus a scratch directory for input files,
/// the schema store and the run log.
pub struct TestModel {
    pub host: SqliteHost,
    pub dir: TempDir,
    pub config: ImportConfig,
}

impl TestModel {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let config = ImportConfig {
            scratch_store: dir.path().join("scratch_store.db"),
            log_file: dir.path().join("metaprop.log"),
            ..Default::default()
        };
        Ok(Self {
            host: SqliteHost::open_in_memory()?,
            dir,
            config,
        })
    }

    pub fn item(&self, item_id: &str, category: &str) -> Result<(), StorageError> {
        self.host.add_item(item_id, category)?;
        Ok(())
    }

    /// Add a field owned by the item itself.
    pub fn field(
        &self,
        item_id: &str,
        name: &str,
        field_type: FieldType,
        read_only: bool,
        value: FieldValue,
    ) -> Result<(), StorageError> {
        self.host.add_field(item_id, name, field_type, read_only, value)?;
        Ok(())
    }

    pub fn fields(&self, item_id: &str, name: &str) -> Result<Vec<FieldRecord>, StorageError> {
        let item = self
            .host
            .lookup_item(&ItemId::new(item_id))?
            .ok_or_else(|| StorageError::NotFound(item_id.to_string()))?;
        self.host.get_fields(&item, name)
    }

    /// Value of the single field `name` on `item_id`; None if it has no value.
    pub fn value(&self, item_id: &str, name: &str) -> Result<Option<FieldValue>, StorageError> {
        let fields = self.fields(item_id, name)?;
        match fields.as_slice() {
            [field] => self.host.field_value(field),
            other => Err(StorageError::NotFound(format!(
                "{item_id} has {} fields named {name}",
                other.len()
            ))),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf, std::io::Error> {
        let path = self.path(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Write a CSV input file: header row, then one line per row.
    pub fn write_csv(&self, name: &str, rows: &[&str]) -> Result<PathBuf, std::io::Error> {
        let mut contents = String::from(CSV_HEADER);
        contents.push('\n');
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        self.write_file(name, &contents)
    }

    pub fn importer(&self) -> Importer {
        Importer::new(self.config.clone())
    }

    pub fn import(&mut self, path: &Path) -> ImportOutcome {
        let mut importer = self.importer();
        importer.run(&mut self.host, &mut FixedInput(Some(path.to_path_buf())))
    }

    pub fn log_text(&self) -> Result<String, std::io::Error> {
        std::fs::read_to_string(&self.config.log_file)
    }
}
