use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use metaprop_storage::{DefinitionRecord, Host, StorageError};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::log::ImportLog;
use crate::plan::SchemaFieldRequest;
use crate::report::BindingFailure;

/// Holds the host's schema-store pointer redirected to a scratch store and
/// puts the original back when dropped, whichever way the scope is left.
pub struct ScratchStore<'h, H: Host> {
    host: &'h mut H,
    original: Option<PathBuf>,
    restored: bool,
}

impl<'h, H: Host> ScratchStore<'h, H> {
    pub fn redirect(host: &'h mut H, scratch: &Path) -> Result<Self, StorageError> {
        let original = host.schema_store_pointer();
        if let Err(e) = host.set_schema_store_pointer(Some(scratch)) {
            // The host may have half-applied the change.
            host.set_schema_store_pointer(original.as_deref())?;
            return Err(e);
        }
        debug!(scratch = %scratch.display(), "schema store redirected");
        Ok(Self {
            host,
            original,
            restored: false,
        })
    }

    pub fn host(&mut self) -> &mut H {
        &mut *self.host
    }

    /// Restore now, surfacing any error instead of only logging it.
    pub fn restore(mut self) -> Result<(), StorageError> {
        self.restored = true;
        self.host.set_schema_store_pointer(self.original.as_deref())
    }
}

impl<H: Host> Drop for ScratchStore<'_, H> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.host.set_schema_store_pointer(self.original.as_deref()) {
            warn!(error = %e, "failed to restore schema store pointer");
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub failures: Vec<BindingFailure>,
}

/// Create and bind the requested fields, in field-name order. A field that
/// fails is logged and skipped; the rest still go ahead.
pub fn synchronize<H: Host>(
    host: &mut H,
    scratch: &Path,
    requests: &BTreeMap<String, SchemaFieldRequest>,
    log: &mut ImportLog,
) -> Result<SyncReport, EngineError> {
    let mut report = SyncReport::default();
    let mut store = ScratchStore::redirect(host, scratch)?;

    for (name, request) in requests {
        match create_field(store.host(), request) {
            Ok(definition) => {
                log.info(format!(
                    "Created {} field {name} ({}) in group {} bound to {}",
                    definition.field_type,
                    definition.definition_id,
                    request.group_name,
                    join_categories(request)
                ));
                report.created.push(name.clone());
            }
            Err(e) => {
                log.warn(format!("Error: cannot create field {name}: {e}"));
                report.failures.push(BindingFailure {
                    field_name: name.clone(),
                    cause: e.to_string(),
                });
            }
        }
    }

    store.restore()?;
    Ok(report)
}

fn create_field<H: Host>(
    host: &mut H,
    request: &SchemaFieldRequest,
) -> Result<DefinitionRecord, StorageError> {
    let group = host.resolve_or_create_group(&request.group_name)?;
    let definition =
        host.resolve_or_create_definition(&group, &request.field_name, request.field_type)?;
    host.bind_definition(&definition, request.display_group, &request.categories)?;
    Ok(definition)
}

fn join_categories(request: &SchemaFieldRequest) -> String {
    request
        .categories
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
