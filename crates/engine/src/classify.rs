use metaprop_core::PropertyRecord;
use metaprop_storage::{Host, ItemRecord};

use crate::error::EngineError;
use crate::log::ImportLog;

/// A record paired with the item it targets.
#[derive(Debug, Clone)]
pub struct Target {
    pub record: PropertyRecord,
    pub item: ItemRecord,
}

#[derive(Debug, Default)]
pub struct Classified {
    pub targets: Vec<Target>,
    pub model_properties: usize,
    /// Component labels of records whose item lookup failed, one per record.
    pub missing: Vec<String>,
}

/// Drop whole-model records, then records whose item cannot be found.
pub fn classify<H: Host>(
    host: &H,
    records: Vec<PropertyRecord>,
    model_prefix: &str,
    log: &mut ImportLog,
) -> Result<Classified, EngineError> {
    let (model, item_records): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|r| r.is_model_property(model_prefix));

    let mut classified = Classified {
        model_properties: model.len(),
        ..Default::default()
    };
    log.info(format!(
        "{} 'Model' properties have externalId prefix '{model_prefix}'",
        classified.model_properties
    ));

    for record in item_records {
        match host.lookup_item(&record.item_id())? {
            Some(item) => classified.targets.push(Target { record, item }),
            None => classified.missing.push(record.component().to_string()),
        }
    }

    let n = classified.missing.len();
    if n > 0 {
        log.warn(format!(
            "{n} invalid unique id{}: {}",
            if n == 1 { "" } else { "s" },
            classified.missing.join(", ")
        ));
    }
    log.info(format!("{} props target existing items", classified.targets.len()));
    Ok(classified)
}
