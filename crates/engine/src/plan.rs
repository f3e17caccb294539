use std::collections::{BTreeMap, BTreeSet};

use metaprop_core::{Category, DisplayGroup, FieldType};
use metaprop_storage::Host;

use crate::classify::Target;
use crate::config::ImportConfig;
use crate::error::EngineError;
use crate::log::ImportLog;
use crate::report::{RejectReason, Rejection};

/// A schema field that has to be created, aggregated over every record
/// that needs it. Only ever grows while planning.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaFieldRequest {
    pub field_name: String,
    pub field_type: FieldType,
    /// Schema-store group the definition is filed in.
    pub group_name: String,
    pub display_group: DisplayGroup,
    pub categories: BTreeSet<Category>,
}

#[derive(Debug, Default)]
pub struct Plan {
    /// Every classified target; only those with `can_apply` are applied.
    pub targets: Vec<Target>,
    pub requests: BTreeMap<String, SchemaFieldRequest>,
    pub rejections: Vec<Rejection>,
}

impl Plan {
    pub fn applicable(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| t.record.can_apply())
    }
}

enum Decision {
    Apply,
    Create(FieldType, DisplayGroup),
    Reject(RejectReason),
}

/// Decide per record whether an existing field is reused, a new one is
/// requested, or the record is dropped.
pub fn plan<H: Host>(
    host: &H,
    targets: Vec<Target>,
    config: &ImportConfig,
    log: &mut ImportLog,
) -> Result<Plan, EngineError> {
    let mut plan = Plan::default();

    for mut target in targets {
        let decision = decide(host, &target, &plan.requests, config)?;
        let record = &target.record;
        match decision {
            Decision::Apply => {
                log.info(format!(
                    "{} property {} uses existing field",
                    record.component(),
                    record.field_name()
                ));
            }
            Decision::Create(field_type, display_group) => {
                let request = plan
                    .requests
                    .entry(record.field_name().to_string())
                    .or_insert_with(|| SchemaFieldRequest {
                        field_name: record.field_name().to_string(),
                        field_type,
                        group_name: record.group_name().to_string(),
                        display_group,
                        categories: BTreeSet::new(),
                    });
                request.categories.insert(target.item.category.clone());
                log.info(format!(
                    "{} property {} needs new {field_type} field for category {}",
                    record.component(),
                    record.field_name(),
                    target.item.category
                ));
            }
            Decision::Reject(reason) => {
                log.warn(format!(
                    "Error: {} property {}: {reason}",
                    record.component(),
                    record.field_name()
                ));
                plan.rejections.push(Rejection {
                    target_id: record.target_id().to_string(),
                    component: record.component().to_string(),
                    field_name: record.field_name().to_string(),
                    reason,
                });
                plan.targets.push(target);
                continue;
            }
        }
        target.record.mark_applicable();
        plan.targets.push(target);
    }

    log.info(format!(
        "{} props applicable, {} rejected, {} new fields requested",
        plan.applicable().count(),
        plan.rejections.len(),
        plan.requests.len()
    ));
    Ok(plan)
}

fn decide<H: Host>(
    host: &H,
    target: &Target,
    requests: &BTreeMap<String, SchemaFieldRequest>,
    config: &ImportConfig,
) -> Result<Decision, EngineError> {
    let record = &target.record;
    let kind = record.value_kind();
    let existing = host.get_fields(&target.item, record.field_name())?;

    let decision = match existing.as_slice() {
        [] => match (kind.field_type(), requests.get(record.field_name())) {
            (None, Some(pending)) => Decision::Create(pending.field_type, pending.display_group),
            (None, None) => Decision::Reject(RejectReason::NoFieldToClear),
            (Some(_), Some(pending)) if !kind.accepts(pending.field_type) => {
                Decision::Reject(RejectReason::TypeMismatch {
                    existing: pending.field_type,
                    kind,
                })
            }
            (Some(_), Some(pending)) => Decision::Create(pending.field_type, pending.display_group),
            (Some(field_type), None) => {
                match DisplayGroup::resolve(record.group_name(), &config.group_aliases) {
                    Some(group) => Decision::Create(field_type, group),
                    None => Decision::Reject(RejectReason::UnrecognizedGroup {
                        label: record.group_name().to_string(),
                    }),
                }
            }
        },
        [field] if !kind.accepts(field.field_type) => Decision::Reject(RejectReason::TypeMismatch {
            existing: field.field_type,
            kind,
        }),
        [field] if field.read_only => Decision::Reject(RejectReason::ReadOnlyField),
        [_] => Decision::Apply,
        many => Decision::Reject(RejectReason::AmbiguousFieldName { count: many.len() }),
    };

    if matches!(decision, Decision::Reject(_)) {
        return Ok(decision);
    }
    match record.validate_value() {
        Ok(()) => Ok(decision),
        Err(source) if config.strict_values => Err(EngineError::ValueParse {
            component: record.component().to_string(),
            field: record.field_name().to_string(),
            source,
        }),
        Err(e) => Ok(Decision::Reject(RejectReason::ValueParseFailure {
            message: e.to_string(),
        })),
    }
}
