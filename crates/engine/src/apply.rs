use metaprop_storage::{Host, StorageError};

use crate::classify::Target;
use crate::error::EngineError;
use crate::log::ImportLog;
use crate::report::{RejectReason, Rejection};

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
    pub rejections: Vec<Rejection>,
}

/// Write each applicable record's value into its field.
///
/// Fields are looked up again because schema synchronization may have
/// created them since planning. No match means the field could not be
/// created (already logged); more than one means planning went wrong and
/// the whole batch is abandoned.
pub fn apply<H: Host>(
    host: &mut H,
    targets: &[Target],
    strict_values: bool,
    log: &mut ImportLog,
) -> Result<ApplyReport, EngineError> {
    let mut report = ApplyReport::default();

    for target in targets.iter().filter(|t| t.record.can_apply()) {
        let record = &target.record;
        let mut fields = host.get_fields(&target.item, record.field_name())?;
        let field = match fields.len() {
            0 => {
                log.warn(format!(
                    "{} property {} skipped: field is unavailable",
                    record.component(),
                    record.field_name()
                ));
                report.skipped += 1;
                continue;
            }
            1 => fields.remove(0),
            n => {
                return Err(EngineError::Integrity(format!(
                    "{} has {n} fields named {} after schema synchronization",
                    record.component(),
                    record.field_name()
                )));
            }
        };

        let reject = |reason: RejectReason| Rejection {
            target_id: record.target_id().to_string(),
            component: record.component().to_string(),
            field_name: record.field_name().to_string(),
            reason,
        };

        if !record.value_kind().accepts(field.field_type) {
            let rejection = reject(RejectReason::TypeMismatch {
                existing: field.field_type,
                kind: record.value_kind(),
            });
            log_rejection(log, &rejection);
            report.rejections.push(rejection);
            continue;
        }

        let value = match record.to_field_value(field.field_type) {
            Ok(value) => value,
            Err(source) if strict_values => {
                return Err(EngineError::ValueParse {
                    component: record.component().to_string(),
                    field: record.field_name().to_string(),
                    source,
                });
            }
            Err(e) => {
                let rejection = reject(RejectReason::ValueParseFailure {
                    message: e.to_string(),
                });
                log_rejection(log, &rejection);
                report.rejections.push(rejection);
                continue;
            }
        };

        let shown = value.to_string();
        match host.set_field_value(&field, value) {
            Ok(()) => {
                log.info(format!(
                    "{} property {} = {shown}",
                    record.component(),
                    record.field_name()
                ));
                report.applied += 1;
            }
            Err(StorageError::ReadOnlyField(_)) => {
                let rejection = reject(RejectReason::ReadOnlyField);
                log_rejection(log, &rejection);
                report.rejections.push(rejection);
            }
            Err(e) => return Err(e.into()),
        }
    }

    log.info(format!(
        "{} values applied, {} skipped",
        report.applied, report.skipped
    ));
    Ok(report)
}

fn log_rejection(log: &mut ImportLog, rejection: &Rejection) {
    log.warn(format!(
        "Error: {} property {}: {}",
        rejection.component, rejection.field_name, rejection.reason
    ));
}
