use std::path::Path;
use std::process;

use labreq_engine::{InstanceDraft, SelectionStore, ServiceKind, ValidationErrors};
use serde::Serialize;

use super::{print_json, Context};
use crate::OutputFormat;

/// Field errors of one configured sample, as the save step would report them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SampleReport {
    pub service_id: String,
    pub service_name: String,
    /// 1-based position within the service.
    pub sample: usize,
    pub errors: ValidationErrors,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    valid: bool,
    errors: &'a ValidationErrors,
    samples: &'a [SampleReport],
}

pub(crate) fn sample_reports(store: &SelectionStore) -> Vec<SampleReport> {
    let mut reports = Vec::new();
    for selected in store.state() {
        if selected.kind != ServiceKind::Configured {
            continue;
        }
        for (i, instance) in selected.instances.iter().enumerate() {
            let draft = match InstanceDraft::edit(store, &selected.service_id, &instance.id) {
                Some(d) => d,
                None => continue,
            };
            let errors = draft.validate();
            if !errors.is_empty() {
                reports.push(SampleReport {
                    service_id: selected.service_id.clone(),
                    service_name: selected.name.clone(),
                    sample: i + 1,
                    errors,
                });
            }
        }
    }
    reports
}

/// Print request and sample errors in the selected format.
pub(crate) fn print_errors(ctx: &Context, errors: &ValidationErrors, samples: &[SampleReport]) {
    if ctx.quiet {
        return;
    }
    match ctx.output {
        OutputFormat::Json => print_json(&CheckReport {
            valid: errors.is_empty() && samples.is_empty(),
            errors,
            samples,
        }),
        OutputFormat::Text => {
            println!("Request has errors:");
            for (field, message) in errors.iter() {
                println!("  {}: {}", field, message);
            }
            for report in samples {
                println!("  {}, sample {}:", report.service_name, report.sample);
                for (field, message) in report.errors.iter() {
                    println!("    {}: {}", field, message);
                }
            }
        }
    }
}

pub(crate) async fn cmd_check(ctx: &Context, request: &Path) {
    let session = ctx.load_session(request).await;
    let errors = session.validate();
    let samples = sample_reports(session.store());

    if !errors.is_empty() || !samples.is_empty() {
        print_errors(ctx, &errors, &samples);
        process::exit(1);
    }

    if ctx.quiet {
        return;
    }
    match ctx.output {
        OutputFormat::Json => print_json(&CheckReport {
            valid: true,
            errors: &errors,
            samples: &samples,
        }),
        OutputFormat::Text => {
            let state = session.store().state();
            let units = state
                .iter()
                .map(|s| s.total_quantity())
                .fold(0u32, u32::saturating_add);
            println!("Request is valid: {} service(s), {} unit(s)", state.len(), units);
        }
    }
}
