use std::path::Path;
use std::process;

use labreq_engine::SubmitOutcome;
use serde_json::json;

use super::check::{print_errors, sample_reports};
use super::{print_json, Context};
use crate::OutputFormat;

/// Validate, then hand the payload to the configured sink. Nothing is sent
/// while the request or any of its samples has errors.
pub(crate) async fn cmd_submit(ctx: &Context, request: &Path) {
    let session = ctx.load_session(request).await;

    let samples = sample_reports(session.store());
    if !samples.is_empty() {
        print_errors(ctx, &session.validate(), &samples);
        process::exit(1);
    }

    let sink = ctx.config.submission_sink();
    match session.submit(&sink).await {
        Ok(SubmitOutcome::Submitted(id)) => {
            if ctx.quiet {
                return;
            }
            match ctx.output {
                OutputFormat::Json => print_json(&json!({ "requestId": id })),
                OutputFormat::Text => println!("Submitted request {}", id),
            }
        }
        Ok(SubmitOutcome::Invalid(errors)) => {
            print_errors(ctx, &errors, &[]);
            process::exit(1);
        }
        Err(e) => ctx.fail(&e.to_string()),
    }
}
