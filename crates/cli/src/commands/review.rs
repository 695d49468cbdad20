use std::path::Path;

use labreq_engine::ReviewCategory;

use super::{print_json, Context};
use crate::OutputFormat;

pub(crate) async fn cmd_review(ctx: &Context, request: &Path) {
    let session = ctx.load_session(request).await;
    if ctx.quiet {
        return;
    }

    let review = session.review();
    match ctx.output {
        OutputFormat::Json => print_json(&review),
        OutputFormat::Text => print!("{}", render_review(&review)),
    }
}

fn render_review(review: &[ReviewCategory]) -> String {
    let mut out = String::new();
    for category in review {
        out.push_str(&format!("{}\n", category.name));
        for service in &category.services {
            out.push_str(&format!("  {} (total {})\n", service.name, service.total_quantity));
            let numbered = service.instances.len() > 1;
            for instance in &service.instances {
                let indent = if numbered {
                    out.push_str(&format!("    Sample {}: quantity {}\n", instance.index, instance.quantity));
                    "      "
                } else {
                    "    "
                };
                for entry in &instance.entries {
                    out.push_str(&format!("{}{}: {}\n", indent, entry.label, entry.value));
                }
                if !instance.notes.is_empty() {
                    out.push_str(&format!("{}Notes: {}\n", indent, instance.notes));
                }
            }
        }
    }
    out
}
