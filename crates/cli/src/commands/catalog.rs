use labreq_engine::{FieldDefinition, ServiceCategory};
use serde::Serialize;

use super::{print_json, Context};
use crate::OutputFormat;

#[derive(Serialize)]
struct CatalogReport<'a> {
    categories: &'a [ServiceCategory],
    warnings: Vec<String>,
}

pub(crate) async fn cmd_catalog(ctx: &Context) {
    let (catalog, warnings) = ctx.load_catalog().await;
    if ctx.quiet {
        return;
    }

    match ctx.output {
        OutputFormat::Json => print_json(&CatalogReport {
            categories: catalog.categories(),
            warnings: warnings.iter().map(ToString::to_string).collect(),
        }),
        OutputFormat::Text => {
            for category in catalog.categories() {
                println!("{} [{}]", category.name, category.code);
                for service in &category.services {
                    println!("  {}  {}", service.id, service.name);
                    for field in &service.fields {
                        println!("    - {}", describe_field(field));
                    }
                }
            }
            println!();
            println!(
                "{} categories, {} services",
                catalog.categories().len(),
                catalog.service_count()
            );
            for warning in &warnings {
                println!("warning: {}", warning);
            }
        }
    }
}

fn describe_field(field: &FieldDefinition) -> String {
    let mut line = format!("{}  {} ({}", field.id, field.label, field.field_type);
    if field.required {
        line.push_str(", required");
    }
    line.push(')');
    if !field.options.is_empty() {
        line.push_str(&format!(" options: {}", field.options.join(", ")));
    }
    if let Some(dep) = &field.dependency {
        line.push_str(&format!(" shown when {} = {}", dep.on_field_name, dep.on_value));
    }
    line
}
