//! Builtins command - list packages compiled into the binary

use crate::cli::args::{BuiltinsArgs, OutputFormat};
use crate::error::PackResult;
use crate::package::{FactoryRegistry, PackageInfo, StaticRegistry};
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct BuiltinJson {
    id: String,
    #[serde(flatten)]
    metadata: PackageInfo,
}

/// Execute the builtins command
pub async fn execute(args: BuiltinsArgs) -> PackResult<()> {
    let registry = StaticRegistry::builtin(&FactoryRegistry::with_defaults())?;

    let builtins: Vec<BuiltinJson> = registry
        .ids()
        .into_iter()
        .filter_map(|id| {
            registry.get(id).map(|pkg| BuiltinJson {
                id: id.to_string(),
                metadata: pkg.metadata(),
            })
        })
        .collect();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&builtins)?),
        OutputFormat::Plain => {
            for builtin in &builtins {
                println!("{}", builtin.id);
            }
        }
        OutputFormat::Table => {
            println!(
                "{:<24} {:<10} {:<8} {}",
                style("ID").bold(),
                style("VERSION").bold(),
                style("AGENTS").bold(),
                style("TYPES").bold()
            );
            for builtin in &builtins {
                let types: Vec<String> = builtin
                    .metadata
                    .agent_types
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                println!(
                    "{:<24} {:<10} {:<8} {}",
                    builtin.id,
                    builtin.metadata.version,
                    builtin.metadata.agent_count,
                    types.join(",")
                );
            }
        }
    }

    Ok(())
}
