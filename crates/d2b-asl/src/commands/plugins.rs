use colored::*;

use crate::registry::{PluginRegistry, ENTRY_POINTS};
use crate::{GlobalOpts, PACKAGE_NAME, VERSION};

/// One line per entry point: `name = module (package version)`.
pub fn entry_point_lines(registry: &PluginRegistry) -> Vec<String> {
    ENTRY_POINTS
        .iter()
        .map(|entry| {
            let status = if registry.get(entry.name).is_some() {
                ""
            } else {
                " [not loaded]"
            };
            format!(
                "{} = {} ({} {}){}",
                entry.name, entry.module, PACKAGE_NAME, VERSION, status
            )
        })
        .collect()
}

pub fn list_plugins(registry: &PluginRegistry, opts: &GlobalOpts) {
    println!("{}", "Plugins:".bold().green());
    for line in entry_point_lines(registry) {
        println!("  {}", line);
    }
    if opts.verbosity_level() > 0 {
        println!("  {} loaded", registry.len().to_string().cyan());
    }
}
