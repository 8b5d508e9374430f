//! Config Command
//!
//! Shows the merged configuration and the paths it resolves from.

use console::style;

use crate::config::ConfigLoader;
use crate::types::{LensError, Result};

pub fn show() -> Result<()> {
    let config = ConfigLoader::load()?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| LensError::Config(format!("cannot render config: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

pub fn path() -> Result<()> {
    println!("{}", style("Configuration paths:").bold());
    match ConfigLoader::global_config_path() {
        Some(global) => {
            let marker = if global.exists() { "" } else { " (absent)" };
            println!("  global:  {}{}", global.display(), marker);
        }
        None => println!("  global:  (no home directory)"),
    }

    let project = ConfigLoader::project_config_path();
    let marker = if project.exists() { "" } else { " (absent)" };
    println!("  project: {}{}", project.display(), marker);
    Ok(())
}
