//! Plugin registration and hook dispatch
//!
//! Plugins are discovered from a static entry-point table and kept in
//! registration order; every hook is dispatched to them in that order.

use clap::Command;

use crate::errors::PluginError;
use crate::hooks::{Plugin, PostMoveContext};
use crate::logger;
use crate::plugin::{AslPlugin, PLUGIN_NAME};
use d2b_asl_config::Config;

pub type PluginFactory = fn(&Config) -> Box<dyn Plugin>;

/// A named plugin the host can load.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoint {
    pub name: &'static str,
    pub module: &'static str,
    pub factory: PluginFactory,
}

/// Entry points advertised by this package.
pub const ENTRY_POINTS: &[EntryPoint] = &[EntryPoint {
    name: PLUGIN_NAME,
    module: "d2b_asl",
    factory: asl_factory,
}];

fn asl_factory(config: &Config) -> Box<dyn Plugin> {
    Box::new(AslPlugin::from_config(config))
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every plugin in [`ENTRY_POINTS`].
    pub fn from_entry_points(config: &Config) -> Result<Self, PluginError> {
        let mut registry = Self::new();
        for entry in ENTRY_POINTS {
            logger::debug(&format!("Loading plugin '{}' from {}", entry.name, entry.module));
            registry.register((entry.factory)(config))?;
        }
        Ok(registry)
    }

    /// Register a plugin, rejecting a second plugin with the same name.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) -> Result<(), PluginError> {
        if self.get(plugin.name()).is_some() {
            return Err(PluginError::Duplicate(plugin.name().to_string()));
        }
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn prepare_run_parser(&self, cmd: Command) -> Command {
        self.plugins
            .iter()
            .fold(cmd, |cmd, plugin| plugin.prepare_run_parser(cmd))
    }

    pub fn pre_run_logs(&self) {
        for plugin in &self.plugins {
            logger::set_current_plugin(Some(plugin.name().to_string()));
            plugin.pre_run_logs();
        }
        logger::set_current_plugin(None);
    }

    /// Stops at the first plugin that fails.
    pub fn post_move(&self, ctx: &PostMoveContext<'_>) -> Result<(), PluginError> {
        for plugin in &self.plugins {
            logger::set_current_plugin(Some(plugin.name().to_string()));
            let result = plugin.post_move(ctx);
            logger::set_current_plugin(None);
            result.map_err(|source| PluginError::Hook {
                plugin: plugin.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
