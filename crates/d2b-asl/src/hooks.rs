//! Hook surface the host calls on every registered plugin
//!
//! Every hook has a no-op default so a plugin only implements what it needs.
//! The host decides when each hook runs:
//!
//! 1. `prepare_run_parser` while the `run` command line is being built
//! 2. `pre_run_logs` before any file is converted
//! 3. `post_move` after converted files are in the output directory

use clap::{ArgMatches, Command};
use std::path::Path;

use crate::acquisition::Acquisition;
use crate::errors::AslError;

/// Arguments passed to [`Plugin::post_move`].
#[derive(Debug, Clone, Copy)]
pub struct PostMoveContext<'a> {
    pub out_dir: &'a Path,
    pub acquisitions: &'a [Acquisition],
    /// Parsed `run` arguments, including flags added by plugins.
    pub options: &'a ArgMatches,
    pub dry_run: bool,
}

pub trait Plugin {
    /// Entry-point name the plugin is registered under.
    fn name(&self) -> &str;

    fn prepare_run_parser(&self, cmd: Command) -> Command {
        cmd
    }

    fn pre_run_logs(&self) {}

    fn post_move(&self, _ctx: &PostMoveContext<'_>) -> Result<(), AslError> {
        Ok(())
    }
}

/// Read a boolean flag added by a plugin; unknown ids read as `false`.
pub fn flag(options: &ArgMatches, id: &str) -> bool {
    options
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}
