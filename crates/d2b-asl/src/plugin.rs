//! The `asl` plugin

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::context_files::{generate_context_files, ContextFileOptions};
use crate::errors::AslError;
use crate::hooks::{flag, Plugin, PostMoveContext};
use crate::logger;
use crate::VERSION;
use d2b_asl_config::Config;

pub const PLUGIN_NAME: &str = "asl";
pub const INCLUDE_ASLCONTEXT_JSON: &str = "include_aslcontext_json";
pub const NO_INCLUDE_ASLCONTEXT_JSON: &str = "no_include_aslcontext_json";

#[derive(Debug, Clone, Default)]
pub struct AslPlugin {
    /// Used when neither `--include-aslcontext-json` nor
    /// `--no-include-aslcontext-json` is given.
    default_include_json: bool,
}

impl AslPlugin {
    pub fn new(default_include_json: bool) -> Self {
        AslPlugin {
            default_include_json,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.include_aslcontext_json())
    }

    pub fn include_aslcontext_json(&self, options: &ArgMatches) -> bool {
        if flag(options, INCLUDE_ASLCONTEXT_JSON) {
            true
        } else if flag(options, NO_INCLUDE_ASLCONTEXT_JSON) {
            false
        } else {
            self.default_include_json
        }
    }
}

impl Plugin for AslPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn prepare_run_parser(&self, cmd: Command) -> Command {
        cmd.arg(
            Arg::new(INCLUDE_ASLCONTEXT_JSON)
                .long("include-aslcontext-json")
                .action(ArgAction::SetTrue)
                .conflicts_with(NO_INCLUDE_ASLCONTEXT_JSON)
                .help("Include *_aslcontext.json files among the outputs generated by this command."),
        )
        .arg(
            Arg::new(NO_INCLUDE_ASLCONTEXT_JSON)
                .long("no-include-aslcontext-json")
                .action(ArgAction::SetTrue)
                .help(
                    "Do not include *_aslcontext.json files among the outputs generated by this \
                     command. This is the default. NOTE: This being the default may change in a \
                     future release.",
                ),
        )
    }

    fn pre_run_logs(&self) {
        logger::info(&format!("d2b-asl:version: {}", VERSION));
    }

    fn post_move(&self, ctx: &PostMoveContext<'_>) -> Result<(), AslError> {
        let options = ContextFileOptions {
            include_aslcontext_json: self.include_aslcontext_json(ctx.options),
            dry_run: ctx.dry_run,
        };
        let report = generate_context_files(ctx.out_dir, ctx.acquisitions, &options)?;
        logger::debug(&format!(
            "Processed {} ASL acquisition(s), removed {} volume(s)",
            report.len(),
            report.discarded_total()
        ));
        Ok(())
    }
}
