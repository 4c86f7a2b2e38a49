use clap::{ArgMatches, Parser};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::acquisition::load_acquisitions;
use crate::hooks::PostMoveContext;
use crate::logger;
use crate::registry::PluginRegistry;

/// Run the post-move hooks of every plugin over a converted dataset.
#[derive(Parser, Debug)]
pub struct RunCommand {
    /// BIDS output directory the converted files were moved into
    #[arg(value_name = "OUT_DIR")]
    pub out_dir: PathBuf,
    /// JSON file with the acquisitions produced by the host
    #[arg(short, long, value_name = "FILE")]
    pub acquisitions: PathBuf,
    /// Validate and report without writing or modifying files
    #[arg(long)]
    pub dry_run: bool,
}

/// `options` are the parsed `run` arguments, including plugin-added flags.
pub fn handle_run(
    cmd: RunCommand,
    options: &ArgMatches,
    registry: &PluginRegistry,
) -> anyhow::Result<()> {
    if !cmd.out_dir.is_dir() {
        anyhow::bail!("Output directory {} does not exist", cmd.out_dir.display());
    }

    let acquisitions = load_acquisitions(&cmd.acquisitions)?;
    logger::debug(&format!(
        "Loaded {} acquisition(s) from {}",
        acquisitions.len(),
        cmd.acquisitions.display()
    ));

    registry.pre_run_logs();

    if cmd.dry_run {
        logger::step("Dry run: no files will be written or modified");
    }

    let start = Instant::now();
    logger::spinner_start("Running post-move hooks");
    let ctx = PostMoveContext {
        out_dir: &cmd.out_dir,
        acquisitions: &acquisitions,
        options,
        dry_run: cmd.dry_run,
    };
    match registry.post_move(&ctx) {
        Ok(()) => {
            logger::spinner_success(&format!(
                "Post-move hooks finished in {}",
                format_duration(start.elapsed())
            ));
            Ok(())
        }
        Err(e) => {
            logger::spinner_error("Post-move hooks failed");
            Err(e.into())
        }
    }
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
