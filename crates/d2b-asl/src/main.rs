use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use d2b_asl::{
    commands::{
        config::{self, ConfigAction},
        plugins, run, sidecar,
    },
    config::Config,
    logger,
    registry::PluginRegistry,
    GlobalOpts,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "d2b-asl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Arterial Spin Labeling support for d2b",
    long_about = "d2b-asl writes BIDS aslcontext files for ASL acquisitions and removes volumes labelled `discard`."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run plugin hooks over a converted output directory
    Run(run::RunCommand),
    /// Print the *_aslcontext.json sidecar content
    Sidecar,
    /// List plugin entry points
    Plugins,
    /// Configure d2b-asl
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Must run after the logger is initialised; the level follows its verbosity.
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                logger::filter_directives(&["d2b_asl", "d2b_asl_nifti"]).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() {
    // Fall back to defaults so `config path` still works.
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let registry = match PluginRegistry::from_entry_points(&config) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to load plugins: {}", e);
            std::process::exit(1);
        }
    };

    let matches = Cli::command()
        .mut_subcommand("run", |cmd| registry.prepare_run_parser(cmd))
        .get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    if let Err(e) = logger::init_with_verbosity(
        cli.global.verbosity_level(),
        cli.global.no_stdout,
        config.log_dir_path().as_deref(),
    ) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    if let Some(e) = config_error {
        logger::warn(&format!(
            "Failed to load config, using defaults: {:#}",
            anyhow::Error::from(e)
        ));
    }

    let result = match cli.command {
        Commands::Run(cmd) => match matches.subcommand_matches("run") {
            Some(run_matches) => run::handle_run(cmd, run_matches, &registry),
            None => Err(anyhow::anyhow!("Missing arguments for run")),
        },
        Commands::Sidecar => sidecar::handle_sidecar(),
        Commands::Plugins => {
            plugins::list_plugins(&registry, &cli.global);
            Ok(())
        }
        Commands::Config { action } => config::handle_config(action, &cli.global),
    };

    if let Err(e) = result {
        logger::error(&format!("{:#}", e));
        logger::show_log_path();
        std::process::exit(1);
    }
}
