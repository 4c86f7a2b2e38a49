//! d2b-asl: Arterial Spin Labeling support for d2b
//!
//! The `asl` plugin runs after the host has moved converted files into the
//! BIDS output directory. For every ASL acquisition it writes the
//! `*_aslcontext.tsv` sidecar (and optionally `*_aslcontext.json`) and drops
//! volumes that were labelled `discard`.

pub mod acquisition;
pub mod aslcontext;
pub mod commands;
pub mod common;
pub mod context_files;
pub mod errors;
pub mod hooks;
pub mod plugin;
pub mod registry;
pub mod sidecar;

pub use common::GlobalOpts;
pub use d2b_asl_config as config;
pub use d2b_asl_logger as logger;

/// Distribution name of this package.
pub const PACKAGE_NAME: &str = env!("CARGO_PKG_NAME");

/// Package version, reported by the `pre_run_logs` hook.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
