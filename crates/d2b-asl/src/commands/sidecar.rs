use anyhow::Context;

use crate::sidecar::aslcontext_sidecar_string;

/// Print the `*_aslcontext.json` sidecar content to stdout.
pub fn handle_sidecar() -> anyhow::Result<()> {
    let content = aslcontext_sidecar_string().context("Failed to render aslcontext sidecar")?;
    println!("{}", content);
    Ok(())
}
