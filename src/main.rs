use std::path::PathBuf;

use flu_node::{Flu, FluConfig};

/// Minimal smoke-test binary for a FLU node. Network transport, cluster
/// membership, and sequencing are owned by collaborators outside this
/// crate; this binary just opens one node against a directory and runs a
/// few operations so the on-disk state can be inspected by hand.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("flu-demo"));

    let flu = Flu::open(FluConfig::new(&dir))?;

    let status = flu.status()?;
    tracing::info!(?status, dir = %dir.display(), "FLU node ready");

    let seal = flu.seal(status.min_epoch.max(1))?;
    println!("seal -> {seal:?}");

    flu.stop()?;
    Ok(())
}
