//! Show a clip's geometry and duration.

use std::path::PathBuf;

use clipstack_compose_engine::probe::probe_media;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let probe =
        probe_media(&path).map_err(|e| anyhow::anyhow!("Failed to probe clip: {e}"))?;

    println!("Clip: {}", path.display());
    println!("  Resolution: {}x{}", probe.width, probe.height);
    println!("  Duration: {:.2}s", probe.duration_secs);

    Ok(())
}
