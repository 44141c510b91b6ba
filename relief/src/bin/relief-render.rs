//! Renders a JSON render request to a PNG file.
//!
//! Usage: `relief-render <request.json> <output.png>`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use relief::{LibraryLoader, RenderRequest, RenderWorker, DEFAULT_READY_TIMEOUT};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    common::log_setup::setup_logging("info", "logs");

    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        bail!("usage: relief-render <request.json> <output.png>");
    };
    let (input, output) = (PathBuf::from(input), PathBuf::from(output));

    let payload = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let request = RenderRequest::from_json(&payload)?;

    let loader = LibraryLoader::spawn();
    let mut worker = RenderWorker::load(&loader, DEFAULT_READY_TIMEOUT).await?;
    let result = worker.render(request).await;
    worker.exit().await;

    let raster = result?;
    raster
        .save_png(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        "Wrote {}x{} raster to {}",
        raster.width(),
        raster.height(),
        output.display()
    );
    Ok(())
}
