//! Product matte CLI tool
//!
//! Command-line interface for stripping light backdrops from product photos.

use product_matte::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}
