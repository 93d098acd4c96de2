mod cli;

use crate::cli::app::App;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cli::init_tracing();
    App::from_args().run().await
}
