use anyhow::Result;

use cardprobe::cli::commands::run_cli;

fn main() -> Result<()> {
    run_cli()
}
