//! streamkit console.

use clap::Parser;

use streamkit_lib::Args;

fn main() -> anyhow::Result<()> {
    streamkit_lib::run(Args::parse())
}
