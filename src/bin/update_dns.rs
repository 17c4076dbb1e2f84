use anyhow::Result;
use clap::Parser;
use hostalloc::cli::{self, DnsCommand};

#[tokio::main]
async fn main() -> Result<()> {
    cli::init_tracing();

    DnsCommand::parse().run().await
}
