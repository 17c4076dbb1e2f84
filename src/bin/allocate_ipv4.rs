use anyhow::Result;
use clap::Parser;
use hostalloc::cli::{self, Ipv4Command};

fn main() -> Result<()> {
    cli::init_tracing();

    let command = Ipv4Command::parse();
    let allocation = command.run()?;

    eprintln!("Allocated {allocation} to {}", command.host_name);
    println!("{allocation}");
    Ok(())
}
