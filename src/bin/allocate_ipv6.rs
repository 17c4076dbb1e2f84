use anyhow::Result;
use clap::Parser;
use hostalloc::cli::{self, Ipv6Command};

fn main() -> Result<()> {
    cli::init_tracing();

    let command = Ipv6Command::parse();
    let allocation = command.run()?;

    if allocation.created {
        eprintln!(
            "Allocated {allocation} to {}",
            command.host_json_path.display()
        );
    } else {
        eprintln!(
            "{} already holds {allocation}",
            command.host_json_path.display()
        );
    }
    println!("{allocation}");
    Ok(())
}
