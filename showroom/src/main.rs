use clap::Parser;
use showroom::{Cli, run};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let output = run(Cli::parse())?;
    println!("{output}");
    Ok(())
}
