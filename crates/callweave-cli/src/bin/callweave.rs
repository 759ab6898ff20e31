use anyhow::Result;
use clap::Parser;

use callweave_cli::args::CliArgs;
use callweave_cli::driver;

fn main() -> Result<()> {
    callweave::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let mut stdout = std::io::stdout().lock();
    let code = driver::run(&args, &mut stdout)?;
    drop(stdout);
    std::process::exit(code);
}
