use clap::{Parser, Subcommand};
use pktools::{audit, inspect};

#[derive(Parser)]
struct Opts {
    #[command(subcommand)]
    tool: ToolOpts,
}

#[derive(Subcommand)]
enum ToolOpts {
    Inspect(inspect::Opts),
    Audit(audit::Opts),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    match opts.tool {
        ToolOpts::Inspect(opts) => inspect::run(opts),
        ToolOpts::Audit(opts) => audit::run(opts),
    }
}
