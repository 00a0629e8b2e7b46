use clap::Parser;
use stockbot::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
