use clap::{Args, Parser, Subcommand};

use crate::config::print_config;
use crate::demo::run_demo;

#[derive(Parser)]
#[command(version, name = "maw", about = "Adaptive master/worker job dispatch")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run simulated jobs on an in-process cluster")]
    Run(DemoArgs),
    #[command(about = "Print the configuration loaded from the environment as JSON")]
    Config,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DemoArgs {
    #[arg(long, default_value_t = 3, help = "The number of worker nodes")]
    pub workers: usize,
    #[arg(long, default_value_t = 30, help = "The number of jobs to submit")]
    pub jobs: usize,
    #[arg(long, default_value_t = 300, help = "The base duration of each job")]
    pub job_millis: u64,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated slowdown factors of the workers, 1.0 by default"
    )]
    pub slowdown: Vec<f64>,
    #[arg(
        long,
        default_value_t = 0,
        help = "Make every N-th job fail, or 0 for no failures"
    )]
    pub fail_every: usize,
}

pub fn main(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_from(args);

    match cli.command {
        Command::Run(args) => run_demo(args),
        Command::Config => print_config(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_arguments() {
        let cli = Cli::parse_from(["maw", "run", "--workers", "2", "--slowdown", "1,4.5"]);
        let Command::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.workers, 2);
        assert_eq!(args.jobs, 30);
        assert_eq!(args.slowdown, vec![1.0, 4.5]);
        assert_eq!(args.fail_every, 0);
    }
}
