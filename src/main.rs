use std::{process::ExitCode, time::Duration};

use clap::Parser;
use rcbox::harness::{self, HarnessError, SCENARIO_COUNT};

/// Run RefCountedBox scenarios, each under a wall-clock bound.
#[derive(Parser, Debug)]
#[command(name = "rcbox-tester", version, about)]
struct Cli
{
    /// Scenario to run; every scenario runs when omitted.
    #[arg(value_parser = clap::value_parser!(u32).range(1..=SCENARIO_COUNT as i64))]
    scenario: Option<u32>,

    /// Run every scenario even if one is named.
    #[arg(long)]
    all: bool,

    /// Seconds a single scenario may take.
    #[arg(long, default_value_t = 3)]
    timeout_secs: u64,
}

fn main() -> ExitCode
{
    env_logger::init();
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    let scenarios: Vec<u32> = match cli.scenario {
        Some(n) if !cli.all => vec![n],
        _ => (1..=SCENARIO_COUNT).collect(),
    };

    for n in scenarios {
        log::info!("running scenario {}", n);
        match harness::run_with_timeout(n, timeout) {
            Ok(()) => log::debug!("scenario {} passed", n),
            Err(HarnessError::TimedOut(..)) => {
                println!("Scenario {} probably went into an infinite loop.", n);
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    println!("Passed");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests
{
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() { Cli::command().debug_assert() }

    #[test]
    fn scenario_range_is_checked()
    {
        assert!(Cli::try_parse_from(["rcbox-tester", "0"]).is_err());
        assert!(Cli::try_parse_from(["rcbox-tester", "28"]).is_err());
        let cli = Cli::try_parse_from(["rcbox-tester", "22", "--timeout-secs", "1"]).unwrap();
        assert_eq!((cli.scenario, cli.timeout_secs, cli.all), (Some(22), 1, false));
    }
}
