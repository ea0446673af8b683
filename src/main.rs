use chrono::Local;
use log::LevelFilter;
use structopt::StructOpt;

use tareas::cli::CommandLineArgs;
use tareas::interface;

/// Warnings only unless asked for more with -v.
fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> anyhow::Result<()> {
    // Get the command-line arguments.
    let args = CommandLineArgs::from_args();

    env_logger::Builder::new()
        .filter_level(log_level(args.verbose))
        .init();

    interface::run(args, Local::now().date_naive())
}
