mod args;
mod pipeline;

use clap::Parser;
use log::debug;
use snafu::ErrorCompat;

fn main() {
    let args = args::Args::parse();

    let mut log_builder = env_logger::Builder::from_default_env();
    if args.verbose {
        log_builder.filter_level(log::LevelFilter::Debug);
    }
    log_builder.init();
    debug!("args: {:?}", args);

    if let Err(e) = pipeline::run_pipeline(&args) {
        eprintln!("uoftab: an error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
