use clap::Parser;
use smu_stream::driver;
use smu_stream::fault;
use smu_stream::sim::SimSession;
use smu_stream::sink::{SampleSink, Tee, TextSink, WavCapture};
use smu_stream::StreamError;
use std::io::{self, BufReader};

mod cli;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let exit_code = execute(&cli);
    std::process::exit(exit_code);
}

fn execute(cli: &Cli) -> i32 {
    let options = cli.options();
    let trigger = options.fault_trigger();
    // Detached: the watcher blocks on stdin for as long as the process lives.
    let _watcher = fault::watch_lines(BufReader::new(io::stdin()), trigger.clone());

    let mut session = SimSession::new(cli.sim_config());
    let outcome = driver::run(&mut session, &options, &trigger, |rate| {
        open_sink(cli, rate)
    });
    // Halt the transport threads before the process exits.
    drop(session);

    match outcome {
        Ok(stats) => {
            log::info!("stopped after {} cycles", stats.cycles);
            0
        }
        Err(err) => {
            log::error!("{}", err);
            eprintln!("{}", err.diagnostic());
            driver::exit_code(&err)
        }
    }
}

fn open_sink(cli: &Cli, rate: u32) -> Result<Box<dyn SampleSink>, StreamError> {
    let text = TextSink::stdout();
    match &cli.capture {
        Some(path) => {
            log::info!("capturing to {}", path.display());
            Ok(Box::new(Tee(text, WavCapture::create(path, rate)?)))
        }
        None => Ok(Box::new(text)),
    }
}
