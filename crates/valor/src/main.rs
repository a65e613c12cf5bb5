use std::env;
use std::io::{self, Write as _};
use std::process::ExitCode;

use env_logger::Env;
use log::error;
use valor::{Invocation, execute};

fn run() -> anyhow::Result<()> {
    let invocation = Invocation::from_args(env::args().skip(1))?;
    let report = execute(&invocation)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(report.as_bytes())?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;
    Ok(())
}

pub fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().filter_or("RUST_LOG", "warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
