use std::process::ExitCode;

fn main() -> ExitCode {
    match sunspot_forecast::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(exit_code = err.exit_code(), "run failed");
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
