use std::process::ExitCode;

fn main() -> ExitCode {
    fieldcast_cli::run()
}
