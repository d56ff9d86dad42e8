use std::process::ExitCode;

fn main() -> ExitCode {
    luminova_cli::run()
}
