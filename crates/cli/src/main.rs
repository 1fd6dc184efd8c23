use std::process::ExitCode;

fn main() -> ExitCode {
    pricelab_cli::run()
}
