use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    karat_cli::run().await
}
