use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    wobserver_cli::run().await
}
