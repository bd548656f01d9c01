use anyhow::Result;

use togglplan_client::config::CliArgs;
use togglplan_client::PlanClient;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::load();

    // Initialize logging with a configured level
    let log_level = args.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let method = args.method()?;
    let headers = args.header_map()?;
    let body = args.data.clone().unwrap_or_default();

    let mut client = PlanClient::with_config(
        args.credentials(),
        args.token.clone(),
        args.client_config(),
    )?;

    tracing::debug!(method = %method, url = %args.url, "Sending request");
    let result = client
        .request(&args.url, method, body.as_bytes(), &headers)
        .await;

    if args.print_token {
        if let Some(token) = client.token() {
            eprintln!("TOGGL_PLAN_TOKEN={}", token);
        }
    }

    match result {
        Ok(body) => {
            println!("{}", body);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Request failed: {}", e);
            anyhow::bail!("{}: {}", e.partial_message(), e)
        }
    }
}
