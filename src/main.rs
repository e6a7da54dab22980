#![allow(clippy::result_large_err)]

use anyhow::Context;
use text_relay::app::RelayApp;
use text_relay::config::RelayConfig;
use text_relay::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise telemetry")?;

    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            other => anyhow::bail!("unrecognised argument `{other}`"),
        }
    }

    let config = RelayConfig::load().context("failed to load configuration")?;
    let app = match RelayApp::initialise(config).await {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = %err, cause = %err.root(), "refusing to start");
            return Err(err).context("failed to start text relay");
        }
    };

    if let Err(err) = app.run().await {
        tracing::error!(error = %err, cause = %err.root(), "text relay terminated with error");
        return Err(err).context("text relay runtime error");
    }

    Ok(())
}

fn print_help() {
    println!(
        "\
Usage: text-relay [OPTIONS]

Relays inbound SMS webhooks to the numbers listed in relays.csv.

Options:
  -h, --help             Print this help message

Environment:
  PORT                          Listen port (default 8080)
  LISTEN_HOST                   Listen address (default 0.0.0.0)
  TOKEN                         Upstream Basic credential; unset means log-only mode
  ACCOUNT_ID                    Upstream account id; unset means log-only mode
  RELAYS_PATH                   Relay table, two CSV columns (default relays.csv)
  UPSTREAM_BASE_URL             Provider API base (default https://api.thinq.com)
  UPSTREAM_TIMEOUT_SECS         Per-request timeout (default 30)
  UPSTREAM_CONNECT_TIMEOUT_SECS Connect timeout (default 10)
  DRAIN_TIMEOUT_SECS            Shutdown wait for in-flight relays (default 30)
  RUST_LOG                      Log filter (default text_relay=info,info)
"
    );
}
