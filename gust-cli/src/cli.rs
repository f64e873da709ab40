use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use gust_core::{
    AuthenticatorOptions, ClientError, ClientOptions, QuotaClient, QuotaLevel, Units,
    WeatherSource, auth::Authenticator, config::DEFAULT_SERVER_URL,
};

use tracing::debug;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "gust", version, about = "Weather in your terminal")]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct ApiArgs {
    /// API key issued by `gust login`.
    #[arg(long, env = "GUST_API_KEY", hide_env_values = true)]
    api_key: String,

    /// API server base URL.
    #[arg(long, env = "GUST_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate with GitHub and print the issued credential as JSON.
    Login {
        /// Authorization server base URL.
        #[arg(long, env = "GUST_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
        server: String,
    },

    /// Show the weather for a city.
    Weather {
        /// City name.
        city: String,

        /// metric, imperial or standard.
        #[arg(long)]
        units: Option<Units>,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Search for cities matching a name.
    Search {
        query: String,

        #[command(flatten)]
        api: ApiArgs,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Login { server } => login(&server).await,
            Command::Weather { city, units, api } => {
                let client = api.client(units)?;
                show_weather(&client, &city).await
            }
            Command::Search { query, api } => {
                let client = api.client(None)?;
                search(&client, &query).await
            }
        }
    }
}

impl ApiArgs {
    fn client(&self, units: Option<Units>) -> anyhow::Result<QuotaClient> {
        let options = ClientOptions::new(&self.server, self.api_key.clone(), units)
            .context("Invalid API client settings")?;
        let client = QuotaClient::new(options);
        debug!(options = ?client.options(), "using API server");
        Ok(client)
    }
}

async fn login(server: &str) -> anyhow::Result<()> {
    output::print_info("Starting GitHub authentication...");

    let options = AuthenticatorOptions::new(server).context("Invalid server URL")?;
    let authenticator = Authenticator::new(options);
    debug!(
        server = %authenticator.options().server_url,
        port = authenticator.options().callback_port,
        "starting login"
    );
    let credential = authenticator
        .authenticate()
        .await
        .context("authentication failed")?;

    let json =
        serde_json::to_string_pretty(&credential).context("Failed to serialize credential")?;
    println!("{json}");

    output::print_success(&format!("Successfully authenticated as {}", credential.principal()));
    Ok(())
}

async fn show_weather(client: &QuotaClient, city: &str) -> anyhow::Result<()> {
    let result = client.get_weather(city).await;
    report_quota(client, &result)?;

    let weather = result.context("failed to get weather data")?;
    let json = serde_json::to_string_pretty(&weather).context("Failed to format weather data")?;
    println!("{json}");
    Ok(())
}

async fn search(client: &QuotaClient, query: &str) -> anyhow::Result<()> {
    let result = client.search_cities(query).await;
    report_quota(client, &result)?;

    let cities = result.context("failed to search cities")?;
    if cities.is_empty() {
        output::print_info(&format!("No cities found for '{query}'"));
    }
    for city in cities {
        println!("{}\t{:.4}\t{:.4}", city.name, city.lat, city.lon);
    }
    Ok(())
}

/// Turn quota state into user guidance. Quota exhaustion becomes the
/// returned error; a low quota only prints a warning.
fn report_quota<T>(client: &QuotaClient, result: &Result<T, ClientError>) -> anyhow::Result<()> {
    let now = Utc::now();
    let quota = client.quota();

    if let Err(ClientError::QuotaExceeded(err)) = result {
        if quota.is_known() {
            output::print_rate_limit_error(quota.limit, quota.reset_at, now);
        }
        bail!("{}", err.retry_hint(now));
    }

    if quota.is_known() && quota.level() == QuotaLevel::Warning {
        output::print_rate_limit_warning(&quota, now);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weather_with_units() {
        let cli = Cli::try_parse_from([
            "gust",
            "weather",
            "London",
            "--units",
            "imperial",
            "--api-key",
            "KEY",
            "--server",
            "http://localhost:8080",
        ])
        .unwrap();

        match cli.command {
            Command::Weather { city, units, api } => {
                assert_eq!(city, "London");
                assert_eq!(units, Some(Units::Imperial));
                assert_eq!(api.server, "http://localhost:8080");
                let client = api.client(units).unwrap();
                assert_eq!(client.options().units(), Some(Units::Imperial));
                assert_eq!(client.options().api_key(), "KEY");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_units() {
        let err = Cli::try_parse_from(["gust", "weather", "London", "--units", "kelvin", "--api-key", "K"])
            .unwrap_err();
        assert!(err.to_string().contains("Unknown units"));
    }

    #[test]
    fn login_defaults_to_public_server() {
        let cli = Cli::try_parse_from(["gust", "login"]).unwrap();
        match cli.command {
            Command::Login { server } => assert_eq!(server, DEFAULT_SERVER_URL),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
