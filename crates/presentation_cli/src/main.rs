//! Rendezvous CLI
//!
//! Resolve meeting points and administer provider budgets from the shell.

#![allow(clippy::print_stdout)]

mod output;

use std::path::PathBuf;

use anyhow::{Context, bail};
use application::{DEFAULT_MAX_HUB_CANDIDATES, ResolutionRequest};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use domain::{Coordinate, ProviderId, TravelMode};
use infrastructure::{
    AppConfig, LoggingConfig, build_hub_registry, build_ledger, build_service, client_for,
    init_logging, open_budget_store,
};
use integration_routing::{RouteQuery, RouteResponse};

/// Rendezvous CLI
#[derive(Parser)]
#[command(name = "rendezvous-cli")]
#[command(author, version, about = "Transit-balanced meeting points", long_about = None)]
struct Cli {
    /// Verbosity level (overrides the configured log filter)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ./rendezvous.toml when present)
    #[arg(short, long, global = true, env = "RENDEZVOUS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the best meeting point between two locations
    Resolve {
        /// First party as "lat,lng"
        #[arg(long, value_parser = parse_pair, allow_hyphen_values = true)]
        origin: (f64, f64),

        /// Second party as "lat,lng"
        #[arg(long, value_parser = parse_pair, allow_hyphen_values = true)]
        destination: (f64, f64),

        /// Travel mode of the first party
        #[arg(long, default_value = "transit")]
        user_mode: TravelMode,

        /// Travel mode of the second party
        #[arg(long, default_value = "transit")]
        friend_mode: TravelMode,

        /// Departure time (RFC 3339, defaults to a few minutes from now)
        #[arg(long)]
        departure: Option<DateTime<Utc>>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or adjust monthly provider budgets
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// List known hubs, or the hubs relevant to a pair of locations
    Hubs {
        /// First party as "lat,lng"
        #[arg(long, requires = "destination", allow_hyphen_values = true)]
        origin: Option<Coordinate>,

        /// Second party as "lat,lng"
        #[arg(long, requires = "origin", allow_hyphen_values = true)]
        destination: Option<Coordinate>,
    },

    /// Query a single provider directly and print its normalized response
    ///
    /// Bypasses budget accounting; meant for checking credentials and
    /// connectivity.
    Route {
        /// Provider id from the configuration
        #[arg(short, long)]
        provider: String,

        /// Start as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        from: Coordinate,

        /// End as "lat,lng"
        #[arg(long, allow_hyphen_values = true)]
        to: Coordinate,

        #[arg(long, default_value = "transit")]
        mode: TravelMode,
    },
}

#[derive(Subcommand)]
enum BudgetAction {
    /// Show usage and policy of every enabled provider
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Overwrite the request counter of a provider for this month
    Set {
        provider: ProviderId,
        consumed: u64,
    },

    /// Zero the counters of a provider for this month
    Reset { provider: ProviderId },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Parse `"lat,lng"` into raw numbers; range checks are left to the engine
fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lng', got '{s}'"))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    let lng = lng
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid longitude '{lng}': {e}"))?;
    Ok((lat, lng))
}

fn logging_config(config: &AppConfig, verbose: u8) -> LoggingConfig {
    if verbose == 0 {
        return config.logging.clone();
    }
    LoggingConfig {
        filter: log_filter_from_verbosity(verbose).to_string(),
        json: config.logging.json,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&logging_config(&config, cli.verbose))?;

    match cli.command {
        Commands::Resolve {
            origin,
            destination,
            user_mode,
            friend_mode,
            departure,
            json,
        } => {
            let service = build_service(&config).await?;
            let mut request =
                ResolutionRequest::new(origin, destination).with_modes(user_mode, friend_mode);
            if let Some(departure) = departure {
                request = request.with_departure(departure);
            }

            let result = service.resolve(&request).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", output::render_resolution(&result));
            }
        },

        Commands::Budget { action } => {
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
            let store = open_budget_store(&config)?;
            let ledger = build_ledger(&config, store).await?;

            match action {
                BudgetAction::Status { json } => {
                    let status = ledger.status();
                    if json {
                        println!("{}", serde_json::to_string_pretty(&status)?);
                    } else {
                        print!("{}", output::render_budget(&status));
                    }
                },
                BudgetAction::Set { provider, consumed } => {
                    let status = ledger.set_consumed(&provider, consumed).await?;
                    println!("✅ Budget updated");
                    print!("{}", output::render_budget(&[status]));
                },
                BudgetAction::Reset { provider } => {
                    let status = ledger.reset(&provider).await?;
                    println!("🧹 Budget reset");
                    print!("{}", output::render_budget(&[status]));
                },
            }
        },

        Commands::Hubs {
            origin,
            destination,
        } => {
            let registry = build_hub_registry(&config)?;
            match origin.zip(destination) {
                Some((origin, destination)) => {
                    let candidates =
                        registry.filter_relevant(origin, destination, DEFAULT_MAX_HUB_CANDIDATES);
                    print!("{}", output::render_candidates(&candidates));
                },
                None => print!("{}", output::render_hubs(registry.hubs())),
            }
        },

        Commands::Route {
            provider,
            from,
            to,
            mode,
        } => {
            let Some(provider_config) = config.providers.iter().find(|p| p.id == provider) else {
                bail!("unknown provider '{provider}'");
            };
            let client = client_for(provider_config)?;
            let query = RouteQuery::new(from, to, mode);

            let response = match client.route(&query).await {
                Ok(response) => response,
                Err(e) => RouteResponse::from_error(&e),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn log_filter_verbosity_levels() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
        assert_eq!(log_filter_from_verbosity(1), "info");
        assert_eq!(log_filter_from_verbosity(2), "debug");
        assert_eq!(log_filter_from_verbosity(7), "trace");
    }

    #[test]
    fn verbosity_overrides_configured_filter() {
        let config = AppConfig::default();
        assert_eq!(logging_config(&config, 0).filter, config.logging.filter);
        assert_eq!(logging_config(&config, 2).filter, "debug");
    }

    #[test]
    fn parse_pair_accepts_negative_longitude() {
        let (lat, lng) = parse_pair("40.7580, -73.9855").unwrap();
        assert!((lat - 40.758).abs() < f64::EPSILON);
        assert!((lng + 73.9855).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_pair_leaves_range_checks_to_engine() {
        assert!(parse_pair("120,0").is_ok());
        assert!(parse_pair("40.7").is_err());
        assert!(parse_pair("north,0").is_err());
    }

    #[test]
    fn resolve_defaults_to_transit() {
        let cli = parse(&[
            "rendezvous-cli",
            "resolve",
            "--origin",
            "40.7580,-73.9855",
            "--destination",
            "40.7359,-73.9906",
        ])
        .unwrap();
        let Commands::Resolve {
            user_mode,
            friend_mode,
            departure,
            json,
            ..
        } = cli.command
        else {
            panic!("expected resolve");
        };
        assert_eq!(user_mode, TravelMode::Transit);
        assert_eq!(friend_mode, TravelMode::Transit);
        assert!(departure.is_none());
        assert!(!json);
    }

    #[test]
    fn resolve_accepts_modes_and_departure() {
        let cli = parse(&[
            "rendezvous-cli",
            "-vv",
            "resolve",
            "--origin",
            "52.52,13.40",
            "--destination",
            "52.50,13.33",
            "--friend-mode",
            "walking",
            "--departure",
            "2026-03-01T09:00:00Z",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Resolve {
            friend_mode,
            departure,
            json,
            ..
        } = cli.command
        else {
            panic!("expected resolve");
        };
        assert_eq!(friend_mode, TravelMode::Walking);
        assert!(departure.is_some());
        assert!(json);
    }

    #[test]
    fn resolve_rejects_unknown_mode() {
        let result = parse(&[
            "rendezvous-cli",
            "resolve",
            "--origin",
            "0,0",
            "--destination",
            "1,1",
            "--user-mode",
            "teleport",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn budget_set_parses_provider_and_count() {
        let cli = parse(&["rendezvous-cli", "budget", "set", "google", "950"]).unwrap();
        let Commands::Budget {
            action: BudgetAction::Set { provider, consumed },
        } = cli.command
        else {
            panic!("expected budget set");
        };
        assert_eq!(provider.as_str(), "google");
        assert_eq!(consumed, 950);
    }

    #[test]
    fn budget_rejects_invalid_provider_id() {
        assert!(parse(&["rendezvous-cli", "budget", "reset", "Not An Id"]).is_err());
    }

    #[test]
    fn hubs_requires_both_locations() {
        assert!(parse(&["rendezvous-cli", "hubs"]).is_ok());
        assert!(parse(&["rendezvous-cli", "hubs", "--origin", "40.75,-73.98"]).is_err());
    }

    #[test]
    fn route_validates_coordinates() {
        assert!(
            parse(&[
                "rendezvous-cli",
                "route",
                "--provider",
                "hafas",
                "--from",
                "95,0",
                "--to",
                "1,1",
            ])
            .is_err()
        );
    }
}
