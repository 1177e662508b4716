use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use feu_compliance::RouteFilter;
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "feu")]
#[command(about = "FuelEU compliance balance, banking and pooling CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order. Falls back to FEU_CONFIG.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Route catalogue
    Routes {
        #[command(subcommand)]
        cmd: RoutesCmd,
    },

    /// Raw and adjusted compliance balance of one route
    Cb {
        #[arg(long = "route")]
        route_id: String,
        #[arg(long)]
        year: i32,
    },

    /// Adjusted compliance balance of every route in a year
    AdjustedCb {
        #[arg(long)]
        year: i32,
    },

    /// Bank the route's positive raw balance
    Bank {
        #[arg(long = "route")]
        route_id: String,
        #[arg(long)]
        year: i32,
    },

    /// Draw banked surplus down against the route
    Apply {
        #[arg(long = "route")]
        route_id: String,
        #[arg(long)]
        year: i32,
        /// gCO2e, decimal
        #[arg(long)]
        amount: Decimal,
    },

    /// Ledger rows of a route
    Records {
        #[arg(long = "route")]
        route_id: String,
        #[arg(long)]
        year: Option<i32>,
    },

    /// Aggregate and record a pool of routes from one year
    Pool {
        #[arg(long)]
        year: i32,
        /// Member route ids (at least two)
        #[arg(required = true)]
        members: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,

    /// Upsert routes from a CSV file and set the flagged baselines.
    Seed {
        #[arg(long)]
        csv: PathBuf,
    },
}

#[derive(Subcommand)]
enum RoutesCmd {
    /// List routes, optionally filtered
    List {
        #[arg(long)]
        vessel_type: Option<String>,
        #[arg(long)]
        fuel_type: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },

    /// Make a route the single baseline of its year
    Baseline {
        #[arg(long = "route")]
        route_id: String,
        #[arg(long)]
        year: i32,
    },

    /// Compare every non-baseline route of a year to the baseline
    Compare {
        #[arg(long)]
        year: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = feu_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Db { cmd } => {
            let cfg = commands::load_config(&cli.config_paths)?;
            let pool = commands::connect(&cfg).await?;
            match cmd {
                DbCmd::Status => {
                    let s = feu_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_routes_table={} routes={} bank_entries={} pools={}",
                        s.ok, s.has_routes_table, s.routes, s.bank_entries, s.pools
                    );
                }
                DbCmd::Migrate => {
                    feu_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
                DbCmd::Seed { csv } => {
                    feu_db::migrate(&pool).await?;
                    let report = feu_db::seed_routes_from_csv(&pool, &csv).await?;
                    println!(
                        "rows_read={} routes_upserted={} baselines_set={}",
                        report.rows_read,
                        report.routes_upserted,
                        report.baselines_set.len()
                    );
                }
            }
        }

        Commands::Routes { cmd } => {
            let svc = commands::service_from(&cli.config_paths).await?;
            match cmd {
                RoutesCmd::List {
                    vessel_type,
                    fuel_type,
                    year,
                } => {
                    let filter = RouteFilter {
                        vessel_type,
                        fuel_type,
                        year,
                    };
                    commands::compliance::routes_list(&svc, filter).await?;
                }
                RoutesCmd::Baseline { route_id, year } => {
                    commands::compliance::routes_baseline(&svc, &route_id, year).await?;
                }
                RoutesCmd::Compare { year } => {
                    commands::compliance::routes_compare(&svc, year).await?;
                }
            }
        }

        Commands::Cb { route_id, year } => {
            let svc = commands::service_from(&cli.config_paths).await?;
            commands::compliance::cb(&svc, &route_id, year).await?;
        }

        Commands::AdjustedCb { year } => {
            let svc = commands::service_from(&cli.config_paths).await?;
            commands::compliance::adjusted_cb(&svc, year).await?;
        }

        Commands::Bank { route_id, year } => {
            let svc = commands::service_from(&cli.config_paths).await?;
            commands::compliance::bank(&svc, &route_id, year).await?;
        }

        Commands::Apply {
            route_id,
            year,
            amount,
        } => {
            let svc = commands::service_from(&cli.config_paths).await?;
            commands::compliance::apply(&svc, &route_id, year, amount).await?;
        }

        Commands::Records { route_id, year } => {
            let svc = commands::service_from(&cli.config_paths).await?;
            commands::compliance::records(&svc, &route_id, year).await?;
        }

        Commands::Pool { year, members } => {
            let svc = commands::service_from(&cli.config_paths).await?;
            commands::compliance::pool(&svc, year, &members).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn apply_parses_decimal_amount() {
        let cli = Cli::try_parse_from([
            "feu", "apply", "--route", "R002", "--year", "2025", "--amount", "1000.5",
        ])
        .unwrap();
        match cli.cmd {
            Commands::Apply { route_id, year, amount } => {
                assert_eq!(route_id, "R002");
                assert_eq!(year, 2025);
                assert_eq!(amount, Decimal::new(10005, 1));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn global_config_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "feu", "cb", "--route", "R001", "--year", "2025", "--config", "a.yaml", "--config",
            "b.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config_paths, vec!["a.yaml", "b.yaml"]);
    }

    #[test]
    fn pool_requires_members() {
        assert!(Cli::try_parse_from(["feu", "pool", "--year", "2025"]).is_err());
    }
}
