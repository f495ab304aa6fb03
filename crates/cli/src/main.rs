//! CLI for the Estate listing API.
//!
//! Every command goes through one `EstateClient`: restore the persisted
//! session, run the request, render a boxed summary or JSON.

mod report;
mod sink;

use clap::{Args, Parser, Subcommand};
use estate_client::{ClientConfig, EstateClient};
use estate_core::{finance, Credentials, PropertyQuery, Registration, Role};
use serde::Serialize;
use sink::JsonStreamSink;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "estate", version, about = "Estate listing API client")]
struct Cli {
    #[command(flatten)]
    connection: Connection,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Connection {
    /// API root, including the version prefix.
    #[arg(long, global = true, env = "ESTATE_API_BASE_URL")]
    base_url: Option<String>,

    /// Where the bearer token is kept between runs.
    /// Defaults to `$HOME/.estate/session.json`.
    #[arg(long, global = true, env = "ESTATE_TOKEN_FILE")]
    token_file: Option<PathBuf>,
}

/// Output switches shared by list commands.
#[derive(Args, Debug)]
struct ListOutput {
    #[arg(long, default_value_t = false)]
    json: bool,

    /// One JSON object per line on stdout.
    #[arg(long, default_value_t = false, conflicts_with = "json")]
    ndjson: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and persist the token.
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "ESTATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "ESTATE_PASSWORD", hide_env_values = true)]
        password: String,

        /// buyer, agent or admin.
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },
    /// Forget the stored token.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List properties, optionally filtered.
    Properties {
        /// Repeatable filter, e.g. `--param city=Pune --param maxPrice=5000000`.
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        #[command(flatten)]
        output: ListOutput,
    },
    /// Show one property.
    Property {
        id: String,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List featured properties.
    Featured {
        #[command(flatten)]
        output: ListOutput,
    },
    /// List agents (admin only).
    Agents {
        #[command(flatten)]
        output: ListOutput,
    },
    /// Dashboard counters (admin only).
    Stats {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List, add or remove favorites.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoriteAction>,

        #[command(flatten)]
        output: ListOutput,
    },
    /// Monthly instalment for a loan.
    Emi {
        #[arg(long)]
        principal: f64,

        /// Annual interest rate in percent.
        #[arg(long)]
        rate: f64,

        #[arg(long)]
        months: u32,
    },
}

#[derive(Subcommand, Debug)]
enum FavoriteAction {
    Add { id: String },
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Pure arithmetic, no client needed.
    if let Commands::Emi {
        principal,
        rate,
        months,
    } = cli.command
    {
        let emi = finance::emi(principal, rate, months)?;
        print!("{}", report::render_emi(principal, rate, months, &emi));
        return Ok(());
    }

    let config = build_config(&cli.connection)?;
    tracing::debug!(base_url = %config.base_url, "connecting");
    let client = EstateClient::connect(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            let session = client
                .auth()
                .login(&Credentials { email, password })
                .await?;
            print!("{}", report::render_session(&session));
        }
        Commands::Register {
            name,
            email,
            password,
            role,
        } => {
            let registration = Registration {
                name,
                email,
                password,
                role,
            };
            let session = client.auth().register(&registration).await?;
            print!("{}", report::render_session(&session));
        }
        Commands::Logout => {
            client.auth().logout()?;
            println!("Signed out.");
        }
        Commands::Whoami => match client.auth().load_user().await? {
            Some(session) => print!("{}", report::render_session(&session)),
            None => println!("Not signed in."),
        },
        Commands::Properties { params, output } => {
            restore_session(&client).await;
            let query = PropertyQuery::from_pairs(&params)?;
            let listings = client.properties().get_properties(&query).await?;
            emit_list(&output, &listings, || {
                report::render_listings("PROPERTIES", &listings)
            })?;
        }
        Commands::Property { id, json } => {
            restore_session(&client).await;
            let property = client.properties().get_property(&id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&property)?);
            } else {
                print!("{}", report::render_property(&property));
            }
        }
        Commands::Featured { output } => {
            restore_session(&client).await;
            let listings = client.properties().get_featured().await?;
            emit_list(&output, &listings, || {
                report::render_listings("FEATURED", &listings)
            })?;
        }
        Commands::Agents { output } => {
            restore_session(&client).await;
            let agents = client.agents().get_agents().await?;
            emit_list(&output, &agents, || report::render_agents(&agents))?;
        }
        Commands::Stats { json } => {
            restore_session(&client).await;
            let stats = client.admin().stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", report::render_stats(&stats));
            }
        }
        Commands::Favorites { action, output } => {
            restore_session(&client).await;
            match action {
                Some(FavoriteAction::Add { id }) => {
                    client.favorites().add(&id).await?;
                    println!("Saved {id}.");
                }
                Some(FavoriteAction::Remove { id }) => {
                    client.favorites().remove(&id).await?;
                    println!("Removed {id}.");
                }
                None => {
                    let favorites = client.favorites().list().await?;
                    emit_list(&output, &favorites, || {
                        report::render_listings("FAVORITES", &favorites)
                    })?;
                }
            }
        }
        Commands::Emi { .. } => {}
    }

    Ok(())
}

/// Environment first, then flags on top.
fn build_config(args: &Connection) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &args.base_url {
        config = config.with_base_url(url)?;
    }
    if let Some(path) = &args.token_file {
        config = config.with_token_file(path);
    } else if config.token_file.is_none() {
        if let Some(home) = std::env::var_os("HOME") {
            config = config.with_token_file(PathBuf::from(home).join(".estate/session.json"));
        }
    }
    Ok(config)
}

/// Resolves a persisted token. A stale token is dropped and the command
/// carries on signed out.
async fn restore_session(client: &EstateClient) {
    match client.auth().load_user().await {
        Ok(Some(session)) => tracing::debug!(user_id = %session.id, "session restored"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "stored session rejected; continuing signed out"),
    }
}

fn emit_list<T: Serialize>(
    output: &ListOutput,
    rows: &[T],
    render: impl FnOnce() -> String,
) -> Result<(), Box<dyn std::error::Error>> {
    if output.ndjson {
        let mut s = JsonStreamSink::stdout();
        s.write_rows(rows)?;
        let n = s.finish()?;
        tracing::debug!(rows = n, "ndjson: wrote to stdout");
    } else if output.json {
        println!("{}", serde_json::to_string_pretty(rows)?);
    } else {
        print!("{}", render());
    }
    Ok(())
}

fn parse_role(raw: &str) -> Result<Role, String> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .map_err(|_| format!("unknown role `{raw}`; expected buyer, agent or admin"))
}
