use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mj")]
#[command(about = "Garden shop operator CLI", long_about = None)]
struct Cli {
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
        /// Paths in merge order (base -> env overlays...)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Fail when the config has keys nothing reads.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Data-repair tasks
    Maint {
        #[command(subcommand)]
        cmd: MaintCmd,
    },

    /// Order administration
    Orders {
        #[command(subcommand)]
        cmd: OrdersCmd,
    },

    /// Sales reporting
    Sales {
        #[command(subcommand)]
        cmd: SalesCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses while undelivered orders exist unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB with orders still in flight.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum MaintCmd {
    /// Remove literal "None" fragments from saved addresses and order destinations
    CleanAddresses {
        /// Report what would change without writing
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Empty the carts of customers whose saved address contains "None"
    EmptyCarts {
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum OrdersCmd {
    /// List orders, oldest first
    List {
        /// PLACED | SHIPPED | DELIVERED
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        customer_id: Option<i64>,
    },

    /// Move an order forward (PLACED -> SHIPPED -> DELIVERED)
    SetStatus {
        #[arg(long)]
        order_id: i64,

        /// PLACED | SHIPPED | DELIVERED
        #[arg(long)]
        status: String,

        /// Free text stored in the status history
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[derive(Subcommand)]
enum SalesCmd {
    /// Write delivered orders to CSV
    Export {
        /// Output file path
        #[arg(long)]
        out: String,

        /// First day (UTC, inclusive), e.g. 2026-01-31
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day (UTC, inclusive)
        #[arg(long)]
        to: Option<NaiveDate>,

        #[arg(long)]
        customer_id: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = mj_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = mj_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate { yes } => {
                    // Schema changes under in-flight orders need an explicit ack.
                    let n = mj_db::count_open_orders(&pool).await?;
                    if n > 0 && !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: detected {} undelivered order(s). Re-run with: `mj db migrate --yes`",
                            n
                        );
                    }

                    mj_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths, strict } => {
            commands::config_hash(&paths, strict)?;
        }

        Commands::Maint { cmd } => {
            let pool = mj_db::connect_from_env().await?;
            let report = match cmd {
                MaintCmd::CleanAddresses { dry_run } => {
                    mj_db::clean_stored_addresses(&pool, dry_run).await?
                }
                MaintCmd::EmptyCarts { dry_run } => {
                    mj_db::empty_carts_with_bad_addresses(&pool, dry_run).await?
                }
            };
            commands::print_maintenance(&report);
        }

        Commands::Orders { cmd } => match cmd {
            OrdersCmd::List {
                status,
                customer_id,
            } => {
                let status = status
                    .as_deref()
                    .map(commands::parse_status)
                    .transpose()?;
                let pool = mj_db::connect_from_env().await?;
                commands::orders::list(&pool, status, customer_id).await?;
            }
            OrdersCmd::SetStatus {
                order_id,
                status,
                notes,
            } => {
                let next = commands::parse_status(&status)?;
                let pool = mj_db::connect_from_env().await?;
                commands::orders::set_status(&pool, order_id, next, &notes).await?;
            }
        },

        Commands::Sales { cmd } => match cmd {
            SalesCmd::Export {
                out,
                from,
                to,
                customer_id,
            } => {
                let filter = commands::sales::filter(customer_id, from, to)?;
                let pool = mj_db::connect_from_env().await?;
                commands::sales::export(&pool, &filter, &out).await?;
            }
        },
    }

    Ok(())
}

/// Logs go to stderr; stdout carries the key=value output scripts parse.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
