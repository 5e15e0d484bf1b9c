use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use tracing::warn;

mod commands;

#[derive(Parser)]
#[command(name = "brew")]
#[command(about = "Coffee order service operator CLI", long_about = None)]
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
        /// Paths in merge order (base -> env overrides ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Menu and stock administration
    Menu {
        #[command(subcommand)]
        cmd: MenuCmd,
    },

    /// Order inspection and status changes
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Admin password management
    Admin {
        #[command(subcommand)]
        cmd: AdminCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses while orders are pending or
    /// in progress unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a DB with open orders.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Insert the starter menu when the menus table is empty.
    Seed,
}

#[derive(Subcommand)]
enum MenuCmd {
    /// Print every menu with its stock and options
    List,

    /// Change one menu's stock by a delta or set it outright
    #[command(group(ArgGroup::new("amount").required(true).args(["change", "set"])))]
    Stock {
        /// Menu id
        #[arg(long)]
        id: i32,

        /// Signed delta (e.g. --change -2)
        #[arg(long, allow_hyphen_values = true)]
        change: Option<i64>,

        /// Absolute non-negative stock
        #[arg(long)]
        set: Option<i64>,
    },

    /// Set every menu's stock to 0
    ResetStock {
        /// Required: this zeroes all stock.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Replace (or clear) a menu's image reference
    #[command(group(ArgGroup::new("image").required(true).args(["url", "clear"])))]
    SetImage {
        /// Menu id
        #[arg(long)]
        id: i32,

        /// Image path or URL
        #[arg(long)]
        url: Option<String>,

        /// Remove the image reference
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
}

#[derive(Subcommand)]
enum OrderCmd {
    /// List orders, newest first
    List {
        /// Dashboard tab: in-progress | completed (wins over --status)
        #[arg(long)]
        tab: Option<String>,

        /// Exact status: pending | in_progress | completed
        #[arg(long)]
        status: Option<String>,
    },

    /// Print one order with its lines
    Show {
        #[arg(long)]
        id: i32,

        /// Print the order as pretty JSON instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Move an order one step forward (pending -> in_progress -> completed)
    Advance {
        #[arg(long)]
        id: i32,

        /// Target status
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum AdminCmd {
    /// Store the first admin password if none exists yet.
    /// Falls back to the env var named by admin.bootstrap_password_env.
    Bootstrap {
        #[arg(long)]
        password: Option<String>,
    },

    /// Rotate the admin password (appends a history row)
    SetPassword {
        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },

    /// Print password history timestamps, newest first
    History,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");

    // Logs go to stderr; stdout stays machine-readable key=value lines.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = brew_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = brew_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate { yes } => {
                    let n = brew_db::count_open_orders(&pool).await?;
                    if n > 0 && !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: detected {} open order(s) in pending/in_progress. Re-run with: `brew db migrate --yes`",
                            n
                        );
                    }
                    if n > 0 {
                        warn!(open_orders = n, "migrating with open orders (--yes)");
                    }

                    brew_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
                DbCmd::Seed => {
                    let s = brew_db::seed_menus(&pool).await?;
                    println!(
                        "menus_inserted={} options_inserted={}",
                        s.menus_inserted, s.options_inserted
                    );
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = brew_config::load_layered_yaml(&path_refs)?;
            loaded.app_config()?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Menu { cmd } => {
            if let MenuCmd::ResetStock { yes: false } = cmd {
                anyhow::bail!(
                    "REFUSING RESET: this sets every menu's stock to 0. Re-run with: `brew menu reset-stock --yes`"
                );
            }

            let pool = brew_db::connect_from_env().await?;
            match cmd {
                MenuCmd::List => commands::menu::list(&pool).await?,
                MenuCmd::Stock { id, change, set } => {
                    commands::menu::stock(&pool, id, change, set).await?
                }
                MenuCmd::ResetStock { .. } => commands::menu::reset_stock(&pool).await?,
                MenuCmd::SetImage { id, url, clear } => {
                    let url = if clear { None } else { url };
                    commands::menu::set_image(&pool, id, url.as_deref()).await?
                }
            }
        }

        Commands::Order { cmd } => {
            let pool = brew_db::connect_from_env().await?;
            match cmd {
                OrderCmd::List { tab, status } => {
                    commands::order::list(&pool, tab.as_deref(), status.as_deref()).await?
                }
                OrderCmd::Show { id, json } => commands::order::show(&pool, id, json).await?,
                OrderCmd::Advance { id, to } => commands::order::advance(&pool, id, &to).await?,
            }
        }

        Commands::Admin { cmd } => {
            let (cfg, _loaded) = brew_config::load_from_env()?;
            let pool = brew_db::connect_from_env().await?;
            match cmd {
                AdminCmd::Bootstrap { password } => {
                    commands::admin::bootstrap(&pool, &cfg, password).await?
                }
                AdminCmd::SetPassword { old, new } => {
                    commands::admin::set_password(&pool, &cfg, &old, &new).await?
                }
                AdminCmd::History => commands::admin::history(&pool).await?,
            }
        }
    }

    Ok(())
}
