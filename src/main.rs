//! Partes CLI - Lightweight client for the Partes components portal
//!
//! Quoting, ordering, and cataloguing computer components from the terminal.

mod api;
mod auth;
mod config;
mod models;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "partes-cli")]
#[command(about = "Lightweight CLI client for the Partes components portal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against the portal
    Login {
        /// Portal username
        username: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Force re-authentication even if a valid token exists
        #[arg(short, long)]
        force: bool,
    },

    /// Log out and clear stored credentials
    Logout,

    /// Show current authentication status
    Status,

    /// Run the session monitor with an interactive extend/reject prompt
    Watch,

    /// List catalogue components
    Components {
        /// Page number (zero-based)
        #[arg(short, long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(short, long, default_value = "20")]
        size: u32,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Show one component by id instead of listing
        #[arg(long)]
        id: Option<i64>,
    },

    /// List assembled PCs
    Pcs {
        /// Page number (zero-based)
        #[arg(short, long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(short, long, default_value = "20")]
        size: u32,
    },

    /// List quotations
    Quotations {
        /// Page number (zero-based)
        #[arg(short, long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(short, long, default_value = "20")]
        size: u32,

        /// Filter by status (draft, sent, accepted, rejected)
        #[arg(long)]
        status: Option<String>,
    },

    /// List suppliers
    Suppliers {
        /// Page number (zero-based)
        #[arg(short, long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(short, long, default_value = "20")]
        size: u32,
    },

    /// List purchase orders
    Orders {
        /// Page number (zero-based)
        #[arg(short, long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(short, long, default_value = "20")]
        size: u32,

        /// Filter by status (pending, confirmed, shipped, delivered, cancelled)
        #[arg(long)]
        status: Option<String>,
    },

    /// List promotions
    Promotions {
        /// Page number (zero-based)
        #[arg(short, long, default_value = "0")]
        page: u32,

        /// Page size
        #[arg(short, long, default_value = "20")]
        size: u32,

        /// Only show currently active promotions
        #[arg(short, long)]
        active: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login {
            username,
            password,
            force,
        } => {
            tracing::info!("Starting authentication flow...");
            auth::login(&username, password, force).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            auth::logout().await?;
        }
        Commands::Status => {
            auth::status().await?;
        }
        Commands::Watch => {
            session::watch().await?;
        }
        Commands::Components {
            page,
            size,
            category,
            id,
        } => match id {
            Some(id) => api::show_component(id).await?,
            None => api::list_components(page, size, category).await?,
        },
        Commands::Pcs { page, size } => {
            api::list_pcs(page, size).await?;
        }
        Commands::Quotations { page, size, status } => {
            api::list_quotations(page, size, status).await?;
        }
        Commands::Suppliers { page, size } => {
            api::list_suppliers(page, size).await?;
        }
        Commands::Orders { page, size, status } => {
            api::list_orders(page, size, status).await?;
        }
        Commands::Promotions { page, size, active } => {
            api::list_promotions(page, size, active).await?;
        }
    }

    Ok(())
}
