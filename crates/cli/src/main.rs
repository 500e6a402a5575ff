//! Sillage CLI - support tools for file-backed carts.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart stored in ./carts
//! sillage cart show --dir ./carts
//!
//! # Add a line (or bump its quantity)
//! sillage cart add --dir ./carts --id p1 --name "Noir Absolu" --price 100 --size 50ml
//!
//! # Set a quantity (clamped to 1-10)
//! sillage cart set --dir ./carts --id p1 --quantity 3
//!
//! # Explain what hydration would keep and drop
//! sillage cart inspect --dir ./carts
//!
//! # Delete the stored cart
//! sillage cart discard --dir ./carts
//! ```
//!
//! # Commands
//!
//! - `cart show` - Print lines and totals
//! - `cart add` / `cart set` / `cart remove` / `cart clear` - Mutate the cart
//! - `cart inspect` - Validation report of the stored record
//! - `cart discard` - Delete the stored record

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sillage_core::{CART_STORAGE_KEY, CurrencyCode};

mod commands;

use commands::cart::{CartTarget, NewLine};

#[derive(Parser)]
#[command(name = "sillage")]
#[command(author, version, about = "Sillage CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and edit a file-backed cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

/// Where the cart lives.
#[derive(Args)]
struct StoreArgs {
    /// Storage directory holding `<key>.json`
    #[arg(long)]
    dir: PathBuf,

    /// Storage key of the cart record
    #[arg(long, default_value = CART_STORAGE_KEY)]
    key: String,

    /// Currency used to print amounts
    #[arg(long, default_value = "USD")]
    currency: CurrencyCode,
}

impl From<StoreArgs> for CartTarget {
    fn from(args: StoreArgs) -> Self {
        Self {
            dir: args.dir,
            key: args.key,
            currency: args.currency,
        }
    }
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart with totals
    Show {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Add a line, or bump its quantity by one
    Add {
        #[command(flatten)]
        store: StoreArgs,

        /// Variant id
        #[arg(long)]
        id: String,

        /// Product name
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,

        #[arg(long, default_value = "")]
        subtitle: String,

        #[arg(long, default_value = "")]
        size: String,

        #[arg(long, default_value = "")]
        image: String,

        #[arg(long, default_value = "")]
        slug: String,
    },
    /// Set a line's quantity (clamped to 1-10)
    Set {
        #[command(flatten)]
        store: StoreArgs,

        #[arg(long)]
        id: String,

        #[arg(long, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        #[command(flatten)]
        store: StoreArgs,

        #[arg(long)]
        id: String,
    },
    /// Remove every line
    Clear {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Report which stored entries hydration keeps and drops
    Inspect {
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Delete the stored record
    Discard {
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() {
    // Logs go to stderr so stdout stays the command output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sillage_core=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli);

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show { store } => commands::cart::show(&store.into(), &mut out)?,
            CartAction::Add {
                store,
                id,
                name,
                price,
                subtitle,
                size,
                image,
                slug,
            } => {
                let line = NewLine {
                    id,
                    name,
                    subtitle,
                    size,
                    image,
                    slug,
                    price,
                };
                commands::cart::add(&store.into(), line, &mut out)?;
            }
            CartAction::Set {
                store,
                id,
                quantity,
            } => commands::cart::set(&store.into(), &id, quantity, &mut out)?,
            CartAction::Remove { store, id } => {
                commands::cart::remove(&store.into(), &id, &mut out)?;
            }
            CartAction::Clear { store } => commands::cart::clear(&store.into(), &mut out)?,
            CartAction::Inspect { store } => commands::cart::inspect(&store.into(), &mut out)?,
            CartAction::Discard { store } => commands::cart::discard(&store.into(), &mut out)?,
        },
    }
    Ok(())
}
