//! Loopstore CLI - browse the shop, manage the cart and check out.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! loopstore products list --size M --max-price 50
//! loopstore products show 12
//! loopstore products search "denim"
//!
//! # Cart and checkout
//! loopstore cart add 12 --qty 2
//! loopstore cart sync
//! loopstore checkout --first-name Anna --last-name Nowak --email anna@example.com \
//!     --address "Prosta 12" --city Warsaw --postal-code 00-001 --country Poland
//!
//! # Account
//! LOOPSTORE_PASSWORD=... loopstore login anna@example.com
//! loopstore favorites add 12
//! loopstore orders list
//! ```
//!
//! State (cart, cached user, session cookies) lives in `LOOPSTORE_DATA_DIR`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use loopstore_core::{OrderId, ProductCondition, ProductId, Size};
use loopstore_storefront::config::StorefrontConfig;
use loopstore_storefront::{Storefront, StorefrontError};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "loopstore")]
#[command(author, version, about = "Loopstore storefront CLI")]
struct Cli {
    /// Shop API base URL (overrides `LOOPSTORE_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Client-local data directory (overrides `LOOPSTORE_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// List product categories
    Categories,
    /// Read or write product reviews
    Reviews {
        #[command(subcommand)]
        action: ReviewsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart contents
    Checkout(ShippingArgs),
    /// Sign in
    Login {
        email: String,
        #[arg(long, env = "LOOPSTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        email: String,
        #[arg(long, env = "LOOPSTORE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in customer
    Whoami,
    /// Manage favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Subscribe to the newsletter
    Newsletter { email: String },
    /// Send a message to the shop
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products, optionally filtered
    List(FilterArgs),
    /// Show one product
    Show { id: ProductId },
    /// Search products
    Search { query: String },
}

#[derive(Args)]
struct FilterArgs {
    /// Category id or slug
    #[arg(long)]
    category: Option<String>,
    /// Size (XS, S, M, L, XL, XXL)
    #[arg(long)]
    size: Option<Size>,
    /// Condition (`new`, `like_new`, `good`, `fair`)
    #[arg(long)]
    condition: Option<ProductCondition>,
    #[arg(long)]
    min_price: Option<Decimal>,
    #[arg(long)]
    max_price: Option<Decimal>,
    #[arg(long)]
    page: Option<u32>,
}

#[derive(Subcommand)]
enum ReviewsAction {
    /// List a product's reviews
    List { id: ProductId },
    /// Review a product (requires login)
    Add {
        id: ProductId,
        /// Rating from 1 to 5
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        id: ProductId,
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Remove a product
    Remove { id: ProductId },
    /// Set a product's quantity (0 removes it)
    Update { id: ProductId, qty: u32 },
    /// Empty the cart
    Clear,
    /// Refresh prices and stock from the shop
    Sync,
}

#[derive(Args)]
struct ShippingArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    postal_code: String,
    #[arg(long)]
    country: String,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites
    List,
    /// Add a product to favorites
    Add { id: ProductId },
    /// Remove a product from favorites
    Remove { id: ProductId },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: OrderId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            output::error(&e.user_message());
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "loopstore=warn".into());

    // JSON lines for log shippers, plain text otherwise
    let json_logs = std::env::var("LOOPSTORE_LOG_FORMAT").is_ok_and(|v| v == "json");
    let json_layer = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            e.report();
            output::error(&e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<StorefrontConfig, StorefrontError> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    Ok(config)
}

async fn run(command: Commands, config: StorefrontConfig) -> Result<(), StorefrontError> {
    let shop = Storefront::open(config)?;

    match command {
        Commands::Products { action } => match action {
            ProductsAction::List(args) => {
                commands::catalog::list_products(&shop, args.into()).await?;
            }
            ProductsAction::Show { id } => commands::catalog::show_product(&shop, id).await?,
            ProductsAction::Search { query } => {
                commands::catalog::search(&shop, &query).await?;
            }
        },
        Commands::Categories => commands::catalog::categories(&shop).await?,
        Commands::Reviews { action } => match action {
            ReviewsAction::List { id } => commands::catalog::reviews(&shop, id).await?,
            ReviewsAction::Add {
                id,
                rating,
                comment,
            } => commands::catalog::add_review(&shop, id, rating, comment).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop),
            CartAction::Add { id, qty } => commands::cart::add(&shop, id, qty).await?,
            CartAction::Remove { id } => commands::cart::remove(&shop, id),
            CartAction::Update { id, qty } => commands::cart::update(&shop, id, qty)?,
            CartAction::Clear => commands::cart::clear(&shop),
            CartAction::Sync => commands::cart::sync(&shop).await?,
        },
        Commands::Checkout(args) => commands::cart::checkout(&shop, args.into()).await?,
        Commands::Login { email, password } => {
            commands::account::login(&shop, &email, &SecretString::from(password)).await?;
        }
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            let password = SecretString::from(password);
            commands::account::register(&shop, &email, &password, &first_name, &last_name)
                .await?;
        }
        Commands::Logout => commands::account::logout(&shop).await?,
        Commands::Whoami => commands::account::whoami(&shop).await,
        Commands::Favorites { action } => match action {
            FavoritesAction::List => commands::account::list_favorites(&shop).await?,
            FavoritesAction::Add { id } => commands::account::add_favorite(&shop, id).await?,
            FavoritesAction::Remove { id } => {
                commands::account::remove_favorite(&shop, id).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::account::list_orders(&shop).await?,
            OrdersAction::Show { id } => commands::account::show_order(&shop, id).await?,
        },
        Commands::Newsletter { email } => commands::marketing::newsletter(&shop, &email).await?,
        Commands::Contact {
            name,
            email,
            message,
        } => commands::marketing::contact(&shop, name, email, message).await?,
    }
    Ok(())
}

impl From<FilterArgs> for loopstore_storefront::api::ProductFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            category: args.category,
            size: args.size,
            condition: args.condition,
            min_price: args.min_price,
            max_price: args.max_price,
            page: args.page,
        }
    }
}

impl From<ShippingArgs> for loopstore_storefront::forms::ShippingDetails {
    fn from(args: ShippingArgs) -> Self {
        Self {
            first_name: args.first_name,
            last_name: args.last_name,
            email: args.email,
            phone: args.phone,
            address: args.address,
            city: args.city,
            postal_code: args.postal_code,
            country: args.country,
            notes: args.notes,
        }
    }
}
