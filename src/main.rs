//! AgriConnect command-line client
//!
//! Talks to the AgriConnect marketplace backend. The session survives
//! between invocations through the persisted refresh token.

use std::future::Future;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use agriconnect_client::auth::{Guarded, ViewScope};
use agriconnect_client::models::{
    Dashboard, FarmingUpdate, NewOrder, NewProduct, Order, OrderStatus, Product, SignupOutcome,
    SignupProfile, WeatherReport,
};
use agriconnect_client::routes::Route;
use agriconnect_client::{AppState, ClientResult, Config, SessionStatus};

#[derive(Parser, Debug)]
#[command(name = "agriconnect", about = "AgriConnect marketplace client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with username and password
    Login {
        username: String,
        #[arg(long, env = "AGRICONNECT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup(SignupArgs),
    /// Sign out and forget the stored session
    Logout,
    /// Show whether a session is active
    Status,
    /// Account overview
    Dashboard,
    #[command(subcommand)]
    Products(ProductsCommand),
    #[command(subcommand)]
    Orders(OrdersCommand),
    /// Farming news and tips
    Updates,
    #[command(subcommand)]
    Weather(WeatherCommand),
    /// Ask the farming assistant a question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct SignupArgs {
    username: String,
    #[arg(long, env = "AGRICONNECT_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    location: String,
    /// Register as a farmer
    #[arg(long)]
    farmer: bool,
    /// Register as a buyer
    #[arg(long)]
    buyer: bool,
}

#[derive(Subcommand, Debug)]
enum ProductsCommand {
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long, default_value = "kg")]
        unit: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum OrdersCommand {
    List,
    Show {
        id: i64,
    },
    Place {
        product_id: i64,
        quantity: f64,
    },
    SetStatus {
        id: i64,
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
}

#[derive(Subcommand, Debug)]
enum WeatherCommand {
    List,
    Fetch { location: String },
}

fn parse_status(s: &str) -> Result<OrderStatus, String> {
    OrderStatus::parse(s)
        .ok_or_else(|| format!("unknown status '{}' (pending, confirmed, completed, cancelled)", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(environment = %config.environment.as_str(), "Configuration loaded");

    let state = AppState::from_config(&config).context("Failed to initialize client")?;

    // Ctrl-C abandons whatever is in flight
    let scope = ViewScope::new();
    {
        let scope = scope.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                scope.cancel();
            }
        });
    }

    state.session.recover().await;

    run(cli.command, &state, &scope).await
}

async fn run(command: Command, state: &AppState, scope: &ViewScope) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            scope.run(state.session.login(&username, &password)).await?;
            println!("Logged in as {}", username);
        }
        Command::Signup(args) => {
            let profile = SignupProfile {
                username: args.username,
                password: args.password,
                email: args.email,
                phone: args.phone,
                location: args.location,
                is_farmer: args.farmer,
                is_buyer: args.buyer,
            };
            match scope.run(state.session.signup(&profile)).await? {
                SignupOutcome::Authenticated => {
                    println!("Account created, logged in as {}", profile.username)
                }
                SignupOutcome::Registered => println!(
                    "Account created. Run `agriconnect login {}` to sign in",
                    profile.username
                ),
            }
        }
        Command::Logout => {
            state.session.logout();
            println!("Logged out");
        }
        Command::Status => match state.session.status() {
            SessionStatus::Authenticated => println!("Signed in"),
            SessionStatus::Unauthenticated => println!("Signed out"),
            SessionStatus::Unknown => println!("Session not yet recovered"),
        },
        Command::Dashboard => {
            let dashboard = protected(state, scope, Route::Dashboard, move || {
                state.api.dashboard()
            })
            .await?;
            print_dashboard(&dashboard);
        }
        Command::Products(ProductsCommand::List) => {
            let products = protected(state, scope, Route::Products, move || {
                state.api.list_products()
            })
            .await?;
            products.iter().for_each(print_product);
        }
        Command::Products(ProductsCommand::Add {
            name,
            quantity,
            unit,
            price,
            description,
        }) => {
            let product = NewProduct {
                name,
                description,
                quantity,
                unit,
                price_per_unit: price,
            };
            let created = protected(state, scope, Route::Products, move || async move {
                state.api.create_product(&product).await
            })
            .await?;
            print_product(&created);
        }
        Command::Orders(OrdersCommand::List) => {
            let orders = protected(state, scope, Route::Orders, move || {
                state.api.list_orders()
            })
            .await?;
            orders.iter().for_each(print_order);
        }
        Command::Orders(OrdersCommand::Show { id }) => {
            let order = protected(state, scope, Route::Orders, move || {
                state.api.get_order(id)
            })
            .await?;
            print_order(&order);
        }
        Command::Orders(OrdersCommand::Place {
            product_id,
            quantity,
        }) => {
            let order = NewOrder {
                product_id,
                quantity,
            };
            let placed = protected(state, scope, Route::Orders, move || async move {
                state.api.place_order(&order).await
            })
            .await?;
            print_order(&placed);
        }
        Command::Orders(OrdersCommand::SetStatus { id, status }) => {
            let order = protected(state, scope, Route::Orders, move || {
                state.api.update_order_status(id, status)
            })
            .await?;
            print_order(&order);
        }
        Command::Updates => {
            let updates = protected(state, scope, Route::Updates, move || {
                state.api.list_updates()
            })
            .await?;
            updates.iter().for_each(print_update);
        }
        Command::Weather(WeatherCommand::List) => {
            let reports = protected(state, scope, Route::Weather, move || {
                state.api.list_weather_reports()
            })
            .await?;
            reports.iter().for_each(print_weather);
        }
        Command::Weather(WeatherCommand::Fetch { location }) => {
            let report = protected(state, scope, Route::Weather, move || async move {
                state.api.fetch_weather(&location).await
            })
            .await?;
            print_weather(&report);
        }
        Command::Ask { question } => {
            let question = question.join(" ");
            let answer = protected(state, scope, Route::AskAi, move || async move {
                state.api.ask_ai(&question).await
            })
            .await?;
            println!("{}", answer);
        }
    }

    Ok(())
}

/// Run a protected view's fetch behind the route guard
async fn protected<T, F, Fut>(
    state: &AppState,
    scope: &ViewScope,
    route: Route,
    view: F,
) -> anyhow::Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    debug_assert!(route.is_protected());
    tracing::debug!(route = %route.path(), "Opening view");

    match state
        .guard
        .protect(&state.session, move || scope.run(view()))
        .await?
    {
        Guarded::Rendered(value) => Ok(value),
        Guarded::Redirect(path) => bail!(
            "Login required ({}). Run `agriconnect login <username>` first",
            path
        ),
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("{} <{}>", dashboard.username, dashboard.email);
    if !dashboard.role_label().is_empty() {
        println!("Role:     {}", dashboard.role_label());
    }
    println!("Products: {}", dashboard.products_count);
    println!("Orders:   {}", dashboard.orders_count);
}

fn print_product(product: &Product) {
    println!(
        "#{:<5} {:<24} {:>10.2} {:<6} @ {:.2}/{}{}",
        product.id,
        product.name,
        product.quantity,
        product.unit,
        product.price_per_unit,
        product.unit,
        if product.available { "" } else { "  (unavailable)" }
    );
}

fn print_order(order: &Order) {
    println!(
        "#{:<5} {:<24} {:>10.2} {:<6} total {:>10.2}  {}  {}",
        order.id,
        order.product.name,
        order.quantity,
        order.product.unit,
        order.total_price,
        order.status.as_str(),
        order.created_at.format("%Y-%m-%d %H:%M")
    );
}

fn print_update(update: &FarmingUpdate) {
    println!(
        "[{}] {:?}: {}",
        update.published_at.format("%Y-%m-%d"),
        update.category,
        update.title
    );
    println!("    {}", update.content);
}

fn print_weather(report: &WeatherReport) {
    let date = report
        .report_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "today".to_string());
    println!(
        "{} ({}): {}, {:.1}°C, humidity {:.0}%, rainfall {:.1} mm",
        report.location,
        date,
        report.conditions,
        report.temperature,
        report.humidity,
        report.rainfall
    );
}
