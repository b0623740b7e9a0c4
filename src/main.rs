use clap::{Args, Parser, Subcommand};
use price_tracker::app_state::AppState;
use price_tracker::configuration::get_configuration;
use price_tracker::create_app;
use price_tracker::data_models::ProductId;
use price_tracker::errors::Error;
use price_tracker::render;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "price-tracker", version, about = "Track product prices against your target")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign in
    Register(AuthArgs),
    /// Sign in with an existing account
    Login(AuthArgs),
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Fetch and show tracked products
    List,
    /// Track a product URL with a target price
    Add { url: String, target_price: String },
    /// Stop tracking a product
    Remove { id: ProductId },
}

#[derive(Args, Debug)]
struct AuthArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "TRACKER_PASSWORD", hide_env_values = true)]
    password: String,
}

impl Command {
    fn fallback_message(&self) -> &'static str {
        match self {
            Command::Register(_) => "Registration failed",
            Command::Login(_) => "Login failed",
            Command::Logout | Command::Whoami => "Session storage unavailable",
            Command::List => "Failed to fetch products",
            Command::Add { .. } => "Failed to add product",
            Command::Remove { .. } => "Failed to delete product",
        }
    }
}

fn init_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("price_tracker={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(app: &AppState, command: &Command) -> Result<(), Error> {
    let currency = &app.settings.currency_symbol;
    match command {
        Command::Register(args) => {
            let session = app
                .sessions
                .register(app.api.as_ref(), &args.email, &args.password)
                .await?;
            println!("Registered and signed in as {}", session.user.email);
        }
        Command::Login(args) => {
            let session = app
                .sessions
                .login(app.api.as_ref(), &args.email, &args.password)
                .await?;
            println!("Signed in as {}", session.user.email);
        }
        Command::Logout => {
            app.sessions.end()?;
            println!("Signed out");
        }
        Command::Whoami => {
            let session = app.sessions.require()?;
            println!("{}", session.user.email);
        }
        Command::List => {
            let store = app.store()?;
            let products = store.refresh().await?;
            print!("{}", render::dashboard(&store.session().user, &products, currency));
        }
        Command::Add { url, target_price } => {
            let store = app.store()?;
            store.refresh().await?;
            let products = store.add_and_refresh(url, target_price).await?;
            println!("Product added");
            print!("{}", render::dashboard(&store.session().user, &products, currency));
        }
        Command::Remove { id } => {
            let store = app.store()?;
            store.remove(*id).await?;
            println!("Product {id} removed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let configuration = get_configuration().expect("Failed to read configuration");
    init_tracing(&configuration.log_level);
    let app = create_app(configuration).expect("Failed to start price tracker");
    if let Err(err) = run(&app, &cli.command).await {
        tracing::debug!("command failed: {err:?}");
        eprintln!("{}", err.user_message(cli.command.fallback_message()));
        std::process::exit(1);
    }
}
