use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use stockroom::config::{ApiConfig, ConfigError, DEFAULT_BASE_URL};
use stockroom::net::api::{ApiError, ProductsApi, UsersApi, ensure_ok};
use stockroom::net::auth::AuthClient;
use stockroom::net::http::{HttpResponse, TransportError};
use stockroom::net::native::ReqwestTransport;
use stockroom::net::types::{Credentials, ProductDraft, ProductTier};
use stockroom::pages::login::{LoginError, LoginFlow, validate_login_form};
use stockroom::pages::products::{SaveError, save_product};
use stockroom::state::session::SessionStore;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("missing credentials; pass --username and --password or set STOCKROOM_* vars")]
    MissingCredentials,
    #[error("login failed: {0}")]
    Login(#[from] LoginError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid product: {0}")]
    InvalidProduct(String),
    #[error("{what} `{id}` not found")]
    NotFound { what: &'static str, id: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<SaveError> for CliError {
    fn from(err: SaveError) -> Self {
        match err {
            SaveError::Invalid(fields) => {
                let joined = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.field, f.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                Self::InvalidProduct(joined)
            }
            SaveError::Api(e) => Self::Api(e),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "stockroom", about = "Inventory admin API CLI")]
struct Cli {
    #[arg(long, env = "STOCKROOM_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "STOCKROOM_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "STOCKROOM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print the session's user profile.
    Login,
    Products(ProductsCommand),
    Users(UsersCommand),
}

#[derive(Args, Debug)]
struct ProductsCommand {
    #[command(subcommand)]
    command: ProductsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProductsSubcommand {
    List,
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_tier)]
        tier: ProductTier,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        stock: u32,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = parse_tier)]
        tier: Option<ProductTier>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        stock: Option<u32>,
    },
    Delete {
        id: String,
    },
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List,
    Get { id: String },
    Delete { id: String },
}

impl Command {
    fn needs_login(&self) -> bool {
        match self {
            Self::Login => true,
            Self::Products(p) => !matches!(
                p.command,
                ProductsSubcommand::List | ProductsSubcommand::Get { .. }
            ),
            Self::Users(u) => matches!(u.command, UsersSubcommand::Delete { .. }),
        }
    }
}

fn parse_tier(raw: &str) -> Result<ProductTier, String> {
    ProductTier::parse(raw).ok_or_else(|| {
        let labels: Vec<&str> = ProductTier::ALL.iter().map(|t| t.label()).collect();
        format!(
            "unknown tier `{raw}`; expected one of {}",
            labels.join(", ")
        )
    })
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ApiConfig::from_base_url(&cli.base_url)?
        .with_env_overrides()?;
    let transport = ReqwestTransport::new(config.timeouts)?;
    let store = SessionStore::in_memory();
    let auth = AuthClient::new(transport, store, config.auth_endpoints());

    if cli.command.needs_login() {
        let username = cli.username.as_deref();
        let password = cli.password.as_deref();
        let (Some(username), Some(password)) = (username, password) else {
            return Err(CliError::MissingCredentials);
        };
        validate_login_form(username, password)?;
        let credentials = Credentials::username(username, password);
        let session = LoginFlow::new(&auth).submit(&credentials).await?;
        if matches!(cli.command, Command::Login) {
            print_json(&session.user)?;
        }
    }

    let result = match cli.command {
        Command::Login => Ok(()),
        Command::Products(products) => run_products(&auth, &config, products).await,
        Command::Users(users) => run_users(&auth, &config, users).await,
    };
    auth.logout();
    result
}

async fn run_products(
    auth: &AuthClient<ReqwestTransport>,
    config: &ApiConfig,
    products: ProductsCommand,
) -> Result<(), CliError> {
    let api = ProductsApi::new(auth, &config.products_url);
    match products.command {
        ProductsSubcommand::List => print_json(&api.list().await),
        ProductsSubcommand::Get { id } => {
            let product = api.get(&id).await?.ok_or(CliError::NotFound {
                what: "product",
                id,
            })?;
            print_json(&product)
        }
        ProductsSubcommand::Create {
            name,
            tier,
            price,
            stock,
        } => {
            let draft = ProductDraft {
                name,
                tier,
                price,
                stock,
            };
            let response = save_product(&api, None, draft).await?;
            print_response(&response)
        }
        ProductsSubcommand::Update {
            id,
            name,
            tier,
            price,
            stock,
        } => {
            let current = api.get(&id).await?.ok_or_else(|| CliError::NotFound {
                what: "product",
                id: id.clone(),
            })?;
            let draft = ProductDraft {
                name: name.unwrap_or(current.name),
                tier: tier.unwrap_or(current.tier),
                price: price.unwrap_or(current.price),
                stock: stock.unwrap_or(current.stock),
            };
            let response = save_product(&api, Some(&id), draft).await?;
            print_response(&response)
        }
        ProductsSubcommand::Delete { id } => {
            let response = api.delete(&id).await?;
            print_response(&response)
        }
    }
}

async fn run_users(
    auth: &AuthClient<ReqwestTransport>,
    config: &ApiConfig,
    users: UsersCommand,
) -> Result<(), CliError> {
    let api = UsersApi::new(auth, &config.users_url);
    match users.command {
        UsersSubcommand::List => print_json(&api.list().await),
        UsersSubcommand::Get { id } => {
            let user = api
                .get(&id)
                .await?
                .ok_or(CliError::NotFound { what: "user", id })?;
            print_json(&user)
        }
        UsersSubcommand::Delete { id } => {
            let response = api.delete(&id).await?;
            print_response(&response)
        }
    }
}

/// Print a mutation's body, failing on non-2xx.
fn print_response(response: &HttpResponse) -> Result<(), CliError> {
    ensure_ok(response)?;
    if response.body.trim().is_empty() {
        println!("ok");
        return Ok(());
    }
    print_json(&response.json::<Value>()?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
