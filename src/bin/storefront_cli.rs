use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use storefront_checkout::{
    config::{self, CheckoutConfig},
    logging,
    models::{CardFields, CartItem, InMemoryCart, LoginCredentials, Product, ShippingInfo},
    services::{
        api_client::ApiClient,
        auth::AuthSession,
        catalog::ProductServiceClient,
        signature::IntegritySigner,
        tokenizer::HttpCardTokenizer,
        CheckoutOrchestrator, CheckoutOutcome, Navigator,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;

    match cli.command {
        Commands::Products(command) => handle_products_command(&context, command, cli.json).await?,
        Commands::Auth(command) => handle_auth_command(&context, command, cli.json).await?,
        Commands::Sign(args) => handle_sign(&context, args)?,
        Commands::Checkout(args) => handle_checkout(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "storefront-cli", about = "Storefront catalog and checkout tooling")]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Products(ProductsCommands),
    #[command(subcommand)]
    Auth(AuthCommands),
    /// Compute the integrity signature for a transaction
    Sign(SignArgs),
    /// Run a full checkout for a cart file
    Checkout(CheckoutArgs),
}

#[derive(Subcommand)]
enum ProductsCommands {
    List,
    Get(ProductGetArgs),
}

#[derive(Args)]
struct ProductGetArgs {
    #[arg(help = "Product identifier")]
    id: String,
}

#[derive(Subcommand)]
enum AuthCommands {
    Login(AuthLoginArgs),
    Profile,
    Logout,
}

#[derive(Args)]
struct AuthLoginArgs {
    #[arg(long, help = "Email address for the account")]
    email: String,
    #[arg(long, help = "Password for the account")]
    password: String,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Persist the session token for later commands"
    )]
    save: bool,
}

#[derive(Args)]
struct SignArgs {
    #[arg(long)]
    reference: String,
    #[arg(long, help = "Amount in cents")]
    amount_in_cents: i64,
    #[arg(long, default_value = "COP")]
    currency: String,
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(long, help = "JSON file with the cart items")]
    cart: PathBuf,
    #[arg(long, help = "JSON file with the shipping form")]
    shipping: PathBuf,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Fill blank shipping fields from the signed-in profile"
    )]
    prefill: bool,
    #[arg(
        long,
        help = "JSON file with the card fields, or - to read them from stdin"
    )]
    card: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    email: String,
    token: String,
    saved_at: DateTime<Utc>,
}

struct CliContext {
    config: CheckoutConfig,
    api: ApiClient,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load checkout config")?;
        logging::init_tracing(&config.log_level, config.log_json);

        let api = ApiClient::new(config.api_base_url.clone(), config.http_timeout())
            .context("failed to build API client")?;

        Ok(Self { config, api })
    }

    fn catalog(&self) -> Result<ProductServiceClient> {
        let api = ApiClient::new(self.config.catalog_base_url(), self.config.http_timeout())
            .context("failed to build catalog client")?;
        Ok(ProductServiceClient::new(api))
    }

    fn auth_session(&self) -> Result<AuthSession> {
        Ok(match read_session()? {
            Some((_, session)) => AuthSession::with_token(self.api.clone(), session.token),
            None => AuthSession::new(self.api.clone()),
        })
    }
}

/// Prints the destination instead of opening a browser
struct StdoutNavigator;

#[async_trait]
impl Navigator for StdoutNavigator {
    async fn redirect(&self, url: &str) {
        println!("Continue payment at: {}", url);
    }

    async fn redirect_to_login(&self, return_to: &str) {
        println!(
            "Sign in with `storefront-cli auth login --save`, then retry (return to {})",
            return_to
        );
    }
}

async fn handle_products_command(
    context: &CliContext,
    command: ProductsCommands,
    json: bool,
) -> Result<()> {
    let catalog = context.catalog()?;
    match command {
        ProductsCommands::List => {
            let products = catalog
                .get_products()
                .await
                .context("failed to list products")?;
            if json {
                print_json(&products)?;
            } else {
                products.iter().for_each(render_product);
            }
        }
        ProductsCommands::Get(args) => {
            let product = catalog
                .get_product(&args.id)
                .await
                .with_context(|| format!("failed to fetch product {}", args.id))?;
            if json {
                print_json(&product)?;
            } else {
                render_product(&product);
            }
        }
    }
    Ok(())
}

async fn handle_auth_command(context: &CliContext, command: AuthCommands, json: bool) -> Result<()> {
    match command {
        AuthCommands::Login(args) => {
            let auth = AuthSession::new(context.api.clone());
            let user = auth
                .login(&LoginCredentials {
                    email: args.email.clone(),
                    password: args.password,
                })
                .await
                .context("failed to sign in")?;

            let token = auth
                .token()
                .await
                .ok_or_else(|| anyhow!("login returned no session token"))?;
            let saved_path = persist_session(args.save, &args.email, &token)?;

            if json {
                print_json(&user)?;
            } else {
                println!(
                    "Signed in as {}{}",
                    user.email.as_deref().unwrap_or(&args.email),
                    if user.is_admin() { " (admin)" } else { "" }
                );
                if let Some(path) = saved_path {
                    println!("Session saved to {}", path);
                }
            }
        }
        AuthCommands::Profile => {
            let auth = context.auth_session()?;
            match auth.check_auth().await {
                Ok(Some(profile)) if json => print_json(&profile)?,
                Ok(Some(profile)) => println!(
                    "{} <{}>",
                    profile.name.as_deref().unwrap_or("-"),
                    profile.email.as_deref().unwrap_or("-")
                ),
                Ok(None) => println!("Not signed in"),
                Err(err) => {
                    if let Some((path, _)) = read_session()? {
                        clear_session_file(&path)?;
                    }
                    return Err(anyhow!(err).context("stored session is no longer valid"));
                }
            }
        }
        AuthCommands::Logout => {
            if let Some((path, _)) = read_session()? {
                clear_session_file(&path)?;
            }
            println!("Signed out");
        }
    }
    Ok(())
}

fn handle_sign(context: &CliContext, args: SignArgs) -> Result<()> {
    let signer = IntegritySigner::new(context.config.integrity_secret.clone())
        .context("integrity secret is not usable")?;
    println!(
        "{}",
        signer.sign(&args.reference, args.amount_in_cents, &args.currency)
    );
    Ok(())
}

async fn handle_checkout(context: &CliContext, args: CheckoutArgs, json: bool) -> Result<()> {
    let items: Vec<CartItem> = read_json(&args.cart)?;
    let shipping: ShippingInfo = read_json(&args.shipping)?;
    let card = read_card(&args.card)?;

    let auth = Arc::new(context.auth_session()?);
    let tokenizer = Arc::new(HttpCardTokenizer::new(
        context.config.processor_base_url.clone(),
        context.config.processor_public_key.clone(),
        context.config.http_timeout(),
    ));

    let checkout = CheckoutOrchestrator::from_config(
        &context.config,
        Arc::new(InMemoryCart::with_items(items)),
        auth.clone(),
        Arc::new(StdoutNavigator),
        tokenizer,
    )
    .context("failed to set up checkout")?;

    if args.prefill {
        if let Some(profile) = auth.check_auth().await.context("failed to load profile")? {
            checkout.session().prefill_from_profile(&profile).await;
            checkout
                .session()
                .update_shipping(|form| fill_blanks(form, &shipping))
                .await;
        } else {
            checkout.session().set_shipping(shipping).await;
        }
    } else {
        checkout.session().set_shipping(shipping).await;
    }

    if let Err(err) = checkout.initialize().await {
        return Err(anyhow!(err.user_message()));
    }
    if let Some(terms) = checkout.session().acceptance_permalink() {
        println!("By paying you accept the processor terms: {}", terms);
    }

    let totals = checkout.totals().await;
    println!(
        "Subtotal {} • shipping {} • total {} {}",
        totals.subtotal, totals.shipping, totals.total, context.config.currency
    );

    match checkout.submit(card).await {
        Ok(CheckoutOutcome::Redirected {
            order_id,
            reference,
            redirect_url,
        }) => {
            if json {
                print_json(&serde_json::json!({
                    "orderId": order_id,
                    "reference": reference,
                    "redirectUrl": redirect_url,
                }))?;
            } else {
                println!("Order {} • reference {}", order_id, reference);
            }
            Ok(())
        }
        Ok(CheckoutOutcome::LoginRequired) => Err(anyhow!("sign in required")),
        Err(err) => Err(anyhow!(err.user_message())),
    }
}

/// Keeps profile values and falls back to the file for anything still blank
fn fill_blanks(form: &mut ShippingInfo, file: &ShippingInfo) {
    for (target, fallback) in [
        (&mut form.name, &file.name),
        (&mut form.email, &file.email),
        (&mut form.address, &file.address),
        (&mut form.city, &file.city),
        (&mut form.state, &file.state),
        (&mut form.phone, &file.phone),
        (&mut form.postal_code, &file.postal_code),
        (&mut form.legal_id, &file.legal_id),
    ] {
        if target.trim().is_empty() {
            *target = fallback.clone();
        }
    }
}

fn render_product(product: &Product) {
    println!(
        "- {} • {} • {}{}",
        product.id,
        product.name,
        product.price,
        if product.in_stock() { "" } else { " • out of stock" }
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

/// Card data stays out of argv and shell history
fn read_card(path: &Path) -> Result<CardFields> {
    if path == Path::new("-") {
        let mut data = String::new();
        io::stdin()
            .read_to_string(&mut data)
            .context("failed to read card fields from stdin")?;
        return serde_json::from_str(&data).context("failed to parse card fields from stdin");
    }
    read_json(path)
}

fn session_file_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("STOREFRONT_CLI_HOME") {
        let mut path = PathBuf::from(dir);
        if path.extension().is_none() {
            path.push("session.json");
        }
        return Some(path);
    }

    std::env::var("HOME").ok().map(|home| {
        let mut path = PathBuf::from(home);
        path.push(".storefront");
        path.push("session.json");
        path
    })
}

fn persist_session(save: bool, email: &str, token: &str) -> Result<Option<String>> {
    if !save {
        return Ok(None);
    }

    let Some(path) = session_file_path() else {
        eprintln!("Skipping session persistence: no suitable directory found.");
        return Ok(None);
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }
    let session = StoredSession {
        email: email.to_string(),
        token: token.to_string(),
        saved_at: Utc::now(),
    };
    fs::write(&path, serde_json::to_vec_pretty(&session)?)
        .with_context(|| format!("failed writing {}", path.display()))?;
    Ok(Some(path.display().to_string()))
}

fn read_session() -> Result<Option<(PathBuf, StoredSession)>> {
    let path = match session_file_path() {
        Some(path) => path,
        None => return Ok(None),
    };

    if !path.exists() {
        return Ok(None);
    }

    let session: StoredSession = read_json(&path)?;
    Ok(Some((path, session)))
}

fn clear_session_file(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}
