use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;

use edge_gateway::config::{load_config, AuthConfig, TOKEN_SECRET_ENV};
use edge_gateway::http::X_CORRELATION_ID;
use edge_gateway::security::token::unix_now;
use edge_gateway::security::TokenCodec;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Token and smoke-test tool for the edge gateway", long_about = None)]
struct Cli {
    /// Gateway config to take the token secret and lifetime from.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Token secret; overrides the config file.
    #[arg(short, long, env = TOKEN_SECRET_ENV, hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue a signed bearer token
    Issue {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "USER")]
        role: String,
        /// Lifetime in seconds; defaults to the configured TTL
        #[arg(long)]
        ttl: Option<u64>,
        #[arg(long)]
        user_id: Option<i64>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Verify a token and print its claims
    Verify { token: String },
    /// Send a request through the gateway
    Call {
        url: String,
        #[arg(short, long)]
        token: Option<String>,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Issue {
            ref subject,
            ref role,
            ttl,
            user_id,
            ref email,
        } => {
            let codec = codec(&cli, ttl.map(Duration::from_secs))?;
            let mut claims = codec.claims_for(subject, role, unix_now());
            claims.user_id = user_id;
            claims.email = email.clone();
            println!("{}", codec.sign(&claims)?);
        }
        Commands::Verify { ref token } => {
            let claims = codec(&cli, None)?.verify(token, unix_now())?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Commands::Call {
            ref url,
            ref token,
            ref method,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let mut request = reqwest::Client::new().request(method, url);
            if let Some(token) = token {
                request = request.header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
            }

            let res = request.send().await?;
            println!("{}", res.status());
            if let Some(id) = res.headers().get(X_CORRELATION_ID.as_str()) {
                println!("{}: {}", X_CORRELATION_ID, id.to_str().unwrap_or("<binary>"));
            }
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

fn secret(cli: &Cli) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(secret) = &cli.secret {
        return Ok(secret.clone());
    }
    match &cli.config {
        Some(path) => Ok(load_config(path)?.auth.token_secret),
        None => Err(format!("no secret: pass --secret, set {} or use --config", TOKEN_SECRET_ENV).into()),
    }
}

fn codec(cli: &Cli, ttl: Option<Duration>) -> Result<TokenCodec, Box<dyn std::error::Error>> {
    let ttl = match (ttl, &cli.config) {
        (Some(ttl), _) => ttl,
        (None, Some(path)) => Duration::from_secs(load_config(path)?.auth.token_ttl_secs),
        (None, None) => Duration::from_secs(AuthConfig::default().token_ttl_secs),
    };
    Ok(TokenCodec::new(secret(cli)?.as_bytes(), ttl))
}
