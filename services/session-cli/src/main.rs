//! SPA session CLI
//!
//! Terminal host for the session layer:
//! 1. Loads configuration and opens the file-backed tab and durable stores
//! 2. Bootstraps the session (one `check_authentication_proceeding()` call)
//! 3. Runs a single command against it
//!
//! The login round trip spans two invocations: `login` prints the IdP URL,
//! and `callback <url>` finishes it with the URL the IdP redirected to.

mod config;
mod navigator;

use anyhow::{Context, Result, bail};
use reqwest::Method;
use session::{CoreConf, FetchOptions, FileStorage, Host, bootstrap};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::navigator::TerminalNavigator;

/// Command to run after bootstrap
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Status,
    Login,
    Callback(String),
    Logout,
    Call {
        path: String,
        method: Method,
        body: Option<String>,
    },
}

impl Command {
    /// Parse positional arguments (flags already removed).
    fn parse(args: &[String]) -> Result<Self> {
        let mut rest = args.iter().map(String::as_str);
        let command = match rest.next() {
            None | Some("status") => Command::Status,
            Some("login") => Command::Login,
            Some("logout") => Command::Logout,
            Some("callback") => match rest.next() {
                Some(url) => Command::Callback(url.to_string()),
                None => bail!("usage: spa-session callback <url>"),
            },
            Some("call") => {
                let Some(path) = rest.next() else {
                    bail!("usage: spa-session call <path> [--method M] [--data BODY]");
                };
                let mut method = Method::GET;
                let mut body = None;
                while let Some(flag) = rest.next() {
                    match (flag, rest.next()) {
                        ("--method", Some(m)) => {
                            method = Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                                .with_context(|| format!("invalid method {m}"))?;
                        }
                        ("--data", Some(d)) => body = Some(d.to_string()),
                        _ => bail!("unexpected argument {flag}"),
                    }
                }
                Command::Call {
                    path: path.to_string(),
                    method,
                    body,
                }
            }
            Some(other) => bail!("unknown command {other}"),
        };
        if !matches!(command, Command::Call { .. }) && rest.next().is_some() {
            bail!("too many arguments");
        }
        Ok(command)
    }
}

/// Split `--config <path>` from the remaining arguments.
fn split_config_flag(args: &[String]) -> (Option<&str>, Vec<String>) {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config = iter.next().map(String::as_str);
        } else {
            rest.push(arg.clone());
        }
    }
    (config, rest)
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cli_config_path, rest) = split_config_flag(&args);
    let command = Command::parse(&rest)?;

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    tokio::fs::create_dir_all(&config.storage.state_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create state dir {}",
                config.storage.state_dir.display()
            )
        })?;
    let session_storage = FileStorage::load(config.storage.session_file())
        .await
        .context("failed to open tab storage")?;
    let local_storage = FileStorage::load(config.storage.local_file())
        .await
        .context("failed to open durable storage")?;

    // The callback URL is where the IdP sent the tab back to
    let location = match &command {
        Command::Callback(url) => url.as_str(),
        _ => config.document_url(),
    };
    let location = oidc_idp::Url::parse(location)
        .with_context(|| format!("invalid document url {location}"))?;

    let host = Host {
        http: reqwest::Client::new(),
        navigator: Arc::new(TerminalNavigator::new(location)),
        session_storage: Arc::new(session_storage),
        local_storage: Arc::new(local_storage),
    };

    let (env, env_defaults) = config.env_source();
    let core = CoreConf {
        env,
        env_defaults,
        document_base: config.document_url().to_string(),
        session: config.session.clone(),
        listener: Some(Box::new(|| info!("session state changed"))),
    };
    let mut app = bootstrap(core, &host).await?;
    let session = app.session.as_mut();

    match command {
        Command::Status => match session.user() {
            Some(user) => println!(
                "signed in as {}{}",
                user.username(),
                user.email().map(|e| format!(" <{e}>")).unwrap_or_default()
            ),
            None => println!("anonymous"),
        },
        Command::Callback(_) => {
            if app.authentication_completed {
                println!("login completed");
            } else {
                println!("no login completed; run `spa-session login` to start one");
            }
        }
        Command::Login => session.authenticate().await?,
        Command::Logout => {
            if session.is_anonymous() {
                println!("not signed in");
            }
            session.logout().await?;
        }
        Command::Call { path, method, body } => {
            let mut options = FetchOptions::new().method(method);
            if let Some(body) = body {
                options = options.body(body);
            }
            let response = session.call_api(&path, options).await?;
            let status = response.status();
            let text = response
                .text()
                .await
                .context("failed to read response body")?;
            println!("{status}");
            println!("{text}");
        }
    }

    Ok(())
}
