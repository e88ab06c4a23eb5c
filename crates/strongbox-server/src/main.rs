// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Strongbox credential store server binary.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use strongbox_config::{LogFormat, LoggingConfig, ServerConfig};
use strongbox_crypto::{load_key, EncryptionKey, EncryptionService, DEFAULT_KEY_ID};
use strongbox_server::jobs::build_scheduler;
use strongbox_server::{create_app_state, create_router};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// Strongbox - encrypted shared credential store.
#[derive(Parser, Debug)]
#[command(name = "strongbox-server", about = "Strongbox credential store server", version)]
struct Args {
	/// Config file, in place of /etc/strongbox/server.toml
	#[arg(long, global = true, env = "STRONGBOX_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Show version information
	Version,
	/// Print a fresh base64 encryption key
	GenerateKey,
	/// Read a password from stdin and print its Argon2 hash for `directory.users`
	HashPassword,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	match args.command.unwrap_or(Command::Serve) {
		Command::Version => {
			println!("strongbox-server version: {}", env!("CARGO_PKG_VERSION"));
			Ok(())
		}
		Command::GenerateKey => {
			let key = EncryptionKey::generate(DEFAULT_KEY_ID);
			println!("{}", key.to_base64().as_str());
			Ok(())
		}
		Command::HashPassword => hash_password_from_stdin(),
		Command::Serve => serve(args.config).await,
	}
}

fn hash_password_from_stdin() -> Result<(), Box<dyn std::error::Error>> {
	let mut line = Zeroizing::new(String::new());
	std::io::stdin().lock().read_line(&mut line)?;
	let password = line.trim_end_matches(['\r', '\n']);
	if password.is_empty() {
		return Err("empty password".into());
	}
	println!("{}", strongbox_auth::hash_password(password)?);
	Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
	let registry = tracing_subscriber::registry().with(filter);
	match logging.format {
		LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
		LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
	}
}

/// A missing or malformed key starts the server in degraded mode: metadata
/// stays readable, secrets do not.
fn load_encryption(config: &ServerConfig) -> EncryptionService {
	let encryption = &config.encryption;
	match load_key(
		&encryption.key_env,
		encryption.key_file.as_deref(),
		encryption.key_id,
	) {
		Ok(key) => {
			tracing::info!(key_id = encryption.key_id, "encryption key loaded");
			EncryptionService::new(key)
		}
		Err(e) => {
			tracing::error!(
				error = %e,
				key_env = %encryption.key_env,
				"no usable encryption key, starting in degraded mode"
			);
			EncryptionService::unavailable(e.to_string())
		}
	}
}

async fn serve(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let config = match config_path {
		Some(path) => strongbox_config::load_config_with_file(path)?,
		None => strongbox_config::load_config()?,
	};
	init_tracing(&config.logging);

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting strongbox-server"
	);

	let crypto = load_encryption(&config);

	let pool = strongbox_db::create_pool(&config.database.url).await?;
	strongbox_db::run_migrations(&pool).await?;

	let mut state = create_app_state(pool, &config, crypto).await?;

	let scheduler = build_scheduler(&state, &config.jobs);
	let scheduler = Arc::new(scheduler);
	scheduler.start().await;
	state.scheduler = Some(scheduler.clone());

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	tracing::info!(%addr, "server listening");
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	scheduler.shutdown().await;
	tracing::info!("server shutdown complete");
	Ok(())
}
