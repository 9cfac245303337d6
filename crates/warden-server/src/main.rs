// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden admission server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_rbac_core::InMemoryPolicyStore;
use warden_server::{create_app_state, create_router, ServerConfig, ServerError};
use warden_server_config::{ConfigError, PolicySource};
use warden_server_k8s::{load_policy_file, read_policy_file, PolicySync};

/// Warden - RBAC admission server.
#[derive(Parser, Debug)]
#[command(name = "warden", about = "RBAC admission server", version)]
struct Args {
	/// Config file (defaults to /etc/warden/server.toml)
	#[arg(long, env = "WARDEN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Validate the configuration and policy file, then exit
	Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Load .env file if present, before clap reads WARDEN_SERVER_CONFIG
	dotenvy::dotenv().ok();

	let args = Args::parse();

	let config = match &args.config {
		Some(path) => warden_server_config::load_config_with_file(path)?,
		None => warden_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	if let Some(Command::Check) = args.command {
		check(&config)?;
		println!("configuration ok");
		return Ok(());
	}

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		policy_source = %config.policy.source,
		"starting warden"
	);

	let store = Arc::new(InMemoryPolicyStore::new());
	let shutdown = CancellationToken::new();

	let sync_task = match config.policy.source {
		PolicySource::File => {
			load_policy_file(&store, policy_file(&config)?)?;
			None
		}
		PolicySource::Kubernetes => {
			let sync = PolicySync::connect(store.clone()).await?;
			Some(tokio::spawn(sync.run(shutdown.clone())))
		}
	};

	let state = create_app_state(&config, store)?;
	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal(shutdown.clone()))
		.await?;

	shutdown.cancel();
	if let Some(task) = sync_task {
		if let Err(e) = task.await {
			tracing::error!(error = %e, "policy sync task failed");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}

/// Builds everything the server would build, without binding or watching.
fn check(config: &ServerConfig) -> Result<(), ServerError> {
	if config.policy.source == PolicySource::File {
		let policies = read_policy_file(policy_file(config)?)?;
		tracing::info!(
			roles = policies.roles.len(),
			cluster_roles = policies.cluster_roles.len(),
			role_bindings = policies.role_bindings.len(),
			cluster_role_bindings = policies.cluster_role_bindings.len(),
			"policy file ok"
		);
	}
	create_app_state(config, Arc::new(InMemoryPolicyStore::new()))?;
	Ok(())
}

fn policy_file(config: &ServerConfig) -> Result<&PathBuf, ServerError> {
	config.policy.file.as_ref().ok_or_else(|| {
		ConfigError::Validation("policy.file is required when policy.source is file".to_string())
			.into()
	})
}

/// Resolves on SIGINT, SIGTERM, or when `token` is cancelled, and cancels
/// `token` so background tasks stop with the server.
async fn shutdown_signal(token: CancellationToken) {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		use tokio::signal::unix::{signal, SignalKind};
		match signal(SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
		_ = token.cancelled() => {}
	}

	tracing::info!("Received shutdown signal");
	token.cancel();
}
