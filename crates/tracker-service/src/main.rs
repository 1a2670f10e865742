//! Main entry point for the order tracker.
//!
//! `watch` keeps a table of orders in sync with the server: it loads the
//! snapshot for the selected status filter, applies live updates as they
//! arrive and prints the table after every change. Filters are switched by
//! typing commands on stdin. `create` submits a single new order.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracker_config::Config;
use tracker_types::{CreateOrderRequest, SessionToken, StatusFilter};

mod console;
mod factory_registry;
mod view;

use factory_registry::build_tracker_from_config;

/// Command-line arguments for the order tracker.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// Session token; overrides the configured one
	#[arg(long, env = "ORDER_TRACKER_TOKEN", hide_env_values = true)]
	token: Option<String>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
	/// Follow the order table (default)
	Watch {
		/// Status filter to start with, or ACTIVE
		#[arg(short, long)]
		status: Option<StatusFilter>,
	},
	/// Submit a new order
	Create {
		#[arg(long)]
		order_id: String,
		#[arg(long)]
		product_name: String,
		#[arg(long)]
		customer_name: String,
		#[arg(long)]
		customer_contact: String,
		#[arg(long)]
		customer_address: String,
		/// Defaults to the configured session merchant
		#[arg(long)]
		merchant_name: Option<String>,
	},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started order tracker");

	let mut config = Config::from_file(&args.config).await?;
	tracing::info!(path = %args.config.display(), "Loaded configuration");

	if let Some(token) = args.token.and_then(|token| SessionToken::non_empty(token)) {
		config.session.token = Some(token);
	}

	match args.command.unwrap_or(Command::Watch { status: None }) {
		Command::Watch { status } => watch(config, status).await?,
		Command::Create {
			order_id,
			product_name,
			customer_name,
			customer_contact,
			customer_address,
			merchant_name,
		} => {
			let request = CreateOrderRequest {
				order_id,
				product_name,
				customer_name,
				customer_contact,
				customer_address,
				merchant_name,
			};
			create(config, request).await?
		},
	}

	tracing::info!("Stopped order tracker");
	Ok(())
}

/// Runs a session until `quit`, end of input or Ctrl-C.
async fn watch(
	mut config: Config,
	status: Option<StatusFilter>,
) -> Result<(), Box<dyn std::error::Error>> {
	if let Some(filter) = status {
		config.session.initial_filter = filter;
	}

	let sync = build_tracker_from_config(config)?;
	let (handle, commands) = sync.handle();

	let view = tokio::spawn(view::run(handle.subscribe()));
	let session = tokio::spawn(async move { sync.run(commands).await });
	let mut console = tokio::spawn(console::run(
		console::spawn_stdin_reader(),
		handle.clone(),
	));

	tokio::select! {
		_ = &mut console => {
			tracing::info!("Console closed");
		}
		result = tokio::signal::ctrl_c() => {
			result?;
			tracing::info!("Interrupted");
		}
	}

	console.abort();
	handle.shutdown().await.ok();
	session.await?;
	view.abort();

	Ok(())
}

/// Submits one order and reports the outcome.
async fn create(
	config: Config,
	request: CreateOrderRequest,
) -> Result<(), Box<dyn std::error::Error>> {
	let sync = build_tracker_from_config(config)?;
	let order_id = request.order_id.clone();

	match sync.create_order(request).await {
		Ok(()) => {
			println!("Order {} created", order_id);
			Ok(())
		},
		Err(e) => {
			tracing::error!(order_id = %order_id, error = %e, "Failed to create order");
			Err(e.into())
		},
	}
}
