use clap::{Parser, Subcommand};
use ledger_sync_client::{
	ActionOutcome, LedgerServiceClient, SyncConfig, SyncController,
	config::DEFAULT_BASE_URL,
	sync::{EventDispatcher, LoggingEventHandler},
	utils::format_block_line,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "ledger-sync", about = "Drive a remote ledger service from the terminal")]
struct Cli {
	/// Root URL of the ledger service
	#[arg(long, env = "LEDGER_SERVICE_URL", default_value = DEFAULT_BASE_URL)]
	url: String,

	/// Seconds between background pending-pool refreshes
	#[arg(long, default_value_t = 5)]
	poll_secs: u64,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show connectivity, stats, the chain and the pending pool
	Status,
	/// Submit an entry to the pending pool
	Add { data: String },
	/// Seal the pending pool into a new block
	Mine,
	/// Search sealed entries
	Search { query: String },
	/// Ask the service to verify its chain
	Validate,
	/// Print the state every time it changes, until Ctrl-C
	Watch,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	let cli = Cli::parse();

	let config = SyncConfig::default()
		.with_base_url(cli.url)
		.with_poll_interval(Duration::from_secs(cli.poll_secs.max(1)));

	let client = match LedgerServiceClient::new(&config.base_url) {
		Ok(client) => client,
		Err(e) => {
			error!("Failed to create service client: {}", e);
			return ExitCode::FAILURE;
		}
	};
	info!("Using ledger service at {}", client.base_url());

	let events = EventDispatcher::new().with_handler(Box::new(LoggingEventHandler));
	let controller = SyncController::start(client, config, events).await;

	let ok = run(&controller, cli.command).await;
	controller.shutdown().await;

	if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

async fn run(controller: &SyncController<LedgerServiceClient>, command: Command) -> bool {
	match command {
		Command::Status => {
			print_status(controller);
			controller.is_connected()
		}
		Command::Add { data } => print_outcome(controller.add_transaction(&data).await),
		Command::Mine => {
			let ok = print_outcome(controller.mine().await);
			print_status(controller);
			ok
		}
		Command::Search { query } => match controller.search(&query).await {
			Ok(results) if results.is_empty() => {
				println!("no matches for {:?}", query);
				true
			}
			Ok(results) => {
				for hit in results {
					println!("block #{:<4} {}", hit.block_index, hit.transaction);
				}
				true
			}
			Err(e) => {
				println!("⚠ {}", e);
				false
			}
		},
		Command::Validate => match controller.validate().await {
			Ok(report) => {
				let verdict = if report.valid { "valid" } else { "INVALID" };
				match report.message {
					Some(message) => println!("chain is {}: {}", verdict, message),
					None => println!("chain is {}", verdict),
				}
				report.valid
			}
			Err(e) => {
				println!("⚠ {}", e);
				false
			}
		},
		Command::Watch => {
			let mut updates = controller.subscribe();
			let ctrl_c = tokio::signal::ctrl_c();
			tokio::pin!(ctrl_c);
			print_status(controller);
			loop {
				tokio::select! {
					changed = updates.changed() => {
						if changed.is_err() {
							break;
						}
						print_status(controller);
					}
					_ = &mut ctrl_c => break,
				}
			}
			true
		}
	}
}

fn print_outcome(outcome: ActionOutcome) -> bool {
	if outcome.success {
		println!("✓ {}", outcome.message);
	} else {
		println!("⚠ {}", outcome.message);
	}
	outcome.success
}

fn print_status(controller: &SyncController<LedgerServiceClient>) {
	let state = controller.snapshot();
	let stats = controller.stats();

	if !state.connected {
		println!("!! cannot reach {} (showing last known chain)", controller.config().base_url);
	}
	println!(
		"blocks={} transactions={} difficulty={} pending={}{}{}",
		stats.blocks,
		stats.transactions,
		stats.difficulty,
		stats.pending,
		if state.submitting { " [submitting]" } else { "" },
		if state.sealing { " [sealing]" } else { "" },
	);
	for block in state.chain.iter().rev() {
		println!("  {}", format_block_line(block));
	}
	for entry in &state.pending {
		println!("  pending: {}", entry);
	}
}
