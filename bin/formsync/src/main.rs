//! formsync command line front end.
//!
//! Runs the whole stack in one process: a [`DocumentHost`] backend, the
//! notification hub, and a [`SyncEngine`] acting as the display side.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use formsync_config::Config;
use formsync_engine::{RequestOutcome, SyncEngine};
use formsync_host::{DocumentHost, JsonDocumentEngine, QueuedPicker};
use tokio::sync::watch;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info};

/// How long to wait for the backend to announce a change.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);
/// Quiet period after which a notification burst is considered handled.
const SETTLE_QUIET: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "formsync")]
#[command(about = "Inspect and fill document forms")]
struct Args {
	/// Configuration file
	#[arg(short, long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the form of a document
	Show {
		/// Document to open
		file: PathBuf,
		/// Also print the preview as a data URL
		#[arg(long)]
		data_url: bool,
	},
	/// Fill fields and print the resulting form
	Fill {
		/// Document to open
		file: PathBuf,
		/// Field assignment, addressed by id or name
		#[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
		assignments: Vec<(String, String)>,
		/// Where to write the filled document
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},
	/// Fill every field with its own name
	AutoFill {
		/// Document to open
		file: PathBuf,
		/// Where to write the filled document
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},
}

impl Command {
	fn file(&self) -> &Path {
		match self {
			Self::Show { file, .. } | Self::Fill { file, .. } | Self::AutoFill { file, .. } => file,
		}
	}
}

fn parse_assignment(arg: &str) -> Result<(String, String), String> {
	match arg.split_once('=') {
		Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
		_ => Err(format!("expected KEY=VALUE, got `{arg}`")),
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => Config::load_or_default(path).with_context(|| format!("loading {}", path.display()))?,
		None => Config::default(),
	};
	setup_tracing(&config, args.verbose);

	let (notifier, mut hub) = formsync_notify::channel();
	let picker = Arc::new(QueuedPicker::new([args.command.file().to_path_buf()]));
	let host = DocumentHost::new(&config, picker, Arc::new(JsonDocumentEngine), notifier);
	let engine = SyncEngine::new(Arc::new(host));
	engine.attach(&mut hub)?;
	hub.spawn();

	let mut changes = engine.changes();
	info!(file = %args.command.file().display(), "formsync.open");
	if engine.open_file().await != RequestOutcome::Sent {
		bail!("could not open {}", args.command.file().display());
	}
	wait_for_change(&mut changes).await?;
	settle(&mut changes).await;
	if engine.form().is_none() {
		bail!("{} has no form", args.command.file().display());
	}

	match &args.command {
		Command::Show { data_url, .. } => {
			if *data_url {
				let preview = engine.preview().context("no preview loaded")?;
				println!("{}", preview.data_url());
			}
		}
		Command::Fill {
			assignments, output, ..
		} => {
			for (key, value) in assignments {
				engine
					.edit_field(key, value.as_str())
					.with_context(|| format!("setting {key}"))?;
			}
			commit(&engine, &mut changes).await?;
			write_output(&engine, output.as_deref())?;
		}
		Command::AutoFill { output, .. } => {
			if engine.auto_fill_and_commit().await != RequestOutcome::Sent {
				bail!("auto-fill failed");
			}
			wait_for_change(&mut changes).await?;
			settle(&mut changes).await;
			write_output(&engine, output.as_deref())?;
		}
	}

	let form = engine.form().context("form disappeared")?;
	print!("{form}");
	Ok(())
}

async fn commit(engine: &SyncEngine, changes: &mut watch::Receiver<u64>) -> anyhow::Result<()> {
	match engine.commit_form().await {
		RequestOutcome::Sent => {}
		RequestOutcome::Skipped => bail!("nothing to commit"),
		RequestOutcome::Failed => bail!("commit failed"),
	}
	wait_for_change(changes).await?;
	settle(changes).await;
	Ok(())
}

fn write_output(engine: &SyncEngine, output: Option<&Path>) -> anyhow::Result<()> {
	let Some(output) = output else {
		return Ok(());
	};
	let preview = engine.preview().context("no preview loaded")?;
	if preview.is_empty() {
		bail!("preview is empty");
	}
	let bytes = preview.decode()?;
	std::fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
	info!(path = %output.display(), bytes = bytes.len(), "formsync.output_written");
	Ok(())
}

async fn wait_for_change(changes: &mut watch::Receiver<u64>) -> anyhow::Result<()> {
	timeout(RESPONSE_TIMEOUT, changes.changed())
		.await
		.context("backend did not respond")??;
	Ok(())
}

/// Waits until no change has been observed for [`SETTLE_QUIET`].
async fn settle(changes: &mut watch::Receiver<u64>) {
	let deadline = Instant::now() + RESPONSE_TIMEOUT;
	loop {
		let quiet = (Instant::now() + SETTLE_QUIET).min(deadline);
		match timeout_at(quiet, changes.changed()).await {
			Ok(Ok(())) if Instant::now() < deadline => continue,
			_ => break,
		}
	}
	debug!(revision = *changes.borrow(), "formsync.settled");
}

fn setup_tracing(config: &Config, verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("debug")
		} else {
			EnvFilter::new(&config.log.level)
		}
	});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn cli_is_well_formed() {
		Args::command().debug_assert();
	}

	#[test]
	fn assignments_split_on_first_equals() {
		assert_eq!(parse_assignment("name=a=b"), Ok(("name".to_string(), "a=b".to_string())));
		assert_eq!(parse_assignment("empty="), Ok(("empty".to_string(), String::new())));
		assert!(parse_assignment("novalue").is_err());
		assert!(parse_assignment("=x").is_err());
	}

	#[test]
	fn fill_collects_repeated_sets() {
		let args = Args::try_parse_from(["formsync", "fill", "doc.json", "--set", "a=1", "-s", "b=2", "-o", "out.json"]).unwrap();
		match args.command {
			Command::Fill { file, assignments, output } => {
				assert_eq!(file, PathBuf::from("doc.json"));
				assert_eq!(assignments, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
				assert_eq!(output, Some(PathBuf::from("out.json")));
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn show_takes_data_url_flag() {
		let args = Args::try_parse_from(["formsync", "show", "doc.json", "--data-url"]).unwrap();
		assert!(matches!(args.command, Command::Show { data_url: true, .. }));
	}

	#[test]
	fn global_flags_after_subcommand() {
		let args = Args::try_parse_from(["formsync", "show", "doc.json", "--verbose", "--config", "c.toml"]).unwrap();
		assert!(args.verbose);
		assert_eq!(args.config, Some(PathBuf::from("c.toml")));
		assert_eq!(args.command.file(), Path::new("doc.json"));
	}
}
