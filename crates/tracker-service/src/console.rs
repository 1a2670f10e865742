//! Line-based control of a running session from stdin.

use std::io::BufRead;
use tokio::sync::mpsc;
use tracker_core::SessionHandle;
use tracker_types::StatusFilter;

const HELP: &str = "commands: filter <STATUS|ACTIVE>, reload, reconnect, help, quit";

/// A command typed at the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
	Filter(StatusFilter),
	Reload,
	Reconnect,
	Help,
	Quit,
}

impl ConsoleCommand {
	/// Parses one input line. Blank lines yield `None`.
	pub fn parse(line: &str) -> Option<Result<Self, String>> {
		let mut words = line.split_whitespace();
		let command = words.next()?;
		let argument = words.next();

		let parsed = match (command.to_ascii_lowercase().as_str(), argument) {
			("filter", Some(value)) => value.parse().map(ConsoleCommand::Filter),
			("filter", None) => Err("usage: filter <STATUS|ACTIVE>".to_string()),
			("reload", None) => Ok(ConsoleCommand::Reload),
			("reconnect", None) => Ok(ConsoleCommand::Reconnect),
			("help", _) => Ok(ConsoleCommand::Help),
			("quit" | "exit", None) => Ok(ConsoleCommand::Quit),
			_ => Err(format!("unknown command '{}'; {}", line.trim(), HELP)),
		};
		Some(parsed)
	}
}

/// Reads stdin lines on a dedicated thread.
///
/// A blocking stdin read cannot be cancelled, so it stays off the runtime;
/// the thread ends with the process.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
	let (sender, receiver) = mpsc::unbounded_channel();
	std::thread::spawn(move || {
		for line in std::io::stdin().lock().lines() {
			let Ok(line) = line else { break };
			if sender.send(line).is_err() {
				break;
			}
		}
	});
	receiver
}

/// Forwards console commands to the session until `quit` or end of input.
pub async fn run(mut lines: mpsc::UnboundedReceiver<String>, handle: SessionHandle) {
	while let Some(line) = lines.recv().await {
		let command = match ConsoleCommand::parse(&line) {
			None => continue,
			Some(Ok(command)) => command,
			Some(Err(message)) => {
				println!("{}", message);
				continue;
			},
		};

		let sent = match command {
			ConsoleCommand::Filter(filter) => handle.set_filter(filter).await,
			ConsoleCommand::Reload => handle.reload().await,
			ConsoleCommand::Reconnect => handle.reconnect().await,
			ConsoleCommand::Help => {
				println!("{}", HELP);
				Ok(())
			},
			ConsoleCommand::Quit => break,
		};

		if let Err(e) = sent {
			tracing::warn!(error = %e, "Session no longer accepts commands");
			break;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_types::OrderStatus;

	#[test]
	fn test_parse_filter() {
		assert_eq!(
			ConsoleCommand::parse("filter picked_up"),
			Some(Ok(ConsoleCommand::Filter(StatusFilter::Status(
				OrderStatus::new("picked_up")
			))))
		);
		assert_eq!(
			ConsoleCommand::parse("  FILTER active "),
			Some(Ok(ConsoleCommand::Filter(StatusFilter::Active)))
		);
	}

	#[test]
	fn test_parse_simple_commands() {
		assert_eq!(ConsoleCommand::parse("reload"), Some(Ok(ConsoleCommand::Reload)));
		assert_eq!(ConsoleCommand::parse("reconnect"), Some(Ok(ConsoleCommand::Reconnect)));
		assert_eq!(ConsoleCommand::parse("exit"), Some(Ok(ConsoleCommand::Quit)));
		assert_eq!(ConsoleCommand::parse("   "), None);
	}

	#[test]
	fn test_parse_errors() {
		assert!(matches!(ConsoleCommand::parse("filter"), Some(Err(_))));
		assert!(matches!(ConsoleCommand::parse("reload now"), Some(Err(_))));
		let Some(Err(message)) = ConsoleCommand::parse("dance") else {
			panic!("expected an error");
		};
		assert!(message.contains("unknown command 'dance'"));
	}

	#[tokio::test]
	async fn test_quit_stops_forwarding() {
		let (sender, lines) = mpsc::unbounded_channel();
		let config: tracker_config::Config = r#"
[stream]
primary = "websocket"
[stream.implementations.websocket]
url = "ws://localhost:8000/ws/orders"

[snapshot]
primary = "http"
[snapshot.implementations.http]
base_url = "http://localhost:8000"
"#
		.parse()
		.unwrap();
		let sync = crate::factory_registry::build_tracker_from_config(config).unwrap();
		let (handle, mut received) = sync.handle();

		sender.send("filter delivered".to_string()).unwrap();
		sender.send("bogus".to_string()).unwrap();
		sender.send("quit".to_string()).unwrap();
		sender.send("reload".to_string()).unwrap();

		run(lines, handle).await;

		assert_eq!(
			received.recv().await,
			Some(tracker_core::SessionCommand::SetFilter(StatusFilter::Status(
				OrderStatus::new("delivered")
			)))
		);
		assert!(received.try_recv().is_err());
	}
}
