//! mqctl - POSIX message queue control utility
//!
//! Creates, inspects and removes queues, sends and receives messages, and
//! watches queues for notifications.

mod config;
mod pingpong;
mod watch;

use crate::config::{parse_signal, CourierConfig};
use crate::pingpong::PingPong;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libnyx_mq::{Deadline, Message, MessageQueue, OpenOptions, QueueAttributes};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// POSIX message queue control utility
#[derive(Parser)]
#[command(name = "mqctl", version, about = "Manage POSIX message queues")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(
        short,
        long,
        env = "COURIER_CONFIG",
        default_value = "/etc/nyx/courier.toml"
    )]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a queue
    Create {
        /// Queue name (e.g., /jobs)
        name: String,

        /// Maximum queued messages
        #[arg(long)]
        max_messages: Option<i64>,

        /// Maximum message size in bytes
        #[arg(long)]
        message_size: Option<i64>,

        /// Permission bits, octal (e.g., 0640)
        #[arg(long, value_parser = parse_mode)]
        mode: Option<u32>,

        /// Fail if the queue already exists
        #[arg(long)]
        exclusive: bool,
    },

    /// Remove a queue
    Unlink {
        name: String,
    },

    /// Send one message
    Send {
        name: String,

        /// Message body
        message: String,

        /// Message priority
        #[arg(short, long, default_value_t = 0)]
        priority: u32,

        /// Give up after this many milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Fail instead of waiting when the queue is full
        #[arg(long)]
        nonblock: bool,
    },

    /// Receive messages
    Recv {
        name: String,

        /// Give up after this many milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Fail instead of waiting when the queue is empty
        #[arg(long)]
        nonblock: bool,

        /// Number of messages to receive
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Show queue attributes
    Info {
        name: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print messages as they arrive, using signal notification
    Watch {
        name: String,

        /// Notification signal (defaults to the configured one)
        #[arg(short, long)]
        signal: Option<String>,

        /// Stop after the first batch of messages
        #[arg(long)]
        once: bool,
    },

    /// Run the request/response demo
    Pingpong {
        /// Number of round trips
        #[arg(short, long, default_value_t = 10)]
        rounds: u32,

        /// Queue name prefix
        #[arg(long, default_value = "posix_mq_example")]
        prefix: String,

        /// Pause between rounds in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode '{}': {}", s, e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CourierConfig::load(&cli.config)?;

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else {
        config.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    debug!("mqctl v{} using {:?}", VERSION, cli.config);

    match cli.command {
        Commands::Create {
            name,
            max_messages,
            message_size,
            mode,
            exclusive,
        } => {
            let attributes = QueueAttributes::new(
                max_messages.unwrap_or(config.queue.max_messages),
                message_size.unwrap_or(config.queue.max_message_size),
            );
            let queue = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .create_new(exclusive)
                .mode(mode.unwrap_or(config.queue.mode))
                .attributes(attributes)
                .open(&name)
                .with_context(|| format!("Failed to create {}", name))?;

            let info = queue.attributes()?;
            info!(
                "Created {} (max {} messages of {} bytes)",
                name, info.max_messages, info.max_message_size
            );
        }

        Commands::Unlink { name } => {
            libnyx_mq::unlink(&name).with_context(|| format!("Failed to unlink {}", name))?;
            info!("Unlinked {}", name);
        }

        Commands::Send {
            name,
            message,
            priority,
            timeout_ms,
            nonblock,
        } => {
            let queue = OpenOptions::new()
                .write(true)
                .nonblocking(nonblock)
                .open(&name)
                .with_context(|| format!("Failed to open {}", name))?;

            let sent = match timeout_ms {
                Some(ms) => queue.timed_send(
                    message.as_bytes(),
                    priority,
                    Deadline::after(Duration::from_millis(ms)),
                ),
                None => queue.send(message.as_bytes(), priority),
            };
            sent.with_context(|| format!("Failed to send to {}", name))?;
            debug!("Sent {} bytes at priority {}", message.len(), priority);
        }

        Commands::Recv {
            name,
            timeout_ms,
            nonblock,
            count,
        } => {
            let mut queue = OpenOptions::new()
                .read(true)
                .nonblocking(nonblock)
                .open(&name)
                .with_context(|| format!("Failed to open {}", name))?;

            for _ in 0..count {
                let msg = receive(&mut queue, timeout_ms)
                    .with_context(|| format!("Failed to receive from {}", name))?;
                watch::print_message(&msg);
            }
        }

        Commands::Info { name, json } => {
            let queue = OpenOptions::new()
                .read(true)
                .open(&name)
                .with_context(|| format!("Failed to open {}", name))?;
            let info = queue.attributes()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Queue {}", name);
                println!("==========");
                println!("Max messages:  {}", info.max_messages);
                println!("Message size:  {}", info.max_message_size);
                println!("Queued:        {}", info.current_messages);
            }
        }

        Commands::Watch { name, signal, once } => {
            let sig = match signal {
                Some(s) => parse_signal(&s)?,
                None => config.notify.signal()?,
            };
            watch::run(&name, sig, once)?;
        }

        Commands::Pingpong {
            rounds,
            prefix,
            interval_ms,
        } => {
            let demo = PingPong {
                prefix,
                rounds,
                interval: Duration::from_millis(interval_ms),
                attributes: config.queue.attributes(),
            };
            demo.run()?;
        }
    }

    Ok(())
}

fn receive(queue: &mut MessageQueue, timeout_ms: Option<u64>) -> libnyx_mq::Result<Message> {
    match timeout_ms {
        Some(ms) => queue.timed_receive(Deadline::after(Duration::from_millis(ms))),
        None => queue.receive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("0640"), Ok(0o640));
        assert_eq!(parse_mode("0o600"), Ok(0o600));
        assert!(parse_mode("999").is_err());
    }

    #[test]
    fn test_send_args() {
        let cli = Cli::parse_from(["mqctl", "send", "/jobs", "hello", "-p", "5", "--nonblock"]);
        match cli.command {
            Commands::Send {
                name,
                message,
                priority,
                nonblock,
                timeout_ms,
            } => {
                assert_eq!(name, "/jobs");
                assert_eq!(message, "hello");
                assert_eq!(priority, 5);
                assert!(nonblock);
                assert_eq!(timeout_ms, None);
            }
            _ => panic!("expected send"),
        }
    }
}
