//! Request/response demo over two queues
//!
//! A responder thread answers each request on `<prefix>_send` with a reply on
//! `<prefix>_resp`. The sender waits up to one second for every reply and
//! unlinks both queues when it is done.

use anyhow::{Context, Result};
use libnyx_mq::{Deadline, ErrorKind, MessageQueue, OpenOptions, QueueAttributes};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const REPLY_TIMEOUT: Duration = Duration::from_secs(1);

/// Demo settings
#[derive(Debug, Clone)]
pub struct PingPong {
    pub prefix: String,
    pub rounds: u32,
    pub interval: Duration,
    pub attributes: QueueAttributes,
}

/// Handles owned by one side of the exchange
struct Endpoint {
    inbox: MessageQueue,
    outbox: MessageQueue,
}

impl PingPong {
    fn request_queue(&self) -> String {
        format!("/{}_send", self.prefix)
    }

    fn response_queue(&self) -> String {
        format!("/{}_resp", self.prefix)
    }

    fn open(&self, name: &str, read: bool) -> Result<MessageQueue> {
        OpenOptions::new()
            .read(read)
            .write(!read)
            .create(true)
            .attributes(self.attributes)
            .open(name)
            .with_context(|| format!("Failed to open {}", name))
    }

    /// Run both sides to completion
    pub fn run(&self) -> Result<()> {
        let requests = self.request_queue();
        let responses = self.response_queue();

        // Queues exist before either side starts, so there is no startup race
        let responder = Endpoint {
            inbox: self.open(&requests, true)?,
            outbox: self.open(&responses, false)?,
        };
        let sender = Endpoint {
            inbox: self.open(&responses, true)?,
            outbox: self.open(&requests, false)?,
        };

        let rounds = self.rounds;
        let interval = self.interval;
        let responder_thread = thread::spawn(move || respond(responder, rounds, interval));

        let sent = send(sender, rounds, interval);

        for name in [&requests, &responses] {
            if let Err(e) = libnyx_mq::unlink(name) {
                warn!("Failed to unlink {}: {}", name, e);
            }
        }
        info!("Sender: finished and unlinked");

        let answered = responder_thread
            .join()
            .map_err(|_| anyhow::anyhow!("Responder thread panicked"))??;
        let received = sent?;

        info!(
            "Exchanged {} requests, {} replies received",
            answered, received
        );
        Ok(())
    }
}

fn respond(mut endpoint: Endpoint, rounds: u32, interval: Duration) -> Result<u32> {
    let mut answered = 0;

    for count in 1..=rounds {
        // Bounded so the responder cannot outlive a sender that gave up
        let deadline = Deadline::after(interval + REPLY_TIMEOUT * 5);
        let msg = match endpoint.inbox.timed_receive(deadline) {
            Ok(msg) => msg,
            Err(e) if e.kind() == ErrorKind::Timeout => {
                warn!("Responder: no request within deadline, stopping");
                break;
            }
            Err(e) => {
                warn!("Responder: error handling message: {}", e);
                continue;
            }
        };
        info!(
            "Responder: got new message from sender: {}",
            String::from_utf8_lossy(&msg.data).trim_end()
        );

        let reply = format!("Farewell, World : {}", count);
        if let Err(e) = endpoint.outbox.send(reply.as_bytes(), 0) {
            warn!("Responder: error sending response: {}", e);
            continue;
        }
        info!("Responder: sent a response");
        answered += 1;
    }

    info!("Responder: finished");
    Ok(answered)
}

fn send(mut endpoint: Endpoint, rounds: u32, interval: Duration) -> Result<u32> {
    let mut received = 0;

    for count in 1..=rounds {
        if count > 1 {
            thread::sleep(interval);
        }

        let request = format!("Hello, World : {}", count);
        if let Err(e) = endpoint.outbox.send(request.as_bytes(), 0) {
            warn!("Sender: error sending message: {}", e);
            continue;
        }
        info!("Sender: sent a new message");

        match endpoint.inbox.timed_receive(Deadline::after(REPLY_TIMEOUT)) {
            Ok(msg) => {
                info!(
                    "Sender: got a response: {}",
                    String::from_utf8_lossy(&msg.data)
                );
                received += 1;
            }
            Err(e) => warn!("Sender: error receiving message: {}", e),
        }
    }

    Ok(received)
}
