//! Signal-driven queue watcher
//!
//! Registers for a notification signal, drains the queue whenever the signal
//! arrives, then re-arms. Notifications only fire on an empty to non-empty
//! transition, so the queue is always drained before (and re-checked after)
//! each registration.

use anyhow::{Context, Result};
use libnyx_mq::{ErrorKind, Message, MessageQueue, OpenOptions, Signal};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

/// Watch `name` until interrupted, or until one batch arrives with `once`
pub fn run(name: &str, sig: Signal, once: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(watch(name, sig, once))
}

async fn watch(name: &str, sig: Signal, once: bool) -> Result<()> {
    let mut queue = OpenOptions::new()
        .read(true)
        .nonblocking(true)
        .open(name)
        .with_context(|| format!("Failed to open {}", name))?;

    // Handler must be installed before the kernel can deliver anything
    let mut notifications = signal(SignalKind::from_raw(sig as i32))
        .with_context(|| format!("Failed to install {:?} handler", sig))?;

    info!("Watching {} for {:?}", name, sig);

    loop {
        drain(&mut queue)?;
        queue.notify(sig)?;

        // A message may have landed between the drain and the registration
        if drain(&mut queue)? > 0 {
            queue.cancel_notify()?;
            if once {
                break;
            }
            continue;
        }

        tokio::select! {
            _ = notifications.recv() => {
                debug!("Notification received for {}", name);
                let count = drain(&mut queue)?;
                if once && count > 0 {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                if let Err(e) = queue.cancel_notify() {
                    warn!("Failed to cancel notification: {}", e);
                }
                break;
            }
        }
    }

    Ok(())
}

/// Print every queued message, returning how many were read
fn drain(queue: &mut MessageQueue) -> Result<usize> {
    let mut count = 0;
    loop {
        match queue.receive() {
            Ok(msg) => {
                print_message(&msg);
                count += 1;
            }
            Err(e) if e.kind().is_would_block() => return Ok(count),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

pub fn print_message(msg: &Message) {
    println!("[{}] {}", msg.priority, String::from_utf8_lossy(&msg.data));
}

#[cfg(test)]
mod tests {
    use super::*;
    use libnyx_mq::QueueAttributes;

    struct Scratch(String);

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = libnyx_mq::unlink(&self.0);
        }
    }

    fn nonblocking_queue(tag: &str) -> (Scratch, MessageQueue) {
        let name = format!("/courier_{}_{}", tag, std::process::id());
        let _ = libnyx_mq::unlink(&name);
        let queue = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .nonblocking(true)
            .attributes(QueueAttributes::new(8, 64))
            .open(&name)
            .unwrap();
        (Scratch(name), queue)
    }

    #[test]
    fn test_drain_reads_until_empty() {
        let (_scratch, mut queue) = nonblocking_queue("drain");
        for i in 0..5u32 {
            queue.send(format!("msg {}", i).as_bytes(), i).unwrap();
        }

        assert_eq!(drain(&mut queue).unwrap(), 5);
        assert!(queue.attributes().unwrap().is_empty());

        // Nothing left: stops on WouldBlock instead of waiting
        assert_eq!(drain(&mut queue).unwrap(), 0);
    }

    #[test]
    fn test_drain_reports_other_errors() {
        let (_scratch, mut queue) = nonblocking_queue("drain_closed");
        queue.close().unwrap();
        assert!(drain(&mut queue).is_err());
    }
}
