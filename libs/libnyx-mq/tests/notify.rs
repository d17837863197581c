//! Notification registration tests
//!
//! SIGWINCH is ignored by default, so a delivery cannot kill the test
//! process. SIGUSR2 is reserved for the delivery test, which installs its
//! own handler.

mod common;

use common::ScratchQueue;
use libnyx_mq::{ErrorKind, MessageQueue, QueueAttributes, Signal};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

static USR2_SEEN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_usr2(_: libc::c_int) {
    USR2_SEEN.store(true, Ordering::SeqCst);
}

fn wait_for(flag: &AtomicBool, limit: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    flag.load(Ordering::SeqCst)
}

#[test]
fn test_signal_delivered_on_first_message() {
    let handler = SigAction::new(
        SigHandler::Handler(on_usr2),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGUSR2, &handler) }.unwrap();

    let scratch = ScratchQueue::new("notify_deliver");
    let mut queue = MessageQueue::create(&scratch.name, &QueueAttributes::new(10, 128)).unwrap();

    queue.notify(Signal::SIGUSR2).unwrap();
    assert!(!wait_for(&USR2_SEEN, Duration::from_millis(50)));

    queue.send(b"wake", 0).unwrap();
    assert!(wait_for(&USR2_SEEN, Duration::from_secs(2)));
    assert_eq!(queue.receive().unwrap().data, b"wake");

    // Delivery used up the registration, so a fresh one succeeds
    queue.notify(Signal::SIGUSR2).unwrap();
    queue.cancel_notify().unwrap();
}

#[test]
fn test_second_registration_rejected() {
    let scratch = ScratchQueue::new("notify_twice");
    let queue = MessageQueue::create(&scratch.name, &QueueAttributes::new(10, 128)).unwrap();
    let other = MessageQueue::attach(&scratch.name).unwrap();

    queue.notify(Signal::SIGWINCH).unwrap();

    let err = queue.notify(Signal::SIGWINCH).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);
    let err = other.notify(Signal::SIGWINCH).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);

    queue.cancel_notify().unwrap();
    other.notify(Signal::SIGWINCH).unwrap();
    other.cancel_notify().unwrap();
}

#[test]
fn test_delivery_consumes_registration() {
    let scratch = ScratchQueue::new("notify_once");
    let mut queue = MessageQueue::create(&scratch.name, &QueueAttributes::new(10, 128)).unwrap();

    queue.notify(Signal::SIGWINCH).unwrap();
    queue.send(b"first", 0).unwrap();
    queue.receive().unwrap();

    // Registration was used up by the empty -> non-empty transition
    queue.notify(Signal::SIGWINCH).unwrap();
    queue.cancel_notify().unwrap();
}

#[test]
fn test_notify_after_close() {
    let scratch = ScratchQueue::new("notify_closed");
    let mut queue = MessageQueue::create(&scratch.name, &QueueAttributes::new(10, 128)).unwrap();
    queue.close().unwrap();

    let err = queue.notify(Signal::SIGWINCH).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    let err = queue.cancel_notify().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
}
