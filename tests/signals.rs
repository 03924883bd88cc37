//! Termination signal handling. Kept in its own test binary because
//! installing the handlers changes process-wide signal dispositions.

#![cfg(unix)]

use std::time::Duration;

use service_host::lifecycle::{Signals, TerminationSignal};

fn send_sigterm() {
    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn test_first_signal_is_consumed_and_later_ones_ignored() {
    let signals = Signals::install().unwrap();
    let waiter = tokio::spawn(signals.wait());

    tokio::time::sleep(Duration::from_millis(100)).await;
    send_sigterm();

    let received = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received, Some(TerminationSignal::Terminate));

    // A second signal during shutdown is drained, not fatal.
    send_sigterm();
    tokio::time::sleep(Duration::from_millis(200)).await;
}
