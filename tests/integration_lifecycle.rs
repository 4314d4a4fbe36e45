/// Integration tests for the start/stop lifecycle and the post-stop
/// contract: mutating calls fail explicitly, accessors empty out, and no
/// callback fires after stop completes.
mod common;

use std::net::SocketAddr;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use netplay_transport::{Transport, TransportConfig, TransportError};

use common::{init_logger, TestProtocol};

fn loopback(port: u16) -> SocketAddr {
    format!("127.0.0.1:{}", port).parse().unwrap()
}

#[test]
fn queue_and_send_fail_explicitly_once_stopped() {
    init_logger();

    let transport = Transport::<TestProtocol>::new(TransportConfig::default());
    transport.start(0).unwrap();
    let address = loopback(transport.port().unwrap());

    transport.queue(address, b"pending".to_vec()).unwrap();
    transport.stop();

    assert_eq!(
        transport.queue(address, b"late".to_vec()),
        Err(TransportError::NotRunning)
    );
    assert_eq!(transport.send(address), Err(TransportError::NotRunning));
    assert!(transport.peers().is_empty());
    assert_eq!(transport.port(), None);
}

#[test]
fn queue_and_send_fail_before_first_start() {
    init_logger();

    let transport = Transport::<TestProtocol>::new(TransportConfig::default());
    let address = loopback(9200);

    assert_eq!(
        transport.queue(address, b"early".to_vec()),
        Err(TransportError::NotRunning)
    );
    assert_eq!(transport.send(address), Err(TransportError::NotRunning));
}

#[test]
fn start_while_running_fails() {
    init_logger();

    let transport = Transport::<TestProtocol>::new(TransportConfig::default());
    transport.start(0).unwrap();
    assert_eq!(transport.start(0), Err(TransportError::AlreadyRunning));
    transport.stop();
}

#[test]
fn stop_is_idempotent_and_restart_rebinds() {
    init_logger();

    let transport = Transport::<TestProtocol>::new(TransportConfig::default());
    transport.start(0).unwrap();
    assert!(transport.port().is_some());

    transport.stop();
    transport.stop();
    assert_eq!(transport.port(), None);

    transport.start(0).unwrap();
    assert!(transport.port().is_some());
    transport.stop();
}

#[test]
fn no_receive_callback_fires_after_stop() {
    init_logger();

    let sender = Transport::<TestProtocol>::new(TransportConfig::default());
    sender.start(0).unwrap();
    let receiver = Transport::<TestProtocol>::new(TransportConfig::default());
    receiver.start(0).unwrap();
    let receiver_addr = loopback(receiver.port().unwrap());

    let (message_tx, message_rx) = mpsc::channel::<Vec<u8>>();
    receiver.set_receive_handler(move |_, payload| {
        message_tx.send(payload).unwrap();
    });

    receiver.stop();

    sender.queue(receiver_addr, b"ghost".to_vec()).unwrap();
    sender.send(receiver_addr).unwrap();

    assert!(message_rx.recv_timeout(Duration::from_millis(500)).is_err());
}

#[test]
fn peer_accessor_never_creates_entries() {
    init_logger();

    let transport = Transport::<TestProtocol>::new(TransportConfig::default());
    transport.start(0).unwrap();

    assert!(transport.peer(loopback(9201)).is_none());
    assert!(transport.peers().is_empty());

    transport.stop();
}

#[test]
fn queue_returns_not_running_from_inside_a_completion_handler() {
    init_logger();

    let sender = Transport::<TestProtocol>::new(TransportConfig::default());
    sender.start(0).unwrap();
    let receiver = Arc::new(Transport::<TestProtocol>::new(TransportConfig::default()));
    receiver.start(0).unwrap();
    let receiver_addr = loopback(receiver.port().unwrap());

    let (entered_tx, entered_rx) = mpsc::channel();
    let (result_tx, result_rx) = mpsc::channel();

    // The handler holds its worker hostage until stop() has begun, then
    // observes the not-running contract from inside an in-flight completion.
    let handler_transport = receiver.clone();
    receiver.set_receive_handler(move |address, _: Vec<u8>| {
        entered_tx.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            match handler_transport.queue(address, b"from-handler".to_vec()) {
                Err(error) => {
                    result_tx.send(error).unwrap();
                    return;
                }
                Ok(()) => {
                    if Instant::now() > deadline {
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
    });

    sender.queue(receiver_addr, b"trigger".to_vec()).unwrap();
    sender.send(receiver_addr).unwrap();

    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // stop() flips the lifecycle before joining workers, so the in-flight
    // handler sees NotRunning while stop() is still draining.
    let stopper = {
        let receiver = receiver.clone();
        std::thread::spawn(move || receiver.stop())
    };

    assert_eq!(
        result_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        TransportError::NotRunning
    );
    stopper.join().unwrap();
}
