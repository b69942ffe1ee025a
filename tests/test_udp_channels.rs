//! Loopback integration tests for the channel-multiplexed UDP transport.
//!
//! Receive ports are bound with port 0 so the OS picks a free one; the bound
//! port returned by `rx_attach` is where the test sends its datagrams.

use std::io::{ErrorKind, Write};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use wireless::{Value, Wireless, WirelessConfig, WirelessError};

fn activate() -> Wireless {
    let config = WirelessConfig { rx_poll_interval_ms: 10, ..WirelessConfig::default() };
    Wireless::activate(config).unwrap()
}

fn sender() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").unwrap()
}

fn peer() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

fn send_to(socket: &UdpSocket, port: u16, bytes: &[u8]) {
    socket.send_to(bytes, ("127.0.0.1", port)).unwrap();
}

fn wait_available(wl: &Wireless, channel: u8, count: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if wl.available(channel).unwrap() >= count {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn recv_bytes(socket: &UdpSocket) -> Option<Vec<u8>> {
    let mut buf = [0u8; 512];
    match socket.recv_from(&mut buf) {
        Ok((len, _)) => Some(buf[..len].to_vec()),
        Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => None,
        Err(e) => panic!("peer receive error: {}", e),
    }
}

#[test]
fn test_hello_scenario() {
    let wl = activate();
    let port = wl.rx_attach(0, 0).unwrap();

    send_to(&sender(), port, &[3, 5, 0, 72, 101, 108, 108, 111]);

    assert!(wait_available(&wl, 0, 1), "datagram never arrived");
    assert_eq!(wl.available(0).unwrap(), 1);
    let value = wl.read(0).unwrap().unwrap();
    assert_eq!(value, Value::String("Hello".to_string()));
    assert_eq!(wl.available(0).unwrap(), 0);
    assert_eq!(wl.read(0).unwrap(), None);
}

#[test]
fn test_unattached_channel_is_empty() {
    let wl = activate();
    assert_eq!(wl.available(5).unwrap(), 0);
    assert_eq!(wl.read(5).unwrap(), None);
}

#[test]
fn test_malformed_datagrams_are_dropped() {
    let wl = activate();
    let port = wl.rx_attach(0, 1).unwrap();
    let socket = sender();

    send_to(&socket, port, &[3, 10, 0, b'a', b'b', b'c', b'd']); // short string
    send_to(&socket, port, &[0, 0]); // trailing byte
    send_to(&socket, port, &[99]); // unknown tag
    send_to(&socket, port, &[4, 2, 0, 1]); // short array
    send_to(&socket, port, &[9, 42]);

    assert!(wait_available(&wl, 1, 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(wl.available(1).unwrap(), 1);
    assert_eq!(wl.read(1).unwrap(), Some(Value::UInt8(42)));
}

#[test]
fn test_oversized_datagram_is_rejected() {
    let wl = activate();
    let port = wl.rx_attach(0, 0).unwrap();
    let socket = sender();

    // 300-byte string encodes to 303 bytes, over the 256-byte limit
    let big = Value::String("x".repeat(300)).to_bytes().unwrap();
    send_to(&socket, port, &big);
    send_to(&socket, port, &Value::Bool(true).to_bytes().unwrap());

    assert!(wait_available(&wl, 0, 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(wl.read_many(0, 10).unwrap(), vec![Value::Bool(true)]);
}

#[test]
fn test_oversized_datagram_with_complete_prefix_is_rejected() {
    let wl = activate();
    let port = wl.rx_attach(0, 0).unwrap();
    let socket = sender();

    // The first 256 bytes decode on their own; the whole datagram must still be dropped
    let mut datagram = Value::String("x".repeat(253)).to_bytes().unwrap();
    assert_eq!(datagram.len(), 256);
    datagram.extend_from_slice(&[0xAA; 44]);
    send_to(&socket, port, &datagram);
    send_to(&socket, port, &Value::UInt8(1).to_bytes().unwrap());

    assert!(wait_available(&wl, 0, 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(wl.read_many(0, 10).unwrap(), vec![Value::UInt8(1)]);
}

#[test]
fn test_datagram_at_packet_limit_is_accepted() {
    let wl = activate();
    let port = wl.rx_attach(0, 0).unwrap();
    let socket = sender();

    let value = Value::String("y".repeat(253));
    send_to(&socket, port, &value.to_bytes().unwrap());

    assert!(wait_available(&wl, 0, 1));
    assert_eq!(wl.read(0).unwrap(), Some(value));
}

#[test]
fn test_values_arrive_in_order() {
    let wl = activate();
    let port = wl.rx_attach(0, 2).unwrap();
    let socket = sender();

    for i in 0..5u32 {
        send_to(&socket, port, &Value::UInt32(i).to_bytes().unwrap());
    }

    assert!(wait_available(&wl, 2, 5));
    let values: Vec<Value> = (0..5).map(|_| wl.read(2).unwrap().unwrap()).collect();
    assert_eq!(values, (0..5u32).map(Value::UInt32).collect::<Vec<_>>());
}

#[test]
fn test_two_channels_share_one_port() {
    let wl = activate();
    let port = wl.rx_attach(0, 0).unwrap();
    assert_eq!(wl.rx_attach(port, 1).unwrap(), port);
    assert_eq!(wl.receive_loops(), 1);
    assert_eq!(wl.rx_ports().unwrap(), vec![port]);

    let value = Value::Array(vec![Value::Int16(-7), Value::from("ch")]);
    send_to(&sender(), port, &value.to_bytes().unwrap());

    assert!(wait_available(&wl, 0, 1));
    assert!(wait_available(&wl, 1, 1));
    assert_eq!(wl.read(0).unwrap(), Some(value.clone()));
    assert_eq!(wl.read(1).unwrap(), Some(value));
}

#[test]
fn test_rx_detach_keeps_loop_running() {
    let wl = activate();
    let port = wl.rx_attach(0, 0).unwrap();
    wl.rx_attach(port, 1).unwrap();
    wl.rx_detach(port, 0).unwrap();
    wl.rx_detach(port, 42).unwrap();

    send_to(&sender(), port, &[1]);

    assert!(wait_available(&wl, 1, 1));
    assert_eq!(wl.available(0).unwrap(), 0);
    assert_eq!(wl.receive_loops(), 1);

    // Re-attaching reuses the existing loop
    wl.rx_attach(port, 0).unwrap();
    assert_eq!(wl.receive_loops(), 1);
    send_to(&sender(), port, &[2]);
    assert!(wait_available(&wl, 0, 1));
    assert_eq!(wl.read(0).unwrap(), Some(Value::Bool(false)));
}

#[test]
fn test_rx_attach_bind_failure() {
    let holder = UdpSocket::bind("0.0.0.0:0").unwrap();
    let port = holder.local_addr().unwrap().port();

    let wl = activate();
    let result = wl.rx_attach(port, 0);
    assert!(matches!(result, Err(WirelessError::Bind { port: p, .. }) if p == port));
    assert!(wl.rx_ports().unwrap().is_empty());
    assert_eq!(wl.receive_loops(), 0);
}

#[test]
fn test_write_fans_out_to_attached_peers_only() {
    let wl = activate();
    let (peer_a, port_a) = peer();
    let (peer_b, port_b) = peer();
    let (bystander, port_c) = peer();
    bystander.set_read_timeout(Some(Duration::from_millis(100))).unwrap();

    wl.tx_attach("127.0.0.1", port_a, 0).unwrap();
    wl.tx_attach("127.0.0.1", port_b, 0).unwrap();
    wl.tx_attach("127.0.0.1", port_c, 1).unwrap();

    let value = Value::Array(vec![Value::Bool(true), Value::UInt64(u64::MAX)]);
    let expected = value.to_bytes().unwrap();
    assert_eq!(wl.write(&value, 0).unwrap(), 2);

    let mut buf = [0u8; 64];
    let (len, src) = peer_a.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], expected.as_slice());
    // Datagrams come from the shared outbound socket
    assert_eq!(src.port(), wl.local_addr().unwrap().port());

    assert_eq!(recv_bytes(&peer_b), Some(expected));
    assert_eq!(recv_bytes(&bystander), None);
}

#[test]
fn test_tx_detach_removes_only_that_peer() {
    let wl = activate();
    let (peer_a, port_a) = peer();
    let (peer_b, port_b) = peer();
    peer_a.set_read_timeout(Some(Duration::from_millis(100))).unwrap();

    wl.tx_attach("127.0.0.1", port_a, 3).unwrap();
    wl.tx_attach("127.0.0.1", port_b, 3).unwrap();
    wl.tx_detach("127.0.0.1", port_a, 3).unwrap();

    assert_eq!(wl.write(&Value::Int8(-1), 3).unwrap(), 1);
    assert_eq!(recv_bytes(&peer_b), Some(vec![5, 0xFF]));
    assert_eq!(recv_bytes(&peer_a), None);
}

#[test]
fn test_write_all_sends_in_order() {
    let wl = activate();
    let (peer_a, port_a) = peer();
    wl.tx_attach("127.0.0.1", port_a, 0).unwrap();

    let values = [Value::from("a"), Value::Null, Value::UInt16(513)];
    assert_eq!(wl.write_all(&values, 0).unwrap(), 3);

    for value in &values {
        let bytes = recv_bytes(&peer_a).unwrap();
        assert_eq!(&Value::from_bytes(&bytes).unwrap(), value);
    }
}

#[test]
fn test_two_transports_end_to_end() {
    let node_a = activate();
    let node_b = activate();
    let port_b = node_b.rx_attach(0, 3).unwrap();
    node_a.tx_attach("127.0.0.1", port_b, 3).unwrap();

    let flags = Value::Array(vec![
        Value::Bool(true),
        Value::Bool(false),
        Value::Bool(false),
        Value::Bool(true),
    ]);
    node_a.write(&flags, 3).unwrap();

    assert!(wait_available(&node_b, 3, 1));
    assert_eq!(node_b.read(3).unwrap(), Some(flags));
}

#[test]
fn test_deactivate_releases_ports() {
    let wl = activate();
    let port = wl.rx_attach(0, 0).unwrap();
    send_to(&sender(), port, &[0]);
    assert!(wait_available(&wl, 0, 1));

    wl.deactivate().unwrap();
    assert_eq!(wl.receive_loops(), 0);
    assert!(matches!(wl.available(0), Err(WirelessError::Inactive)));

    // The receive loop closed its socket, so the port is free again
    let rebound = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port)));
    assert!(rebound.is_ok());
}

#[test]
fn test_drop_stops_receive_loops() {
    let port = {
        let wl = activate();
        wl.rx_attach(0, 0).unwrap()
    };
    assert!(UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port))).is_ok());
}

#[test]
fn test_shared_across_threads() {
    let wl = Arc::new(activate());
    let port = wl.rx_attach(0, 0).unwrap();
    wl.tx_attach("127.0.0.1", port, 0).unwrap();

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let wl = Arc::clone(&wl);
            thread::spawn(move || {
                for j in 0..5u8 {
                    wl.write(&Value::UInt8(i * 10 + j), 0).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(wait_available(&wl, 0, 20));
    let mut received: Vec<u64> = wl
        .read_many(0, 100)
        .unwrap()
        .iter()
        .filter_map(Value::as_u64)
        .collect();
    received.sort_unstable();
    let mut expected: Vec<u64> = (0..4u64).flat_map(|i| (0..5u64).map(move |j| i * 10 + j)).collect();
    expected.sort_unstable();
    assert_eq!(received, expected);
}

#[test]
fn test_load_applies_bindings() {
    let (peer_a, port_a) = peer();
    let path = std::env::temp_dir().join(format!("wireless-load-{}.json", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "rx_poll_interval_ms": 10,
                "rx": [ {{ "port": 0, "channel": 1 }} ],
                "tx": [ {{ "host": "127.0.0.1", "port": {}, "channel": 2 }} ]
            }}"#,
            port_a
        )
        .unwrap();
    }

    let wl = Wireless::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(wl.rx_ports().unwrap().len(), 1);
    assert_eq!(wl.tx_peers(2).unwrap(), vec![SocketAddr::from(([127, 0, 0, 1], port_a))]);

    wl.write(&Value::from("configured"), 2).unwrap();
    let bytes = recv_bytes(&peer_a).unwrap();
    assert_eq!(Value::from_bytes(&bytes).unwrap().as_str(), Some("configured"));
}
