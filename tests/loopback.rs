//! Ida e volta real em 127.0.0.1. Precisa de root/CAP_NET_RAW; sem isso o
//! teste só avisa e retorna.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::time::{Duration, Instant};

use pingrs_echo::{Family, RawSocket, RunOutcome, Session, SessionConfig};

fn raw_socket_or_skip() -> Option<RawSocket> {
    match RawSocket::open(Family::V4) {
        Ok(sock) => Some(sock),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            eprintln!("sem permissão para socket RAW, pulando: {e}");
            None
        }
        Err(e) => {
            eprintln!("socket RAW indisponível, pulando: {e}");
            None
        }
    }
}

fn config(timeout: Duration) -> SessionConfig {
    let mut config = SessionConfig::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
    config.timeout = timeout;
    config
}

#[test]
fn loopback_round_trip() {
    let Some(mut sock) = raw_socket_or_skip() else {
        return;
    };
    let timeout = Duration::from_secs(2);
    let mut session = Session::new(config(timeout)).unwrap();

    let sent = session.send(&mut sock).unwrap();
    let received = session
        .receive(&mut sock, sent.sequence, timeout)
        .unwrap()
        .expect("sem Echo Reply do loopback");

    let rtt = received.duration_since(sent.at);
    assert!(rtt < timeout);
}

#[test]
fn receive_without_request_times_out() {
    let Some(mut sock) = raw_socket_or_skip() else {
        return;
    };
    let timeout = Duration::from_millis(200);
    let session = Session::new(config(timeout)).unwrap();

    let start = Instant::now();
    assert_eq!(session.receive(&mut sock, 0, timeout).unwrap(), None);
    let waited = start.elapsed();
    assert!(waited >= timeout);
    assert!(waited < timeout + Duration::from_millis(500));
}

#[test]
fn loopback_run_statistics() {
    if raw_socket_or_skip().is_none() {
        return;
    }
    let mut session = Session::new(config(Duration::from_secs(5))).unwrap();

    let outcome = session.run(&mut pingrs_echo::RawSocketOpener, 3).unwrap();
    let RunOutcome::Completed(stats) = outcome else {
        panic!("esperava Completed, veio {outcome:?}");
    };
    assert_eq!(stats.sent(), 3);
    assert_eq!(stats.dropped(), stats.sent() - stats.received());
    assert_eq!(stats.received(), 3);

    let rtt = stats.summary().unwrap();
    assert!(rtt.min <= rtt.avg && rtt.avg <= rtt.max);
}
