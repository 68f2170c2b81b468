// Criação e configuração de sockets de baixo nível
use socket2::{Domain, Protocol, Socket, Type};

use std::io::{self, Read};
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, trace};

use crate::icmp::Family;

/// Menor timeout de leitura aceito pelo socket (zero significa "sem timeout").
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Canal por onde a sessão troca datagramas ICMP.
pub trait Transport {
    fn send_to(&mut self, packet: &[u8], dst: &SocketAddr) -> io::Result<usize>;

    /// Lê um datagrama esperando no máximo `timeout`. `Ok(None)` quando o
    /// prazo acaba (ou a leitura é interrompida) sem nada para ler.
    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

/// Abre um `Transport` novo para cada tentativa.
pub trait Opener {
    type Transport: Transport;

    fn open(&mut self, family: Family) -> io::Result<Self::Transport>;
}

/// Socket ICMP RAW. Fechado no `Drop`.
#[derive(Debug)]
pub struct RawSocket {
    sock: Socket,
    family: Family,
}

impl RawSocket {
    /// Domain::IPV4/IPV6 -> AF_INET/AF_INET6
    /// Type::from(3) -> SOCK_RAW (recebemos o cabeçalho IP em IPv4)
    /// Protocol::ICMPV4/ICMPV6 -> IPPROTO_ICMP/IPPROTO_ICMPV6
    pub fn open(family: Family) -> io::Result<Self> {
        let (domain, protocol) = match family {
            Family::V4 => (Domain::IPV4, Protocol::ICMPV4),
            Family::V6 => (Domain::IPV6, Protocol::ICMPV6),
        };

        // SOCK_RAW é 3; usamos o valor direto pois libc::SOCK_RAW pode não
        // estar disponível no Windows.
        let sock = Socket::new(domain, Type::from(3), Some(protocol))?;

        // Permite pingar endereços de broadcast
        if family == Family::V4 {
            sock.set_broadcast(true)?;
        }

        trace!("socket RAW {family:?} aberto");
        Ok(RawSocket { sock, family })
    }
}

impl Transport for RawSocket {
    fn send_to(&mut self, packet: &[u8], dst: &SocketAddr) -> io::Result<usize> {
        // A porta do endereço é ignorada pelo ICMP
        self.sock.send_to(packet, &(*dst).into())
    }

    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        self.sock
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;

        match self.sock.read(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl Drop for RawSocket {
    fn drop(&mut self) {
        debug!("fechando socket RAW {:?}", self.family);
    }
}

/// Abre um `RawSocket` por tentativa.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSocketOpener;

impl Opener for RawSocketOpener {
    type Transport = RawSocket;

    fn open(&mut self, family: Family) -> io::Result<RawSocket> {
        RawSocket::open(family)
    }
}
