use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use log::{debug, info, trace, warn};

use crate::error::{PingError, PingResult};
use crate::icmp::{
    self, DEFAULT_PAYLOAD_LEN, EchoRequest, Family, HEADER_LEN, IcmpHeader, MAX_PAYLOAD_LEN,
    MAX_RECV, TIMESTAMP_LEN,
};
use crate::stats::Statistics;
use crate::transport::{Opener, Transport};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1000);
pub const DEFAULT_COUNT: u32 = 3;

/// Maior orçamento aceito (~136 anos); acima disso `Instant + timeout`
/// estoura.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(u32::MAX as u64);

/// Fatia máxima de cada espera bloqueante; entre fatias o sinalizador de
/// execução é consultado.
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Parâmetros de uma sessão de ping.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub destination: IpAddr,
    /// Orçamento total da execução.
    pub timeout: Duration,
    /// Espera máxima por resposta em cada tentativa; `None` usa `timeout`.
    pub reply_timeout: Option<Duration>,
    /// `None` sorteia um identificador para a sessão.
    pub identifier: Option<u16>,
    pub payload_size: usize,
    pub count: u32,
    /// Pausa entre tentativas (nunca depois da última).
    pub interval: Duration,
}

impl SessionConfig {
    pub fn new(destination: IpAddr) -> Self {
        SessionConfig {
            destination,
            timeout: DEFAULT_TIMEOUT,
            reply_timeout: None,
            identifier: None,
            payload_size: DEFAULT_PAYLOAD_LEN,
            count: DEFAULT_COUNT,
            interval: Duration::ZERO,
        }
    }
}

/// Resultado de um envio bem-sucedido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    pub sequence: u16,
    /// Instante tomado logo antes do `send_to`.
    pub at: Instant,
}

/// Como terminou `Session::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Todas as tentativas foram feitas dentro do orçamento.
    Completed(Statistics),
    /// O orçamento total acabou antes de todas as tentativas.
    TimedOut(Statistics),
    /// O sinalizador de execução foi desligado (Ctrl+C).
    Interrupted(Statistics),
}

impl RunOutcome {
    pub fn statistics(&self) -> &Statistics {
        match self {
            RunOutcome::Completed(s) | RunOutcome::TimedOut(s) | RunOutcome::Interrupted(s) => s,
        }
    }
}

/// Uma sessão de ping: destino, identificador, contador de sequência e
/// estatísticas acumuladas.
#[derive(Debug)]
pub struct Session {
    destination: SocketAddr,
    family: Family,
    identifier: u16,
    timeout: Duration,
    reply_timeout: Duration,
    payload_size: usize,
    interval: Duration,
    sequence: u16,
    stats: Statistics,
    running: Arc<AtomicBool>,
}

impl Session {
    pub fn new(config: SessionConfig) -> PingResult<Self> {
        if !(TIMESTAMP_LEN..=MAX_PAYLOAD_LEN).contains(&config.payload_size) {
            return Err(PingError::PayloadSize {
                size: config.payload_size,
                min: TIMESTAMP_LEN,
                max: MAX_PAYLOAD_LEN,
            });
        }

        let reply_timeout = config.reply_timeout.unwrap_or(config.timeout);
        if config.timeout.is_zero() || reply_timeout.is_zero() {
            return Err(PingError::ZeroTimeout);
        }
        if config.timeout > MAX_TIMEOUT || reply_timeout > MAX_TIMEOUT {
            return Err(PingError::TimeoutTooLarge(MAX_TIMEOUT));
        }

        let family = match config.destination {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        };

        Ok(Session {
            // Porta 0 é ignorada para ICMP
            destination: SocketAddr::new(config.destination, 0),
            family,
            identifier: config.identifier.unwrap_or_else(rand::random),
            timeout: config.timeout,
            reply_timeout,
            payload_size: config.payload_size,
            interval: config.interval,
            sequence: 0,
            stats: Statistics::new(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Usa um sinalizador externo (ex.: o handler de Ctrl+C) para parar o
    /// `run`, inclusive no meio da espera por uma resposta.
    pub fn with_interrupt(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn destination(&self) -> IpAddr {
        self.destination.ip()
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Próximo número de sequência a ser enviado.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// Monta e transmite um Echo Request. A sequência só avança se o envio
    /// der certo.
    pub fn send<T: Transport>(&mut self, transport: &mut T) -> PingResult<Sent> {
        let payload = icmp::build_payload(self.payload_size, SystemTime::now());
        let pkt = EchoRequest {
            family: self.family,
            ident: self.identifier,
            seq: self.sequence,
            payload: &payload,
        }
        .encode();

        let at = Instant::now();
        transport
            .send_to(&pkt, &self.destination)
            .map_err(PingError::Send)?;

        let sent = Sent {
            sequence: self.sequence,
            at,
        };
        self.sequence = self.sequence.wrapping_add(1);
        trace!(
            "Echo Request para {}: id={} seq={} bytes={}",
            self.destination.ip(),
            self.identifier,
            sent.sequence,
            pkt.len()
        );
        Ok(sent)
    }

    /// Espera pelo Echo Reply de `sequence` até `timeout`.
    ///
    /// Datagramas de outras sessões, o nosso próprio Echo Request (loopback)
    /// e lixo são descartados até o prazo acabar. Devolve o instante de
    /// chegada da resposta, ou `None` se o prazo acabou ou a sessão foi
    /// interrompida.
    pub fn receive<T: Transport>(
        &self,
        transport: &mut T,
        sequence: u16,
        timeout: Duration,
    ) -> PingResult<Option<Instant>> {
        let deadline = deadline_after(Instant::now(), timeout);
        let mut buf = [0u8; MAX_RECV];

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            // Verifica interrupção também no loop de espera
            if !self.is_running() {
                debug!("espera por icmp_seq={sequence} interrompida");
                return Ok(None);
            }

            let wait = (deadline - now).min(WAIT_SLICE);
            let Some(n) = transport
                .recv_timeout(&mut buf, wait)
                .map_err(PingError::Receive)?
            else {
                continue;
            };
            let received_at = Instant::now();

            match IcmpHeader::parse(&buf[..n], self.family) {
                Ok(header) if header.is_reply_to(self.family, self.identifier, sequence) => {
                    return Ok(Some(received_at));
                }
                Ok(header) => trace!(
                    "descartando ICMP type={} id={} seq={}",
                    header.icmp_type, header.ident, header.seq
                ),
                Err(e) => trace!("descartando datagrama: {e}"),
            }
        }
    }

    /// Faz até `max_count` tentativas dentro do orçamento `timeout`, cada uma
    /// com um socket novo, e devolve as estatísticas acumuladas.
    ///
    /// Falhas de uma tentativa (envio, leitura, sem resposta) apenas contam
    /// como perda. Só a falha ao abrir o socket interrompe a execução.
    pub fn run<O: Opener>(&mut self, opener: &mut O, max_count: u32) -> PingResult<RunOutcome> {
        let start = Instant::now();
        let mut count = 0;

        while count < max_count && start.elapsed() < self.timeout {
            if !self.is_running() {
                debug!("interrompido após {count} tentativas");
                return Ok(RunOutcome::Interrupted(self.stats.clone()));
            }

            let remaining = self.timeout.saturating_sub(start.elapsed());
            self.attempt(opener, remaining)?;
            count += 1;

            if count < max_count && !self.interval.is_zero() {
                self.pause(self.interval.min(self.timeout.saturating_sub(start.elapsed())));
            }
        }

        if !self.is_running() {
            debug!("interrompido após {count} tentativas");
            return Ok(RunOutcome::Interrupted(self.stats.clone()));
        }

        if count < max_count {
            debug!("orçamento de {:?} esgotado após {count} tentativas", self.timeout);
            return Ok(RunOutcome::TimedOut(self.stats.clone()));
        }

        Ok(RunOutcome::Completed(self.stats.clone()))
    }

    fn attempt<O: Opener>(&mut self, opener: &mut O, remaining: Duration) -> PingResult<()> {
        // O socket é fechado no fim do escopo, em qualquer caminho
        let mut transport = opener.open(self.family).map_err(PingError::Open)?;

        self.stats.record_sent();
        let sent = match self.send(&mut transport) {
            Ok(sent) => sent,
            Err(e) => {
                warn!("{e}");
                return Ok(());
            }
        };

        let wait = self.reply_timeout.min(remaining);
        match self.receive(&mut transport, sent.sequence, wait) {
            Ok(Some(received_at)) => {
                let rtt = received_at.saturating_duration_since(sent.at);
                self.stats.record_reply(rtt);
                info!(
                    "Resposta de {}: bytes={} icmp_seq={} tempo={:.3}ms",
                    self.destination.ip(),
                    HEADER_LEN + self.payload_size,
                    sent.sequence,
                    rtt.as_secs_f64() * 1000.0
                );
            }
            Ok(None) if !self.is_running() => {}
            Ok(None) => warn!(
                "Esgotado o tempo limite do pedido (icmp_seq={}, {:?})",
                sent.sequence, wait
            ),
            Err(e) => warn!("{e} (icmp_seq={})", sent.sequence),
        }

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Dorme `total` em fatias, acordando cedo se a sessão for interrompida.
    fn pause(&self, total: Duration) {
        let until = deadline_after(Instant::now(), total);
        while self.is_running() {
            let now = Instant::now();
            if now >= until {
                break;
            }
            thread::sleep((until - now).min(WAIT_SLICE));
        }
    }
}

/// `now + timeout`, limitado a `MAX_TIMEOUT` para não estourar o `Instant`.
fn deadline_after(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .or_else(|| now.checked_add(MAX_TIMEOUT))
        .unwrap_or(now)
}
