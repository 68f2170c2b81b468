use std::time::{SystemTime, UNIX_EPOCH};

use crate::checksum::internet_checksum;
use crate::error::ParseError;

/// Tamanho do cabeçalho ICMP: type, code, checksum, identifier, sequence.
pub const HEADER_LEN: usize = 8;

/// Tamanho do timestamp no início do payload.
pub const TIMESTAMP_LEN: usize = 8;

/// Payload padrão (timestamp + preenchimento).
pub const DEFAULT_PAYLOAD_LEN: usize = 56;

/// Maior datagrama lido por chamada de recepção.
pub const MAX_RECV: usize = 2048;

/// Cabeçalho IPv4 sem opções.
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// Cabeçalho IPv4 com o máximo de opções (IHL = 15).
pub const IPV4_MAX_HEADER_LEN: usize = 60;

/// Maior payload que ainda cabe no buffer de recepção.
pub const MAX_PAYLOAD_LEN: usize = MAX_RECV - IPV4_MAX_HEADER_LEN - HEADER_LEN;

const PADDING_BYTE: u8 = b'Q';

/// Família de endereços do destino. Decide os tipos ICMP e o formato do que
/// o socket RAW entrega na leitura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn echo_request(self) -> u8 {
        match self {
            Family::V4 => 8,
            Family::V6 => 128,
        }
    }

    pub fn echo_reply(self) -> u8 {
        match self {
            Family::V4 => 0,
            Family::V6 => 129,
        }
    }
}

/// Echo Request pronto para ser serializado.
#[derive(Debug, Clone)]
pub struct EchoRequest<'a> {
    pub family: Family,
    pub ident: u16,
    pub seq: u16,
    pub payload: &'a [u8],
}

impl EchoRequest<'_> {
    /// Serializa cabeçalho + payload com o checksum calculado sobre o pacote
    /// com o campo zerado e gravado em big-endian.
    ///
    /// No ICMPv6 o kernel sobrescreve o checksum (pseudo-cabeçalho IPv6).
    pub fn encode(&self) -> Vec<u8> {
        let mut pkt = Vec::with_capacity(HEADER_LEN + self.payload.len());

        pkt.extend_from_slice(&[self.family.echo_request(), 0, 0, 0]);
        pkt.extend_from_slice(&self.ident.to_be_bytes());
        pkt.extend_from_slice(&self.seq.to_be_bytes());
        pkt.extend_from_slice(self.payload);

        let csum = internet_checksum(&pkt);
        pkt[2..4].copy_from_slice(&csum.to_be_bytes());

        pkt
    }
}

/// Monta o payload: timestamp de envio (f64 big-endian, segundos desde a
/// época UNIX) seguido de preenchimento até `len` bytes.
///
/// `len` menor que o timestamp trunca o timestamp; a sessão valida o tamanho
/// antes de chegar aqui.
pub fn build_payload(len: usize, sent_at: SystemTime) -> Vec<u8> {
    let secs = sent_at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();

    let mut payload = Vec::with_capacity(len.max(TIMESTAMP_LEN));
    payload.extend_from_slice(&secs.to_be_bytes());
    payload.resize(len.max(TIMESTAMP_LEN), PADDING_BYTE);
    payload.truncate(len);
    payload
}

/// Lê o timestamp gravado por `build_payload`.
#[cfg(test)]
pub(crate) fn payload_timestamp(payload: &[u8]) -> Option<f64> {
    let bytes: [u8; TIMESTAMP_LEN] = payload.get(..TIMESTAMP_LEN)?.try_into().ok()?;
    Some(f64::from_be_bytes(bytes))
}

/// Cabeçalho ICMP extraído de um datagrama recebido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub ident: u16,
    pub seq: u16,
}

impl IcmpHeader {
    /// Extrai o cabeçalho ICMP de um datagrama lido do socket RAW.
    ///
    /// Em IPv4 o kernel entrega o cabeçalho IP na frente; o deslocamento vem
    /// do campo IHL (20 bytes sem opções). Em IPv6 o datagrama começa no ICMP.
    pub fn parse(datagram: &[u8], family: Family) -> Result<Self, ParseError> {
        let start = match family {
            Family::V4 => ipv4_payload_offset(datagram)?,
            Family::V6 => 0,
        };

        let icmp = datagram
            .get(start..start + HEADER_LEN)
            .ok_or(ParseError::Truncated(datagram.len()))?;

        Ok(IcmpHeader {
            icmp_type: icmp[0],
            code: icmp[1],
            checksum: u16::from_be_bytes([icmp[2], icmp[3]]),
            ident: u16::from_be_bytes([icmp[4], icmp[5]]),
            seq: u16::from_be_bytes([icmp[6], icmp[7]]),
        })
    }

    /// Verdadeiro somente para um Echo Reply desta sessão e desta sequência.
    pub fn is_reply_to(&self, family: Family, ident: u16, seq: u16) -> bool {
        self.icmp_type == family.echo_reply()
            && self.code == 0
            && self.ident == ident
            && self.seq == seq
    }
}

fn ipv4_payload_offset(datagram: &[u8]) -> Result<usize, ParseError> {
    let first = *datagram.first().ok_or(ParseError::Truncated(0))?;
    if first >> 4 != 4 {
        return Err(ParseError::NotIpv4(first >> 4));
    }
    let ihl = (first & 0x0F) as usize * 4;
    if ihl < IPV4_MIN_HEADER_LEN {
        return Err(ParseError::BadHeaderLength(ihl));
    }
    Ok(ihl)
}
