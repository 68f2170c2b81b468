use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PingError {
    #[error("falha ao criar socket RAW (requer root/CAP_NET_RAW): {0}")]
    Open(#[source] io::Error),

    #[error("falha ao enviar Echo Request: {0}")]
    Send(#[source] io::Error),

    #[error("erro na leitura do socket: {0}")]
    Receive(#[source] io::Error),

    #[error("payload de {size} bytes fora do intervalo [{min}, {max}]")]
    PayloadSize { size: usize, min: usize, max: usize },

    #[error("o timeout precisa ser maior que zero")]
    ZeroTimeout,

    #[error("timeout acima do máximo de {0:?}")]
    TimeoutTooLarge(std::time::Duration),

    #[error("nenhuma resposta recebida, tempo médio indefinido")]
    NoReplies,
}

pub type PingResult<T> = Result<T, PingError>;

/// Motivos para descartar um datagrama recebido.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("datagrama truncado ({0} bytes)")]
    Truncated(usize),

    #[error("versão IP inesperada: {0}")]
    NotIpv4(u8),

    #[error("IHL inválido: {0} bytes")]
    BadHeaderLength(usize),
}
