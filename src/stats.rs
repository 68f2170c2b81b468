use std::fmt;
use std::time::Duration;

use crate::error::{PingError, PingResult};

/// Contadores e tempos de ida e volta acumulados por uma sessão.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    sent: u64,
    received: u64,
    min: Option<Duration>,
    max: Option<Duration>,
    total: Duration,
}

/// Tempos derivados, disponíveis apenas com pelo menos uma resposta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttSummary {
    pub min: Duration,
    pub max: Duration,
    pub avg: Duration,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    pub fn record_reply(&mut self, rtt: Duration) {
        self.received += 1;
        self.total += rtt;
        self.min = Some(self.min.map_or(rtt, |m| m.min(rtt)));
        self.max = Some(self.max.map_or(rtt, |m| m.max(rtt)));
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn dropped(&self) -> u64 {
        self.sent.saturating_sub(self.received)
    }

    pub fn min(&self) -> Option<Duration> {
        self.min
    }

    pub fn max(&self) -> Option<Duration> {
        self.max
    }

    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            return 0.0;
        }
        self.dropped() as f64 / self.sent as f64 * 100.0
    }

    /// Média dos RTTs. Falha com `NoReplies` se nada foi recebido.
    pub fn average(&self) -> PingResult<Duration> {
        if self.received == 0 {
            return Err(PingError::NoReplies);
        }
        let nanos = self.total.as_nanos() / self.received as u128;
        Ok(Duration::from_nanos(nanos as u64))
    }

    pub fn summary(&self) -> PingResult<RttSummary> {
        let avg = self.average()?;
        match (self.min, self.max) {
            (Some(min), Some(max)) => Ok(RttSummary { min, max, avg }),
            _ => Err(PingError::NoReplies),
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pacotes enviados:\t{}", self.sent)?;
        writeln!(f, "Pacotes recebidos:\t{}", self.received)?;
        write!(
            f,
            "Pacotes perdidos:\t{} ({:.0}% de perda)",
            self.dropped(),
            self.loss_percent()
        )
    }
}

impl fmt::Display for RttSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        writeln!(f, "Tempo máximo:\t{:.3} ms", ms(self.max))?;
        writeln!(f, "Tempo mínimo:\t{:.3} ms", ms(self.min))?;
        write!(f, "Tempo médio:\t{:.3} ms", ms(self.avg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn empty_has_no_average() {
        let stats = Statistics::new();
        assert!(matches!(stats.average(), Err(PingError::NoReplies)));
        assert!(matches!(stats.summary(), Err(PingError::NoReplies)));
        assert_eq!(stats.loss_percent(), 0.0);
    }

    #[test]
    fn all_dropped() {
        let mut stats = Statistics::new();
        for _ in 0..3 {
            stats.record_sent();
        }
        assert_eq!(stats.sent(), 3);
        assert_eq!(stats.received(), 0);
        assert_eq!(stats.dropped(), 3);
        assert_eq!(stats.loss_percent(), 100.0);
        assert!(matches!(stats.average(), Err(PingError::NoReplies)));
    }

    #[test]
    fn min_max_avg() {
        let mut stats = Statistics::new();
        for rtt in [ms(30), ms(10), ms(20)] {
            stats.record_sent();
            stats.record_reply(rtt);
        }
        stats.record_sent();

        let summary = stats.summary().unwrap();
        assert_eq!(summary.min, ms(10));
        assert_eq!(summary.max, ms(30));
        assert_eq!(summary.avg, ms(20));
        assert_eq!(stats.dropped(), 1);
        assert_eq!(stats.total, ms(60));
    }

    #[test]
    fn average_stays_within_bounds() {
        let mut stats = Statistics::new();
        for nanos in [1, 2, 2] {
            stats.record_sent();
            stats.record_reply(Duration::from_nanos(nanos));
        }
        let s = stats.summary().unwrap();
        assert!(s.min <= s.avg && s.avg <= s.max);
    }

    #[test]
    fn display_counters() {
        let mut stats = Statistics::new();
        stats.record_sent();
        stats.record_sent();
        stats.record_reply(ms(1));
        let text = stats.to_string();
        assert!(text.contains("Pacotes enviados:\t2"));
        assert!(text.contains("Pacotes recebidos:\t1"));
        assert!(text.contains("Pacotes perdidos:\t1 (50% de perda)"));
    }
}
