use anyhow::{Context, Result};
use pingrs_echo::SessionConfig;
use std::net::IpAddr;
use std::time::Duration;

const USAGE: &str = "Uso: pingrs <ip> [-c <count>] [-w <timeout_s>] [-W <reply_timeout_s>] \
                     [-i <identifier>] [-s <payload_bytes>] [-I <interval_s>]";

pub fn parse() -> Result<SessionConfig> {
    parse_from(std::env::args().skip(1))
}

pub fn parse_from<I, S>(args: I) -> Result<SessionConfig>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let mut dst_str = None;
    let mut count = None;
    let mut timeout = None;
    let mut reply_timeout = None;
    let mut identifier = None;
    let mut size = None;
    let mut interval = None;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => anyhow::bail!(USAGE),
            "-c" | "-w" | "-W" | "-i" | "-s" | "-I" => {
                let value = args
                    .get(i + 1)
                    .with_context(|| format!("Faltou o valor para {flag}"))?;
                match flag {
                    "-c" => count = Some(value.parse().context("Valor inválido para -c")?),
                    "-w" => timeout = Some(seconds(value).context("Valor inválido para -w")?),
                    "-W" => {
                        reply_timeout = Some(seconds(value).context("Valor inválido para -W")?)
                    }
                    "-i" => identifier = Some(value.parse().context("Valor inválido para -i")?),
                    "-s" => size = Some(value.parse().context("Valor inválido para -s")?),
                    _ => interval = Some(seconds(value).context("Valor inválido para -I")?),
                }
                i += 1;
            }
            val => {
                if dst_str.is_none() {
                    dst_str = Some(val.to_owned());
                }
            }
        }
        i += 1;
    }

    let dst_str = dst_str.context(USAGE)?;
    // Aceita apenas literais IPv4/IPv6; sem resolução de nomes
    let dst: IpAddr = dst_str.parse().context("Endereço IP inválido")?;

    let mut config = SessionConfig::new(dst);
    if let Some(c) = count {
        config.count = c;
    }
    if let Some(t) = timeout {
        config.timeout = t;
    }
    config.reply_timeout = reply_timeout;
    config.identifier = identifier;
    if let Some(s) = size {
        config.payload_size = s;
    }
    if let Some(i) = interval {
        config.interval = i;
    }
    Ok(config)
}

fn seconds(value: &str) -> Result<Duration> {
    let secs: f64 = value.parse()?;
    Ok(Duration::try_from_secs_f64(secs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn destination_only_uses_defaults() {
        let config = parse_from(["10.0.0.1"]).unwrap();
        assert_eq!(config, SessionConfig::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
    }

    #[test]
    fn all_flags() {
        let config = parse_from([
            "-c", "5", "::1", "-w", "2.5", "-W", "0.5", "-i", "7", "-s", "64", "-I", "1",
        ])
        .unwrap();
        assert_eq!(config.destination, "::1".parse::<IpAddr>().unwrap());
        assert_eq!(config.count, 5);
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.reply_timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.identifier, Some(7));
        assert_eq!(config.payload_size, 64);
        assert_eq!(config.interval, Duration::from_secs(1));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_from(Vec::<String>::new()).is_err());
        assert!(parse_from(["256.0.0.1"]).is_err());
        assert!(parse_from(["example.com"]).is_err());
        assert!(parse_from(["127.0.0.1", "-c"]).is_err());
        assert!(parse_from(["127.0.0.1", "-w", "-1"]).is_err());
        assert!(parse_from(["127.0.0.1", "-i", "70000"]).is_err());
    }
}
