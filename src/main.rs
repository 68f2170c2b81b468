// Tratamento de erros ergonômico
use anyhow::{Context, Result};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pingrs_echo::{RawSocketOpener, RunOutcome, Session};

// Módulos locais
mod args;

/// Programa principal: envia Echo Requests e aguarda os Echo Replies.
/// Requer root (ou CAP_NET_RAW) para abrir o socket RAW.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = args::parse()?;
    let count = config.count;

    // Ctrl+C para a execução entre uma tentativa e outra
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Erro ao configurar handler de Ctrl+C")?;

    let mut session = Session::new(config)
        .context("Configuração inválida")?
        .with_interrupt(running);

    println!(
        "Disparando {} com {} bytes de dados (id={}):",
        session.destination(),
        session.payload_size(),
        session.identifier()
    );

    let outcome = session
        .run(&mut RawSocketOpener, count)
        .context("Falha ao criar socket RAW. Verifique se está rodando como root.")?;

    let stats = match outcome {
        RunOutcome::Completed(stats) | RunOutcome::Interrupted(stats) => stats,
        RunOutcome::TimedOut(stats) => {
            anyhow::bail!(
                "Tempo limite total esgotado após {} de {} pacotes",
                stats.sent(),
                count
            );
        }
    };

    println!("\n--- estatísticas de ping para {} ---", session.destination());
    println!("{stats}");
    let rtt = stats
        .summary()
        .context("Não é possível calcular o tempo médio")?;
    println!("{rtt}");

    Ok(())
}
