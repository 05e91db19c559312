//! # Solarmetria Push
//!
//! Lê os três INA219 do arranjo solar e publica o evento compacto no
//! broker MQTT esperado no peer do ponto de acesso, a cada 2 s.
//! Falha de entrega derruba a sessão e a próxima iteração refaz o
//! handshake – o laço nunca termina por erro de transporte.

mod delivery;
mod mqtt;

use std::time::{Duration, Instant};

use delivery::Delivery;
use mqtt::MqttTransport;
use solar_core::config::AppConfig;
use solar_core::payload::encode_compact;
use tracing::{error, info, warn};

fn main() {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    for problem in config.validate() {
        warn!("Config: {problem}");
    }
    let push_cfg = &config.push;
    let interval = Duration::from_millis(push_cfg.interval_ms);

    // ── Banco de sensores ──
    let mut bank = push_cfg.bus.build_bank();
    bank.init();
    info!("{}/{} canais vivos", bank.live_count(), bank.len());

    // ── Canal de entrega ──
    let transport = MqttTransport::new(
        push_cfg.broker_host.clone(),
        push_cfg.broker_port,
        push_cfg.topic.clone(),
        push_cfg.client_prefix.clone(),
        Duration::from_millis(push_cfg.connect_timeout_ms),
    );
    let mut delivery = Delivery::new(
        transport,
        Duration::from_millis(push_cfg.reconnect_delay_ms),
    );

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ☀ SOLARMETRIA PUSH – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  AP:        {} (bring-up pela plataforma)", push_cfg.ap.ssid);
    println!("  Broker:    {}:{}", push_cfg.broker_host, push_cfg.broker_port);
    println!("  Tópico:    {}", push_cfg.topic);
    println!("  Cadência:  {:.1}s", push_cfg.interval_ms as f64 / 1000.0);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Laço principal ──
    loop {
        let cycle_start = Instant::now();

        // Restaura a conexão antes de amostrar, como o firmware
        delivery.ensure_connected();

        let batch = bank.collect();
        match encode_compact(&batch) {
            Ok(payload) => match delivery.deliver(&payload) {
                Ok(()) => {
                    info!(
                        "→ lote #{} ({} bytes) publicado em {}",
                        batch.seq,
                        payload.len(),
                        push_cfg.topic
                    );
                }
                Err(e) => {
                    // Lote perdido fica registrado; reconexão na próxima volta
                    warn!("Lote #{} não entregue: {e}", batch.seq);
                }
            },
            Err(e) => error!("Erro ao codificar lote #{}: {e}", batch.seq),
        }

        // Dormir pelo tempo restante do intervalo
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }
}
