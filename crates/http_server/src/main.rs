//! # Solarmetria Pull
//!
//! Responder HTTP dentro do ponto de acesso: `GET /` devolve o
//! relatório estruturado com a leitura mais recente dos INA219. O
//! laço é single-thread com tick cooperativo de 10 ms – o consumidor
//! é quem inicia cada transmissão; nunca abrimos conexões de saída.

use std::time::Duration;

use solar_core::config::AppConfig;
use solar_core::payload::encode_report;
use solar_core::sensor::SensorBank;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{error, info, warn};

/// Resultado do roteamento de uma requisição.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    /// `GET /` → relatório estruturado
    Report,
    /// Qualquer outra coisa → 404 (não há outros endpoints)
    NotFound,
}

fn route(method: &Method, url: &str) -> Route {
    if *method == Method::Get && url == "/" {
        Route::Report
    } else {
        Route::NotFound
    }
}

/// Atende uma requisição: coleta um lote fresco e codifica sob demanda.
fn handle_request(request: Request, bank: &mut SensorBank, json_header: &Header) {
    let outcome = match route(request.method(), request.url()) {
        Route::Report => {
            let batch = bank.collect();
            match encode_report(&batch) {
                Ok(body) => {
                    info!("GET / → lote #{} ({} bytes)", batch.seq, body.len());
                    request.respond(
                        Response::from_data(body).with_header(json_header.clone()),
                    )
                }
                Err(e) => {
                    error!("Erro ao codificar lote: {e}");
                    request.respond(Response::from_string("error").with_status_code(500))
                }
            }
        }
        Route::NotFound => {
            request.respond(Response::from_string("not found").with_status_code(404))
        }
    };

    if let Err(e) = outcome {
        // Cliente desistiu no meio da resposta; segue o laço
        warn!("Erro ao responder: {e}");
    }
}

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
    let pull_cfg = &config.pull;
    let tick = Duration::from_millis(pull_cfg.tick_ms);

    // ── Banco de sensores ──
    let mut bank = pull_cfg.bus.build_bank();
    bank.init();
    info!("{}/{} canais vivos", bank.live_count(), bank.len());

    // ── Servidor HTTP ──
    // Sem listener não há serviço nenhum; é o único fatal da partida
    let server = Server::http(pull_cfg.bind.as_str())
        .unwrap_or_else(|e| panic!("Falha ao escutar em {}: {e}", pull_cfg.bind));
    let json_header: Header = "Content-Type: application/json"
        .parse()
        .expect("header estático");

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ☀ SOLARMETRIA PULL – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  AP:       {} (bring-up pela plataforma)", pull_cfg.ap.ssid);
    println!("  Escuta:   {}", pull_cfg.bind);
    println!("  Tick:     {} ms", pull_cfg.tick_ms);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Laço principal ──
    loop {
        match server.recv_timeout(tick) {
            Ok(Some(request)) => handle_request(request, &mut bank, &json_header),
            Ok(None) => {} // Tick sem requisição pendente
            Err(e) => warn!("Erro ao receber requisição: {e}"),
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_root_serves_the_report() {
        assert_eq!(route(&Method::Get, "/"), Route::Report);
        assert_eq!(route(&Method::Get, "/metrics"), Route::NotFound);
        assert_eq!(route(&Method::Post, "/"), Route::NotFound);
        assert_eq!(route(&Method::Head, "/"), Route::NotFound);
    }
}
