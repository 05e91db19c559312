//! Formatos de payload dos dois transportes.
//!
//! - **Relatório estruturado** (pull/HTTP): objeto com a lista
//!   `mediciones`, um item por canal com id 1-based e os quatro campos
//!   crus do sensor. É o formato que o cliente consulta em `GET /`.
//! - **Evento compacto** (push/MQTT): objeto plano com exatamente nove
//!   campos numéricos (`current_1..3`, `voltage_1..3`, `power_1..3`),
//!   o formato esperado pelo logger/SQL/dashboard.
//!
//! Ambos arredondam para 3 casas decimais e são determinísticos: o
//! mesmo [`Batch`] produz sempre os mesmos bytes. Os nomes de campo
//! são contrato externo e não podem mudar.

use serde::{Deserialize, Serialize};

use crate::types::{Batch, DerivedSample, RawSample};

/// Quantidade de canais do formato compacto (esquema SQL fixo).
pub const COMPACT_CHANNELS: usize = 3;

/// Marcador de canal indisponível no relatório estruturado.
const UNAVAILABLE_MARKER: &str = "sensor no disponible";

/// Erros de codificação/decodificação de payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Lote com {0} canais (formato compacto exige {COMPACT_CHANNELS})")]
    WrongChannelCount(usize),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Arredonda para 3 casas decimais (separador `.`, independente de locale).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ──────────────────────────────────────────────
// Relatório estruturado (pull)
// ──────────────────────────────────────────────

/// Item da lista `mediciones`. A ordem dos campos segue a declaração.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicion {
    pub id: u16,
    pub v_bus: f64,
    pub v_shunt: f64,
    pub c_ma: f64,
    pub p_mw: f64,
    /// Presente apenas quando o canal não está vivo
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Corpo completo da resposta HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportPayload {
    pub mediciones: Vec<Medicion>,
}

/// Codifica um [`Batch`] no relatório estruturado.
///
/// Canal indisponível mantém a posição com campos zerados e o campo
/// `error` – nunca um slot ausente.
pub fn encode_report(batch: &Batch) -> Result<Vec<u8>, PayloadError> {
    let mediciones = batch
        .readings
        .iter()
        .map(|reading| {
            let raw: RawSample = reading.sample.unwrap_or_default();
            Medicion {
                id: reading.id,
                v_bus: round3(raw.bus_voltage_v),
                v_shunt: round3(raw.shunt_voltage_mv),
                c_ma: round3(raw.current_ma),
                p_mw: round3(raw.power_mw),
                error: reading
                    .sample
                    .is_none()
                    .then(|| UNAVAILABLE_MARKER.to_string()),
            }
        })
        .collect();

    serde_json::to_vec(&ReportPayload { mediciones })
        .map_err(|e| PayloadError::Serialize(e.to_string()))
}

/// Decodifica o relatório estruturado (caminho de teste/depuração).
pub fn decode_report(data: &[u8]) -> Result<ReportPayload, PayloadError> {
    serde_json::from_slice(data).map_err(|e| PayloadError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Evento compacto (push)
// ──────────────────────────────────────────────

/// Os nove campos do evento compacto, na ordem do esquema SQL.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompactPayload {
    pub current_1: f64,
    pub current_2: f64,
    pub current_3: f64,
    pub voltage_1: f64,
    pub voltage_2: f64,
    pub voltage_3: f64,
    pub power_1: f64,
    pub power_2: f64,
    pub power_3: f64,
}

/// Codifica um [`Batch`] de exatamente 3 canais no evento compacto.
///
/// A potência de cada canal é a recalculada de [`DerivedSample`],
/// nunca o registrador de hardware. Canal indisponível contribui
/// zeros (o formato não tem espaço para marcador).
pub fn encode_compact(batch: &Batch) -> Result<Vec<u8>, PayloadError> {
    if batch.len() != COMPACT_CHANNELS {
        return Err(PayloadError::WrongChannelCount(batch.len()));
    }

    let derived: Vec<DerivedSample> = batch
        .readings
        .iter()
        .map(|r| DerivedSample::from_raw(&r.sample.unwrap_or_default()))
        .collect();

    let payload = CompactPayload {
        current_1: round3(derived[0].current_a),
        current_2: round3(derived[1].current_a),
        current_3: round3(derived[2].current_a),
        voltage_1: round3(derived[0].voltage_v),
        voltage_2: round3(derived[1].voltage_v),
        voltage_3: round3(derived[2].voltage_v),
        power_1: round3(derived[0].power_w),
        power_2: round3(derived[1].power_w),
        power_3: round3(derived[2].power_w),
    };

    serde_json::to_vec(&payload).map_err(|e| PayloadError::Serialize(e.to_string()))
}

/// Decodifica o evento compacto (caminho de teste/depuração).
pub fn decode_compact(data: &[u8]) -> Result<CompactPayload, PayloadError> {
    serde_json::from_slice(data).map_err(|e| PayloadError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
