//! Definição de tipos para as medições dos INA219.
//!
//! Um [`RawSample`] carrega os quatro registradores do sensor em
//! unidades de engenharia; um [`DerivedSample`] é a forma derivada
//! usada pela entrega push (V, A, W). Um [`Batch`] agrupa uma leitura
//! por canal configurado, em ordem estável.

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Amostras
// ──────────────────────────────────────────────

/// Leitura instantânea de um canal, direto dos registradores.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSample {
    /// Tensão de barramento (V)
    pub bus_voltage_v: f64,
    /// Tensão de shunt (mV)
    pub shunt_voltage_mv: f64,
    /// Corrente (mA)
    pub current_ma: f64,
    /// Potência do registrador de hardware (mW)
    pub power_mw: f64,
}

/// Forma derivada usada pela entrega push (MQTT).
///
/// A potência é sempre recalculada como `voltage_v * current_a` no
/// momento da entrega, nunca copiada do registrador de potência do
/// hardware. A entrega pull, ao contrário, repassa o registrador
/// (`p_mw`) – divergência intencional entre os dois transportes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DerivedSample {
    /// Tensão (V)
    pub voltage_v: f64,
    /// Corrente (A), convertida de mA
    pub current_a: f64,
    /// Potência (W), `voltage_v * current_a`
    pub power_w: f64,
}

impl DerivedSample {
    /// Converte uma leitura crua: mA → A e potência recalculada.
    pub fn from_raw(raw: &RawSample) -> Self {
        let voltage_v = raw.bus_voltage_v;
        let current_a = raw.current_ma / 1000.0;
        Self {
            voltage_v,
            current_a,
            power_w: voltage_v * current_a,
        }
    }
}

// ──────────────────────────────────────────────
// Lote de leituras
// ──────────────────────────────────────────────

/// Leitura de um canal dentro de um lote.
///
/// `sample == None` marca um canal cuja inicialização falhou: a
/// posição é preservada (consumidores indexam por posição), nunca
/// removida silenciosamente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelReading {
    /// Id do canal, 1-based, na ordem configurada
    pub id: u16,
    /// Leitura do ciclo, ou `None` se o canal não está vivo
    pub sample: Option<RawSample>,
}

/// Um conjunto sincronizado de leituras, um por canal configurado.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    /// Índice de sequência, incrementado a cada coleta
    pub seq: u64,
    /// Leituras na ordem configurada dos canais
    pub readings: Vec<ChannelReading>,
}

impl Batch {
    /// Quantidade de posições (vivas ou não) no lote.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Lote sem nenhuma posição.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
