//! Banco de sensores – porta `PowerSensor`, arena de canais e coleta.
//!
//! A porta abstrai o hardware (INA219 real via I2C ou simulado) para
//! que o laço de aquisição não conheça detalhes do barramento. A
//! arena de canais é criada uma vez na inicialização e imutável
//! depois, exceto pela flag de vivacidade.

use tracing::{info, warn};

use crate::types::{Batch, ChannelReading, RawSample};

/// Erros de acesso ao sensor.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("Sensor não inicializado")]
    NotInitialized,

    #[error("Erro de barramento: {0}")]
    Bus(String),

    #[error("Sensor retornou dados inválidos")]
    InvalidData,
}

/// Porta para um canal físico de medição.
///
/// `begin` roda uma única vez na partida e aplica o perfil fixo de
/// calibração; `read` nunca deve bloquear além do timeout do
/// barramento nem encerrar o processo.
pub trait PowerSensor {
    /// Inicializa o sensor e aplica a calibração. `false` = ausente.
    fn begin(&mut self) -> bool;

    /// Lê os quatro registradores do canal.
    fn read(&mut self) -> Result<RawSample, SensorError>;
}

/// Registro de um canal na arena: identidade estável + vivacidade.
pub struct Channel {
    /// Id estável, 1-based, na ordem configurada
    pub id: u16,
    /// Nome curto para logs ("circuito", "panel_1"…)
    pub label: String,
    /// Vivacidade: a inicialização funcionou?
    pub live: bool,
    sensor: Box<dyn PowerSensor>,
}

/// Arena de canais + contador de sequência dos lotes.
///
/// O agregador: [`SensorBank::collect`] percorre os canais na ordem
/// configurada e monta um [`Batch`] com uma posição por canal,
/// sempre – canal morto contribui um placeholder, nunca um slot
/// ausente (consumidores indexam por posição).
pub struct SensorBank {
    channels: Vec<Channel>,
    seq: u64,
}

impl SensorBank {
    /// Monta a arena na ordem dada. Ids são atribuídos 1-based.
    pub fn new(sensors: Vec<(String, Box<dyn PowerSensor>)>) -> Self {
        let channels = sensors
            .into_iter()
            .enumerate()
            .map(|(i, (label, sensor))| Channel {
                id: (i + 1) as u16,
                label,
                live: false,
                sensor,
            })
            .collect();
        Self { channels, seq: 0 }
    }

    /// Inicializa cada canal uma vez. Falha individual marca o canal
    /// como não-vivo e segue para o próximo – nunca aborta a partida.
    pub fn init(&mut self) {
        for ch in &mut self.channels {
            ch.live = ch.sensor.begin();
            if ch.live {
                info!("✓ Canal {} ({}) inicializado", ch.id, ch.label);
            } else {
                warn!("✗ Canal {} ({}) não encontrado no barramento", ch.id, ch.label);
            }
        }
    }

    /// Quantidade de canais configurados.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// `true` se nenhum canal foi configurado.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Quantidade de canais vivos.
    pub fn live_count(&self) -> usize {
        self.channels.iter().filter(|c| c.live).count()
    }

    /// Coleta um lote: uma leitura por canal, na ordem configurada.
    ///
    /// Erro de leitura rende uma amostra zerada só neste ciclo (o
    /// canal segue vivo); nenhum ciclo é pulado por um canal ruim.
    /// Não há retry aqui – retry é preocupação da entrega.
    pub fn collect(&mut self) -> Batch {
        self.seq += 1;
        let readings = self
            .channels
            .iter_mut()
            .map(|ch| {
                let sample = if ch.live {
                    match ch.sensor.read() {
                        Ok(raw) => Some(raw),
                        Err(e) => {
                            warn!("Erro lendo canal {} ({}): {e}", ch.id, ch.label);
                            Some(RawSample::default())
                        }
                    }
                } else {
                    None
                };
                ChannelReading { id: ch.id, sample }
            })
            .collect();

        Batch {
            seq: self.seq,
            readings,
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimSensor;

    fn bank_with(sensors: Vec<SimSensor>) -> SensorBank {
        let boxed = sensors
            .into_iter()
            .enumerate()
            .map(|(i, s)| (format!("canal_{}", i + 1), Box::new(s) as Box<dyn PowerSensor>))
            .collect();
        SensorBank::new(boxed)
    }

    #[test]
    fn ids_are_one_based_in_configured_order() {
        let mut bank = bank_with(vec![
            SimSensor::steady(12.0, 1000.0),
            SimSensor::steady(13.0, 500.0),
            SimSensor::steady(5.0, 100.0),
        ]);
        bank.init();
        let batch = bank.collect();
        let ids: Vec<u16> = batch.readings.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn dead_channel_yields_placeholder_every_cycle() {
        let mut bank = bank_with(vec![
            SimSensor::steady(12.0, 1000.0),
            SimSensor::absent(),
            SimSensor::steady(5.0, 100.0),
        ]);
        bank.init();
        assert_eq!(bank.live_count(), 2);

        for _ in 0..4 {
            let batch = bank.collect();
            assert_eq!(batch.len(), 3);
            assert!(batch.readings[0].sample.is_some());
            assert!(batch.readings[1].sample.is_none());
            assert!(batch.readings[2].sample.is_some());
            // Ids estáveis mesmo com canal morto no meio
            assert_eq!(batch.readings[1].id, 2);
        }
    }

    #[test]
    fn read_error_degrades_to_zero_sample_and_channel_stays_live() {
        let mut bank = bank_with(vec![SimSensor::failing_reads()]);
        bank.init();
        assert_eq!(bank.live_count(), 1);

        let batch = bank.collect();
        assert_eq!(batch.readings[0].sample, Some(RawSample::default()));
        // Nenhuma demoção de vivacidade por erro de leitura
        assert_eq!(bank.live_count(), 1);
    }

    #[test]
    fn sequence_increments_per_batch() {
        let mut bank = bank_with(vec![SimSensor::steady(12.0, 1000.0)]);
        bank.init();
        assert_eq!(bank.collect().seq, 1);
        assert_eq!(bank.collect().seq, 2);
        assert_eq!(bank.collect().seq, 3);
    }
}
