//! Configuração unificada via TOML.
//!
//! Os defaults de cada seção carregam as constantes de fábrica do
//! dispositivo (endereços I2C, SSID/senha do AP, broker, tópico,
//! cadências); um `config.toml` ao lado do executável pode
//! sobrescrevê-los campo a campo.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ina219::Ina219Sensor;
use crate::sensor::{PowerSensor, SensorBank};
use crate::sim::SimSensor;

/// Um canal configurado: rótulo para logs + endereço no barramento.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelSpec {
    pub label: String,
    /// Endereço I2C (0x40, 0x41, 0x44…)
    pub address: u16,
}

/// Barramento compartilhado e seus canais, em ordem significativa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Device I2C do Linux
    pub device: String,
    /// "i2c" ou "sim" (execução sem hardware)
    pub driver: String,
    /// Canais na ordem dos ids 1..N
    pub channels: Vec<ChannelSpec>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: "/dev/i2c-1".into(),
            driver: "i2c".into(),
            channels: Vec::new(),
        }
    }
}

impl BusConfig {
    /// Monta o banco de sensores na ordem configurada.
    ///
    /// Driver desconhecido cai no simulado com um aviso – partida
    /// nunca aborta por configuração de driver.
    pub fn build_bank(&self) -> SensorBank {
        let sensors = self
            .channels
            .iter()
            .map(|spec| {
                let sensor: Box<dyn PowerSensor> = match self.driver.as_str() {
                    "i2c" => Box::new(Ina219Sensor::new(&self.device, spec.address)),
                    "sim" => Box::new(sim_channel(spec.address)),
                    other => {
                        warn!("Driver desconhecido '{other}', usando simulado");
                        Box::new(sim_channel(spec.address))
                    }
                };
                (spec.label.clone(), sensor)
            })
            .collect();
        SensorBank::new(sensors)
    }
}

/// Valores simulados plausíveis de um arranjo solar, por endereço.
fn sim_channel(address: u16) -> SimSensor {
    match address {
        0x40 => SimSensor::steady(12.6, 1500.0), // circuito / carga
        0x44 => SimSensor::steady(13.8, 820.0),  // painel 1
        0x41 => SimSensor::steady(13.7, 790.0),  // painel 2
        _ => SimSensor::steady(12.0, 500.0),
    }
}

/// Ponto de acesso WiFi (bring-up pertence à plataforma; as
/// constantes ficam aqui porque a regra de senha faz parte do
/// contrato externo).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApConfig {
    pub ssid: String,
    pub passphrase: String,
}

impl Default for ApConfig {
    fn default() -> Self {
        Self {
            ssid: "ESP32-SOLAR".into(),
            passphrase: "12345678".into(),
        }
    }
}

/// Variante pull: responder HTTP dentro do AP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    /// Endereço de escuta do responder
    pub bind: String,
    /// Tick cooperativo do laço (ms)
    pub tick_ms: u64,
    pub ap: ApConfig,
    pub bus: BusConfig,
}

impl Default for PullConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:80".into(),
            tick_ms: 10,
            ap: ApConfig {
                ssid: "ESP32-INA219".into(),
                passphrase: "clave123".into(),
            },
            bus: BusConfig {
                channels: vec![
                    ChannelSpec { label: "ina_1".into(), address: 0x40 },
                    ChannelSpec { label: "ina_2".into(), address: 0x41 },
                    ChannelSpec { label: "ina_3".into(), address: 0x44 },
                ],
                ..BusConfig::default()
            },
        }
    }
}

/// Variante push: publicador MQTT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Broker esperado no peer do AP
    pub broker_host: String,
    pub broker_port: u16,
    /// Tópico único de publicação
    pub topic: String,
    /// Prefixo do id de sessão (completado com a MAC sem dois-pontos)
    pub client_prefix: String,
    /// Cadência de publicação (ms)
    pub interval_ms: u64,
    /// Atraso fixo entre tentativas de reconexão (ms)
    pub reconnect_delay_ms: u64,
    /// Timeout de uma tentativa de conexão (ms)
    pub connect_timeout_ms: u64,
    pub ap: ApConfig,
    pub bus: BusConfig,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            broker_host: "192.168.4.2".into(),
            broker_port: 1883,
            topic: "esp32/ina219".into(),
            client_prefix: "ESP32_SOLAR_".into(),
            interval_ms: 2000,
            reconnect_delay_ms: 2000,
            connect_timeout_ms: 4000,
            ap: ApConfig {
                ssid: "ESP32-SOLAR".into(),
                passphrase: "12345678".into(),
            },
            bus: BusConfig {
                channels: vec![
                    ChannelSpec { label: "circuito".into(), address: 0x40 },
                    ChannelSpec { label: "panel_1".into(), address: 0x44 },
                    ChannelSpec { label: "panel_2".into(), address: 0x41 },
                ],
                ..BusConfig::default()
            },
        }
    }
}

/// Configuração raiz (unifica as duas variantes em um arquivo).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pull: PullConfig,
    pub push: PushConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML; ausência = defaults.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.pull.ap.passphrase.len() < 8 {
            errors.push("Senha do AP (pull) precisa de ao menos 8 caracteres".into());
        }
        if self.push.ap.passphrase.len() < 8 {
            errors.push("Senha do AP (push) precisa de ao menos 8 caracteres".into());
        }
        if self.pull.bus.channels.is_empty() {
            errors.push("Nenhum canal configurado para a variante pull".into());
        }
        if self.push.bus.channels.is_empty() {
            errors.push("Nenhum canal configurado para a variante push".into());
        }
        if self.push.broker_port == 0 {
            errors.push("Porta do broker não pode ser 0".into());
        }
        if self.push.interval_ms == 0 {
            errors.push("Cadência de publicação não pode ser 0".into());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn defaults_carry_firmware_constants() {
        let config = AppConfig::default();
        assert_eq!(config.push.broker_host, "192.168.4.2");
        assert_eq!(config.push.topic, "esp32/ina219");
        assert_eq!(config.push.interval_ms, 2000);
        assert_eq!(config.pull.tick_ms, 10);

        let pull_addrs: Vec<u16> =
            config.pull.bus.channels.iter().map(|c| c.address).collect();
        assert_eq!(pull_addrs, vec![0x40, 0x41, 0x44]);
        // Ordem push: circuito, painel 1, painel 2
        let push_addrs: Vec<u16> =
            config.push.bus.channels.iter().map(|c| c.address).collect();
        assert_eq!(push_addrs, vec![0x40, 0x44, 0x41]);
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.push.topic, config.push.topic);
        assert_eq!(parsed.pull.bus.channels, config.pull.bus.channels);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[push]
broker_host = "10.0.0.9"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.push.broker_host, "10.0.0.9");
        // Outros campos devem ter valor padrão
        assert_eq!(config.push.broker_port, 1883);
        assert_eq!(config.pull.tick_ms, 10);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.push.broker_host = "10.1.2.3".into();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.push.broker_host, "10.1.2.3");
        assert_eq!(loaded.pull.tick_ms, config.pull.tick_ms);
        assert_eq!(loaded.push.bus.channels, config.push.bus.channels);
    }

    #[test]
    fn partial_ap_table_keeps_other_overrides() {
        // Tabela [pull.ap] incompleta não pode invalidar o arquivo
        let partial = r#"
[pull]
tick_ms = 25

[pull.ap]
ssid = "MINHA-REDE"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.pull.ap.ssid, "MINHA-REDE");
        assert_eq!(config.pull.ap.passphrase, "12345678");
        assert_eq!(config.pull.tick_ms, 25);
    }

    #[test]
    fn short_passphrase_is_rejected() {
        let mut config = AppConfig::default();
        config.push.ap.passphrase = "curta".into();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("8 caracteres"));
    }

    #[test]
    fn sim_bank_matches_channel_order() {
        let mut cfg = PushConfig::default();
        cfg.bus.driver = "sim".into();
        let mut bank = cfg.bus.build_bank();
        bank.init();
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.live_count(), 3);

        let batch = bank.collect();
        let ids: Vec<u16> = batch.readings.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
