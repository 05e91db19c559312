//! # Solar Core
//!
//! Crate compartilhada que define as estruturas de dados, os formatos
//! de payload JSON, a configuração TOML e o banco de sensores do
//! sistema Solarmetria (monitor solar com INA219).
//!
//! ## Módulos
//! - [`types`] – Amostras (RawSample, DerivedSample) e lotes (Batch)
//! - [`payload`] – Encode/decode dos dois formatos de entrega
//! - [`sensor`] – Porta `PowerSensor`, arena de canais e agregador
//! - [`ina219`] – Adapter I2C para o sensor INA219
//! - [`sim`] – Sensores simulados (testes e execução sem hardware)
//! - [`config`] – Configuração unificada via TOML

pub mod config;
pub mod ina219;
pub mod payload;
pub mod sensor;
pub mod sim;
pub mod types;

// Re-exports convenientes
pub use config::{AppConfig, PullConfig, PushConfig};
pub use payload::{encode_compact, encode_report, PayloadError};
pub use sensor::{PowerSensor, SensorBank, SensorError};
pub use types::{Batch, ChannelReading, DerivedSample, RawSample};
