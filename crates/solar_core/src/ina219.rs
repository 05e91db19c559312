//! Adapter I2C para o INA219 (monitor de corrente/tensão).
//!
//! Implementa a porta [`PowerSensor`] sobre `/dev/i2c-N` com o perfil
//! fixo de calibração 32V/2A (o mesmo `setCalibration_32V_2A` do
//! driver Adafruit): calibração 4096, LSB de corrente 0,1 mA, LSB de
//! potência 2 mW.

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tracing::debug;

use crate::sensor::{PowerSensor, SensorError};
use crate::types::RawSample;

// Registradores do INA219
const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_POWER: u8 = 0x03;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

// Perfil 32V/2A: BRNG=32V, PGA /8, ADC 12 bits, modo contínuo
const CONFIG_32V_2A: u16 = 0x399F;
const CALIBRATION_32V_2A: u16 = 4096;

/// LSB de corrente do perfil 32V/2A (mA por bit)
const CURRENT_LSB_MA: f64 = 0.1;
/// LSB de potência do perfil 32V/2A (mW por bit)
const POWER_LSB_MW: f64 = 2.0;
/// LSB do registrador de shunt (mV por bit)
const SHUNT_LSB_MV: f64 = 0.01;

/// Canal INA219 em um barramento I2C Linux.
///
/// O device é aberto em `begin`, uma vez na partida; falha de
/// abertura ou de sondagem marca o canal como não-vivo sem abortar
/// os demais.
pub struct Ina219Sensor {
    device_path: String,
    address: u16,
    dev: Option<LinuxI2CDevice>,
}

impl Ina219Sensor {
    /// Prepara um canal no endereço dado (0x40, 0x41, 0x44…).
    pub fn new(device_path: impl Into<String>, address: u16) -> Self {
        Self {
            device_path: device_path.into(),
            address,
            dev: None,
        }
    }

    /// Lê um registrador de 16 bits. O INA219 envia MSB primeiro;
    /// SMBus entrega LSB primeiro, então o word chega trocado.
    fn read_register(dev: &mut LinuxI2CDevice, register: u8) -> Result<u16, SensorError> {
        dev.smbus_read_word_data(register)
            .map(u16::swap_bytes)
            .map_err(|e| SensorError::Bus(e.to_string()))
    }

    fn write_register(
        dev: &mut LinuxI2CDevice,
        register: u8,
        value: u16,
    ) -> Result<(), SensorError> {
        dev.smbus_write_word_data(register, value.swap_bytes())
            .map_err(|e| SensorError::Bus(e.to_string()))
    }
}

impl PowerSensor for Ina219Sensor {
    fn begin(&mut self) -> bool {
        let mut dev = match LinuxI2CDevice::new(&self.device_path, self.address) {
            Ok(dev) => dev,
            Err(e) => {
                debug!(
                    "INA219 0x{:02X}: falha abrindo {}: {e}",
                    self.address, self.device_path
                );
                return false;
            }
        };

        // Sondagem + perfil de calibração, uma única vez
        let configured = Self::read_register(&mut dev, REG_CONFIG)
            .and_then(|_| Self::write_register(&mut dev, REG_CONFIG, CONFIG_32V_2A))
            .and_then(|_| Self::write_register(&mut dev, REG_CALIBRATION, CALIBRATION_32V_2A));

        match configured {
            Ok(()) => {
                self.dev = Some(dev);
                true
            }
            Err(e) => {
                debug!("INA219 0x{:02X}: sem resposta: {e}", self.address);
                false
            }
        }
    }

    fn read(&mut self) -> Result<RawSample, SensorError> {
        let dev = self.dev.as_mut().ok_or(SensorError::NotInitialized)?;

        let shunt_raw = Self::read_register(dev, REG_SHUNT_VOLTAGE)? as i16;
        let bus_raw = Self::read_register(dev, REG_BUS_VOLTAGE)?;
        let power_raw = Self::read_register(dev, REG_POWER)?;
        let current_raw = Self::read_register(dev, REG_CURRENT)? as i16;

        Ok(RawSample {
            bus_voltage_v: bus_voltage_v_from_raw(bus_raw),
            shunt_voltage_mv: shunt_mv_from_raw(shunt_raw),
            current_ma: current_ma_from_raw(current_raw),
            power_mw: power_mw_from_raw(power_raw),
        })
    }
}

// ──────────────────────────────────────────────
// Escalas dos registradores (funções puras)
// ──────────────────────────────────────────────

/// Registrador de bus: bits 3..15, 4 mV por bit.
pub fn bus_voltage_v_from_raw(raw: u16) -> f64 {
    f64::from((raw >> 3) * 4) / 1000.0
}

/// Registrador de shunt: com sinal, 10 µV por bit.
pub fn shunt_mv_from_raw(raw: i16) -> f64 {
    f64::from(raw) * SHUNT_LSB_MV
}

/// Registrador de corrente: com sinal, 0,1 mA por bit (perfil 32V/2A).
pub fn current_ma_from_raw(raw: i16) -> f64 {
    f64::from(raw) * CURRENT_LSB_MA
}

/// Registrador de potência: 2 mW por bit (perfil 32V/2A).
pub fn power_mw_from_raw(raw: u16) -> f64 {
    f64::from(raw) * POWER_LSB_MW
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_voltage_scaling() {
        // 12.0 V = 3000 contagens de 4 mV, deslocadas 3 bits
        assert_eq!(bus_voltage_v_from_raw(3000 << 3), 12.0);
        assert_eq!(bus_voltage_v_from_raw(0), 0.0);
        // Bits de flag (0..2) não afetam o valor
        assert_eq!(bus_voltage_v_from_raw((3000 << 3) | 0b101), 12.0);
    }

    #[test]
    fn shunt_scaling_is_signed() {
        assert_eq!(shunt_mv_from_raw(100), 1.0);
        assert_eq!(shunt_mv_from_raw(-100), -1.0);
    }

    #[test]
    fn current_scaling_matches_32v_2a_profile() {
        // 15000 contagens × 0,1 mA = 1500 mA
        assert_eq!(current_ma_from_raw(15000), 1500.0);
        assert_eq!(current_ma_from_raw(-500), -50.0);
    }

    #[test]
    fn power_scaling_matches_32v_2a_profile() {
        assert_eq!(power_mw_from_raw(9000), 18000.0);
    }

    #[test]
    fn unopened_sensor_refuses_reads() {
        let mut s = Ina219Sensor::new("/dev/i2c-99", 0x40);
        assert!(matches!(s.read(), Err(SensorError::NotInitialized)));
    }
}
