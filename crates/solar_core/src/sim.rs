//! Sensores simulados – execução sem hardware e testes.
//!
//! O [`SimSensor`] é determinístico: o mesmo tick produz sempre a
//! mesma leitura, o que mantém os testes de codificação estáveis.

use crate::sensor::{PowerSensor, SensorError};
use crate::types::RawSample;

/// Resistência do shunt simulado (ohms), igual ao módulo INA219 comum.
const SHUNT_OHMS: f64 = 0.1;

/// Sensor simulado com base fixa e ondulação determinística.
pub struct SimSensor {
    base_voltage_v: f64,
    base_current_ma: f64,
    present: bool,
    fail_reads: bool,
    initialized: bool,
    tick: u64,
}

impl SimSensor {
    /// Sensor presente com valores de base fixos.
    pub fn steady(voltage_v: f64, current_ma: f64) -> Self {
        Self {
            base_voltage_v: voltage_v,
            base_current_ma: current_ma,
            present: true,
            fail_reads: false,
            initialized: false,
            tick: 0,
        }
    }

    /// Sensor ausente do barramento: `begin` falha.
    pub fn absent() -> Self {
        Self {
            present: false,
            ..Self::steady(0.0, 0.0)
        }
    }

    /// Sensor presente cujas leituras sempre falham (erro de barramento).
    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::steady(0.0, 0.0)
        }
    }
}

impl PowerSensor for SimSensor {
    fn begin(&mut self) -> bool {
        self.initialized = self.present;
        self.present
    }

    fn read(&mut self) -> Result<RawSample, SensorError> {
        if !self.initialized {
            return Err(SensorError::NotInitialized);
        }
        if self.fail_reads {
            return Err(SensorError::Bus("leitura simulada falhou".into()));
        }

        // Ondulação triangular de ±1% sobre a corrente de base
        self.tick += 1;
        let phase = (self.tick % 20) as f64 / 20.0;
        let ripple = 1.0 + 0.01 * (if phase < 0.5 { phase } else { 1.0 - phase }) * 2.0;

        let bus_voltage_v = self.base_voltage_v;
        let current_ma = self.base_current_ma * ripple;
        Ok(RawSample {
            bus_voltage_v,
            shunt_voltage_mv: current_ma * SHUNT_OHMS,
            current_ma,
            // Registrador de potência simulado, como o hardware reportaria
            power_mw: bus_voltage_v * current_ma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tick_same_reading() {
        let mut a = SimSensor::steady(12.5, 800.0);
        let mut b = SimSensor::steady(12.5, 800.0);
        assert!(a.begin());
        assert!(b.begin());
        for _ in 0..5 {
            assert_eq!(a.read().unwrap(), b.read().unwrap());
        }
    }

    #[test]
    fn absent_sensor_fails_begin_and_reads() {
        let mut s = SimSensor::absent();
        assert!(!s.begin());
        assert!(matches!(s.read(), Err(SensorError::NotInitialized)));
    }

    #[test]
    fn failing_sensor_reports_bus_error() {
        let mut s = SimSensor::failing_reads();
        assert!(s.begin());
        assert!(matches!(s.read(), Err(SensorError::Bus(_))));
    }
}
