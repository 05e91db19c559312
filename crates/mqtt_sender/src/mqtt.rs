//! Transporte MQTT concreto sobre o cliente síncrono do rumqttc.
//!
//! Cada `reconnect` descarta a sessão anterior e refaz o handshake
//! com identidade fresca derivada da MAC (prefixo fixo + MAC sem
//! dois-pontos, para evitar colisão de sessão no broker). O `send`
//! publica com QoS 0 e drena a fila de eventos até observar o
//! publish de saída – qualquer erro de conexão derruba a sessão.

use std::time::{Duration, Instant};

use rumqttc::{Client, Connection, ConnectReturnCode, Event, Incoming, MqttOptions, Outgoing, QoS};
use tracing::{debug, info};

use crate::delivery::{PushTransport, TransportError};

/// Keep-alive da sessão; a cadência de publicação (2 s) mantém a
/// sessão viva bem dentro desta janela.
const KEEP_ALIVE: Duration = Duration::from_secs(10);

/// Capacidade da fila interna do cliente.
const CLIENT_QUEUE_CAP: usize = 16;

pub struct MqttTransport {
    broker_host: String,
    broker_port: u16,
    topic: String,
    client_prefix: String,
    connect_timeout: Duration,
    session: Option<(Client, Connection)>,
}

impl MqttTransport {
    pub fn new(
        broker_host: impl Into<String>,
        broker_port: u16,
        topic: impl Into<String>,
        client_prefix: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            broker_host: broker_host.into(),
            broker_port,
            topic: topic.into(),
            client_prefix: client_prefix.into(),
            connect_timeout,
            session: None,
        }
    }

    /// Identidade de sessão: prefixo + MAC sem dois-pontos.
    fn session_id(&self) -> String {
        format!("{}{}", self.client_prefix, hardware_id())
    }

    /// Drena eventos até o predicado, um erro de conexão ou o prazo.
    fn drain_until(
        connection: &mut Connection,
        deadline: Instant,
        mut done: impl FnMut(&Event) -> bool,
    ) -> Result<(), TransportError> {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(TransportError::Send("sem resposta do broker".into()));
            }
            match connection.recv_timeout(deadline - now) {
                Ok(Ok(event)) => {
                    debug!("Evento MQTT: {event:?}");
                    if done(&event) {
                        return Ok(());
                    }
                }
                Ok(Err(e)) => return Err(TransportError::Send(e.to_string())),
                Err(_) => return Err(TransportError::Send("sem resposta do broker".into())),
            }
        }
    }
}

impl PushTransport for MqttTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let (client, connection) = self
            .session
            .as_mut()
            .ok_or_else(|| TransportError::Send("sem sessão".into()))?;

        let result = client
            .try_publish(self.topic.as_str(), QoS::AtMostOnce, false, payload.to_vec())
            .map_err(|e| TransportError::Send(e.to_string()))
            .and_then(|()| {
                // QoS 0 não tem ack; o evento de saída confirma a escrita
                Self::drain_until(
                    connection,
                    Instant::now() + self.connect_timeout,
                    |event| matches!(event, Event::Outgoing(Outgoing::Publish(_))),
                )
            });

        if result.is_err() {
            self.session = None;
        }
        result
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn reconnect(&mut self) -> Result<(), TransportError> {
        self.session = None;

        let id = self.session_id();
        debug!("Handshake MQTT como '{id}'");
        let mut options = MqttOptions::new(id, self.broker_host.clone(), self.broker_port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut connection) = Client::new(options, CLIENT_QUEUE_CAP);

        // Só consideramos a sessão de pé após o ConnAck do broker
        let deadline = Instant::now() + self.connect_timeout;
        let mut accepted = false;
        Self::drain_until(&mut connection, deadline, |event| {
            if let Event::Incoming(Incoming::ConnAck(ack)) = event {
                accepted = ack.code == ConnectReturnCode::Success;
                true
            } else {
                false
            }
        })
        .map_err(|e| match e {
            TransportError::Send(msg) | TransportError::Connect(msg) => {
                TransportError::Connect(msg)
            }
        })?;

        if !accepted {
            return Err(TransportError::Connect("broker recusou a sessão".into()));
        }

        info!("Sessão MQTT aceita por {}:{}", self.broker_host, self.broker_port);
        self.session = Some((client, connection));
        Ok(())
    }
}

/// MAC da primeira interface não-loopback, sem dois-pontos.
///
/// Sem interface utilizável (container mínimo), cai no pid – a
/// identidade continua única o bastante para o broker local.
fn hardware_id() -> String {
    if let Ok(entries) = std::fs::read_dir("/sys/class/net") {
        let mut names: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name != "lo")
            .collect();
        names.sort();

        for name in names {
            if let Ok(mac) = std::fs::read_to_string(format!("/sys/class/net/{name}/address")) {
                let mac: String = mac.trim().chars().filter(|c| *c != ':').collect();
                if !mac.is_empty() && mac.chars().any(|c| c != '0') {
                    return mac.to_uppercase();
                }
            }
        }
    }
    format!("PID{}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_id_has_no_colons() {
        let id = hardware_id();
        assert!(!id.is_empty());
        assert!(!id.contains(':'));
    }

    #[test]
    fn session_id_uses_prefix() {
        let t = MqttTransport::new("localhost", 1883, "t", "ESP32_SOLAR_", Duration::from_secs(1));
        assert!(t.session_id().starts_with("ESP32_SOLAR_"));
    }

    #[test]
    fn send_without_session_is_refused() {
        let mut t =
            MqttTransport::new("localhost", 1883, "t", "X_", Duration::from_millis(10));
        assert!(!t.is_connected());
        assert!(t.send(b"{}").is_err());
    }
}
