//! Canal de entrega push – máquina de estados de conexão.
//!
//! O [`Delivery`] é dono exclusivo do [`ConnectionState`] e só o
//! transiciona em resposta a resultados do transporte. Invariantes:
//! nunca envia em `Disconnected`, sempre passa por `Connecting` antes
//! de `Connected`, e falha de envio é logada e derruba o estado –
//! nunca encerra o processo.

use std::time::Duration;

use tracing::{info, warn};

/// Estado da sessão com o broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Erros do transporte push.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Tentativa de conexão recusada ou sem resposta
    #[error("conexão: {0}")]
    Connect(String),

    /// Envio falhou ou a sessão caiu no meio
    #[error("envio: {0}")]
    Send(String),
}

/// Interface estreita com o transporte externo.
///
/// `reconnect` deve fazer o handshake completo com identidade de
/// sessão fresca; `send` publica um payload já codificado.
pub trait PushTransport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;
    fn is_connected(&self) -> bool;
    fn reconnect(&mut self) -> Result<(), TransportError>;
}

/// Canal de entrega sobre um transporte push.
pub struct Delivery<T: PushTransport> {
    transport: T,
    state: ConnectionState,
    /// Atraso fixo entre tentativas de reconexão
    reconnect_delay: Duration,
}

impl<T: PushTransport> Delivery<T> {
    pub fn new(transport: T, reconnect_delay: Duration) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            reconnect_delay,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Bloqueia até a sessão estar de pé.
    ///
    /// Tentativas ilimitadas com atraso fixo entre elas – escolha
    /// explícita de projeto (laço de controle sem outro trabalho).
    /// No máximo uma tentativa em voo: o laço é single-thread.
    pub fn ensure_connected(&mut self) {
        while self.state != ConnectionState::Connected {
            self.state = ConnectionState::Connecting;
            info!("Conectando ao broker...");
            match self.transport.reconnect() {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    info!("Conectado ao broker");
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    warn!("Falha de conexão: {e}. Nova tentativa em {:?}", self.reconnect_delay);
                    std::thread::sleep(self.reconnect_delay);
                }
            }
        }
    }

    /// Entrega um payload, conectando antes se necessário.
    ///
    /// Falha de envio transiciona para `Disconnected` e devolve o
    /// erro; a próxima iteração do laço refaz o handshake.
    pub fn deliver(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.state != ConnectionState::Connected || !self.transport.is_connected() {
            self.ensure_connected();
        }

        match self.transport.send(payload) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Falha de envio: {e}");
                self.state = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Transporte falso que grava cada chamada na ordem recebida.
    struct FakeTransport {
        calls: Vec<String>,
        connected: bool,
        /// Resultados pré-programados, na ordem: true = sucesso
        send_results: VecDeque<bool>,
        connect_results: VecDeque<bool>,
    }

    impl FakeTransport {
        fn new() -> Self {
            Self {
                calls: Vec::new(),
                connected: false,
                send_results: VecDeque::new(),
                connect_results: VecDeque::new(),
            }
        }
    }

    impl PushTransport for FakeTransport {
        fn send(&mut self, _payload: &[u8]) -> Result<(), TransportError> {
            self.calls.push("send".into());
            assert!(self.connected, "send chamado sem sessão de pé");
            if self.send_results.pop_front().unwrap_or(true) {
                Ok(())
            } else {
                self.connected = false;
                Err(TransportError::Send("broker caiu".into()))
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn reconnect(&mut self) -> Result<(), TransportError> {
            self.calls.push("reconnect".into());
            if self.connect_results.pop_front().unwrap_or(true) {
                self.connected = true;
                Ok(())
            } else {
                self.connected = false;
                Err(TransportError::Connect("sem resposta".into()))
            }
        }
    }

    fn delivery(transport: FakeTransport) -> Delivery<FakeTransport> {
        Delivery::new(transport, Duration::from_millis(1))
    }

    #[test]
    fn starts_disconnected_and_connects_before_first_send() {
        let mut d = delivery(FakeTransport::new());
        assert_eq!(d.state(), ConnectionState::Disconnected);

        d.deliver(b"{}").unwrap();
        assert_eq!(d.state(), ConnectionState::Connected);
        // reconnect sempre antes do primeiro send
        assert_eq!(d.transport.calls, vec!["reconnect", "send"]);
    }

    #[test]
    fn never_sends_while_disconnected() {
        let mut t = FakeTransport::new();
        t.connect_results = VecDeque::from(vec![false, false, true]);
        let mut d = delivery(t);

        d.deliver(b"{}").unwrap();
        // Três tentativas de conexão antes de qualquer send
        assert_eq!(
            d.transport.calls,
            vec!["reconnect", "reconnect", "reconnect", "send"]
        );
    }

    #[test]
    fn send_failure_drops_to_disconnected_then_reconnects() {
        // Cenário: send falha uma vez → Disconnected → próxima
        // iteração reconecta antes de tentar de novo
        let mut t = FakeTransport::new();
        t.send_results = VecDeque::from(vec![true, false, true]);
        let mut d = delivery(t);

        d.deliver(b"a").unwrap();
        assert!(d.deliver(b"b").is_err());
        assert_eq!(d.state(), ConnectionState::Disconnected);

        d.deliver(b"c").unwrap();
        assert_eq!(d.state(), ConnectionState::Connected);
        assert_eq!(
            d.transport.calls,
            vec!["reconnect", "send", "send", "reconnect", "send"]
        );
    }

    #[test]
    fn detected_session_loss_forces_handshake() {
        let mut d = delivery(FakeTransport::new());
        d.deliver(b"a").unwrap();

        // Sessão cai fora de um send (keep-alive perdido)
        d.transport.connected = false;
        d.deliver(b"b").unwrap();
        assert_eq!(
            d.transport.calls,
            vec!["reconnect", "send", "reconnect", "send"]
        );
    }
}
