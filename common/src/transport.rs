use serde::{Deserialize, Serialize};

/// Tipo de los pasos placeholder que abren el socket de escritura.
pub const SOCKET_WRITER_TYPE: &str = "SocketWriter";
/// Tipo de los pasos placeholder que leen de un socket remoto.
pub const SOCKET_READER_TYPE: &str = "SocketReader";

/// Frontera entre procesos: el paso que la lleva recibe de (o envía a)
/// `hostname:port`. `hostname` es siempre el del otro extremo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteTransportBinding {
    pub hostname: String,
    pub port: u16,
    pub source_step: String,
    pub target_step: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportRole {
    Reader,
    Writer,
}

/// Configuración que consume la implementación de sockets (fuera de este crate).
/// El splitter la copia del cluster descriptor pero no la interpreta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub role: TransportRole,
    /// Lector: host al que conecta. Escritor: host donde escucha.
    pub hostname: String,
    pub port: u16,
    pub buffer_size: u32,
    pub flush_interval_ms: u32,
    pub compressed: bool,
}
