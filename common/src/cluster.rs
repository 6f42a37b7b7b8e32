use serde::{Deserialize, Serialize};
use std::fmt;

/// Puerto base por defecto cuando el descriptor no trae uno.
pub const DEFAULT_BASE_PORT: u16 = 40_000;
/// Tamaño de buffer de los sockets, en bytes.
pub const DEFAULT_SOCKETS_BUFFER_SIZE: u32 = 2_000;
/// Intervalo de flush de los sockets, en milisegundos.
pub const DEFAULT_SOCKETS_FLUSH_INTERVAL_MS: u32 = 5_000;

fn default_base_port() -> u16 {
    DEFAULT_BASE_PORT
}

fn default_buffer_size() -> u32 {
    DEFAULT_SOCKETS_BUFFER_SIZE
}

fn default_flush_interval() -> u32 {
    DEFAULT_SOCKETS_FLUSH_INTERVAL_MS
}

fn default_compressed() -> bool {
    true
}

/// Un endpoint de ejecución del cluster (el master o un worker).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerNode {
    pub name: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub is_master: bool,
}

impl WorkerNode {
    pub fn new(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            username: None,
            password: None,
            is_master: false,
        }
    }

    pub fn master(name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            is_master: true,
            ..Self::new(name, hostname)
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

// A mano para no volcar la password en los logs.
impl fmt::Debug for WorkerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerNode")
            .field("name", &self.name)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("is_master", &self.is_master)
            .finish()
    }
}

impl fmt::Display for WorkerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Grupo de nodos más los defaults de transporte que usan los pasos de socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    pub name: String,

    #[serde(default = "default_base_port")]
    pub base_port: u16,

    #[serde(default = "default_buffer_size")]
    pub sockets_buffer_size: u32,

    #[serde(default = "default_flush_interval")]
    pub sockets_flush_interval_ms: u32,

    #[serde(default = "default_compressed")]
    pub sockets_compressed: bool,

    /// Orden significativo: es el orden del round-robin de particiones.
    #[serde(default)]
    pub workers: Vec<WorkerNode>,
}

impl ClusterDescriptor {
    pub fn new(name: impl Into<String>, base_port: u16) -> Self {
        Self {
            name: name.into(),
            base_port,
            sockets_buffer_size: DEFAULT_SOCKETS_BUFFER_SIZE,
            sockets_flush_interval_ms: DEFAULT_SOCKETS_FLUSH_INTERVAL_MS,
            sockets_compressed: true,
            workers: Vec::new(),
        }
    }

    pub fn with_worker(mut self, worker: WorkerNode) -> Self {
        self.workers.push(worker);
        self
    }

    pub fn masters(&self) -> impl Iterator<Item = &WorkerNode> {
        self.workers.iter().filter(|w| w.is_master)
    }

    /// Workers que reciben trabajo, en el orden del descriptor. El master
    /// queda fuera desde el principio.
    pub fn non_master_workers(&self) -> Vec<&WorkerNode> {
        self.workers.iter().filter(|w| !w.is_master).collect()
    }

    pub fn find_worker(&self, name: &str) -> Option<&WorkerNode> {
        self.workers.iter().find(|w| w.name == name)
    }
}

impl fmt::Display for ClusterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
