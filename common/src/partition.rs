use serde::{Deserialize, Serialize};

/// Sufijo de los descriptores de partición acotados a un worker.
pub const WORKER_PARTITION_SUFFIX: &str = " (worker)";

/// Nombre del descriptor con el subconjunto de IDs de un worker.
pub fn worker_partition_name(name: &str) -> String {
    format!("{}{}", name, WORKER_PARTITION_SUFFIX)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionMethod {
    #[default]
    None,
    /// Resto de la división del hash de la clave.
    Modulo,
    /// Cada partición recibe todas las filas.
    Mirror,
}

/// Particionado de un paso: método + descriptor (por nombre) + campo clave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitioningSpec {
    #[serde(default)]
    pub method: PartitionMethod,
    pub partition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl PartitioningSpec {
    pub fn new(method: PartitionMethod, partition: impl Into<String>) -> Self {
        Self {
            method,
            partition: partition.into(),
            field: None,
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn is_active(&self) -> bool {
        self.method != PartitionMethod::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    pub name: String,
    pub partition_ids: Vec<String>,
}

impl PartitionDescriptor {
    pub fn new<I, S>(name: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            partition_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.partition_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition_ids.is_empty()
    }
}
