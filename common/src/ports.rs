use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::{ClusterDescriptor, WorkerNode};
use crate::error::ConfigurationError;

/// Nombre del canal lógico `source -> target` que identifica un puerto.
pub fn channel_name(source: &str, target: &str) -> String {
    format!("{} - {}", source, target)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortKey {
    pub cluster: String,
    pub worker: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAssignment {
    pub cluster: String,
    pub worker: String,
    pub channel: String,
    pub port: u16,
}

/// Asignación de puertos de una corrida del splitter.
///
/// Cada cluster arranca en su `base_port` y avanza de a uno; una clave
/// (cluster, worker, canal) ya vista devuelve siempre el mismo puerto.
#[derive(Debug, Default)]
pub struct PortAllocator {
    // último puerto entregado por cluster
    last_port: HashMap<String, u16>,
    assigned: HashMap<PortKey, u16>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port_for(
        &mut self,
        cluster: &ClusterDescriptor,
        worker: &WorkerNode,
        channel: &str,
    ) -> Result<u16, ConfigurationError> {
        let key = PortKey {
            cluster: cluster.name.clone(),
            worker: worker.name.clone(),
            channel: channel.to_string(),
        };

        if let Some(&port) = self.assigned.get(&key) {
            return Ok(port);
        }

        let port = match self.last_port.get(&cluster.name) {
            None => cluster.base_port,
            Some(&last) => last
                .checked_add(1)
                .ok_or_else(|| ConfigurationError::PortRangeExhausted {
                    cluster: cluster.name.clone(),
                })?,
        };

        self.last_port.insert(cluster.name.clone(), port);
        debug!(
            "puerto {} asignado a cluster={} worker={} canal=[{}]",
            port, key.cluster, key.worker, key.channel
        );
        self.assigned.insert(key, port);

        Ok(port)
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Todas las asignaciones, ordenadas por cluster y puerto.
    pub fn assignments(&self) -> Vec<PortAssignment> {
        let mut out: Vec<PortAssignment> = self
            .assigned
            .iter()
            .map(|(k, &port)| PortAssignment {
                cluster: k.cluster.clone(),
                worker: k.worker.clone(),
                channel: k.channel.clone(),
                port,
            })
            .collect();
        out.sort_by(|a, b| a.cluster.cmp(&b.cluster).then(a.port.cmp(&b.port)));
        out
    }
}
