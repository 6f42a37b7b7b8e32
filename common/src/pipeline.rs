use serde::{Deserialize, Serialize};

use crate::cluster::ClusterDescriptor;
use crate::partition::{PartitionDescriptor, PartitioningSpec};
use crate::transport::{RemoteTransportBinding, TransportConfig};

/// Posición del paso en el diagrama. Sólo se arrastra para dibujar,
/// no tiene ningún efecto en el split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Desplaza la posición; en los bordes de `i32` se queda en el límite.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

fn default_copies() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

/* --------- Pasos --------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Nombre único dentro del pipeline que lo contiene.
    pub name: String,

    /// Tipo de paso: "TableInput", "StreamLookup", "SocketWriter", etc.
    #[serde(rename = "type")]
    pub step_type: String,

    #[serde(default)]
    pub location: Location,

    /// Número de copias que arranca el motor para este paso.
    #[serde(default = "default_copies")]
    pub copies: u32,

    /// Nombre del cluster descriptor (en el catálogo del pipeline) en el que corre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitioning: Option<PartitioningSpec>,

    /// Endpoints remotos desde los que este paso recibe filas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_inputs: Vec<RemoteTransportBinding>,

    /// Endpoints remotos hacia los que este paso envía filas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote_outputs: Vec<RemoteTransportBinding>,

    /// Sólo en pasos de transporte (lector / escritor de socket).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportConfig>,
}

impl Step {
    pub fn new(name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step_type: step_type.into(),
            location: Location::default(),
            copies: default_copies(),
            cluster: None,
            partitioning: None,
            remote_inputs: Vec::new(),
            remote_outputs: Vec::new(),
            transport: None,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.location = Location::new(x, y);
        self
    }

    pub fn clustered(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn partitioned(mut self, spec: PartitioningSpec) -> Self {
        self.partitioning = Some(spec);
        self
    }

    pub fn is_clustered(&self) -> bool {
        self.cluster.is_some()
    }

    /// true si tiene un esquema de particionado con método distinto de "none".
    pub fn is_partitioned(&self) -> bool {
        self.partitioning
            .as_ref()
            .map(|p| p.is_active())
            .unwrap_or(false)
    }
}

/* --------- Aristas --------- */

/// Arista de streaming: las filas de `from` fluyen a `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub from: String,
    pub to: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Hop {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            enabled: true,
        }
    }
}

/// Dependencia "info": el consumidor necesita materializar completa la salida
/// de cada paso de `info_steps` antes de procesar su propia entrada.
/// El orden de la lista es significativo para el consumidor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoLink {
    pub consumer: String,
    pub info_steps: Vec<String>,
}

impl InfoLink {
    pub fn new<I, S>(consumer: impl Into<String>, info_steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            consumer: consumer.into(),
            info_steps: info_steps.into_iter().map(Into::into).collect(),
        }
    }

    pub fn references(&self, name: &str) -> bool {
        self.info_steps.iter().any(|s| s == name)
    }

    /// Agrega `name` al final si todavía no está referenciado.
    pub fn link(&mut self, name: &str) {
        if !self.references(name) {
            self.info_steps.push(name.to_string());
        }
    }

    /// Reemplaza cada referencia a `from` por los nombres de `to`, en la misma
    /// posición. Devuelve false si `from` no estaba referenciado.
    pub fn replace_info_step<I, S>(&mut self, from: &str, to: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.references(from) {
            return false;
        }

        let replacement: Vec<String> = to.into_iter().map(Into::into).collect();
        let mut out = Vec::with_capacity(self.info_steps.len() + replacement.len());

        for name in self.info_steps.drain(..) {
            if name == from {
                for r in &replacement {
                    if !out.contains(r) {
                        out.push(r.clone());
                    }
                }
            } else {
                out.push(name);
            }
        }

        self.info_steps = out;
        true
    }
}

/* --------- Configuración compartida --------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConnection {
    pub name: String,
    /// "postgresql", "mysql", ...
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub feedback_shown: bool,
    pub feedback_size: u32,
    pub thread_priority_management: bool,
    pub unique_connections: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            feedback_shown: true,
            feedback_size: 50_000,
            thread_priority_management: true,
            unique_connections: false,
        }
    }
}

/* --------- Pipeline --------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,

    /// Notas libres; el splitter deja una indicando dónde corre cada pipeline generado.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub hops: Vec<Hop>,
    #[serde(default)]
    pub info_links: Vec<InfoLink>,

    /// Catálogos por nombre, compartidos con la capa de configuración.
    #[serde(default)]
    pub clusters: Vec<ClusterDescriptor>,
    #[serde(default)]
    pub partitions: Vec<PartitionDescriptor>,
    #[serde(default)]
    pub databases: Vec<DatabaseConnection>,

    #[serde(default)]
    pub settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: Vec::new(),
            steps: Vec::new(),
            hops: Vec::new(),
            info_links: Vec::new(),
            clusters: Vec::new(),
            partitions: Vec::new(),
            databases: Vec::new(),
            settings: PipelineSettings::default(),
        }
    }

    /// Pipeline vacío (sin pasos ni aristas) que hereda de `original` la
    /// configuración que no es grafo: conexiones, catálogos y settings.
    pub fn derived_from(name: impl Into<String>, original: &Pipeline) -> Self {
        Self {
            name: name.into(),
            notes: Vec::new(),
            steps: Vec::new(),
            hops: Vec::new(),
            info_links: Vec::new(),
            clusters: original.clusters.clone(),
            partitions: original.partitions.clone(),
            databases: original.databases.clone(),
            settings: original.settings.clone(),
        }
    }

    pub fn step_index(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    pub fn find_step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn contains_step(&self, name: &str) -> bool {
        self.step_index(name).is_some()
    }

    /// Agrega el paso si no hay otro con el mismo nombre. Devuelve su índice.
    pub fn add_step(&mut self, step: Step) -> usize {
        match self.step_index(&step.name) {
            Some(idx) => idx,
            None => {
                self.steps.push(step);
                self.steps.len() - 1
            }
        }
    }

    /// Agrega un hop habilitado `from -> to` salvo que ya exista.
    pub fn add_hop(&mut self, from: &str, to: &str) {
        let exists = self.hops.iter().any(|h| h.from == from && h.to == to);
        if !exists {
            self.hops.push(Hop::new(from, to));
        }
    }

    pub fn has_hop(&self, from: &str, to: &str) -> bool {
        self.hops.iter().any(|h| h.from == from && h.to == to)
    }

    pub fn find_cluster(&self, name: &str) -> Option<&ClusterDescriptor> {
        self.clusters.iter().find(|c| c.name == name)
    }

    pub fn find_partition(&self, name: &str) -> Option<&PartitionDescriptor> {
        self.partitions.iter().find(|p| p.name == name)
    }

    pub fn info_link(&self, consumer: &str) -> Option<&InfoLink> {
        self.info_links.iter().find(|l| l.consumer == consumer)
    }

    /// Devuelve el info-link del consumidor, creándolo con `seed` si no existe.
    pub fn ensure_info_link<F>(&mut self, consumer: &str, seed: F) -> &mut InfoLink
    where
        F: FnOnce() -> Vec<String>,
    {
        let idx = match self.info_links.iter().position(|l| l.consumer == consumer) {
            Some(idx) => idx,
            None => {
                self.info_links.push(InfoLink::new(consumer, seed()));
                self.info_links.len() - 1
            }
        };
        &mut self.info_links[idx]
    }
}
