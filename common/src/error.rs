use thiserror::Error;

/// Configuración de entrada que no se puede dividir. Nunca se reintenta.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("ningún paso usa un cluster: no hay nada que dividir")]
    NoClusterConfigured,

    #[error("no se soporta usar varios clusters en el mismo pipeline: {clusters:?}")]
    MultipleClustersUnsupported { clusters: Vec<String> },

    #[error("el cluster [{cluster}] no tiene un nodo master")]
    NoMasterDefined { cluster: String },

    #[error("el cluster [{cluster}] define más de un master: {masters:?}")]
    MultipleMastersDefined { cluster: String, masters: Vec<String> },

    #[error("el paso [{step}] referencia el cluster desconocido [{cluster}]")]
    UnknownCluster { step: String, cluster: String },

    #[error("el paso [{step}] referencia el descriptor de particiones desconocido [{partition}]")]
    UnknownPartitionDescriptor { step: String, partition: String },

    #[error("se agotaron los puertos para el cluster [{cluster}]")]
    PortRangeExhausted { cluster: String },

    #[error(
        "el nombre [{step}] ya lo usa un paso del pipeline: no se puede crear el paso de \
         transporte en [{pipeline}]"
    )]
    TransportStepNameTaken { pipeline: String, step: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartitioningError {
    #[error(
        "el paso [{step}] está particionado y en cluster con menos particiones ({partitions}) \
         en [{partition}] que workers ({workers})"
    )]
    InsufficientPartitions {
        step: String,
        partition: String,
        partitions: usize,
        workers: usize,
    },
}

/// Estado que el propio algoritmo garantiza y no se cumplió: siempre es un bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalConsistencyError {
    #[error("no existe el pipeline del worker [{worker}] en el cluster [{cluster}]")]
    MissingWorkerPipeline { cluster: String, worker: String },

    #[error(
        "falta el descriptor [{partition}] en el worker [{worker}] del cluster [{cluster}] \
         (paso [{step}])"
    )]
    MissingWorkerPartition {
        cluster: String,
        worker: String,
        step: String,
        partition: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Partitioning(#[from] PartitioningError),

    #[error(transparent)]
    Internal(#[from] InternalConsistencyError),
}

pub type Result<T> = std::result::Result<T, SplitError>;
