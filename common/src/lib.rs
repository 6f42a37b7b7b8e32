pub mod cluster;
pub mod distributor;
pub mod error;
pub mod graph;
pub mod partition;
pub mod pipeline;
pub mod plan;
pub mod ports;
pub mod remote;
pub mod splitter;
pub mod transport;
pub mod validator;

pub use cluster::{ClusterDescriptor, WorkerNode};
pub use error::{
    ConfigurationError, InternalConsistencyError, PartitioningError, Result, SplitError,
};
pub use partition::{PartitionDescriptor, PartitionMethod, PartitioningSpec};
pub use pipeline::{DatabaseConnection, Hop, InfoLink, Location, Pipeline, PipelineSettings, Step};
pub use plan::{ErrorResponse, PlanId, SplitPlanInfo, SplitPlanSummary, SplitRequest};
pub use ports::PortAssignment;
pub use splitter::{split, SplitResult, WorkerPipeline};
pub use transport::{RemoteTransportBinding, TransportConfig, TransportRole};
