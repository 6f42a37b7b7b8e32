use std::collections::BTreeMap;

use tracing::debug;

use crate::cluster::{ClusterDescriptor, WorkerNode};
use crate::error::ConfigurationError;
use crate::graph::PipelineGraph;
use crate::pipeline::Step;

/// El único cluster en juego y su master ya resuelto.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedCluster<'a> {
    pub cluster: &'a ClusterDescriptor,
    pub master: &'a WorkerNode,
}

/// Resuelve el cluster de un paso contra el catálogo del pipeline.
pub fn cluster_of<'a>(
    graph: &PipelineGraph<'a>,
    step: &Step,
) -> Result<Option<&'a ClusterDescriptor>, ConfigurationError> {
    let Some(name) = step.cluster.as_deref() else {
        return Ok(None);
    };

    graph
        .pipeline()
        .find_cluster(name)
        .map(Some)
        .ok_or_else(|| ConfigurationError::UnknownCluster {
            step: step.name.clone(),
            cluster: name.to_string(),
        })
}

/// Verifica que los pasos de referencia usen exactamente un cluster y que
/// ese cluster tenga exactamente un master.
pub fn validate<'a>(graph: &PipelineGraph<'a>) -> Result<ValidatedCluster<'a>, ConfigurationError> {
    let mut used: BTreeMap<&str, &'a ClusterDescriptor> = BTreeMap::new();

    for step in graph.reference_steps() {
        if let Some(cluster) = cluster_of(graph, step)? {
            used.insert(cluster.name.as_str(), cluster);
        }
    }

    if used.len() > 1 {
        return Err(ConfigurationError::MultipleClustersUnsupported {
            clusters: used.keys().map(|k| k.to_string()).collect(),
        });
    }

    let Some(cluster) = used.into_values().next() else {
        return Err(ConfigurationError::NoClusterConfigured);
    };

    let masters: Vec<&WorkerNode> = cluster.masters().collect();
    let master = match masters.as_slice() {
        [] => {
            return Err(ConfigurationError::NoMasterDefined {
                cluster: cluster.name.clone(),
            })
        }
        [master] => *master,
        _ => {
            return Err(ConfigurationError::MultipleMastersDefined {
                cluster: cluster.name.clone(),
                masters: masters.iter().map(|m| m.name.clone()).collect(),
            })
        }
    };

    debug!(
        "cluster {} validado: master={} ({}), {} workers",
        cluster.name,
        master.name,
        master.hostname,
        cluster.non_master_workers().len()
    );

    Ok(ValidatedCluster { cluster, master })
}
