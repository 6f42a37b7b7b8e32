use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::cluster::ClusterDescriptor;
use crate::error::{ConfigurationError, PartitioningError, Result};
use crate::graph::PipelineGraph;
use crate::partition::{worker_partition_name, PartitionDescriptor};

/// Índice del worker (entre los no-master) que recibe la partición `index`.
pub fn next_worker(index: usize, worker_count: usize) -> usize {
    index % worker_count
}

/// Reparto de IDs de partición: worker -> descriptor origen -> IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionDistribution {
    assignments: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl PartitionDistribution {
    /// Reparte en round-robin los IDs de cada descriptor usado por un paso
    /// particionado de `cluster` entre sus workers no-master.
    pub fn distribute(graph: &PipelineGraph<'_>, cluster: &ClusterDescriptor) -> Result<Self> {
        let workers = cluster.non_master_workers();
        let mut dist = Self::default();

        // sin workers no hay a quién repartir
        if workers.is_empty() {
            return Ok(dist);
        }

        let mut done: BTreeSet<&str> = BTreeSet::new();

        for step in graph.reference_steps() {
            let Some(spec) = step.partitioning.as_ref().filter(|p| p.is_active()) else {
                continue;
            };
            if step.cluster.as_deref() != Some(cluster.name.as_str()) {
                continue;
            }

            let descriptor = graph
                .pipeline()
                .find_partition(&spec.partition)
                .ok_or_else(|| ConfigurationError::UnknownPartitionDescriptor {
                    step: step.name.clone(),
                    partition: spec.partition.clone(),
                })?;

            // varios pasos pueden compartir descriptor: se reparte una sola vez
            if !done.insert(descriptor.name.as_str()) {
                continue;
            }

            if descriptor.len() < workers.len() {
                return Err(PartitioningError::InsufficientPartitions {
                    step: step.name.clone(),
                    partition: descriptor.name.clone(),
                    partitions: descriptor.len(),
                    workers: workers.len(),
                }
                .into());
            }

            for (i, id) in descriptor.partition_ids.iter().enumerate() {
                let worker = workers[next_worker(i, workers.len())];
                let ids = dist
                    .assignments
                    .entry(worker.name.clone())
                    .or_default()
                    .entry(descriptor.name.clone())
                    .or_default();
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }

            debug!(
                "particiones de {} repartidas entre {} workers del cluster {}",
                descriptor.name,
                workers.len(),
                cluster.name
            );
        }

        Ok(dist)
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn partitions_for(&self, worker: &str, descriptor: &str) -> Option<&[String]> {
        self.assignments
            .get(worker)
            .and_then(|m| m.get(descriptor))
            .map(Vec::as_slice)
    }

    /// Descriptores acotados al worker, ya con el sufijo " (worker)".
    pub fn worker_descriptors(&self, worker: &str) -> Vec<PartitionDescriptor> {
        self.assignments
            .get(worker)
            .map(|m| {
                m.iter()
                    .map(|(name, ids)| PartitionDescriptor::new(worker_partition_name(name), ids.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::WorkerNode;
    use crate::error::SplitError;
    use crate::partition::{PartitionMethod, PartitioningSpec};
    use crate::pipeline::{Hop, Pipeline, Step};

    fn cluster_con(workers: usize) -> ClusterDescriptor {
        let mut c = ClusterDescriptor::new("C1", 10_000).with_worker(WorkerNode::master("M", "master"));
        for i in 1..=workers {
            c = c.with_worker(WorkerNode::new(format!("W{i}"), format!("host{i}")));
        }
        c
    }

    fn pipeline_particionado(ids: &[&str], workers: usize) -> Pipeline {
        let mut p = Pipeline::new("p");
        p.clusters.push(cluster_con(workers));
        p.partitions.push(PartitionDescriptor::new("P", ids.iter().copied()));
        p.steps.push(Step::new("Src", "TableInput"));
        p.steps.push(
            Step::new("Agg", "GroupBy")
                .clustered("C1")
                .partitioned(PartitioningSpec::new(PartitionMethod::Modulo, "P").on_field("id")),
        );
        p.hops.push(Hop::new("Src", "Agg"));
        p
    }

    #[test]
    fn next_worker_da_la_vuelta() {
        let picks: Vec<usize> = (0..5).map(|i| next_worker(i, 2)).collect();
        assert_eq!(picks, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn round_robin_empieza_por_el_primer_worker() {
        let p = pipeline_particionado(&["p0", "p1", "p2", "p3"], 2);
        let g = PipelineGraph::new(&p);
        let dist = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap();

        assert_eq!(dist.partitions_for("W1", "P").unwrap(), ["p0", "p2"]);
        assert_eq!(dist.partitions_for("W2", "P").unwrap(), ["p1", "p3"]);
        assert!(dist.partitions_for("M", "P").is_none());
    }

    #[test]
    fn la_union_cubre_todos_los_ids_una_sola_vez() {
        let ids = ["a", "b", "c", "d", "e", "f", "g"];
        let p = pipeline_particionado(&ids, 3);
        let g = PipelineGraph::new(&p);
        let dist = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap();

        let mut all: Vec<String> = Vec::new();
        for w in ["W1", "W2", "W3"] {
            let part = dist.partitions_for(w, "P").unwrap();
            assert!(!part.is_empty());
            all.extend(part.iter().cloned());
        }
        all.sort();
        assert_eq!(all, ids.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn menos_particiones_que_workers_falla() {
        let p = pipeline_particionado(&["p0", "p1"], 3);
        let g = PipelineGraph::new(&p);
        let err = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap_err();

        assert_eq!(
            err,
            SplitError::Partitioning(PartitioningError::InsufficientPartitions {
                step: "Agg".to_string(),
                partition: "P".to_string(),
                partitions: 2,
                workers: 3,
            })
        );
    }

    #[test]
    fn master_en_medio_de_la_lista_no_recibe_particiones() {
        let mut p = pipeline_particionado(&["p0", "p1", "p2", "p3"], 0);
        p.clusters[0] = ClusterDescriptor::new("C1", 10_000)
            .with_worker(WorkerNode::new("W1", "h1"))
            .with_worker(WorkerNode::master("M", "master"))
            .with_worker(WorkerNode::new("W2", "h2"));

        let g = PipelineGraph::new(&p);
        let dist = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap();
        assert_eq!(dist.partitions_for("W1", "P").unwrap(), ["p0", "p2"]);
        assert_eq!(dist.partitions_for("W2", "P").unwrap(), ["p1", "p3"]);
    }

    #[test]
    fn descriptor_compartido_se_reparte_una_vez() {
        let mut p = pipeline_particionado(&["p0", "p1"], 2);
        p.steps.push(
            Step::new("Out", "TableOutput")
                .clustered("C1")
                .partitioned(PartitioningSpec::new(PartitionMethod::Modulo, "P")),
        );
        p.hops.push(Hop::new("Agg", "Out"));

        let g = PipelineGraph::new(&p);
        let dist = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap();
        assert_eq!(dist.partitions_for("W1", "P").unwrap(), ["p0"]);
        assert_eq!(dist.partitions_for("W2", "P").unwrap(), ["p1"]);
    }

    #[test]
    fn pasos_sin_metodo_o_sin_cluster_se_ignoran() {
        let mut p = pipeline_particionado(&["p0"], 2);
        p.steps[1].partitioning = Some(PartitioningSpec::new(PartitionMethod::None, "P"));
        p.steps[0].partitioning = Some(PartitioningSpec::new(PartitionMethod::Modulo, "P"));

        let g = PipelineGraph::new(&p);
        let dist = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap();
        assert!(dist.is_empty());
    }

    #[test]
    fn cluster_sin_workers_no_reparte() {
        let p = pipeline_particionado(&["p0"], 0);
        let g = PipelineGraph::new(&p);
        let dist = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap();
        assert!(dist.is_empty());
    }

    #[test]
    fn descriptor_desconocido_falla() {
        let mut p = pipeline_particionado(&["p0", "p1"], 2);
        p.partitions.clear();
        let g = PipelineGraph::new(&p);
        assert!(matches!(
            PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap_err(),
            SplitError::Configuration(ConfigurationError::UnknownPartitionDescriptor { .. })
        ));
    }

    #[test]
    fn worker_descriptors_usa_el_sufijo() {
        let p = pipeline_particionado(&["p0", "p1", "p2"], 2);
        let g = PipelineGraph::new(&p);
        let dist = PartitionDistribution::distribute(&g, &p.clusters[0]).unwrap();

        let w1 = dist.worker_descriptors("W1");
        assert_eq!(w1, vec![PartitionDescriptor::new("P (worker)", ["p0", "p2"])]);
        assert!(dist.worker_descriptors("nadie").is_empty());
    }
}
