//! División de un pipeline en un pipeline master más uno por worker.
//!
//! Pasos del algoritmo:
//! 0. Validar el cluster, repartir particiones y sembrar los pipelines vacíos.
//! 1. Recorrer los hops de cada paso de referencia y reescribirlos según
//!    dónde corre cada extremo (master / workers).
//! 2. Ubicar los pasos sin predecesores.
//! 3. Reescribir los info-links con pasos lector/escritor de socket.
//!
//! Todo el estado (puertos, reparto de particiones, copias ya creadas) vive
//! en un `SplitContext` que se descarta al terminar la corrida.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cluster::{ClusterDescriptor, WorkerNode};
use crate::distributor::PartitionDistribution;
use crate::error::{ConfigurationError, InternalConsistencyError, Result};
use crate::graph::PipelineGraph;
use crate::partition::worker_partition_name;
use crate::pipeline::{Pipeline, Step};
use crate::ports::{channel_name, PortAllocator, PortAssignment};
use crate::remote::{remote_binding, Endpoint, Fanout, RemoteStepFactory};
use crate::validator::{validate, ValidatedCluster};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPipeline {
    pub worker: WorkerNode,
    pub pipeline: Pipeline,
}

/// Resultado de un split: el master y un pipeline por worker no-master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitResult {
    pub cluster: String,
    pub master_node: WorkerNode,
    pub master: Pipeline,
    /// Por nombre de worker.
    pub workers: BTreeMap<String, WorkerPipeline>,
    pub ports: Vec<PortAssignment>,
}

impl SplitResult {
    pub fn worker_nodes(&self) -> impl Iterator<Item = &WorkerNode> {
        self.workers.values().map(|w| &w.worker)
    }

    pub fn worker_pipeline(&self, worker: &str) -> Option<&Pipeline> {
        self.workers.get(worker).map(|w| &w.pipeline)
    }
}

/// Divide `original` en master + workers. Falla sin producir nada si la
/// configuración de cluster o de particiones no es válida.
pub fn split(original: &Pipeline) -> Result<SplitResult> {
    let graph = PipelineGraph::new(original);
    let ValidatedCluster { cluster, master } = validate(&graph)?;
    let partitions = PartitionDistribution::distribute(&graph, cluster)?;

    let mut ctx = SplitContext::seed(graph, cluster, master, &partitions);
    ctx.rewrite_hops()?;
    ctx.rewrite_info_links()?;

    Ok(ctx.finish())
}

/// Dónde corre cada extremo de una arista.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    /// ninguno en cluster: todo queda en el master
    Local,
    /// origen en los workers, destino en el master
    FromWorkers,
    /// origen en el master, destino en los workers
    ToWorkers,
    /// ambos en los workers
    WithinWorkers,
}

impl Boundary {
    fn between(source: &Step, target: &Step) -> Self {
        match (source.is_clustered(), target.is_clustered()) {
            (false, false) => Boundary::Local,
            (true, false) => Boundary::FromWorkers,
            (false, true) => Boundary::ToWorkers,
            (true, true) => Boundary::WithinWorkers,
        }
    }
}

struct SplitContext<'a> {
    graph: PipelineGraph<'a>,
    cluster: &'a ClusterDescriptor,
    master_node: &'a WorkerNode,
    workers: Vec<&'a WorkerNode>,
    ports: PortAllocator,
    master: Pipeline,
    worker_pipelines: BTreeMap<String, Pipeline>,
}

impl<'a> SplitContext<'a> {
    fn seed(
        graph: PipelineGraph<'a>,
        cluster: &'a ClusterDescriptor,
        master_node: &'a WorkerNode,
        partitions: &PartitionDistribution,
    ) -> Self {
        let original = graph.pipeline();

        let mut master = Pipeline::derived_from(format!("{} (master)", original.name), original);
        master.notes.push(format!(
            "Pipeline master generado. Corre en el servidor {} ({})",
            master_node.name, master_node.hostname
        ));

        let workers = cluster.non_master_workers();
        let mut worker_pipelines = BTreeMap::new();

        for worker in &workers {
            let mut pipeline = Pipeline::derived_from(
                format!("{} ({}:{})", original.name, cluster.name, worker.name),
                original,
            );
            pipeline.notes.push(format!(
                "Pipeline worker generado. Corre en el worker {} ({})",
                worker.name, worker.hostname
            ));

            for descriptor in partitions.worker_descriptors(&worker.name) {
                if pipeline.find_partition(&descriptor.name).is_none() {
                    pipeline.partitions.push(descriptor);
                }
            }

            worker_pipelines.insert(worker.name.clone(), pipeline);
        }

        Self {
            graph,
            cluster,
            master_node,
            workers,
            ports: PortAllocator::new(),
            master,
            worker_pipelines,
        }
    }

    /* ---------------- hops ---------------- */

    fn rewrite_hops(&mut self) -> Result<()> {
        let reference: Vec<&'a Step> = self.graph.reference_steps().to_vec();

        for target in reference {
            let predecessors: Vec<&'a Step> = self.graph.predecessors(&target.name).to_vec();

            for &source in &predecessors {
                match Boundary::between(source, target) {
                    Boundary::Local => self.hop_local(source, target),
                    Boundary::FromWorkers => self.hop_from_workers(source, target)?,
                    Boundary::ToWorkers => self.hop_to_workers(source, target)?,
                    Boundary::WithinWorkers => self.hop_within_workers(source, target)?,
                }
            }

            if !self.graph.has_predecessors(&target.name) {
                self.place_source_step(target)?;
            }
        }

        Ok(())
    }

    fn hop_local(&mut self, source: &Step, target: &Step) {
        master_copy(&mut self.master, source);
        master_copy(&mut self.master, target);
        self.master.add_hop(&source.name, &target.name);
    }

    fn hop_from_workers(&mut self, source: &Step, target: &Step) -> Result<()> {
        let channel = channel_name(&source.name, &target.name);
        let t = master_copy(&mut self.master, target);

        for &worker in &self.workers {
            let port = self.ports.port_for(self.cluster, worker, &channel)?;
            self.master.steps[t].remote_inputs.push(remote_binding(
                &worker.hostname,
                port,
                &source.name,
                &target.name,
            ));

            let pipeline = worker_pipeline(&mut self.worker_pipelines, self.cluster, worker)?;
            let s = worker_copy(pipeline, source, self.cluster, worker)?;
            pipeline.steps[s].remote_outputs.push(remote_binding(
                &self.master_node.hostname,
                port,
                &source.name,
                &target.name,
            ));
        }

        debug!("hop [{}] de workers al master", channel);
        Ok(())
    }

    fn hop_to_workers(&mut self, source: &Step, target: &Step) -> Result<()> {
        let channel = channel_name(&source.name, &target.name);
        let s = master_copy(&mut self.master, source);

        for &worker in &self.workers {
            let port = self.ports.port_for(self.cluster, worker, &channel)?;
            self.master.steps[s].remote_outputs.push(remote_binding(
                &worker.hostname,
                port,
                &source.name,
                &target.name,
            ));

            let pipeline = worker_pipeline(&mut self.worker_pipelines, self.cluster, worker)?;
            let t = worker_copy(pipeline, target, self.cluster, worker)?;
            pipeline.steps[t].remote_inputs.push(remote_binding(
                &self.master_node.hostname,
                port,
                &source.name,
                &target.name,
            ));
        }

        debug!("hop [{}] del master a los workers", channel);
        Ok(())
    }

    fn hop_within_workers(&mut self, source: &Step, target: &Step) -> Result<()> {
        for &worker in &self.workers {
            let pipeline = worker_pipeline(&mut self.worker_pipelines, self.cluster, worker)?;
            worker_copy(pipeline, source, self.cluster, worker)?;
            worker_copy(pipeline, target, self.cluster, worker)?;
            pipeline.add_hop(&source.name, &target.name);
        }
        Ok(())
    }

    // Paso sin predecesores: no hay nada que recibir, sólo se ubica.
    fn place_source_step(&mut self, step: &Step) -> Result<()> {
        if !step.is_clustered() {
            master_copy(&mut self.master, step);
            return Ok(());
        }

        for &worker in &self.workers {
            let pipeline = worker_pipeline(&mut self.worker_pipelines, self.cluster, worker)?;
            worker_copy(pipeline, step, self.cluster, worker)?;
        }
        Ok(())
    }

    /* ---------------- info-links ---------------- */

    fn rewrite_info_links(&mut self) -> Result<()> {
        let reference: Vec<&'a Step> = self.graph.reference_steps().to_vec();

        for consumer in reference {
            let infos: Vec<&'a Step> = self.graph.info_steps(&consumer.name).to_vec();

            for info in infos {
                match Boundary::between(info, consumer) {
                    Boundary::Local => self.info_local(info, consumer),
                    Boundary::FromWorkers => self.info_from_workers(info, consumer)?,
                    Boundary::ToWorkers => self.info_to_workers(info, consumer)?,
                    Boundary::WithinWorkers => self.info_within_workers(info, consumer)?,
                }
            }
        }

        Ok(())
    }

    fn info_local(&mut self, info: &Step, consumer: &Step) {
        let original = self.graph.pipeline();

        master_copy(&mut self.master, info);
        master_copy(&mut self.master, consumer);
        self.master
            .ensure_info_link(&consumer.name, || original_info_steps(original, &consumer.name))
            .link(&info.name);
    }

    /// El paso info corre en los workers y el consumidor en el master: cada
    /// worker escribe su parte por un socket y el master la lee con un reader
    /// por worker.
    fn info_from_workers(&mut self, info: &Step, consumer: &Step) -> Result<()> {
        let original = self.graph.pipeline();
        let channel = channel_name(&info.name, &consumer.name);
        let factory = RemoteStepFactory::new(self.cluster);
        let total = self.workers.len();
        let mut readers = Vec::with_capacity(total);

        master_copy(&mut self.master, consumer);

        for (index, &worker) in self.workers.iter().enumerate() {
            let endpoint = Endpoint {
                worker,
                channel: &channel,
                hostname: &worker.hostname,
            };

            let writer = factory.writer_step(&mut self.ports, endpoint, info, None)?;
            let pipeline = worker_pipeline(&mut self.worker_pipelines, self.cluster, worker)?;
            worker_copy(pipeline, info, self.cluster, worker)?;
            let writer_name = add_transport_step(pipeline, original, writer)?;
            pipeline.add_hop(&info.name, &writer_name);

            let reader = factory.reader_step(
                &mut self.ports,
                endpoint,
                consumer,
                Some(Fanout { index, total }),
            )?;
            readers.push(add_transport_step(&mut self.master, original, reader)?);
        }

        self.master
            .ensure_info_link(&consumer.name, || original_info_steps(original, &consumer.name))
            .replace_info_step(&info.name, readers);

        debug!("info [{}] de workers al master", channel);
        Ok(())
    }

    /// El paso info corre en el master y el consumidor en los workers: el
    /// master escribe una copia completa por worker.
    fn info_to_workers(&mut self, info: &Step, consumer: &Step) -> Result<()> {
        let original = self.graph.pipeline();
        let master_host = self.master_node.hostname.as_str();
        let channel = channel_name(&info.name, &consumer.name);
        let factory = RemoteStepFactory::new(self.cluster);
        let total = self.workers.len();

        master_copy(&mut self.master, info);

        for (index, &worker) in self.workers.iter().enumerate() {
            let endpoint = Endpoint {
                worker,
                channel: &channel,
                hostname: master_host,
            };

            let writer = factory.writer_step(
                &mut self.ports,
                endpoint,
                info,
                Some(Fanout { index, total }),
            )?;
            let writer_name = add_transport_step(&mut self.master, original, writer)?;
            self.master.add_hop(&info.name, &writer_name);

            let reader = factory.reader_step(&mut self.ports, endpoint, consumer, None)?;
            let pipeline = worker_pipeline(&mut self.worker_pipelines, self.cluster, worker)?;
            worker_copy(pipeline, consumer, self.cluster, worker)?;
            let reader_name = add_transport_step(pipeline, original, reader)?;
            pipeline
                .ensure_info_link(&consumer.name, || original_info_steps(original, &consumer.name))
                .replace_info_step(&info.name, [reader_name]);
        }

        debug!("info [{}] del master a los workers", channel);
        Ok(())
    }

    fn info_within_workers(&mut self, info: &Step, consumer: &Step) -> Result<()> {
        let original = self.graph.pipeline();

        for &worker in &self.workers {
            let pipeline = worker_pipeline(&mut self.worker_pipelines, self.cluster, worker)?;
            worker_copy(pipeline, info, self.cluster, worker)?;
            worker_copy(pipeline, consumer, self.cluster, worker)?;
            // la copia local conserva el nombre: la referencia ya apunta a ella
            pipeline
                .ensure_info_link(&consumer.name, || original_info_steps(original, &consumer.name))
                .link(&info.name);
        }
        Ok(())
    }

    fn finish(self) -> SplitResult {
        let SplitContext {
            graph,
            cluster,
            master_node,
            workers,
            ports,
            master,
            mut worker_pipelines,
        } = self;

        let mut out = BTreeMap::new();
        for worker in workers {
            if let Some(pipeline) = worker_pipelines.remove(&worker.name) {
                out.insert(
                    worker.name.clone(),
                    WorkerPipeline {
                        worker: worker.clone(),
                        pipeline,
                    },
                );
            }
        }

        info!(
            "pipeline {} dividido en cluster {}: master con {} pasos, {} workers, {} puertos",
            graph.pipeline().name,
            cluster.name,
            master.steps.len(),
            out.len(),
            ports.len()
        );

        SplitResult {
            cluster: cluster.name.clone(),
            master_node: master_node.clone(),
            master,
            workers: out,
            ports: ports.assignments(),
        }
    }
}

/* ---------------- copias ---------------- */

/// Copia `step` al master si todavía no está. Devuelve su índice.
fn master_copy(master: &mut Pipeline, step: &Step) -> usize {
    match master.step_index(&step.name) {
        Some(idx) => idx,
        None => {
            master.steps.push(step.clone());
            master.steps.len() - 1
        }
    }
}

/// Copia `step` al pipeline del worker si todavía no está. La copia pierde la
/// referencia al cluster y, si está particionada, pasa a usar el descriptor
/// del worker con una sola copia.
fn worker_copy(
    pipeline: &mut Pipeline,
    step: &Step,
    cluster: &ClusterDescriptor,
    worker: &WorkerNode,
) -> std::result::Result<usize, InternalConsistencyError> {
    if let Some(idx) = pipeline.step_index(&step.name) {
        return Ok(idx);
    }

    let mut copy = step.clone();
    copy.cluster = None;

    if copy.is_partitioned() {
        if let Some(spec) = copy.partitioning.as_mut() {
            let scoped = worker_partition_name(&spec.partition);
            if pipeline.find_partition(&scoped).is_none() {
                return Err(InternalConsistencyError::MissingWorkerPartition {
                    cluster: cluster.name.clone(),
                    worker: worker.name.clone(),
                    step: step.name.clone(),
                    partition: scoped,
                });
            }
            spec.partition = scoped;
        }
        copy.copies = 1;
    }

    pipeline.steps.push(copy);
    Ok(pipeline.steps.len() - 1)
}

/// Agrega un paso lector/escritor de socket. Si su nombre ya lo usa un paso
/// del pipeline original (o del destino) no se puede agregar sin pisarlo.
fn add_transport_step(pipeline: &mut Pipeline, original: &Pipeline, step: Step) -> Result<String> {
    if original.contains_step(&step.name) || pipeline.contains_step(&step.name) {
        return Err(ConfigurationError::TransportStepNameTaken {
            pipeline: pipeline.name.clone(),
            step: step.name,
        }
        .into());
    }

    let name = step.name.clone();
    pipeline.steps.push(step);
    Ok(name)
}

fn worker_pipeline<'p>(
    pipelines: &'p mut BTreeMap<String, Pipeline>,
    cluster: &ClusterDescriptor,
    worker: &WorkerNode,
) -> std::result::Result<&'p mut Pipeline, InternalConsistencyError> {
    pipelines
        .get_mut(&worker.name)
        .ok_or_else(|| InternalConsistencyError::MissingWorkerPipeline {
            cluster: cluster.name.clone(),
            worker: worker.name.clone(),
        })
}

fn original_info_steps(original: &Pipeline, consumer: &str) -> Vec<String> {
    original
        .info_link(consumer)
        .map(|l| l.info_steps.clone())
        .unwrap_or_default()
}
