use tracing::debug;

use crate::cluster::{ClusterDescriptor, WorkerNode};
use crate::error::ConfigurationError;
use crate::pipeline::{Location, Step};
use crate::ports::PortAllocator;
use crate::transport::{
    RemoteTransportBinding, TransportConfig, TransportRole, SOCKET_READER_TYPE, SOCKET_WRITER_TYPE,
};

// separación vertical entre pasos de transporte en abanico
const FANOUT: i32 = 30;
// separación horizontal respecto del paso ancla
const SPLIT: i32 = 120;

pub fn writer_name(port: u16) -> String {
    format!("Writer : {}", port)
}

pub fn reader_name(port: u16) -> String {
    format!("Reader : {}", port)
}

pub fn remote_binding(
    hostname: &str,
    port: u16,
    source_step: &str,
    target_step: &str,
) -> RemoteTransportBinding {
    RemoteTransportBinding {
        hostname: hostname.to_string(),
        port,
        source_step: source_step.to_string(),
        target_step: target_step.to_string(),
    }
}

/// Posición de un paso dentro de un abanico de `total` pasos de transporte.
#[derive(Debug, Clone, Copy)]
pub struct Fanout {
    pub index: usize,
    pub total: usize,
}

impl Fanout {
    fn dy(self) -> i32 {
        let index = i64::try_from(self.index).unwrap_or(i64::MAX);
        let total = i64::try_from(self.total).unwrap_or(i64::MAX);
        let fanout = i64::from(FANOUT);
        let dy = index
            .saturating_mul(fanout * 2)
            .saturating_sub(total.saturating_mul(fanout) / 2);
        i32::try_from(dy).unwrap_or(if dy < 0 { i32::MIN } else { i32::MAX })
    }
}

/// Un canal a cruzar: de qué worker, con qué nombre lógico y contra qué host.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'w> {
    pub worker: &'w WorkerNode,
    pub channel: &'w str,
    /// Lector: host al que se conecta. Escritor: host donde escucha.
    pub hostname: &'w str,
}

/// Arma los pasos placeholder de socket con la configuración del cluster.
pub struct RemoteStepFactory<'a> {
    cluster: &'a ClusterDescriptor,
}

impl<'a> RemoteStepFactory<'a> {
    pub fn new(cluster: &'a ClusterDescriptor) -> Self {
        Self { cluster }
    }

    pub fn writer_step(
        &self,
        ports: &mut PortAllocator,
        endpoint: Endpoint<'_>,
        anchor: &Step,
        fanout: Option<Fanout>,
    ) -> Result<Step, ConfigurationError> {
        let port = ports.port_for(self.cluster, endpoint.worker, endpoint.channel)?;
        let dy = fanout.map(Fanout::dy).unwrap_or(0);

        let mut step = Step::new(writer_name(port), SOCKET_WRITER_TYPE);
        step.location = anchor.location.offset(0, dy);
        step.transport = Some(self.config(TransportRole::Writer, endpoint.hostname, port));

        debug!("writer {} para canal [{}]", step.name, endpoint.channel);
        Ok(step)
    }

    pub fn reader_step(
        &self,
        ports: &mut PortAllocator,
        endpoint: Endpoint<'_>,
        anchor: &Step,
        fanout: Option<Fanout>,
    ) -> Result<Step, ConfigurationError> {
        let port = ports.port_for(self.cluster, endpoint.worker, endpoint.channel)?;
        let dy = fanout.map(Fanout::dy).unwrap_or(0);

        let mut step = Step::new(reader_name(port), SOCKET_READER_TYPE);
        step.location = anchor.location.offset(-(SPLIT / 2), dy);
        step.transport = Some(self.config(TransportRole::Reader, endpoint.hostname, port));

        debug!(
            "reader {} para canal [{}] desde {}",
            step.name, endpoint.channel, endpoint.hostname
        );
        Ok(step)
    }

    fn config(&self, role: TransportRole, hostname: &str, port: u16) -> TransportConfig {
        TransportConfig {
            role,
            hostname: hostname.to_string(),
            port,
            buffer_size: self.cluster.sockets_buffer_size,
            flush_interval_ms: self.cluster.sockets_flush_interval_ms,
            compressed: self.cluster.sockets_compressed,
        }
    }
}
