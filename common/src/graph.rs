use std::collections::{HashMap, HashSet};

use crate::pipeline::{Pipeline, Step};

/// Vista de sólo lectura del pipeline original.
///
/// Se arma una vez por split; no se modifica. Hops deshabilitados y aristas
/// hacia pasos inexistentes se ignoran.
pub struct PipelineGraph<'a> {
    pipeline: &'a Pipeline,
    reference_steps: Vec<&'a Step>,
    predecessors: HashMap<&'a str, Vec<&'a Step>>,
    info_steps: HashMap<&'a str, Vec<&'a Step>>,
}

impl<'a> PipelineGraph<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        let by_name: HashMap<&str, &Step> = pipeline
            .steps
            .iter()
            .map(|s| (s.name.as_str(), s))
            .collect();

        let mut used: HashSet<&str> = HashSet::new();
        let mut info_steps: HashMap<&str, Vec<&Step>> = HashMap::new();

        for link in &pipeline.info_links {
            let Some(consumer) = by_name.get(link.consumer.as_str()) else {
                continue;
            };
            for info_name in &link.info_steps {
                let Some(info) = by_name.get(info_name.as_str()) else {
                    continue;
                };
                used.insert(consumer.name.as_str());
                used.insert(info.name.as_str());

                let entry = info_steps.entry(consumer.name.as_str()).or_default();
                if !entry.iter().any(|s| s.name == info.name) {
                    entry.push(*info);
                }
            }
        }

        let mut predecessors: HashMap<&str, Vec<&Step>> = HashMap::new();

        for hop in pipeline.hops.iter().filter(|h| h.enabled) {
            let (Some(from), Some(to)) = (
                by_name.get(hop.from.as_str()),
                by_name.get(hop.to.as_str()),
            ) else {
                continue;
            };
            used.insert(from.name.as_str());
            used.insert(to.name.as_str());

            // un hop que duplica un info-link se trata sólo como info
            let is_info = info_steps
                .get(to.name.as_str())
                .map(|v| v.iter().any(|s| s.name == from.name))
                .unwrap_or(false);
            if is_info {
                continue;
            }

            let entry = predecessors.entry(to.name.as_str()).or_default();
            if !entry.iter().any(|s| s.name == from.name) {
                entry.push(*from);
            }
        }

        // orden determinista: el de declaración en el pipeline
        let reference_steps = pipeline
            .steps
            .iter()
            .filter(|s| used.contains(s.name.as_str()))
            .collect();

        Self {
            pipeline,
            reference_steps,
            predecessors,
            info_steps,
        }
    }

    pub fn pipeline(&self) -> &'a Pipeline {
        self.pipeline
    }

    /// Pasos conectados por al menos un hop o info-link, en orden de declaración.
    pub fn reference_steps(&self) -> &[&'a Step] {
        &self.reference_steps
    }

    pub fn predecessors(&self, name: &str) -> &[&'a Step] {
        self.predecessors
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn info_steps(&self, name: &str) -> &[&'a Step] {
        self.info_steps
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_predecessors(&self, name: &str) -> bool {
        !self.predecessors(name).is_empty()
    }
}
