//! Incident provenance graph: RwLock<StableGraph> of incidents and decisions.
//!
//! Edges always run incident → decision and carry the full [`IncidentLink`].
//! Parallel edges between the same pair are kept; each is independent
//! evidence.

use std::collections::HashMap;
use std::sync::RwLock;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;

use pcal_core::errors::PcalResult;
use pcal_core::models::{IncidentLink, LinkType};
use pcal_core::sync;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProvenanceNode {
    Incident(String),
    Decision(String),
}

#[derive(Default)]
struct IndexedGraph {
    graph: StableGraph<ProvenanceNode, IncidentLink>,
    index: HashMap<ProvenanceNode, NodeIndex>,
}

impl IndexedGraph {
    fn ensure_node(&mut self, node: ProvenanceNode) -> NodeIndex {
        if let Some(idx) = self.index.get(&node) {
            return *idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.index.insert(node, idx);
        idx
    }

    fn edges_of(&self, node: &ProvenanceNode, direction: Direction) -> Vec<IncidentLink> {
        let Some(idx) = self.index.get(node) else {
            return Vec::new();
        };
        let mut links: Vec<IncidentLink> = self
            .graph
            .edges_directed(*idx, direction)
            .map(|e| e.weight().clone())
            .collect();
        links.sort_by_key(|l| l.created_at);
        links
    }
}

/// Thread-safe provenance graph.
#[derive(Default)]
pub struct ProvenanceGraph {
    inner: RwLock<IndexedGraph>,
}

impl ProvenanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge. Never deduplicates.
    pub fn add_link(&self, link: IncidentLink) -> PcalResult<()> {
        let mut g = sync::write(&self.inner)?;
        let from = g.ensure_node(ProvenanceNode::Incident(link.incident_id.clone()));
        let to = g.ensure_node(ProvenanceNode::Decision(link.decision_id.clone()));
        g.graph.add_edge(from, to, link);
        Ok(())
    }

    /// Every link, oldest first.
    pub fn all_links(&self) -> PcalResult<Vec<IncidentLink>> {
        let g = sync::read(&self.inner)?;
        let mut links: Vec<IncidentLink> = g
            .graph
            .edge_indices()
            .filter_map(|e| g.graph.edge_weight(e).cloned())
            .collect();
        links.sort_by_key(|l| l.created_at);
        Ok(links)
    }

    pub fn links_for_decision(&self, decision_id: &str) -> PcalResult<Vec<IncidentLink>> {
        let g = sync::read(&self.inner)?;
        Ok(g.edges_of(
            &ProvenanceNode::Decision(decision_id.to_string()),
            Direction::Incoming,
        ))
    }

    pub fn links_for_incident(&self, incident_id: &str) -> PcalResult<Vec<IncidentLink>> {
        let g = sync::read(&self.inner)?;
        Ok(g.edges_of(
            &ProvenanceNode::Incident(incident_id.to_string()),
            Direction::Outgoing,
        ))
    }

    /// Distinct decisions an incident has a `caused_by` edge onto.
    pub fn decisions_caused_by(&self, incident_id: &str) -> PcalResult<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for link in self.links_for_incident(incident_id)? {
            if link.link_type == LinkType::CausedBy && !ids.contains(&link.decision_id) {
                ids.push(link.decision_id);
            }
        }
        Ok(ids)
    }

    pub fn edge_count(&self) -> PcalResult<usize> {
        Ok(sync::read(&self.inner)?.graph.edge_count())
    }

    pub fn node_count(&self) -> PcalResult<usize> {
        Ok(sync::read(&self.inner)?.graph.node_count())
    }

    pub fn clear(&self) -> PcalResult<()> {
        *sync::write(&self.inner)? = IndexedGraph::default();
        Ok(())
    }
}
