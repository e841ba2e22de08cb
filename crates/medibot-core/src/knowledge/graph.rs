//! Weighted symptom → disease → specialty graph

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::symptom_match::{SubstringMatcher, SymptomMatcher};

/// Edge between two graph nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphEdge {
    /// Symptom → Disease, with diagnostic confidence in (0, 1]
    Indicates { weight: f64 },
    /// Disease → Specialty routing edge
    TreatedBy,
}

/// Outcome of scanning a block of text against the graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialtyMatch {
    /// Highest-scoring specialty, `None` when no symptom matched
    pub specialty: Option<String>,
    /// Accumulated weight of `specialty`
    pub score: f64,
    /// Accumulated weight per specialty
    pub scores: BTreeMap<String, f64>,
    /// Symptom labels found in the text
    pub matched_symptoms: Vec<String>,
}

impl SpecialtyMatch {
    pub fn is_match(&self) -> bool {
        self.specialty.is_some()
    }

    /// Human-readable score breakdown
    pub fn explanation(&self) -> String {
        if self.scores.is_empty() {
            return "no match".to_string();
        }
        let mut out = String::from("graph scores:");
        for (specialty, score) in &self.scores {
            let _ = write!(out, " {}={:.2}", specialty, score);
        }
        out
    }
}

/// Node and edge counts by tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub symptoms: usize,
    pub diseases: usize,
    pub specialties: usize,
    pub edges: usize,
}

/// Directed weighted graph used as a deterministic specialty classifier.
///
/// Read-only after [`KnowledgeGraphBuilder::build`]; safe to share across
/// tasks behind an `Arc` without locking.
pub struct KnowledgeGraph {
    graph: DiGraph<String, GraphEdge>,
    matcher: Box<dyn SymptomMatcher>,
}

impl std::fmt::Debug for KnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraph")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

impl KnowledgeGraph {
    pub fn builder() -> KnowledgeGraphBuilder {
        KnowledgeGraphBuilder::new()
    }

    /// Score every specialty implied by symptoms found in `text`.
    ///
    /// Each matching symptom contributes its edge weight, in full, to every
    /// specialty reachable through each of its diseases. Equal top scores
    /// resolve to the lexically smallest specialty label.
    pub fn find_specialty(&self, text: &str) -> Result<SpecialtyMatch> {
        let text = text.to_lowercase();
        let mut scores: BTreeMap<String, f64> = BTreeMap::new();
        let mut matched_symptoms = Vec::new();

        for symptom in self.symptom_nodes() {
            let label = &self.graph[symptom];
            if !self.matcher.matches(label, &text) {
                continue;
            }
            matched_symptoms.push(label.clone());

            for edge in self.graph.edges(symptom) {
                let GraphEdge::Indicates { weight } = *edge.weight() else {
                    continue;
                };
                for specialty in self.specialties_of(edge.target())? {
                    *scores.entry(self.graph[specialty].clone()).or_insert(0.0) += weight;
                }
            }
        }

        let mut best: Option<(&String, f64)> = None;
        for (specialty, &score) in &scores {
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((specialty, score));
            }
        }

        let (specialty, score) = match best {
            Some((name, score)) => (Some(name.clone()), score),
            None => (None, 0.0),
        };

        debug!(
            matched = matched_symptoms.len(),
            specialty = specialty.as_deref().unwrap_or("-"),
            score,
            "Knowledge graph scan complete"
        );

        Ok(SpecialtyMatch {
            specialty,
            score,
            scores,
            matched_symptoms,
        })
    }

    /// Sorted symptom labels
    pub fn symptoms(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .symptom_nodes()
            .map(|idx| self.graph[idx].as_str())
            .collect();
        labels.sort_unstable();
        labels
    }

    /// Sorted specialty labels
    pub fn specialties(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .graph
            .node_indices()
            .filter(|&idx| self.is_specialty(idx))
            .map(|idx| self.graph[idx].as_str())
            .collect();
        labels.sort_unstable();
        labels
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            symptoms: 0,
            diseases: 0,
            specialties: 0,
            edges: self.graph.edge_count(),
        };
        for idx in self.graph.node_indices() {
            if self.is_symptom(idx) {
                stats.symptoms += 1;
            } else if self.is_disease(idx) {
                stats.diseases += 1;
            } else if self.is_specialty(idx) {
                stats.specialties += 1;
            }
        }
        stats
    }

    /// Confirm every disease routes to at least one specialty
    pub fn validate(&self) -> Result<()> {
        for idx in self.graph.node_indices().filter(|&idx| self.is_disease(idx)) {
            self.specialties_of(idx)?;
        }
        Ok(())
    }

    fn symptom_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .node_indices()
            .filter(|&idx| self.is_symptom(idx))
    }

    fn specialties_of(&self, disease: NodeIndex) -> Result<Vec<NodeIndex>> {
        let specialties: Vec<NodeIndex> = self
            .graph
            .edges(disease)
            .filter(|edge| *edge.weight() == GraphEdge::TreatedBy)
            .map(|edge| edge.target())
            .collect();
        if specialties.is_empty() {
            return Err(Error::MalformedGraph(self.graph[disease].clone()));
        }
        Ok(specialties)
    }

    fn is_symptom(&self, idx: NodeIndex) -> bool {
        self.graph
            .edges(idx)
            .any(|edge| matches!(edge.weight(), GraphEdge::Indicates { .. }))
    }

    fn is_disease(&self, idx: NodeIndex) -> bool {
        !self.is_symptom(idx)
            && (self
                .graph
                .edges(idx)
                .any(|edge| *edge.weight() == GraphEdge::TreatedBy)
                || self
                    .graph
                    .edges_directed(idx, petgraph::Direction::Incoming)
                    .any(|edge| matches!(edge.weight(), GraphEdge::Indicates { .. })))
    }

    fn is_specialty(&self, idx: NodeIndex) -> bool {
        self.graph
            .edges_directed(idx, petgraph::Direction::Incoming)
            .any(|edge| *edge.weight() == GraphEdge::TreatedBy)
    }
}

/// Collects graph edges and validates them on [`build`](Self::build).
pub struct KnowledgeGraphBuilder {
    indications: Vec<(String, String, f64)>,
    treatments: Vec<(String, String)>,
    matcher: Box<dyn SymptomMatcher>,
}

impl Default for KnowledgeGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeGraphBuilder {
    pub fn new() -> Self {
        Self {
            indications: Vec::new(),
            treatments: Vec::new(),
            matcher: Box::new(SubstringMatcher),
        }
    }

    /// Add a complete `symptom → disease → specialty` chain
    pub fn path(
        mut self,
        symptom: impl Into<String>,
        disease: impl Into<String>,
        weight: f64,
        specialty: impl Into<String>,
    ) -> Self {
        let disease = disease.into();
        self.indications.push((symptom.into(), disease.clone(), weight));
        self.treatments.push((disease, specialty.into()));
        self
    }

    /// Add several symptom synonyms that all indicate the same disease
    pub fn synonyms<I, S>(
        mut self,
        symptoms: I,
        disease: impl Into<String>,
        weight: f64,
        specialty: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let disease = disease.into();
        for symptom in symptoms {
            self.indications.push((symptom.into(), disease.clone(), weight));
        }
        self.treatments.push((disease, specialty.into()));
        self
    }

    /// Add a lone `symptom → disease` edge
    pub fn indicates(
        mut self,
        symptom: impl Into<String>,
        disease: impl Into<String>,
        weight: f64,
    ) -> Self {
        self.indications.push((symptom.into(), disease.into(), weight));
        self
    }

    /// Add a lone `disease → specialty` edge
    pub fn treated_by(mut self, disease: impl Into<String>, specialty: impl Into<String>) -> Self {
        self.treatments.push((disease.into(), specialty.into()));
        self
    }

    /// Replace the substring symptom recogniser
    pub fn matcher(mut self, matcher: impl SymptomMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    pub fn build(self) -> Result<KnowledgeGraph> {
        let mut graph = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();

        let mut node = |graph: &mut DiGraph<String, GraphEdge>, label: String| {
            *index
                .entry(label.clone())
                .or_insert_with(|| graph.add_node(label))
        };

        for (symptom, disease, weight) in self.indications {
            let symptom = symptom.trim().to_lowercase();
            if !(weight > 0.0 && weight <= 1.0) {
                return Err(Error::InvalidWeight {
                    symptom,
                    disease,
                    weight,
                });
            }
            if symptom.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "empty symptom label for disease '{}'",
                    disease
                )));
            }
            let from = node(&mut graph, symptom);
            let to = node(&mut graph, disease);
            graph.update_edge(from, to, GraphEdge::Indicates { weight });
        }

        for (disease, specialty) in self.treatments {
            let from = node(&mut graph, disease);
            let to = node(&mut graph, specialty);
            graph.update_edge(from, to, GraphEdge::TreatedBy);
        }

        let knowledge_graph = KnowledgeGraph {
            graph,
            matcher: self.matcher,
        };
        knowledge_graph.validate()?;

        let stats = knowledge_graph.stats();
        debug!(
            symptoms = stats.symptoms,
            diseases = stats.diseases,
            specialties = stats.specialties,
            "Knowledge graph built"
        );
        Ok(knowledge_graph)
    }
}
