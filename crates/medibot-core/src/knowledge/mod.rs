//! Symptom knowledge graph
//!
//! A directed graph with three tiers of nodes:
//!
//! ```text
//! symptom ──(weight)──▶ disease ──(treated_by)──▶ specialty
//! ```
//!
//! Tiers are inferred from edges: a symptom has outgoing weighted edges, a
//! disease has outgoing `treated_by` edges, a specialty only has incoming
//! ones. Several symptoms may point at one disease to model synonyms.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use medibot_core::knowledge::KnowledgeGraph;
//!
//! let graph = KnowledgeGraph::medical()?;
//! let result = graph.find_specialty("I have chest pain")?;
//! assert_eq!(result.specialty.as_deref(), Some("Cardiology"));
//! println!("{}", result.explanation());
//! ```

mod graph;
mod seed;
mod symptom_match;

pub use graph::{GraphEdge, GraphStats, KnowledgeGraph, KnowledgeGraphBuilder, SpecialtyMatch};
pub use seed::medical_builder;
pub use symptom_match::{SubstringMatcher, SymptomMatcher};
