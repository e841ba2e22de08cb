//! Built-in medical knowledge graph

use crate::error::Result;

use super::graph::{KnowledgeGraph, KnowledgeGraphBuilder};

impl KnowledgeGraph {
    /// The shipped symptom → disease → specialty graph
    pub fn medical() -> Result<Self> {
        medical_builder().build()
    }
}

/// Builder preloaded with the shipped graph, for callers that want to extend it
pub fn medical_builder() -> KnowledgeGraphBuilder {
    KnowledgeGraph::builder()
        // Cardiology
        .synonyms(
            ["chest pain", "chest hurts", "heart pain", "pain in chest"],
            "Heart Attack",
            1.0,
            "Cardiology",
        )
        .path("shortness of breath", "Heart Failure", 0.9, "Cardiology")
        .path("palpitations", "Arrhythmia", 0.9, "Cardiology")
        // Neurology
        .synonyms(
            ["headache", "head pain", "head hurts", "my head is hurting", "severe headache"],
            "Migraine",
            0.9,
            "Neurology",
        )
        .path("dizziness", "Vertigo", 0.9, "Neurology")
        .path("seizure", "Epilepsy", 1.0, "Neurology")
        .path("slurred speech", "Stroke", 1.0, "Neurology")
        // Orthopedics
        .synonyms(["back pain", "back hurts", "spine pain"], "Sciatica", 0.9, "Orthopedics")
        .synonyms(["knee pain", "joint pain", "knee hurts"], "Arthritis", 0.8, "Orthopedics")
        .path("fracture", "Bone Fracture", 1.0, "Orthopedics")
        // Dermatology
        .path("rash", "Eczema", 0.9, "Dermatology")
        .path("itch", "Allergies", 0.8, "Dermatology")
        .path("redness", "Rosacea", 0.8, "Dermatology")
        .path("hair loss", "Alopecia", 1.0, "Dermatology")
        // Ophthalmology
        .synonyms(
            ["blurry vision", "cant see clearly", "vision loss"],
            "Cataracts",
            0.9,
            "Ophthalmology",
        )
        .path("eye pain", "Glaucoma", 0.9, "Ophthalmology")
        // Pulmonology
        .path("wheezing", "Asthma", 1.0, "Pulmonology")
        .path("coughing blood", "Tuberculosis", 1.0, "Pulmonology")
        // Gastroenterology
        .synonyms(
            ["stomach pain", "stomach ache", "belly pain", "abdominal pain"],
            "Gastritis",
            0.9,
            "Gastroenterology",
        )
        .path("acid reflux", "GERD", 1.0, "Gastroenterology")
        // Urology
        .path("painful urination", "UTI", 1.0, "Urology")
        .path("blood in urine", "Kidney Stones", 1.0, "Urology")
        // Dentistry
        .synonyms(["toothache", "tooth pain", "teeth hurt"], "Cavity", 1.0, "Dentistry")
        // General Medicine
        .path("fever", "Viral Infection", 0.9, "General Medicine")
        .indicates("cough", "Viral Infection", 0.8)
        .path("weakness", "General Fatigue", 0.7, "General Medicine")
        .path("vomiting", "Gastroenteritis", 0.9, "General Medicine")
}
