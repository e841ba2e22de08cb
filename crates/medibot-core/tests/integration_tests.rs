//! MediBot Core Integration Tests

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use medibot_core::{
    Error, Result,
    classifier::SpecialtyClassifier,
    config::{LexicalMetric, MatcherConfig, MatcherMode},
    dialogue::{DialogueDriver, DriverDecision, LlmDialogueDriver},
    doctors::{self, DoctorCatalog, DoctorMatcher, DoctorRecord, HashingEmbedder, LexicalMatcher, SemanticMatcher},
    knowledge::KnowledgeGraph,
    llm::TextGenerator,
    pipeline::{ConfidenceSource, TriagePipeline},
    session::{RecommendedAction, SessionReply, TriageService},
    transcript::Transcript,
};

const SHIPPED_CATALOG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/doctors_db.json");

/// Generator that answers question prompts and diagnosis prompts differently
struct ScriptedModel {
    question: &'static str,
    diagnosis: Option<&'static str>,
    diagnosis_calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(question: &'static str, diagnosis: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            question,
            diagnosis,
            diagnosis_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for ScriptedModel {
    async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String> {
        if prompt.contains("Diagnose Patient") {
            self.diagnosis_calls.fetch_add(1, Ordering::SeqCst);
            return self
                .diagnosis
                .map(str::to_string)
                .ok_or_else(|| Error::LLMError("model offline".into()));
        }
        Ok(self.question.to_string())
    }
}

fn shipped_catalog() -> Arc<DoctorCatalog> {
    Arc::new(DoctorCatalog::try_load(SHIPPED_CATALOG).unwrap())
}

async fn pipeline_with(generator: Option<Arc<ScriptedModel>>) -> TriagePipeline {
    let matcher = doctors::build_matcher(&MatcherConfig::default(), shipped_catalog(), None)
        .await
        .unwrap();
    let pipeline = TriagePipeline::new(Arc::new(KnowledgeGraph::medical().unwrap()), matcher);
    match generator {
        Some(generator) => pipeline.with_fallback(SpecialtyClassifier::new(generator)),
        None => pipeline,
    }
}

#[test]
fn test_graph_scenarios() {
    let graph = KnowledgeGraph::medical().unwrap();

    let transcript = Transcript::from_lines(["Patient: I have chest pain and shortness of breath"]);
    let result = graph.find_specialty(&transcript.flatten()).unwrap();
    assert_eq!(result.specialty.as_deref(), Some("Cardiology"));
    assert!((result.score - 1.9).abs() < 1e-9);

    let transcript = Transcript::from_lines(["Patient: my knee hurts"]);
    let result = graph.find_specialty(&transcript.flatten()).unwrap();
    assert_eq!(result.specialty.as_deref(), Some("Orthopedics"));
    assert!((result.score - 0.8).abs() < 1e-9);

    let transcript = Transcript::from_lines(["Patient: I feel generally unwell"]);
    assert!(graph.find_specialty(&transcript.flatten()).unwrap().specialty.is_none());
}

#[test]
fn test_every_symptom_routes_alone() {
    let graph = KnowledgeGraph::medical().unwrap();
    for symptom in graph.symptoms() {
        let result = graph.find_specialty(symptom).unwrap();
        assert!(result.is_match(), "{} matched nothing", symptom);
        assert!(result.score > 0.0 && result.score <= 2.0, "{}: {}", symptom, result.score);
    }
}

#[test]
fn test_shipped_catalog_covers_graph_specialties() {
    let catalog = shipped_catalog();
    let graph = KnowledgeGraph::medical().unwrap();
    let available: HashSet<&str> = catalog.specialties().into_iter().collect();
    for specialty in graph.specialties() {
        assert!(available.contains(specialty), "no doctor for {}", specialty);
    }
}

#[tokio::test]
async fn test_every_graph_specialty_finds_its_own_doctor() {
    let catalog = shipped_catalog();
    let graph = KnowledgeGraph::medical().unwrap();
    let matcher = LexicalMatcher::new(catalog, LexicalMetric::Dice, 0.30);

    for specialty in graph.specialties() {
        let hits = matcher.search(specialty, 1).await;
        assert_eq!(hits.len(), 1, "{}", specialty);
        assert_eq!(hits[0].record.specialty, specialty);
    }
}

#[tokio::test]
async fn test_lexical_cardiology_excludes_neurology() {
    let catalog = Arc::new(DoctorCatalog::from_records(vec![
        DoctorRecord::new("Cardiology", "heart chest pain cardiac"),
        DoctorRecord::new("Neurology", "brain headache migraine"),
    ]));

    for (metric, threshold) in [(LexicalMetric::Dice, 0.30), (LexicalMetric::Partial, 0.75)] {
        let matcher = LexicalMatcher::new(catalog.clone(), metric, threshold);
        let hits = matcher.search("Cardiology", 5).await;
        assert_eq!(hits.len(), 1, "{}", metric);
        assert_eq!(hits[0].record.specialty, "Cardiology");
        assert!(hits[0].score > threshold);
    }
}

#[tokio::test]
async fn test_empty_catalog_never_matches() {
    let empty = Arc::new(DoctorCatalog::empty());
    let lexical = LexicalMatcher::new(empty.clone(), LexicalMetric::Dice, 0.0);
    let semantic = SemanticMatcher::build(empty, Arc::new(HashingEmbedder::default()), 0.0, 3)
        .await
        .unwrap();

    for query in ["Cardiology", "", "anything at all"] {
        for top_k in [0, 1, 3, 100] {
            assert!(lexical.search(query, top_k).await.is_empty());
            assert!(semantic.search(query, top_k).await.is_empty());
        }
    }
}

#[tokio::test]
async fn test_matchers_respect_top_k_and_threshold() {
    let catalog = shipped_catalog();
    let config = MatcherConfig {
        mode: MatcherMode::Semantic,
        ..MatcherConfig::default()
    };
    let semantic = doctors::build_matcher(&config, catalog.clone(), None).await.unwrap();
    let lexical = doctors::build_matcher(&MatcherConfig::default(), catalog, None)
        .await
        .unwrap();

    for query in ["Cardiology", "General Medicine", "skin", "Urology"] {
        for top_k in [1, 2, 5] {
            let hits = semantic.search(query, top_k).await;
            assert!(hits.len() <= top_k);
            assert!(hits.iter().all(|h| h.score > f64::from(config.semantic_threshold)));

            let hits = lexical.search(query, top_k).await;
            assert!(hits.len() <= top_k);
            assert!(hits.iter().all(|h| h.score > config.dice_threshold));
        }
    }
}

#[tokio::test]
async fn test_semantic_single_pick_varies() {
    let catalog = Arc::new(DoctorCatalog::from_records(vec![
        DoctorRecord::new("Dermatology", "skin").with_field("name", "One"),
        DoctorRecord::new("Dermatology", "skin rash").with_field("name", "Two"),
        DoctorRecord::new("Dermatology", "skin acne").with_field("name", "Three"),
        DoctorRecord::new("Urology", "kidney").with_field("name", "Four"),
    ]));
    let matcher = SemanticMatcher::build(catalog, Arc::new(HashingEmbedder::default()), 0.45, 3)
        .await
        .unwrap();

    let mut seen = HashSet::new();
    for _ in 0..200 {
        let hits = matcher.search("dermatology", 1).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.specialty, "Dermatology");
        seen.insert(hits[0].record.name().unwrap().to_string());
    }
    assert!(seen.len() > 1, "always returned {:?}", seen);
}

#[tokio::test]
async fn test_pipeline_always_returns_specialty() {
    let transcript = Transcript::from_lines(["Patient: I feel generally unwell"]);

    let without_llm = pipeline_with(None).await.resolve(&transcript).await.unwrap();
    assert_eq!(without_llm.specialty, "General Medicine");
    assert_eq!(without_llm.confidence_source, ConfidenceSource::Fallback);

    let broken = ScriptedModel::new("unused", None);
    let result = pipeline_with(Some(broken.clone())).await.resolve(&transcript).await.unwrap();
    assert_eq!(result.specialty, "General Medicine");
    assert_eq!(broken.diagnosis_calls.load(Ordering::SeqCst), 1);

    let garbled = ScriptedModel::new("unused", Some("Patient needs rest"));
    let result = pipeline_with(Some(garbled)).await.resolve(&transcript).await.unwrap();
    assert_eq!(result.specialty, "General Medicine");
    assert!(result.has_doctor());
}

#[tokio::test]
async fn test_pipeline_fallback_with_noisy_label() {
    let model = ScriptedModel::new("unused", Some("URGENCY: Medium | SPECIALTY: **Dermatology**."));
    let result = pipeline_with(Some(model))
        .await
        .resolve(&Transcript::from_lines(["Patient: there is a strange spot on my arm"]))
        .await
        .unwrap();

    assert_eq!(result.specialty, "Dermatology");
    assert_eq!(result.confidence_source, ConfidenceSource::Fallback);
    assert_eq!(result.urgency.as_deref(), Some("Medium"));
    assert_eq!(result.doctor.unwrap().record.specialty, "Dermatology");
}

#[tokio::test]
async fn test_concurrent_resolves_share_pipeline() {
    let pipeline = Arc::new(pipeline_with(None).await);
    let cases = [
        ("Patient: I have a toothache", "Dentistry"),
        ("Patient: painful urination since monday", "Urology"),
        ("Patient: wheezing at night", "Pulmonology"),
        ("Patient: I have a rash", "Dermatology"),
    ];

    let handles: Vec<_> = cases
        .iter()
        .map(|(line, _)| {
            let pipeline = pipeline.clone();
            let transcript = Transcript::from_lines([*line]);
            tokio::spawn(async move { pipeline.resolve(&transcript).await })
        })
        .collect();

    for (handle, (_, expected)) in handles.into_iter().zip(cases) {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.specialty, expected);
        assert_eq!(result.confidence_source, ConfidenceSource::Graph);
        assert_eq!(result.doctor.unwrap().record.specialty, expected);
    }
}

#[tokio::test]
async fn test_full_session_with_llm_driver() {
    let model = ScriptedModel::new("Question: Where exactly is the pain?", Some("SPECIALTY: Cardiology"));
    let driver = LlmDialogueDriver::new(model.clone()).with_max_questions(2);
    let service = TriageService::new(pipeline_with(Some(model.clone())).await, Arc::new(driver));

    let first = service.handle_message("s1", "my stomach ache is bad").await.unwrap();
    assert!(matches!(first, SessionReply::Question { ref message } if message == "Where exactly is the pain?"));
    service.handle_message("s1", "upper belly").await.unwrap();

    match service.handle_message("s1", "after meals").await.unwrap() {
        SessionReply::Diagnosis {
            result,
            recommended_action,
            ..
        } => {
            assert_eq!(result.specialty, "Gastroenterology");
            assert_eq!(result.confidence_source, ConfidenceSource::Graph);
            assert_eq!(recommended_action, RecommendedAction::VideoCall);
        }
        other => panic!("expected diagnosis, got {:?}", other),
    }
    assert_eq!(model.diagnosis_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.active_sessions().await, 0);
}

#[tokio::test]
async fn test_stop_sentinel_ends_session_immediately() {
    struct AlwaysStop;

    #[async_trait]
    impl DialogueDriver for AlwaysStop {
        async fn next_turn(&self, _transcript: &Transcript) -> DriverDecision {
            DriverDecision::Stop
        }
    }

    let service = TriageService::new(pipeline_with(None).await, Arc::new(AlwaysStop));
    let reply = service.handle_message("s2", "I keep having seizures").await.unwrap();
    match reply {
        SessionReply::Diagnosis { result, .. } => assert_eq!(result.specialty, "Neurology"),
        other => panic!("expected diagnosis, got {:?}", other),
    }
}
