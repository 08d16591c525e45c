use std::path::Path;

use semkv_core::config::Settings;
use semkv_core::traits::Embedder;
use semkv_core::{cosine_similarity, Error};
use semkv_embed::{get_default_embedder, FakeEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = Settings { use_fake_embeddings: true, fake_embedding_dim: 384, ..Settings::default() };
    let embedder = get_default_embedder(&settings, Path::new(".")).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs: Vec<_> = embedder.embed_batch(&texts).into_iter().map(|r| r.expect("embed")).collect();
    let v1 = embs[0].values();
    let v2 = embs[1].values();

    assert_eq!(v1.len(), 384, "embedding dim follows settings");
    assert_eq!(embedder.dim(), 384);
    assert_eq!(embedder.model_id(), "fake:xxh64:d384");

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_rejects_blank_text() {
    let embedder = FakeEmbedder::new(16).unwrap();
    assert!(matches!(embedder.embed(""), Err(Error::Embedding(_))));
    assert!(matches!(embedder.embed(" \n\t"), Err(Error::Embedding(_))));
}

#[test]
fn fake_embedder_batch_isolates_failures() {
    let embedder = FakeEmbedder::new(32).unwrap();
    let out = embedder.embed_batch(&["alpha".to_string(), String::new(), "beta".to_string()]);
    assert!(out[0].is_ok());
    assert!(out[1].is_err());
    assert!(out[2].is_ok());
}

#[test]
fn shared_words_score_higher_than_disjoint_words() {
    let embedder = FakeEmbedder::new(256).unwrap();
    let query = embedder.embed("typescript generics").unwrap();
    let close = embedder.embed("TypeScript generics are powerful").unwrap();
    let far = embedder.embed("cats purr loudly").unwrap();
    let s_close = cosine_similarity(&query, &close).unwrap();
    let s_far = cosine_similarity(&query, &far).unwrap();
    assert!(s_close > s_far, "{s_close} <= {s_far}");
}

#[test]
fn zero_fake_dimension_is_rejected_up_front() {
    assert!(matches!(FakeEmbedder::new(0), Err(Error::InvalidConfig(_))));

    let settings = Settings { use_fake_embeddings: true, fake_embedding_dim: 0, ..Settings::default() };
    match get_default_embedder(&settings, Path::new(".")) {
        Err(Error::InvalidConfig(msg)) => assert!(msg.contains("fake_embedding_dim"), "{msg}"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("a zero-dimension embedder must not be built"),
    }
}

#[test]
fn factory_validates_settings_before_touching_the_model() {
    let settings = Settings { key_namespace: "bad ns".to_string(), ..Settings::default() };
    assert!(matches!(get_default_embedder(&settings, Path::new(".")), Err(Error::InvalidConfig(_))));
}

#[test]
fn missing_model_directory_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = Settings { model_dir: Some("no-such-model".to_string()), ..Settings::default() };
    match get_default_embedder(&settings, tmp.path()) {
        Err(Error::NotFound(msg)) => assert!(msg.contains("no-such-model")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected missing model directory"),
    }
}
