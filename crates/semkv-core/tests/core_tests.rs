use std::fs;
use std::io::Write;
use tempfile::TempDir;

use semkv_core::config::Config;
use semkv_core::kv::MemoryKv;
use semkv_core::loader::DocumentLoader;
use semkv_core::{Embedding, Error, KeyDeriver, Retriever, VectorStore};

#[test]
fn load_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let docs = DocumentLoader::new().load_directory(dir).expect("load");

    assert_eq!(docs.len(), 1, "one file becomes one document");
    assert_eq!(docs[0].document.text, "Short text\n", "text is kept byte-for-byte");
    assert_eq!(docs[0].path, file_path);
}

#[test]
fn load_directory_filters_extension_and_sorts() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("a.txt"), "alpha").unwrap();
    fs::write(dir.join("nested/c.txt"), "charlie").unwrap();
    fs::write(dir.join("notes.md"), "ignored").unwrap();

    let docs = DocumentLoader::new().load_directory(dir).expect("load");
    let texts: Vec<&str> = docs.iter().map(|d| d.document.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha", "bravo", "charlie"]);

    let md = DocumentLoader::new().with_extension(".md").load_directory(dir).expect("load md");
    assert_eq!(md.len(), 1);
    assert_eq!(md[0].document.text, "ignored");
}

#[test]
fn load_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let docs = DocumentLoader::new().with_limit(1).load_directory(dir).expect("load limited");
    assert_eq!(docs.len(), 1, "limited to one source document");
    assert_eq!(docs[0].document.text, "alpha bravo");
}

#[test]
fn load_directory_skips_invalid_utf8() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("good.txt"), "fine").unwrap();
    fs::write(dir.join("bad.txt"), [0xffu8, 0xfe, 0x00]).unwrap();

    let docs = DocumentLoader::new().load_directory(dir).expect("load");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].document.text, "fine");
}

#[test]
fn load_directory_missing_dir_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = DocumentLoader::new().load_directory(&tmp.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn empty_directory_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    assert!(DocumentLoader::new().load_directory(tmp.path()).unwrap().is_empty());
}

fn emb(v: &[f32]) -> Embedding {
    Embedding::new(v.to_vec()).unwrap()
}

#[test]
fn hand_picked_vectors_pick_the_typescript_document() {
    let store = VectorStore::new(MemoryKv::new(), KeyDeriver::default());
    let docs = [
        ("cats are great", [1.0f32, 0.0, 0.0]),
        ("dogs are great", [0.9, 0.1, 0.0]),
        ("TypeScript generics are powerful", [0.0, 0.0, 1.0]),
    ];
    for (text, v) in &docs {
        store.put(&store.keys().derive(text), text, &emb(v)).unwrap();
    }

    let query = emb(&[0.0, 0.0, 1.0]);
    let best = Retriever::new(&store).retrieve_best(&query).unwrap().expect("a match");
    assert_eq!(best.text, "TypeScript generics are powerful");
    assert!((best.score - 1.0).abs() < 1e-9);

    let ranked = Retriever::new(&store).retrieve_top_k(&query, 3).unwrap();
    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked[0].text, best.text);
    assert!(ranked[1..].iter().all(|c| c.score < best.score));
}

#[test]
fn mixed_dimensions_only_score_matching_records() {
    let store = VectorStore::new(MemoryKv::new(), KeyDeriver::default());
    store.put(&store.keys().derive("d3"), "d3", &emb(&[0.0, 1.0, 0.0])).unwrap();
    store.put(&store.keys().derive("d2"), "d2", &emb(&[1.0, 0.0])).unwrap();

    let best = Retriever::new(&store).retrieve_best(&emb(&[0.0, 0.5, 0.5])).unwrap().expect("d3 scores");
    assert_eq!(best.text, "d3");
    let all = Retriever::new(&store).retrieve_top_k(&emb(&[0.0, 0.5, 0.5]), 10).unwrap();
    assert_eq!(all.len(), 1, "the two-dimensional record is excluded");
}

#[test]
fn tie_goes_to_first_inserted() {
    let store = VectorStore::new(MemoryKv::new(), KeyDeriver::default());
    store.put(&store.keys().derive("first"), "first", &emb(&[2.0, 0.0])).unwrap();
    store.put(&store.keys().derive("second"), "second", &emb(&[5.0, 0.0])).unwrap();
    for parallel in [false, true] {
        let best = Retriever::new(&store).parallel(parallel).retrieve_best(&emb(&[1.0, 0.0])).unwrap().unwrap();
        assert_eq!(best.text, "first");
    }
}

#[test]
fn config_layers_defaults_files_and_env() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
                model_name = "sentence-transformers/all-MiniLM-L6-v2"
                data_dir = "corpus"
            "#,
        )?;
        jail.create_file("config.test.toml", r#"key_namespace = "testdocs""#)?;
        jail.set_env("APP_STORE_ADDRESS", "redis://10.0.0.5:6380/");
        jail.set_env("APP_USE_FAKE_EMBEDDINGS", "true");

        let config = Config::load_for_env("test").map_err(|e| e.to_string())?;
        let settings = config.settings().map_err(|e| e.to_string())?;
        assert_eq!(settings.model_name, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(settings.data_dir, "corpus");
        assert_eq!(settings.key_namespace, "testdocs");
        assert_eq!(settings.store_address, "redis://10.0.0.5:6380/");
        assert!(settings.use_fake_embeddings);
        assert_eq!(settings.max_tokens, 128, "untouched values keep defaults");
        let dir: String = config.get("data_dir").map_err(|e| e.to_string())?;
        assert_eq!(dir, "corpus");
        Ok(())
    });
}

#[test]
fn config_rejects_invalid_namespace() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("APP_KEY_NAMESPACE", "bad*ns");
        assert!(matches!(Config::load_for_env("dev"), Err(Error::InvalidConfig(_))));
        Ok(())
    });
}

#[test]
fn config_rejects_fake_embeddings_in_prod() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("APP_USE_FAKE_EMBEDDINGS", "true");
        assert!(Config::load_for_env("dev").is_ok());
        assert!(matches!(Config::load_for_env("prod"), Err(Error::InvalidConfig(_))));
        Ok(())
    });
}
