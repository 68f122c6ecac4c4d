use ragchat_cli::load_env_file;
use ragchat_cli::providers::build_llm;
use ragchat_cli::settings::{GenerationBackend, GenerationSettings};
use ragchat_rag::Llm;

#[test]
fn test_env_file_supplies_provider_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.env");
    std::fs::write(&path, "RAGCHAT_ENV_TEST_GEMINI_KEY=from-file\n").unwrap();

    let loaded = load_env_file(Some(&path)).unwrap();
    assert_eq!(loaded.as_deref(), Some(path.as_path()));
    assert_eq!(std::env::var("RAGCHAT_ENV_TEST_GEMINI_KEY").unwrap(), "from-file");

    let settings = GenerationSettings {
        provider: GenerationBackend::Gemini,
        api_key_env: Some("RAGCHAT_ENV_TEST_GEMINI_KEY".to_string()),
        ..Default::default()
    };
    let llm = build_llm(&settings).unwrap();
    assert_eq!(llm.name(), "gemini-2.0-flash");
}

#[test]
fn test_process_environment_wins_over_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("override.env");
    std::fs::write(&path, "PATH=/nowhere\n").unwrap();
    let before = std::env::var("PATH").unwrap();

    load_env_file(Some(&path)).unwrap();
    assert_eq!(std::env::var("PATH").unwrap(), before);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_env_file(Some(&dir.path().join("absent.env"))).unwrap_err();
    assert!(format!("{err:#}").contains("absent.env"));
}
