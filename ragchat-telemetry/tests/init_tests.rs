use std::error::Error;

#[test]
fn test_only_one_global_subscriber() {
    ragchat_telemetry::init_telemetry("ragchat-test").unwrap();
    tracing::info!("telemetry is up");

    let err = ragchat_telemetry::init_json_telemetry("ragchat-test").unwrap_err();
    assert!(err.to_string().starts_with("failed to initialise telemetry: "));

    // Usable behind `?` in functions returning a boxed error.
    let boxed: Box<dyn Error + Send + Sync> = Box::new(err);
    assert!(boxed.source().is_none());
}
