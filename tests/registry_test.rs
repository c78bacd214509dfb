//! Model registry integration tests
//!
//! Lifecycle, configuration and lookup through the public client against a
//! scripted backend.

mod support;

use localgen::backend::{BackendError, MockCall};
use localgen::registry::{ModelParameters, PerformanceFlags, Quantization, ResourceLimits};
use localgen::{ErrorKind, GenerateRequest, ModelConfigOptions, StatusKind};
use serde_json::json;
use support::mock_client;

fn config(context_length: u32) -> ModelConfigOptions {
    ModelConfigOptions::default().with_parameters(ModelParameters {
        context_length: Some(context_length),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_preload_on_loaded_model_goes_through_update() {
    let (client, backend, _logger) = mock_client();

    client.preload_model("llama2", None).await.unwrap();
    assert!(client.models().registry().status("llama2").await.loaded);
    let first_pass = backend.calls().len();

    client
        .preload_model("llama2", Some(config(8192)))
        .await
        .unwrap();

    let operations: Vec<&str> = backend.calls()[first_pass..]
        .iter()
        .map(MockCall::operation)
        .collect();
    assert_eq!(
        operations,
        vec!["show", "update_model", "delete", "update_model", "pull"]
    );

    let status = client.models().registry().status("llama2").await;
    assert!(status.loaded);
    assert_eq!(status.status, StatusKind::Ready);

    let descriptor = client.get_model("llama2").await.unwrap().unwrap();
    assert_eq!(descriptor.custom_config, Some(config(8192)));
}

#[tokio::test]
async fn test_preload_on_loaded_model_without_config_does_nothing() {
    let (client, backend, _logger) = mock_client();

    client.preload_model("llama2", None).await.unwrap();
    client.preload_model("llama2", None).await.unwrap();

    assert_eq!(backend.call_count("pull"), 1);
}

#[tokio::test]
async fn test_unknown_model_is_none() {
    let (client, backend, logger) = mock_client();

    let model = client.get_model("does-not-exist").await.unwrap();

    assert!(model.is_none());
    assert_eq!(backend.call_count("show"), 1);
    assert!(logger
        .entries_at(localgen::logger::LogLevel::Error)
        .is_empty());
}

#[tokio::test]
async fn test_get_model_is_cached() {
    let (client, backend, _logger) = mock_client();

    let first = client.get_model("llama2").await.unwrap().unwrap();
    let second = client.get_model("llama2").await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.call_count("show"), 1);
    assert_eq!(first.capabilities.max_context_length, 4096);
    assert!(first.metadata.is_some());
}

#[tokio::test]
async fn test_list_models_is_additive() {
    let (client, backend, _logger) = mock_client();
    backend.add_model("mistral");

    assert_eq!(client.list_models().await.unwrap().len(), 2);

    backend.remove_model("mistral");
    assert_eq!(client.list_models().await.unwrap().len(), 1);
    assert_eq!(client.models().registry().descriptor_count().await, 2);
}

#[tokio::test]
async fn test_status_reflects_server() {
    let (client, backend, _logger) = mock_client();

    let status = client.get_model_status("llama2").await.unwrap();
    assert!(status.loaded);
    assert_eq!(status.status, StatusKind::Ready);

    backend.remove_model("llama2");
    let status = client.get_model_status("llama2").await.unwrap();
    assert!(!status.loaded);
    assert_eq!(status.status, StatusKind::Error);
    assert_eq!(status.error.as_deref(), Some("model not found: llama2"));
}

#[tokio::test]
async fn test_error_status_blocks_generation() {
    let (client, backend, _logger) = mock_client();
    backend.remove_model("llama2");
    client.get_model_status("llama2").await.unwrap();

    let err = client
        .generate(&GenerateRequest::new("Hi"), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidModel);
    assert_eq!(backend.call_count("generate"), 0);
}

#[tokio::test]
async fn test_unload_cycle() {
    let (client, backend, _logger) = mock_client();

    client.unload_model("llama2").await.unwrap();
    assert_eq!(backend.call_count("delete"), 0);

    client.preload_model("llama2", None).await.unwrap();
    client.unload_model("llama2").await.unwrap();

    let status = client.models().registry().status("llama2").await;
    assert!(!status.loaded);
    assert_eq!(status.status, StatusKind::Ready);
    assert!(status.last_used.is_some());
    assert_eq!(backend.call_count("delete"), 1);
}

#[tokio::test]
async fn test_update_config_flattens_parameters() {
    let (client, backend, _logger) = mock_client();
    let options = ModelConfigOptions::default()
        .with_parameters(ModelParameters {
            context_length: Some(4096),
            quantization: Some(Quantization::FourBit),
            threads: Some(8),
            ..Default::default()
        })
        .with_resources(ResourceLimits {
            cpu_cores: Some(4),
            ..Default::default()
        })
        .with_performance(PerformanceFlags {
            use_gpu: Some(true),
            ..Default::default()
        });

    client
        .update_model_config("llama2", options.clone())
        .await
        .unwrap();

    let sent = backend
        .calls()
        .into_iter()
        .find_map(|call| match call {
            MockCall::UpdateModel(model, parameters) => Some((model, parameters)),
            _ => None,
        })
        .unwrap();
    assert_eq!(sent.0, "llama2");
    assert_eq!(
        serde_json::Value::Object(sent.1),
        json!({
            "context_length": 4096,
            "quantization": "4bit",
            "num_threads": 8,
            "num_cpu": 4,
            "use_gpu": true,
        })
    );

    // Not loaded, so no cycle
    assert_eq!(backend.call_count("delete"), 0);
    assert_eq!(backend.call_count("pull"), 0);

    let descriptor = client.get_model("llama2").await.unwrap().unwrap();
    assert_eq!(descriptor.custom_config, Some(options));
}

#[tokio::test]
async fn test_update_config_unknown_model() {
    let (client, backend, _logger) = mock_client();

    let err = client
        .update_model_config("llama9", config(4096))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidModel);
    assert_eq!(backend.call_count("update_model"), 0);
}

#[tokio::test]
async fn test_update_config_out_of_range() {
    let (client, backend, _logger) = mock_client();

    let err = client
        .update_model_config("llama2", config(100_000))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(backend.calls().is_empty());
    assert_eq!(client.models().registry().descriptor_count().await, 0);
}

#[tokio::test]
async fn test_preload_rejects_out_of_range_config() {
    let (client, backend, _logger) = mock_client();

    let err = client
        .preload_model("llama2", Some(config(1)))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    assert!(backend.calls().is_empty());
    assert!(!client.models().registry().status("llama2").await.loaded);
}

#[tokio::test]
async fn test_pull_failure_is_initialization_failed() {
    let (client, backend, _logger) = mock_client();
    backend.fail_next(
        "pull",
        BackendError::NetworkError {
            message: "connection refused".to_string(),
        },
    );

    let err = client.preload_model("llama2", None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InitializationFailed);
    assert_eq!(err.context_value("operation"), Some(&json!("preload")));
    assert!(!client.models().registry().status("llama2").await.loaded);
}
