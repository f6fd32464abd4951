use super::*;

#[test]
fn overload_and_server_errors_are_transient() {
    for status in [408, 429, 500, 502, 503] {
        assert!(
            matches!(classify_status(status, ""), ModelError::Transient(_)),
            "status {status}"
        );
    }
}

#[test]
fn client_errors_are_rejections() {
    let err = classify_status(400, "prompt flagged");
    assert_eq!(
        err,
        ModelError::Rejected("HTTP 400: prompt flagged".to_string())
    );
    assert!(matches!(classify_status(404, ""), ModelError::Rejected(_)));
}

#[test]
fn endpoint_must_be_http() {
    assert!(HttpVideoModel::new("ftp://example.invalid").is_err());
    let model = HttpVideoModel::new("http://127.0.0.1:9/invocations").unwrap();
    assert_eq!(model.endpoint(), "http://127.0.0.1:9/invocations");
}

#[test]
fn payload_uses_inputs_and_parameters() {
    let payload = EndpointPayload {
        inputs: "A harbour",
        parameters: EndpointParameters {
            negative_prompt: None,
            width: 576,
            height: 1024,
            num_frames: 24,
            num_inference_steps: 50,
            fps: 24,
            seed: Some(7),
        },
    };
    let v = serde_json::to_value(&payload).unwrap();
    assert_eq!(v["inputs"], "A harbour");
    assert_eq!(v["parameters"]["num_frames"], 24);
    assert_eq!(v["parameters"]["seed"], 7);
    assert!(v["parameters"].get("negative_prompt").is_none());
}

#[tokio::test]
async fn unreachable_endpoint_is_transient() {
    let model = HttpVideoModel::new("http://127.0.0.1:9/invocations").unwrap();
    let request = GenerationRequest {
        scene_index: 0,
        prompt: "x".to_string(),
        negative_prompt: None,
        width: 4,
        height: 4,
        num_frames: 1,
        num_inference_steps: 1,
        fps: 8,
        seed: None,
    };
    let err = model.synthesize(&request).await.unwrap_err();
    assert!(matches!(err, ModelError::Transient(_)));
}
