use super::*;

fn client() -> BackendClient {
    BackendClient::new(BackendClientConfig {
        base_url: "http://127.0.0.1:0".into(),
        station_id: "station-1".into(),
        equipment_id: Some("eq-1".into()),
        timeout_secs: 5.0,
    })
    .unwrap()
}

#[test]
fn url_joins_base_and_path_regardless_of_slashes() {
    let client = client();
    assert_eq!(client.url("scan"), "http://127.0.0.1:0/scan");
    assert_eq!(client.url("/scan"), "http://127.0.0.1:0/scan");
}

#[test]
fn not_found_maps_to_wip_not_found_regardless_of_body() {
    let err = classify_error(StatusCode::NOT_FOUND, None, None);
    assert!(matches!(err, BackendError::WipNotFound));
}

#[test]
fn prerequisite_not_met_derives_required_from_process_id() {
    let body = BackendErrorBody {
        error: Some("PREREQUISITE_NOT_MET".into()),
        message: Some("process 3 must complete first".into()),
    };
    let err = classify_error(StatusCode::BAD_REQUEST, Some(body), Some(3));
    match err {
        BackendError::PrerequisiteNotMet { required } => assert_eq!(required, 2),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn duplicate_pass_and_invalid_status_map_to_dedicated_variants() {
    let dup = classify_error(
        StatusCode::BAD_REQUEST,
        Some(BackendErrorBody { error: Some("DUPLICATE_PASS".into()), message: None }),
        None,
    );
    assert!(matches!(dup, BackendError::DuplicatePass));

    let invalid = classify_error(
        StatusCode::BAD_REQUEST,
        Some(BackendErrorBody { error: Some("INVALID_WIP_STATUS".into()), message: None }),
        None,
    );
    assert!(matches!(invalid, BackendError::InvalidWipStatus));
}

#[test]
fn unrecognized_error_code_falls_back_to_generic_backend_error() {
    let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, None, None);
    match err {
        BackendError::Backend { .. } => {}
        other => panic!("unexpected: {other:?}"),
    }
    assert!(err.is_transient());
}

fn variant_tag(err: &BackendError) -> &'static str {
    match err {
        BackendError::WipNotFound => "wip_not_found",
        BackendError::PrerequisiteNotMet { .. } => "prerequisite_not_met",
        BackendError::InvalidWipStatus => "invalid_wip_status",
        BackendError::DuplicatePass => "duplicate_pass",
        BackendError::Backend { .. } => "backend",
        other => panic!("unexpected variant in table test: {other:?}"),
    }
}

#[yare::parameterized(
    not_found = { StatusCode::NOT_FOUND, None, "wip_not_found" },
    prerequisite_not_met = { StatusCode::BAD_REQUEST, Some("PREREQUISITE_NOT_MET"), "prerequisite_not_met" },
    duplicate_pass = { StatusCode::BAD_REQUEST, Some("DUPLICATE_PASS"), "duplicate_pass" },
    invalid_wip_status = { StatusCode::BAD_REQUEST, Some("INVALID_WIP_STATUS"), "invalid_wip_status" },
    unrecognized_code = { StatusCode::BAD_REQUEST, Some("SOMETHING_ELSE"), "backend" },
    server_error_no_body = { StatusCode::INTERNAL_SERVER_ERROR, None, "backend" },
)]
fn classify_error_maps_status_and_body_to_the_spec_taxonomy(
    status: StatusCode,
    error_code: Option<&str>,
    expected: &str,
) {
    let body = error_code.map(|code| BackendErrorBody { error: Some(code.to_string()), message: None });
    let err = classify_error(status, body, None);
    assert_eq!(variant_tag(&err), expected);
}

#[test]
fn setting_token_invokes_refresh_callback_with_the_new_value() {
    use std::sync::atomic::{AtomicBool, Ordering};
    let seen = Arc::new(AtomicBool::new(false));
    let seen_clone = seen.clone();
    let client = client().with_token_refresh_callback(Arc::new(move |token: &str| {
        assert_eq!(token, "tok-123");
        seen_clone.store(true, Ordering::SeqCst);
    }));

    client.set_token("tok-123");
    assert!(seen.load(Ordering::SeqCst));
    assert_eq!(client.current_token().as_deref(), Some("tok-123"));
}
