//! Verify request building and response normalization against the JSON test
//! vectors stored in `test-vectors/`.
//!
//! Request parameters are compared as decoded key/value maps rather than raw
//! encoded strings, so escaping choices that servers treat identically do not
//! cause false negatives.

use featureservice_core::{
    normalize_parts, ClientConfig, FeatureServiceClient, HttpMethod, HttpRequest, Parameters,
    ResponseData, ServiceError,
};
use serde_json::{Map, Value};

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

/// Split a built request into its URL without query and its decoded params.
fn split_request(req: &HttpRequest) -> (String, Value) {
    let (url, encoded) = match req.method {
        HttpMethod::Get => {
            let (url, query) = req.url.split_once('?').expect("GET carries a query string");
            (url.to_string(), query.to_string())
        }
        HttpMethod::Post => (req.url.clone(), req.body.clone().expect("POST carries a body")),
    };
    let params: Map<String, Value> = url::form_urlencoded::parse(encoded.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    (url, Value::Object(params))
}

fn build(client: &FeatureServiceClient, operation: &str, input: &Parameters) -> HttpRequest {
    match operation {
        "info" => client.build_info(),
        "query" => client.build_query(input),
        "count" => client.build_count(input),
        "ids" => client.build_ids(input),
        "add" => client.build_add(input),
        "update" => client.build_update(input),
        "remove" => client.build_remove(input),
        "edit" => client.build_edit(input),
        "queryRelatedRecords" => client.build_query_related_records(input),
        other => panic!("unknown operation: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let config: ClientConfig = serde_json::from_value(case["config"].clone()).unwrap();
        let input: Parameters = serde_json::from_value(case["input"].clone()).unwrap();
        let expected_req = &case["expected_request"];

        let client = FeatureServiceClient::new(&config).unwrap();
        let req = build(&client, case["operation"].as_str().unwrap(), &input);

        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        let (url, params) = split_request(&req);
        assert_eq!(url, expected_req["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(params, expected_req["params"], "{name}: params");

        if let Some(expected_last) = case.get("expected_last_query") {
            let expected: Parameters = serde_json::from_value(expected_last.clone()).unwrap();
            assert_eq!(client.last_query(), Some(expected), "{name}: last query");
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

#[test]
fn normalize_test_vectors() {
    let raw = include_str!("../../test-vectors/normalize.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let completion = normalize_parts(case["transport_error"].as_str(), case["body"].as_str());

        let expected_error = &case["expected_error"];
        match (&completion.error, expected_error) {
            (None, Value::Null) => {}
            (Some(ServiceError::Api(value)), expected) if expected.get("api").is_some() => {
                assert_eq!(value, &expected["api"], "{name}: api error");
            }
            (Some(ServiceError::Transport(message)), expected) if expected.get("transport").is_some() => {
                assert_eq!(message, expected["transport"].as_str().unwrap(), "{name}: transport error");
            }
            (Some(ServiceError::Parse { transport, .. }), expected) if expected.get("parse").is_some() => {
                assert_eq!(transport.as_deref(), case["transport_error"].as_str(), "{name}: carried transport error");
            }
            (actual, expected) => panic!("{name}: expected error {expected}, got {actual:?}"),
        }

        let expected_data = &case["expected_data"];
        match (&completion.data, expected_data) {
            (None, Value::Null) => {}
            (Some(ResponseData::Json(value)), expected) if expected.get("json").is_some() => {
                assert_eq!(value, &expected["json"], "{name}: json data");
            }
            (Some(ResponseData::Raw(body)), expected) if expected.get("raw").is_some() => {
                assert_eq!(body, expected["raw"].as_str().unwrap(), "{name}: raw data");
            }
            (actual, expected) => panic!("{name}: expected data {expected}, got {actual:?}"),
        }
    }
}
