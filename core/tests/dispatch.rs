//! `FeatureService` driven through an in-memory transport.
//!
//! The recording transport answers every request with a canned exchange and
//! keeps what it was asked to send, so tests can check exactly which requests
//! went out (and that some never did).

use std::sync::{Arc, Mutex};

use featureservice_core::{
    ClientConfig, Exchange, FeatureService, HttpMethod, HttpRequest, HttpResponse, Parameters,
    ResponseData, ServiceError, Transport,
};
use serde_json::{json, Value};

#[derive(Clone, Debug, Default)]
struct RecordingTransport {
    sent: Arc<Mutex<Vec<HttpRequest>>>,
    reply: Exchange,
}

impl RecordingTransport {
    fn replying(transport_error: Option<&str>, body: Option<&str>) -> Self {
        Self {
            sent: Arc::default(),
            reply: Exchange {
                transport_error: transport_error.map(str::to_string),
                response: body.map(|body| HttpResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
            },
        }
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn execute(&self, request: HttpRequest) -> Exchange {
        self.sent.lock().unwrap().push(request);
        self.reply.clone()
    }
}

fn params(value: Value) -> Parameters {
    serde_json::from_value(value).unwrap()
}

fn form(encoded: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(encoded.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn config() -> ClientConfig {
    ClientConfig::from_parts("http://gis.example.com/arcgis/rest/services", "Parcels", "FeatureServer")
        .with_layer(0)
}

#[tokio::test]
async fn missing_identification_sends_nothing() {
    let transport = RecordingTransport::replying(None, Some("{}"));
    let err = FeatureService::connect_with(&ClientConfig::default(), transport.clone())
        .await
        .unwrap_err();

    assert_eq!(err, ServiceError::Configuration(featureservice_core::error::MISSING_IDENTIFICATION.to_string()));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn connect_sends_one_info_request() {
    let transport = RecordingTransport::replying(None, Some(r#"{"name":"Parcels"}"#));
    let (_, info) = FeatureService::connect_with(&config(), transport.clone())
        .await
        .unwrap();

    assert_eq!(info.data, Some(ResponseData::Json(json!({"name": "Parcels"}))));
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, HttpMethod::Get);
    assert_eq!(
        sent[0].url,
        "http://gis.example.com/arcgis/rest/services/Parcels/FeatureServer/0?f=json&outFields=*"
    );
}

#[tokio::test]
async fn each_operation_sends_exactly_one_request() {
    let transport = RecordingTransport::replying(None, Some(r#"{"ok":true}"#));
    let service = FeatureService::new(&config(), transport.clone()).unwrap();
    let p = Parameters::new();

    assert!(service.query(&p).await.is_ok());
    assert!(service.count(&p).await.is_ok());
    assert!(service.ids(&p).await.is_ok());
    assert!(service.add(&p).await.is_ok());
    assert!(service.update(&p).await.is_ok());
    assert!(service.remove(&p).await.is_ok());
    assert!(service.edit(&p).await.is_ok());
    assert!(service.query_related_records(&p).await.is_ok());

    let endpoints: Vec<(HttpMethod, String)> = transport
        .sent()
        .into_iter()
        .map(|req| {
            let path = req.url.split('?').next().unwrap_or_default().to_string();
            let endpoint = path.rsplit('/').next().unwrap_or_default().to_string();
            (req.method, endpoint)
        })
        .collect();
    assert_eq!(
        endpoints,
        vec![
            (HttpMethod::Get, "query".to_string()),
            (HttpMethod::Get, "query".to_string()),
            (HttpMethod::Get, "query".to_string()),
            (HttpMethod::Post, "addFeatures".to_string()),
            (HttpMethod::Post, "updateFeatures".to_string()),
            (HttpMethod::Post, "deleteFeatures".to_string()),
            (HttpMethod::Post, "applyEdits".to_string()),
            (HttpMethod::Get, "queryRelatedRecords".to_string()),
        ]
    );
}

#[tokio::test]
async fn query_post_sends_form_without_method() {
    let transport = RecordingTransport::replying(None, Some("{}"));
    let service = FeatureService::new(&config(), transport.clone()).unwrap();

    let original = params(json!({"method": "post", "foo": 1}));
    service.query(&original).await;

    let sent = transport.sent();
    assert_eq!(sent[0].method, HttpMethod::Post);
    assert!(sent[0].url.ends_with("/query"));
    let body = form(sent[0].body.as_deref().unwrap());
    assert_eq!(lookup(&body, "method"), None);
    assert_eq!(lookup(&body, "foo"), Some("1"));
    assert_eq!(service.last_query(), Some(original));
}

#[tokio::test]
async fn add_sends_features_as_json_text() {
    let transport = RecordingTransport::replying(None, Some("{}"));
    let service = FeatureService::new(&config(), transport.clone()).unwrap();

    service.add(&params(json!({"features": [{"a": 1}]}))).await;
    service.add(&params(json!({"features": "[{\"a\":1}]"}))).await;

    for request in transport.sent() {
        let body = form(request.body.as_deref().unwrap());
        assert_eq!(lookup(&body, "features"), Some(r#"[{"a":1}]"#));
    }
}

#[tokio::test]
async fn api_error_wins_over_data() {
    let transport = RecordingTransport::replying(None, Some(r#"{"error":"bad"}"#));
    let service = FeatureService::new(&config(), transport).unwrap();

    let (error, data) = service.query(&Parameters::new()).await.into_parts();
    assert_eq!(error, Some(ServiceError::Api(json!("bad"))));
    assert_eq!(data, None);
}

#[tokio::test]
async fn parse_error_wins_over_transport_error() {
    let transport = RecordingTransport::replying(Some("ECONNRESET"), Some("not-json"));
    let service = FeatureService::new(&config(), transport).unwrap();

    let (error, data) = service.count(&Parameters::new()).await.into_parts();
    let error = error.unwrap();
    assert!(error
        .to_string()
        .starts_with("Error parsing JSON in Feature Service response"));
    assert_eq!(data, Some(ResponseData::Raw("not-json".to_string())));
}

#[tokio::test]
async fn transport_error_travels_with_valid_body() {
    let transport = RecordingTransport::replying(Some("ECONNRESET"), Some(r#"{"x":1}"#));
    let service = FeatureService::new(&config(), transport).unwrap();

    let (error, data) = service.ids(&Parameters::new()).await.into_parts();
    assert_eq!(error, Some(ServiceError::Transport("ECONNRESET".to_string())));
    assert_eq!(data, Some(ResponseData::Json(json!({"x": 1}))));
}

#[tokio::test]
async fn instance_token_is_propagated() {
    let transport = RecordingTransport::replying(None, Some("{}"));
    let service = FeatureService::new(&config().with_token("abc"), transport.clone()).unwrap();

    service.remove(&params(json!({"objectIds": "1"}))).await;
    service.query(&params(json!({"token": "override"}))).await;

    let sent = transport.sent();
    let body = form(sent[0].body.as_deref().unwrap());
    assert_eq!(lookup(&body, "token"), Some("abc"));
    let (_, query) = sent[1].url.split_once('?').unwrap();
    assert_eq!(lookup(&form(query), "token"), Some("override"));
}
