use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{extract::State, routing::get, Form, Json};
pub use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// Path of the single layer served by `app`.
pub const LAYER_PATH: &str = "/arcgis/rest/services/Parcels/FeatureServer/0";

/// Path of a layer whose endpoints answer with a body that is not JSON.
pub const BROKEN_LAYER_PATH: &str = "/arcgis/rest/services/Broken/FeatureServer/0";

pub const OBJECT_ID_FIELD: &str = "OBJECTID";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
}

#[derive(Debug, Default)]
pub struct Layer {
    next_object_id: i64,
    features: BTreeMap<i64, Feature>,
    token: Option<String>,
}

impl Layer {
    fn insert(&mut self, mut feature: Feature) -> i64 {
        self.next_object_id += 1;
        let id = self.next_object_id;
        feature.attributes.insert(OBJECT_ID_FIELD.to_string(), json!(id));
        self.features.insert(id, feature);
        id
    }

    fn update(&mut self, feature: Feature) -> Value {
        let Some(id) = feature.attributes.get(OBJECT_ID_FIELD).and_then(Value::as_i64) else {
            return edit_failure(None, 1019, "Object is missing");
        };
        match self.features.get_mut(&id) {
            Some(existing) => {
                for (key, value) in feature.attributes {
                    existing.attributes.insert(key, value);
                }
                if feature.geometry.is_some() {
                    existing.geometry = feature.geometry;
                }
                edit_success(id)
            }
            None => edit_failure(Some(id), 1019, "Object is missing"),
        }
    }

    fn delete(&mut self, id: i64) -> Value {
        match self.features.remove(&id) {
            Some(_) => edit_success(id),
            None => edit_failure(Some(id), 1019, "Object is missing"),
        }
    }
}

pub type Db = Arc<RwLock<Layer>>;
type Params = HashMap<String, String>;

/// A feature layer that accepts any token.
pub fn app() -> Router {
    router(Layer::default())
}

/// A feature layer that rejects requests not carrying `token`.
pub fn app_with_token(token: impl Into<String>) -> Router {
    router(Layer {
        token: Some(token.into()),
        ..Layer::default()
    })
}

fn router(layer: Layer) -> Router {
    let db: Db = Arc::new(RwLock::new(layer));
    let layer_routes = Router::new()
        .route("/query", get(query).post(query))
        .route("/addFeatures", get(add_features).post(add_features))
        .route("/updateFeatures", get(update_features).post(update_features))
        .route("/deleteFeatures", get(delete_features).post(delete_features))
        .route("/applyEdits", get(apply_edits).post(apply_edits))
        .route(
            "/queryRelatedRecords",
            get(query_related_records).post(query_related_records),
        );
    Router::new()
        .route(LAYER_PATH, get(layer_info).post(layer_info))
        .nest(LAYER_PATH, layer_routes)
        .route(&format!("{BROKEN_LAYER_PATH}/{{*rest}}"), get(not_json).post(not_json))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_app(listener, app()).await
}

pub async fn run_app(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn layer_info(State(db): State<Db>, Form(params): Form<Params>) -> Json<Value> {
    let layer = db.read().await;
    if let Err(e) = check_request(&layer, &params) {
        return Json(e);
    }
    Json(json!({
        "currentVersion": 10.81,
        "id": 0,
        "name": "Parcels",
        "type": "Feature Layer",
        "objectIdField": OBJECT_ID_FIELD,
        "relationships": [{"id": 0, "name": "Owners"}],
        "capabilities": "Query,Create,Update,Delete,Editing"
    }))
}

async fn query(State(db): State<Db>, Form(params): Form<Params>) -> Json<Value> {
    let layer = db.read().await;
    if let Err(e) = check_request(&layer, &params) {
        return Json(e);
    }

    match params.get("where").map(String::as_str) {
        None | Some("") | Some("1=1") => {}
        Some(other) => {
            debug!(clause = other, "unsupported where clause");
            return Json(service_error(400, "Unable to complete operation.", &["Unsupported where clause"]));
        }
    }

    let wanted = match params.get("objectIds").map(|ids| parse_ids(ids)) {
        Some(Ok(ids)) => Some(ids),
        Some(Err(e)) => return Json(e),
        None => None,
    };
    let matching: Vec<(&i64, &Feature)> = layer
        .features
        .iter()
        .filter(|(id, _)| wanted.as_ref().is_none_or(|ids| ids.contains(id)))
        .collect();

    if is_true(&params, "returnCountOnly") {
        return Json(json!({ "count": matching.len() }));
    }
    if is_true(&params, "returnIdsOnly") {
        let ids: Vec<i64> = matching.iter().map(|(id, _)| **id).collect();
        return Json(json!({ "objectIdFieldName": OBJECT_ID_FIELD, "objectIds": ids }));
    }

    let out_fields = params.get("outFields").map(String::as_str).unwrap_or("*");
    let features: Vec<Feature> = matching
        .into_iter()
        .map(|(_, feature)| project(feature, out_fields))
        .collect();
    Json(json!({ "objectIdFieldName": OBJECT_ID_FIELD, "features": features }))
}

async fn add_features(State(db): State<Db>, Form(params): Form<Params>) -> Json<Value> {
    let mut layer = db.write().await;
    if let Err(e) = check_request(&layer, &params) {
        return Json(e);
    }
    let features = match parse_features(params.get("features")) {
        Ok(features) => features,
        Err(e) => return Json(e),
    };
    let results: Vec<Value> = features
        .into_iter()
        .map(|feature| edit_success(layer.insert(feature)))
        .collect();
    Json(json!({ "addResults": results }))
}

async fn update_features(State(db): State<Db>, Form(params): Form<Params>) -> Json<Value> {
    let mut layer = db.write().await;
    if let Err(e) = check_request(&layer, &params) {
        return Json(e);
    }
    let features = match parse_features(params.get("features")) {
        Ok(features) => features,
        Err(e) => return Json(e),
    };
    let results: Vec<Value> = features.into_iter().map(|f| layer.update(f)).collect();
    Json(json!({ "updateResults": results }))
}

async fn delete_features(State(db): State<Db>, Form(params): Form<Params>) -> Json<Value> {
    let mut layer = db.write().await;
    if let Err(e) = check_request(&layer, &params) {
        return Json(e);
    }
    let ids = match params.get("objectIds") {
        Some(ids) => match parse_ids(ids) {
            Ok(ids) => ids,
            Err(e) => return Json(e),
        },
        None => return Json(service_error(400, "Unable to complete operation.", &["'objectIds' parameter is required"])),
    };
    let results: Vec<Value> = ids.into_iter().map(|id| layer.delete(id)).collect();
    Json(json!({ "deleteResults": results }))
}

async fn apply_edits(State(db): State<Db>, Form(params): Form<Params>) -> Json<Value> {
    let mut layer = db.write().await;
    if let Err(e) = check_request(&layer, &params) {
        return Json(e);
    }
    let adds = match optional_features(params.get("adds")) {
        Ok(adds) => adds,
        Err(e) => return Json(e),
    };
    let updates = match optional_features(params.get("updates")) {
        Ok(updates) => updates,
        Err(e) => return Json(e),
    };
    let deletes = match params.get("deletes").filter(|d| !d.is_empty()) {
        Some(ids) => match parse_ids(ids) {
            Ok(ids) => ids,
            Err(e) => return Json(e),
        },
        None => Vec::new(),
    };

    let add_results: Vec<Value> = adds.into_iter().map(|f| edit_success(layer.insert(f))).collect();
    let update_results: Vec<Value> = updates.into_iter().map(|f| layer.update(f)).collect();
    let delete_results: Vec<Value> = deletes.into_iter().map(|id| layer.delete(id)).collect();
    Json(json!({
        "addResults": add_results,
        "updateResults": update_results,
        "deleteResults": delete_results
    }))
}

async fn query_related_records(State(db): State<Db>, Form(params): Form<Params>) -> Json<Value> {
    let layer = db.read().await;
    if let Err(e) = check_request(&layer, &params) {
        return Json(e);
    }
    if params.get("relationshipId").is_none_or(|id| id != "0") {
        return Json(service_error(400, "Invalid or missing input parameters.", &["Invalid relationshipId"]));
    }
    let ids = match params.get("objectIds") {
        Some(ids) => match parse_ids(ids) {
            Ok(ids) => ids,
            Err(e) => return Json(e),
        },
        None => Vec::new(),
    };
    let groups: Vec<Value> = ids
        .into_iter()
        .filter(|id| layer.features.contains_key(id))
        .map(|id| json!({ "objectId": id, "relatedRecords": [] }))
        .collect();
    Json(json!({ "relatedRecordGroups": groups }))
}

async fn not_json() -> &'static str {
    "not-json"
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject requests with a missing/wrong token or an unsupported format,
/// answering the way feature services do: HTTP 200 with an `error` body.
fn check_request(layer: &Layer, params: &Params) -> Result<(), Value> {
    if let Some(expected) = &layer.token {
        if params.get("token") != Some(expected) {
            return Err(service_error(499, "Token Required", &[]));
        }
    }
    match params.get("f").map(String::as_str) {
        Some("json") | Some("pjson") => Ok(()),
        _ => Err(service_error(400, "Invalid or missing input parameters.", &["Unsupported format"])),
    }
}

fn service_error(code: u16, message: &str, details: &[&str]) -> Value {
    json!({ "error": { "code": code, "message": message, "details": details } })
}

fn edit_success(id: i64) -> Value {
    json!({ "objectId": id, "success": true })
}

fn edit_failure(id: Option<i64>, code: u16, description: &str) -> Value {
    json!({
        "objectId": id,
        "success": false,
        "error": { "code": code, "description": description }
    })
}

fn is_true(params: &Params, key: &str) -> bool {
    params.get(key).is_some_and(|v| v == "true")
}

/// Accepts `1,2,3` as well as a JSON array `[1,2,3]`.
fn parse_ids(raw: &str) -> Result<Vec<i64>, Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|_| service_error(400, "Invalid or missing input parameters.", &["Invalid objectIds"]));
    }
    trimmed
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| service_error(400, "Invalid or missing input parameters.", &["Invalid objectIds"]))
}

fn parse_features(raw: Option<&String>) -> Result<Vec<Feature>, Value> {
    let raw = raw.ok_or_else(|| {
        service_error(400, "Unable to complete operation.", &["'features' parameter is required"])
    })?;
    serde_json::from_str(raw)
        .map_err(|_| service_error(400, "Unable to complete operation.", &["'features' must be a JSON array of features"]))
}

fn optional_features(raw: Option<&String>) -> Result<Vec<Feature>, Value> {
    match raw.filter(|r| !r.is_empty()) {
        Some(raw) => parse_features(Some(raw)),
        None => Ok(Vec::new()),
    }
}

fn project(feature: &Feature, out_fields: &str) -> Feature {
    if out_fields == "*" {
        return feature.clone();
    }
    let wanted: Vec<&str> = out_fields.split(',').map(str::trim).collect();
    Feature {
        attributes: feature
            .attributes
            .iter()
            .filter(|(name, _)| wanted.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
        geometry: feature.geometry.clone(),
    }
}
