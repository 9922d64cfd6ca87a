//! Client and tracker tests against an in-process mock upstream.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration,
};

use axum::{
  Json, Router,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header::AUTHORIZATION},
  routing::get,
};
use chrono::Utc;
use citrack_core::links::Links;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::{
  ApiClient, ApiConfig, ClientError,
  tracker::{ChangeLog, Tracker, TrackerEvent, TrackerOptions, TrackerReport},
};

// ─── Mock upstream ───────────────────────────────────────────────────────────

/// One request as seen by the mock.
#[derive(Debug, Clone)]
struct Call {
  procedure:     String,
  input:         Value,
  authorization: Option<String>,
}

type Responder = dyn Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync;

#[derive(Clone)]
struct Upstream {
  calls:   Arc<Mutex<Vec<Call>>>,
  respond: Arc<Responder>,
}

impl Upstream {
  fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }

  fn count(&self, procedure: &str) -> usize {
    self.calls().iter().filter(|c| c.procedure == procedure).count()
  }
}

async fn handle(
  State(upstream): State<Upstream>,
  Path(procedure): Path<String>,
  Query(query): Query<HashMap<String, String>>,
  headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
  let input: Value = query
    .get("input")
    .map(|raw| serde_json::from_str(raw).unwrap())
    .unwrap_or(Value::Null);
  let authorization = headers
    .get(AUTHORIZATION)
    .map(|v| v.to_str().unwrap().to_string());
  upstream.calls.lock().unwrap().push(Call {
    procedure: procedure.clone(),
    input: input.clone(),
    authorization,
  });
  let (status, body) = (upstream.respond)(&procedure, &input);
  (status, Json(body))
}

async fn spawn_upstream<F>(respond: F) -> (ApiClient, Upstream)
where
  F: Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
{
  let upstream = Upstream {
    calls:   Arc::default(),
    respond: Arc::new(respond),
  };
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let app = Router::new()
    .route("/{procedure}", get(handle))
    .with_state(upstream.clone());
  tokio::spawn(async move {
    let _ = axum::serve(listener, app).await;
  });

  let client = ApiClient::new(ApiConfig {
    base_url: format!("http://{addr}/"),
    timeout:  Duration::from_secs(5),
    links:    Links::default(),
  })
  .unwrap();
  (client, upstream)
}

fn ok(data: Value) -> (StatusCode, Value) { (StatusCode::OK, json!({ "result": { "data": data } })) }

fn fail() -> (StatusCode, Value) {
  (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": { "message": "boom" } }))
}

fn recent() -> String { (Utc::now() - chrono::TimeDelta::days(1)).to_rfc3339() }

fn user(id: &str, name: &str, last: &str) -> Value {
  json!({ "_id": id, "username": name, "lastConnectionAt": last })
}

// ─── Countries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn country_lookup_is_cached() {
  let (client, upstream) = spawn_upstream(|_, input| {
    assert_eq!(input["countryId"], "c1");
    ok(json!({ "_id": "c1", "name": "France", "code": "FR" }))
  })
  .await;

  let first = client.get_country_by_id("c1").await.unwrap();
  let second = client.get_country_by_id("c1").await.unwrap();
  assert_eq!(first, second);
  assert_eq!(first.flag_url.as_deref(), Some("https://flagcdn.com/w40/fr.png"));
  assert_eq!(upstream.count("country.getCountryById"), 1);
}

#[tokio::test]
async fn failed_country_lookup_is_absent_and_not_cached() {
  let (client, upstream) = spawn_upstream(|_, _| fail()).await;

  assert!(client.get_country_by_id("c1").await.is_none());
  assert!(client.get_country_by_id("c1").await.is_none());
  assert!(client.cached_country("c1").is_none());
  assert_eq!(upstream.count("country.getCountryById"), 2);
}

#[tokio::test]
async fn null_country_is_absent() {
  let (client, _) = spawn_upstream(|_, _| ok(Value::Null)).await;
  assert!(client.get_country_by_id("missing").await.is_none());
}

#[tokio::test]
async fn country_list_fills_the_cache() {
  let (client, upstream) = spawn_upstream(|procedure, _| match procedure {
    "country.getAllCountries" => ok(json!([
      { "_id": "c1", "name": "France", "code": "FR" },
      { "_id": "c2", "name": "Nowhere" },
    ])),
    _ => fail(),
  })
  .await;

  let countries = client.get_all_countries().await;
  assert_eq!(countries.len(), 2);
  assert_eq!(countries[1].flag_url, None);

  let cached = client.get_country_by_id("c2").await.unwrap();
  assert_eq!(cached.name, "Nowhere");
  assert_eq!(upstream.count("country.getCountryById"), 0);
}

#[tokio::test]
async fn country_list_failure_is_empty() {
  let (client, _) = spawn_upstream(|_, _| fail()).await;
  assert!(client.get_all_countries().await.is_empty());
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn roster_page_encodes_input() {
  let (client, upstream) = spawn_upstream(|_, _| {
    (
      StatusCode::OK,
      json!({ "items": [{ "_id": "u1", "username": "alice" }], "nextCursor": "next" }),
    )
  })
  .await;

  let page = client
    .get_users_by_country("c1", Some("cur"), None)
    .await
    .unwrap();
  assert_eq!(page.items.len(), 1);
  assert_eq!(page.items[0].username, "alice");
  assert!(!page.items[0].active);
  assert_eq!(page.cursor(), Some("next"));

  let calls = upstream.calls();
  assert_eq!(calls[0].procedure, "user.getUsersByCountry");
  assert_eq!(calls[0].input, json!({ "countryId": "c1", "limit": 100, "cursor": "cur" }));
  assert_eq!(calls[0].authorization, None);
}

#[tokio::test]
async fn user_lite_derives_active() {
  let last = recent();
  let (client, _) = spawn_upstream(move |_, input| match input["userId"].as_str() {
    Some("fresh") => ok(user("fresh", "alice", &last)),
    _ => ok(user("stale", "bob", "2001-01-01T00:00:00Z")),
  })
  .await;

  assert!(client.get_user_lite("fresh").await.unwrap().active);
  assert!(!client.get_user_lite("stale").await.unwrap().active);
}

#[tokio::test]
async fn user_lite_errors_propagate() {
  let (client, _) = spawn_upstream(|_, _| fail()).await;
  let err = client.get_user_lite("u1").await.unwrap_err();
  assert!(matches!(err, ClientError::Status { status, .. } if status.as_u16() == 500));
}

// ─── Citizenship changes ─────────────────────────────────────────────────────

#[tokio::test]
async fn change_log_without_token_fails_fast() {
  let (client, upstream) = spawn_upstream(|_, _| ok(json!({ "items": [] }))).await;

  let err = client.get_citizenship_changes("u1", None).await.unwrap_err();
  assert!(err.is_missing_token());
  assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn blank_token_counts_as_unset() {
  let (client, upstream) = spawn_upstream(|_, _| ok(json!({ "items": [] }))).await;

  client.set_auth_token("   ");
  assert!(!client.has_auth_token());
  assert!(client.get_citizenship_changes("u1", None).await.is_err());
  assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn change_log_sends_token_and_filter() {
  let (client, upstream) = spawn_upstream(|_, _| {
    ok(json!({
      "items": [{
        "_id": "a1",
        "user": "u1",
        "createdAt": "2024-01-01T00:00:00Z",
        "data": { "oldCountry": "c1", "newCountry": "c2" },
      }],
    }))
  })
  .await;

  client.set_auth_token("secret-token");
  let page = client.get_citizenship_changes("u1", None).await.unwrap();
  assert_eq!(page.items.len(), 1);
  assert_eq!(page.items[0].details.to_country_id.as_deref(), Some("c2"));
  assert_eq!(page.next_cursor, None);

  let call = &upstream.calls()[0];
  assert_eq!(call.procedure, "actionLog.getActionLogs");
  assert_eq!(call.authorization.as_deref(), Some("secret-token"));
  assert_eq!(call.input["actionType"], "changedCitizenship");
  assert_eq!(call.input["direction"], "forward");
  assert_eq!(call.input["limit"], 100);
}

#[tokio::test]
async fn token_is_shared_between_clones() {
  let (client, _) = spawn_upstream(|_, _| ok(json!({ "items": [] }))).await;
  let clone = client.clone();
  client.set_auth_token("t");
  assert!(clone.has_auth_token());
  clone.clear_auth_token();
  assert!(!client.has_auth_token());
}

#[tokio::test]
async fn change_log_upstream_errors_propagate() {
  let (client, _) =
    spawn_upstream(|_, _| (StatusCode::UNAUTHORIZED, json!({ "error": "nope" }))).await;
  client.set_auth_token("expired");
  let err = client.get_citizenship_changes("u1", None).await.unwrap_err();
  assert!(!err.is_missing_token());
  assert!(matches!(err, ClientError::Status { status, .. } if status.as_u16() == 401));
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

/// Roster of four: an active player with one change, an inactive player, a
/// player whose lookup fails, and an active player whose log fails.
fn mixed_country(procedure: &str, input: &Value, last: &str) -> (StatusCode, Value) {
  match procedure {
    "user.getUsersByCountry" => ok(json!({
      "items": [
        { "_id": "u1", "username": "alice" },
        { "_id": "u2", "username": "bob" },
        { "_id": "u3", "username": "carol" },
        { "_id": "u4", "username": "dave" },
      ],
      "nextCursor": "more",
    })),
    "user.getUserLite" => match input["userId"].as_str().unwrap_or_default() {
      "u1" => ok(user("u1", "alice", last)),
      "u2" => ok(user("u2", "bob", "2001-01-01T00:00:00Z")),
      "u4" => ok(user("u4", "dave", last)),
      _ => fail(),
    },
    "actionLog.getActionLogs" => match input["userId"].as_str().unwrap_or_default() {
      "u1" => ok(json!({
        "items": [{
          "_id": "a1",
          "createdAt": "2024-01-01T00:00:00Z",
          "data": { "fromCountryId": "c9", "toCountryId": "c1" },
        }],
      })),
      _ => fail(),
    },
    _ => fail(),
  }
}

#[tokio::test]
async fn tracker_isolates_per_user_failures() {
  let last = recent();
  let (client, upstream) =
    spawn_upstream(move |procedure, input| mixed_country(procedure, input, &last)).await;
  client.set_auth_token("t");

  let mut events = Vec::new();
  let report = Tracker::new(client, TrackerOptions::default())
    .run("c1", |e| events.push(e))
    .await
    .unwrap();

  assert_eq!(report.progress.current, 4);
  assert_eq!(report.progress.total, 4);
  assert_eq!(report.active, 2);
  assert_eq!(report.inactive, 1);
  assert_eq!(report.failed_users.len(), 1);
  assert_eq!(report.failed_users[0].username, "carol");
  assert_eq!(report.failed_logs(), 1);

  let alice = report.player("u1").unwrap();
  assert_eq!(alice.changes.changes().len(), 1);
  assert!(matches!(report.player("u4").unwrap().changes, ChangeLog::Failed(_)));
  assert!(report.player("u2").is_none());

  // Only active players have their logs fetched, and only one roster page
  // is read by default.
  assert_eq!(upstream.count("actionLog.getActionLogs"), 2);
  assert_eq!(upstream.count("user.getUsersByCountry"), 1);

  let rows = report.rows_in(&Utc);
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].username, "alice");
  assert_eq!(rows[0].from_country_id.as_deref(), Some("c9"));

  // Replaying the events reproduces the report.
  let mut mirrored = TrackerReport::new("c1");
  for event in &events {
    mirrored.apply(event);
  }
  assert_eq!(mirrored, report);
  assert!(matches!(events[0], TrackerEvent::RosterLoaded { total: 4 }));
}

#[tokio::test]
async fn tracker_without_token_marks_logs_failed() {
  let last = recent();
  let (client, upstream) =
    spawn_upstream(move |procedure, input| mixed_country(procedure, input, &last)).await;

  let report = Tracker::new(client, TrackerOptions::default())
    .run("c1", |_| {})
    .await
    .unwrap();

  assert_eq!(report.active, 2);
  assert_eq!(report.failed_logs(), 2);
  assert_eq!(upstream.count("actionLog.getActionLogs"), 0);
}

#[tokio::test]
async fn roster_failure_aborts_the_run() {
  let (client, upstream) = spawn_upstream(|_, _| fail()).await;

  let mut events = Vec::new();
  let result = Tracker::new(client, TrackerOptions::default())
    .run("c1", |e| events.push(e))
    .await;

  assert!(result.is_err());
  assert!(events.is_empty());
  assert_eq!(upstream.calls().len(), 1);
}

#[tokio::test]
async fn follow_cursors_reads_every_page() {
  let last = recent();
  let (client, upstream) = spawn_upstream(move |procedure, input| match procedure {
    "user.getUsersByCountry" => match input.get("cursor").and_then(Value::as_str) {
      None => ok(json!({ "items": [{ "_id": "u1" }], "nextCursor": "p2" })),
      Some("p2") => ok(json!({ "items": [{ "_id": "u2" }], "nextCursor": "p2" })),
      Some(_) => fail(),
    },
    "user.getUserLite" => ok(user(input["userId"].as_str().unwrap(), "x", "2001-01-01T00:00:00Z")),
    _ => ok(user("unused", "x", &last)),
  })
  .await;

  let options = TrackerOptions {
    page_size:      2,
    follow_cursors: true,
  };
  let report = Tracker::new(client, options).run("c1", |_| {}).await.unwrap();

  assert_eq!(report.progress.total, 2);
  assert_eq!(report.inactive, 2);
  // The repeated cursor stops the walk after the second page.
  assert_eq!(upstream.count("user.getUsersByCountry"), 2);
  assert_eq!(upstream.calls()[0].input["limit"], 2);
}

#[tokio::test]
async fn follow_cursors_reads_every_change_log_page() {
  let last = recent();
  let (client, upstream) = spawn_upstream(move |procedure, input| match procedure {
    "user.getUsersByCountry" => ok(json!({ "items": [{ "_id": "u1" }] })),
    "user.getUserLite" => ok(user("u1", "alice", &last)),
    "actionLog.getActionLogs" => match input.get("cursor").and_then(Value::as_str) {
      None => ok(json!({
        "items": [{ "_id": "a1", "createdAt": "2024-01-01T00:00:00Z" }],
        "nextCursor": "l2",
      })),
      Some("l2") => ok(json!({
        "items": [{ "_id": "a2", "createdAt": "2024-02-01T00:00:00Z" }],
      })),
      Some(_) => fail(),
    },
    _ => fail(),
  })
  .await;
  client.set_auth_token("t");

  let options = TrackerOptions {
    page_size:      1,
    follow_cursors: true,
  };
  let report = Tracker::new(client, options).run("c1", |_| {}).await.unwrap();

  let ids: Vec<_> = report
    .player("u1")
    .unwrap()
    .changes
    .changes()
    .iter()
    .map(|c| c.change_id.as_str())
    .collect();
  assert_eq!(ids, ["a1", "a2"]);

  let logs: Vec<_> = upstream
    .calls()
    .into_iter()
    .filter(|c| c.procedure == "actionLog.getActionLogs")
    .collect();
  assert_eq!(logs.len(), 2);
  assert_eq!(logs[1].input["cursor"], "l2");
  assert_eq!(logs[1].input["limit"], 1);
  assert_eq!(logs[1].authorization.as_deref(), Some("t"));
}
