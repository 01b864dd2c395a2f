//! Shared fixtures for ingestion tests
#![allow(dead_code)]

use serde_json::{json, Map, Value};
use swapi_ingest::config::ApiConfig;
use swapi_ingest::{HttpFetcher, PersonId};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path prefix the mock API serves people under
pub const PEOPLE_PATH: &str = "/api/people";

/// A complete person body as the API returns it, extra fields included
pub fn person_body(id: PersonId) -> Value {
    json!({
        "name": format!("Person {id}"),
        "height": "172",
        "mass": "77",
        "hair_color": "blond",
        "skin_color": "fair",
        "eye_color": "blue",
        "birth_year": "19BBY",
        "gender": "male",
        "homeworld": "https://swapi.dev/api/planets/1/",
        "films": ["https://swapi.dev/api/films/1/"],
        "species": [],
        "vehicles": ["https://swapi.dev/api/vehicles/14/"],
        "starships": [],
        "created": "2014-12-09T13:50:51.644000Z",
        "edited": "2014-12-20T21:17:56.891000Z",
        "url": format!("https://swapi.dev/api/people/{id}/")
    })
}

/// Person body with `fields` removed
pub fn person_body_without(id: PersonId, fields: &[&str]) -> Value {
    let mut body = person_body(id);
    if let Some(map) = body.as_object_mut() {
        for field in fields {
            map.remove(*field);
        }
    }
    body
}

pub fn person_map(id: PersonId) -> Map<String, Value> {
    person_body(id).as_object().cloned().unwrap_or_default()
}

pub fn not_found_body() -> Value {
    json!({ "detail": "Not found" })
}

pub fn person_path(id: PersonId) -> String {
    format!("{PEOPLE_PATH}/{id}/")
}

/// Serve `body` with `status` for one person
pub async fn mount_person(server: &MockServer, id: PersonId, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(person_path(id)))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve complete bodies for every id in `ids`
pub async fn mount_people(server: &MockServer, ids: impl IntoIterator<Item = PersonId>) {
    for id in ids {
        mount_person(server, id, 200, person_body(id)).await;
    }
}

pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: format!("{}{}", server.uri(), PEOPLE_PATH),
        first_id: 1,
        last_id: 85,
        wave_size: 5,
        timeout_secs: 5,
    }
}

pub fn http_fetcher(server: &MockServer) -> HttpFetcher {
    HttpFetcher::new(&api_config(server)).expect("client builds")
}

/// Number of requests the mock server saw for one person
pub async fn requests_for(server: &MockServer, id: PersonId) -> usize {
    let wanted = person_path(id);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == wanted)
        .count()
}
