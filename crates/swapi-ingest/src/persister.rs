//! Validation and storage of one wave's fetch results

use crate::error::{IngestError, Result};
use crate::models::{
    PersonId, PersonRecord, RawFetchResult, Rejection, WaveReport, REQUIRED_FIELDS,
};
use crate::store::PeopleStore;
use crate::wave::Wave;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Records split into what gets stored and what gets dropped
#[derive(Debug, Default, PartialEq)]
pub struct PreparedBatch {
    pub records: Vec<PersonRecord>,
    pub rejections: Vec<Rejection>,
}

/// Validate a wave's results against the required fields
///
/// `results` must be in dispatch order: position `i` belongs to
/// `wave.first() + i`. A record missing any required field is dropped whole.
pub fn prepare_batch(wave: &Wave, results: Vec<RawFetchResult>) -> Result<PreparedBatch> {
    if results.len() != wave.len() {
        return Err(IngestError::BatchMismatch {
            wave: wave.index(),
            expected: wave.len(),
            actual: results.len(),
        });
    }

    let mut batch = PreparedBatch::default();

    for (id, result) in wave.ids().zip(results) {
        match result {
            RawFetchResult::NotFound => batch.rejections.push(Rejection::NotFound { id }),
            RawFetchResult::Record(fields) => match to_person(id, &fields) {
                Ok(record) => batch.records.push(record),
                Err(rejection) => batch.rejections.push(rejection),
            },
        }
    }

    Ok(batch)
}

/// Copy the required fields out of a raw record
fn to_person(
    id: PersonId,
    raw: &Map<String, Value>,
) -> std::result::Result<PersonRecord, Rejection> {
    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !raw.contains_key(*field))
        .collect();

    if !missing.is_empty() {
        return Err(Rejection::MissingFields { id, fields: missing });
    }

    let mut payload = Map::with_capacity(REQUIRED_FIELDS.len() + 1);
    payload.insert("id".to_string(), Value::from(id));
    for field in REQUIRED_FIELDS {
        payload.insert(field.to_string(), raw[field].clone());
    }

    Ok(PersonRecord {
        id,
        payload: Value::Object(payload),
    })
}

/// Validate one wave and write its valid records in a single batch
///
/// Rejections are logged and skipped. A store failure is returned tagged
/// with the wave so the drain barrier can report it.
#[instrument(name = "persist_wave", skip_all, fields(wave = wave.index(), first_id = wave.first()))]
pub async fn persist<S>(store: &S, wave: Wave, results: Vec<RawFetchResult>) -> Result<WaveReport>
where
    S: PeopleStore + ?Sized,
{
    let batch = prepare_batch(&wave, results)?;

    for rejection in &batch.rejections {
        match rejection {
            Rejection::NotFound { id } => {
                warn!(person_id = id, "Record not found, skipping");
            },
            Rejection::MissingFields { id, fields } => {
                warn!(
                    person_id = id,
                    missing = %fields.join(","),
                    "Record is missing required field(s), skipping"
                );
            },
        }
    }

    let inserted = store
        .bulk_insert(&batch.records)
        .await
        .map_err(|e| IngestError::persistence(wave.index(), e))?;

    debug!(inserted, rejected = batch.rejections.len(), "Wave persisted");

    Ok(WaveReport {
        wave: wave.index(),
        inserted,
        rejected: batch.rejections.len(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wave::IdRange;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink shared between the subscriber and the assertions
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn person(name: &str) -> RawFetchResult {
        let mut body = json!({
            "name": name,
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
            "vehicles": [],
            "starships": [],
            "created": "2014-12-09T13:50:51.644000Z",
            "url": "https://swapi.dev/api/people/1/"
        });
        RawFetchResult::from_body(body.as_object_mut().unwrap().clone())
    }

    fn without(result: RawFetchResult, fields: &[&str]) -> RawFetchResult {
        match result {
            RawFetchResult::Record(mut map) => {
                for field in fields {
                    map.remove(*field);
                }
                RawFetchResult::Record(map)
            },
            other => other,
        }
    }

    fn wave(first: PersonId, last: PersonId) -> Wave {
        IdRange::new(first, last).unwrap().waves(10).unwrap()[0]
    }

    #[test]
    fn test_valid_record_keeps_only_required_fields() {
        let batch = prepare_batch(&wave(1, 1), vec![person("Luke Skywalker")]).unwrap();

        assert!(batch.rejections.is_empty());
        let record = &batch.records[0];
        assert_eq!(record.id, 1);

        let payload = record.payload.as_object().unwrap();
        assert_eq!(payload.len(), REQUIRED_FIELDS.len() + 1);
        assert_eq!(payload["id"], json!(1));
        assert_eq!(payload["name"], json!("Luke Skywalker"));
        assert!(!payload.contains_key("created"));
        assert!(!payload.contains_key("url"));
    }

    #[test]
    fn test_identifiers_follow_position_in_wave() {
        let results = vec![person("a"), RawFetchResult::NotFound, person("c")];
        let batch = prepare_batch(&wave(16, 18), results).unwrap();

        let ids: Vec<PersonId> = batch.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![16, 18]);
        assert_eq!(batch.rejections, vec![Rejection::NotFound { id: 17 }]);
    }

    #[test]
    fn test_missing_field_drops_whole_record() {
        let results = vec![person("a"), without(person("b"), &["mass"]), person("c")];
        let batch = prepare_batch(&wave(3, 5), results).unwrap();

        assert_eq!(batch.records.len(), 2);
        assert!(batch.records.iter().all(|r| r.id != 4));
        assert_eq!(
            batch.rejections,
            vec![Rejection::MissingFields {
                id: 4,
                fields: vec!["mass"]
            }]
        );
    }

    #[test]
    fn test_every_missing_field_is_reported() {
        let results = vec![without(person("a"), &["vehicles", "birth_year", "mass"])];
        let batch = prepare_batch(&wave(9, 9), results).unwrap();

        assert_eq!(
            batch.rejections,
            vec![Rejection::MissingFields {
                id: 9,
                fields: vec!["birth_year", "mass", "vehicles"]
            }]
        );
    }

    #[test]
    fn test_null_field_counts_as_present() {
        let result = match person("a") {
            RawFetchResult::Record(mut map) => {
                map.insert("mass".to_string(), Value::Null);
                RawFetchResult::Record(map)
            },
            other => other,
        };
        let batch = prepare_batch(&wave(1, 1), vec![result]).unwrap();
        assert_eq!(batch.records[0].payload["mass"], Value::Null);
    }

    #[test]
    fn test_result_count_must_match_wave() {
        let err = prepare_batch(&wave(1, 3), vec![person("a")]).unwrap_err();
        assert!(matches!(
            err,
            IngestError::BatchMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_persist_writes_one_batch() {
        let store = MemoryStore::new();
        let results = vec![person("a"), RawFetchResult::NotFound, without(person("c"), &["films"])];

        let report = persist(&store, wave(1, 3), results).await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.rejected, 2);
        assert_eq!(store.insert_calls().await, 1);
        assert_eq!(store.count_for(1).await, 1);
    }

    #[tokio::test]
    async fn test_rejections_are_logged_with_id_and_fields() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        // current-thread test runtime, so the guard covers every poll
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = MemoryStore::new();
        let results = vec![
            person("a"),
            RawFetchResult::NotFound,
            without(person("c"), &["films", "mass"]),
        ];
        persist(&store, wave(11, 13), results).await.unwrap();

        let output = logs.contents();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2, "unexpected log output: {output}");

        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("Record not found, skipping"));
        assert!(lines[0].contains("person_id=12"));

        assert!(lines[1].contains("missing required field(s)"));
        assert!(lines[1].contains("person_id=13"));
        assert!(lines[1].contains("missing=films,mass"));
    }
}
