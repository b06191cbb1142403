use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A conference event as stored in the document database.
///
/// The store is schema-less, so reading never fails on an object: a modelled
/// field that is absent, `null` or of an unexpected type reads as empty, and
/// its raw value stays in `extra`. Serializing writes `extra` over the
/// modelled fields, so stored values come back out unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    /// Document identifier
    pub id: String,

    /// Document revision
    pub rev: Option<String>,

    pub name: String,

    pub description: String,

    pub track: String,

    pub tags: Vec<NamedEntry>,

    pub speakers: Vec<NamedEntry>,

    /// Whether this event is part of the music programme. Non-boolean values
    /// are read the way the index functions read them (`if (doc.music)`).
    pub music: bool,

    /// Fields not modelled above, and modelled fields whose stored value did
    /// not fit
    pub extra: Map<String, Value>,
}

/// A `{ "name": ... }` entry, used for both tags and speakers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedEntry {
    pub name: String,

    pub extra: Map<String, Value>,
}

impl NamedEntry {
    pub fn from_object(mut object: Map<String, Value>) -> Self {
        Self {
            name: take_string(&mut object, "name").unwrap_or_default(),
            extra: object,
        }
    }
}

impl Event {
    /// Read an event from a stored document
    pub fn from_document(mut doc: Map<String, Value>) -> Self {
        let music = match doc.get("music") {
            Some(Value::Bool(music)) => {
                let music = *music;
                doc.remove("music");
                music
            }
            Some(other) => is_truthy(other),
            None => false,
        };

        Self {
            id: take_string(&mut doc, "_id").unwrap_or_default(),
            rev: take_string(&mut doc, "_rev"),
            name: take_string(&mut doc, "name").unwrap_or_default(),
            description: take_string(&mut doc, "description").unwrap_or_default(),
            track: take_string(&mut doc, "track").unwrap_or_default(),
            tags: take_entries(&mut doc, "tags"),
            speakers: take_entries(&mut doc, "speakers"),
            music,
            extra: doc,
        }
    }

    /// Tag names in document order
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    /// Speaker names in document order
    pub fn speaker_names(&self) -> impl Iterator<Item = &str> {
        self.speakers.iter().map(|s| s.name.as_str())
    }
}

/// Remove `key` when it holds a string
fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            object.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

/// Object items of the list at `key`. The raw list is kept in place unless
/// every item was an object.
fn take_entries(object: &mut Map<String, Value>, key: &str) -> Vec<NamedEntry> {
    let Some(Value::Array(items)) = object.get(key) else {
        return Vec::new();
    };

    let entries = items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| NamedEntry::from_object(item.clone()))
        .collect();
    if items.iter().all(Value::is_object) {
        object.remove(key);
    }
    entries
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Write `value` under `key` unless `extra` carries the stored value for it
fn serialize_field<M, T>(map: &mut M, extra: &Map<String, Value>, key: &str, value: &T) -> Result<(), M::Error>
where
    M: SerializeMap,
    T: Serialize + ?Sized,
{
    if extra.contains_key(key) {
        Ok(())
    } else {
        map.serialize_entry(key, value)
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.id.is_empty() {
            serialize_field(&mut map, &self.extra, "_id", &self.id)?;
        }
        if let Some(rev) = &self.rev {
            serialize_field(&mut map, &self.extra, "_rev", rev)?;
        }
        serialize_field(&mut map, &self.extra, "name", &self.name)?;
        serialize_field(&mut map, &self.extra, "description", &self.description)?;
        serialize_field(&mut map, &self.extra, "track", &self.track)?;
        serialize_field(&mut map, &self.extra, "tags", &self.tags)?;
        serialize_field(&mut map, &self.extra, "speakers", &self.speakers)?;
        serialize_field(&mut map, &self.extra, "music", &self.music)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Event::from_document)
    }
}

impl Serialize for NamedEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        serialize_field(&mut map, &self.extra, "name", &self.name)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NamedEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(NamedEntry::from_object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_full_document() {
        let event: Event = serde_json::from_value(json!({
            "_id": "evt-1",
            "_rev": "1-abc",
            "name": "Rust at Scale",
            "description": "Ownership in production",
            "track": "Systems",
            "tags": [{"name": "rust"}, {"name": "performance"}],
            "speakers": [{"name": "Ada", "company": "Acme"}],
            "music": false,
            "room": "Hall B"
        }))
        .unwrap();

        assert_eq!(event.id, "evt-1");
        assert_eq!(event.rev.as_deref(), Some("1-abc"));
        assert_eq!(event.tag_names().collect::<Vec<_>>(), vec!["rust", "performance"]);
        assert_eq!(event.speakers[0].extra["company"], "Acme");
        assert_eq!(event.extra.len(), 1);
        assert_eq!(event.extra["room"], "Hall B");
    }

    #[test]
    fn test_absent_and_null_fields_are_empty() {
        let event: Event = serde_json::from_value(json!({
            "_id": "evt-2",
            "description": null,
            "tags": null
        }))
        .unwrap();

        assert!(event.name.is_empty());
        assert!(event.description.is_empty());
        assert!(event.tags.is_empty());
        assert!(event.speakers.is_empty());
        assert!(!event.music);
    }

    #[test]
    fn test_ill_typed_fields_read_as_empty_and_round_trip() {
        let raw = json!({
            "_id": "evt-4",
            "name": "Rust Night",
            "track": 2024,
            "tags": ["rust"],
            "speakers": [null, {"name": "Ada"}, {"name": 7}],
            "music": 1
        });
        let event: Event = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(event.name, "Rust Night");
        assert!(event.track.is_empty());
        assert!(event.tags.is_empty());
        assert_eq!(event.speaker_names().collect::<Vec<_>>(), vec!["Ada", ""]);
        assert!(event.music);

        let back = serde_json::to_value(&event).unwrap();
        for key in ["track", "tags", "speakers", "music"] {
            assert_eq!(back[key], raw[key], "{} not kept as stored", key);
        }
    }

    #[test]
    fn test_unmodelled_fields_survive_reserialization() {
        let raw = json!({
            "_id": "evt-3",
            "name": "Late Set",
            "music": true,
            "geometry": {"coordinates": [-97.74, 30.27]}
        });
        let event: Event = serde_json::from_value(raw.clone()).unwrap();
        let back = serde_json::to_value(&event).unwrap();

        assert_eq!(back["geometry"], raw["geometry"]);
        assert_eq!(back["music"], true);
        assert_eq!(back["description"], "");
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(serde_json::from_value::<Event>(json!("not an event")).is_err());
        assert!(serde_json::from_value::<Event>(json!(["a"])).is_err());
    }
}
