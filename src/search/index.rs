//! Search index definitions
//!
//! Each index is described as data: a list of mappings from a source field of
//! the event document to a search field with an optional boost. The same
//! description renders the JavaScript indexing function the store persists in
//! the design document, and extracts index entries directly from a raw
//! document for the in-memory backend.

use crate::models::event::is_truthy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Id of the design document holding the search indexes
pub const DESIGN_DOCUMENT_ID: &str = "_design/search";

/// The indexes the event search relies on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum IndexName {
    ByTopic,
    BySpeaker,
    ByMusicTopic,
    ByMusicArtist,
}

/// A field of the event document that feeds an index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceField {
    Name,
    Description,
    Track,
    /// `name` of every entry in `tags`
    TagNames,
    /// `name` of every entry in `speakers`
    SpeakerNames,
}

impl SourceField {
    /// Key of the field in the stored document
    pub fn doc_key(self) -> &'static str {
        match self {
            SourceField::Name => "name",
            SourceField::Description => "description",
            SourceField::Track => "track",
            SourceField::TagNames => "tags",
            SourceField::SpeakerNames => "speakers",
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, SourceField::TagNames | SourceField::SpeakerNames)
    }
}

/// Source field → search field with an optional boost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: SourceField,
    pub indexed_as: &'static str,
    pub boost: Option<u32>,
    /// Only index documents whose `music` flag is set
    pub requires_music: bool,
}

impl FieldMapping {
    pub const fn new(source: SourceField, indexed_as: &'static str) -> Self {
        Self {
            source,
            indexed_as,
            boost: None,
            requires_music: false,
        }
    }

    pub fn boost(mut self, boost: u32) -> Self {
        self.boost = Some(boost);
        self
    }

    pub fn music_only(mut self) -> Self {
        self.requires_music = true;
        self
    }

    /// Boost applied when scoring, 1 when unboosted
    pub fn weight(&self) -> u32 {
        self.boost.unwrap_or(1)
    }
}

/// One value produced by indexing a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub field: &'static str,
    pub value: String,
    pub weight: u32,
}

/// A named search index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: IndexName,
    pub mappings: Vec<FieldMapping>,
}

impl IndexDefinition {
    pub fn new(name: IndexName, mappings: Vec<FieldMapping>) -> Self {
        Self { name, mappings }
    }

    /// Search fields this index exposes, in mapping order
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = Vec::new();
        for mapping in &self.mappings {
            if !fields.contains(&mapping.indexed_as) {
                fields.push(mapping.indexed_as);
            }
        }
        fields
    }

    /// Extract the entries this index would hold for `doc`.
    ///
    /// Absent, `null` or ill-typed fields contribute nothing.
    pub fn entries(&self, doc: &Value) -> Vec<IndexEntry> {
        let is_music = doc.get("music").map(is_truthy).unwrap_or(false);
        let mut entries = Vec::new();

        for mapping in &self.mappings {
            if mapping.requires_music && !is_music {
                continue;
            }

            let Some(value) = doc.get(mapping.source.doc_key()) else {
                continue;
            };

            if mapping.source.is_list() {
                let Some(items) = value.as_array() else {
                    continue;
                };
                for item in items {
                    if let Some(name) = item.get("name").and_then(Value::as_str) {
                        push_entry(&mut entries, mapping, name);
                    }
                }
            } else if let Some(text) = value.as_str() {
                push_entry(&mut entries, mapping, text);
            }
        }

        entries
    }

    /// Render the JavaScript indexing function for this index
    pub fn render_function(&self) -> String {
        let (music, always): (Vec<&FieldMapping>, Vec<&FieldMapping>) =
            self.mappings.iter().partition(|m| m.requires_music);

        let mut body = String::new();
        if !music.is_empty() {
            body.push_str("if (doc.music) {\n");
            for mapping in &music {
                render_mapping(&mut body, mapping);
            }
            body.push_str("}\n");
        }
        for mapping in &always {
            render_mapping(&mut body, mapping);
        }

        format!("function (doc) {{\n{}}}", body)
    }
}

fn push_entry(entries: &mut Vec<IndexEntry>, mapping: &FieldMapping, value: &str) {
    if value.is_empty() {
        return;
    }
    entries.push(IndexEntry {
        field: mapping.indexed_as,
        value: value.to_string(),
        weight: mapping.weight(),
    });
}

fn render_mapping(out: &mut String, mapping: &FieldMapping) {
    let key = mapping.source.doc_key();
    let options = match mapping.boost {
        Some(boost) => format!("{{boost: {}}}", boost),
        None => "{}".to_string(),
    };

    // Writing to a String cannot fail
    if mapping.source.is_list() {
        let _ = writeln!(
            out,
            "if (doc.{key} && doc.{key}.length > 0) {{\n\
             for (var i = 0; i < doc.{key}.length; i++) {{\n\
             if (doc.{key}[i] && doc.{key}[i].name) {{\n\
             index(\"{field}\", doc.{key}[i].name, {options});\n\
             }}\n\
             }}\n\
             }}",
            key = key,
            field = mapping.indexed_as,
            options = options,
        );
    } else {
        let _ = writeln!(
            out,
            "if (doc.{key}) {{\n\
             index(\"{field}\", doc.{key}, {options});\n\
             }}",
            key = key,
            field = mapping.indexed_as,
            options = options,
        );
    }
}

/// The full set of index definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCatalog {
    definitions: Vec<IndexDefinition>,
}

impl IndexCatalog {
    /// The four event indexes
    pub fn standard() -> Self {
        use SourceField::*;

        let topic = [
            FieldMapping::new(Name, "name").boost(2),
            FieldMapping::new(Description, "description").boost(1),
            FieldMapping::new(Track, "track").boost(2),
            FieldMapping::new(TagNames, "tag").boost(10),
        ];

        let definitions = IndexName::iter()
            .map(|name| {
                let mappings = match name {
                    IndexName::ByTopic => topic.to_vec(),
                    IndexName::BySpeaker => vec![FieldMapping::new(SpeakerNames, "speaker")],
                    // Artists are indexed for every document, not only music ones
                    IndexName::ByMusicTopic => topic
                        .iter()
                        .map(|m| m.music_only())
                        .chain(std::iter::once(
                            FieldMapping::new(SpeakerNames, "artist").boost(5),
                        ))
                        .collect(),
                    IndexName::ByMusicArtist => {
                        vec![FieldMapping::new(SpeakerNames, "artist").music_only()]
                    }
                };
                IndexDefinition::new(name, mappings)
            })
            .collect();

        Self { definitions }
    }

    pub fn get(&self, name: IndexName) -> Option<&IndexDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.definitions.iter()
    }
}

impl Default for IndexCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Index function as persisted in the design document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFunction {
    pub index: String,
}

/// The design document carrying every search index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(rename = "_id")]
    pub id: String,

    pub indexes: BTreeMap<String, IndexFunction>,
}

impl DesignDocument {
    pub fn from_catalog(id: impl Into<String>, catalog: &IndexCatalog) -> Self {
        let indexes = catalog
            .iter()
            .map(|def| {
                (
                    def.name.to_string(),
                    IndexFunction {
                        index: def.render_function(),
                    },
                )
            })
            .collect();

        Self {
            id: id.into(),
            indexes,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// `_design/search` → `search`
pub fn design_name(design_id: &str) -> &str {
    design_id.strip_prefix("_design/").unwrap_or(design_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn boosts(def: &IndexDefinition) -> Vec<(&'static str, Option<u32>, bool)> {
        def.mappings
            .iter()
            .map(|m| (m.indexed_as, m.boost, m.requires_music))
            .collect()
    }

    #[test]
    fn test_index_names_round_trip() {
        assert_eq!(IndexName::ByMusicTopic.to_string(), "by_music_topic");
        assert_eq!(IndexName::from_str("by_speaker").unwrap(), IndexName::BySpeaker);
        assert!(IndexName::from_str("by_popularity").is_err());
    }

    #[test]
    fn test_standard_catalog_weights() {
        let catalog = IndexCatalog::standard();

        assert_eq!(
            boosts(catalog.get(IndexName::ByTopic).unwrap()),
            vec![
                ("name", Some(2), false),
                ("description", Some(1), false),
                ("track", Some(2), false),
                ("tag", Some(10), false),
            ]
        );
        assert_eq!(
            boosts(catalog.get(IndexName::BySpeaker).unwrap()),
            vec![("speaker", None, false)]
        );
        assert_eq!(
            boosts(catalog.get(IndexName::ByMusicTopic).unwrap()),
            vec![
                ("name", Some(2), true),
                ("description", Some(1), true),
                ("track", Some(2), true),
                ("tag", Some(10), true),
                ("artist", Some(5), false),
            ]
        );
        assert_eq!(
            boosts(catalog.get(IndexName::ByMusicArtist).unwrap()),
            vec![("artist", None, true)]
        );
    }

    #[test]
    fn test_entries_read_fields_defensively() {
        let catalog = IndexCatalog::standard();
        let topic = catalog.get(IndexName::ByTopic).unwrap();

        let doc = json!({
            "name": "Ferris Talk",
            "description": null,
            "track": 42,
            "tags": [{"name": "rust"}, {"label": "no-name"}, null]
        });

        assert_eq!(
            topic.entries(&doc),
            vec![
                IndexEntry { field: "name", value: "Ferris Talk".into(), weight: 2 },
                IndexEntry { field: "tag", value: "rust".into(), weight: 10 },
            ]
        );
        assert!(topic.entries(&json!({})).is_empty());
    }

    #[test]
    fn test_music_gating() {
        let catalog = IndexCatalog::standard();
        let music_topic = catalog.get(IndexName::ByMusicTopic).unwrap();
        let music_artist = catalog.get(IndexName::ByMusicArtist).unwrap();

        let talk = json!({"name": "Keynote", "speakers": [{"name": "Grace"}]});
        let gig = json!({"name": "Night Set", "music": true, "speakers": [{"name": "Bjork"}]});

        // Non-music documents still contribute artists to by_music_topic
        assert_eq!(
            music_topic.entries(&talk),
            vec![IndexEntry { field: "artist", value: "Grace".into(), weight: 5 }]
        );
        assert!(music_artist.entries(&talk).is_empty());

        assert_eq!(music_topic.entries(&gig).len(), 2);
        assert_eq!(
            music_artist.entries(&gig),
            vec![IndexEntry { field: "artist", value: "Bjork".into(), weight: 1 }]
        );
    }

    #[test]
    fn test_render_function() {
        let catalog = IndexCatalog::standard();

        let speaker = catalog.get(IndexName::BySpeaker).unwrap().render_function();
        assert!(speaker.starts_with("function (doc) {"));
        assert!(speaker.contains("index(\"speaker\", doc.speakers[i].name, {});"));
        assert!(!speaker.contains("doc.music"));

        let music_topic = catalog.get(IndexName::ByMusicTopic).unwrap().render_function();
        assert!(music_topic.contains("if (doc.music) {"));
        assert!(music_topic.contains("index(\"tag\", doc.tags[i].name, {boost: 10});"));
        assert!(music_topic.contains("index(\"artist\", doc.speakers[i].name, {boost: 5});"));
        assert_eq!(
            music_topic.matches('{').count(),
            music_topic.matches('}').count()
        );
    }

    #[test]
    fn test_design_document_shape() {
        let doc = DesignDocument::from_catalog(DESIGN_DOCUMENT_ID, &IndexCatalog::standard());
        let value = doc.to_value().unwrap();

        assert_eq!(value["_id"], "_design/search");
        let indexes = value["indexes"].as_object().unwrap();
        let mut names: Vec<&String> = indexes.keys().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["by_music_artist", "by_music_topic", "by_speaker", "by_topic"]
        );
        assert!(indexes["by_topic"]["index"].as_str().unwrap().contains("{boost: 2}"));
    }

    #[test]
    fn test_design_name() {
        assert_eq!(design_name("_design/search"), "search");
        assert_eq!(design_name("search"), "search");
    }
}
