use serde::{ Deserialize, Serialize };
use serde_json::Value;

pub const ID_FIELD: &str = "id";
pub const CONTENT_FIELD: &str = "content";
pub const CONTENT_OUTPUT_FIELD: &str = "content_output";
pub const COLLECTION_OUTPUT_FIELD: &str = "collection_output";
pub const VECTOR_OUTPUT_FIELD: &str = "vector_output";

pub const VECTOR_PROFILE: &str = "my-vector-profile";
pub const HNSW_ALGORITHM: &str = "my-hnsw";

const COLLECTION_HINTS: [&str; 6] = [
    "phrases",
    "entities",
    "tags",
    "persons",
    "organizations",
    "locations",
];

/// One of the generic index fields a skill output can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    ContentOutput,
    CollectionOutput,
    VectorOutput,
}

impl OutputTarget {
    pub fn field_name(&self) -> &'static str {
        match self {
            OutputTarget::ContentOutput => CONTENT_OUTPUT_FIELD,
            OutputTarget::CollectionOutput => COLLECTION_OUTPUT_FIELD,
            OutputTarget::VectorOutput => VECTOR_OUTPUT_FIELD,
        }
    }

    /// Name-based inference: vector skills always land in `vector_output`, names hinting at
    /// a list (phrases, entities, tags, ...) land in `collection_output`, everything else in
    /// `content_output`. Case-insensitive substring match.
    pub fn classify(output_name: &str, emits_vector: bool) -> Self {
        if emits_vector {
            return OutputTarget::VectorOutput;
        }
        let lowered = output_name.to_lowercase();
        if COLLECTION_HINTS.iter().any(|hint| lowered.contains(hint)) {
            OutputTarget::CollectionOutput
        } else {
            OutputTarget::ContentOutput
        }
    }
}

/// A single field of the generic test index.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default = "default_true")]
    pub retrievable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
}

fn default_true() -> bool {
    true
}

impl IndexField {
    fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: "Edm.String".to_string(),
            key: false,
            searchable: true,
            retrievable: true,
            dimensions: None,
            vector_search_profile: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HnswAlgorithm {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VectorSearch {
    pub algorithms: Vec<HnswAlgorithm>,
    pub profiles: Vec<VectorProfile>,
}

/// Schema of the per-run test index. Identical for every non-vector skill; vector skills
/// add exactly one `vector_output` field plus its HNSW profile.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    /// The index name on the search service.
    pub name: String,
    /// Fields in declaration order: id, content, content_output, collection_output[, vector_output].
    pub fields: Vec<IndexField>,
    /// Present only when the index carries a vector field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_search: Option<VectorSearch>,
}

impl IndexSchema {
    pub fn for_run(name: &str, vector_dimensions: Option<usize>) -> Self {
        let mut id = IndexField::text(ID_FIELD);
        id.key = true;
        id.searchable = false;

        let mut collection = IndexField::text(COLLECTION_OUTPUT_FIELD);
        collection.data_type = "Collection(Edm.String)".to_string();

        let mut fields = vec![
            id,
            IndexField::text(CONTENT_FIELD),
            IndexField::text(CONTENT_OUTPUT_FIELD),
            collection
        ];

        let vector_search = vector_dimensions.map(|dims| {
            fields.push(IndexField {
                name: VECTOR_OUTPUT_FIELD.to_string(),
                data_type: "Collection(Edm.Single)".to_string(),
                key: false,
                searchable: true,
                retrievable: true,
                dimensions: Some(dims),
                vector_search_profile: Some(VECTOR_PROFILE.to_string()),
            });
            VectorSearch {
                algorithms: vec![HnswAlgorithm {
                    name: HNSW_ALGORITHM.to_string(),
                    kind: "hnsw".to_string(),
                }],
                profiles: vec![VectorProfile {
                    name: VECTOR_PROFILE.to_string(),
                    algorithm: HNSW_ALGORITHM.to_string(),
                }],
            }
        });

        Self {
            name: name.to_string(),
            fields,
            vector_search,
        }
    }

    pub fn field(&self, name: &str) -> Option<&IndexField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, target: OutputTarget) -> bool {
        self.field(target.field_name()).is_some()
    }

    pub fn to_definition(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_name_hints() {
        assert_eq!(OutputTarget::classify("keyPhrases", false), OutputTarget::CollectionOutput);
        assert_eq!(OutputTarget::classify("Persons", false), OutputTarget::CollectionOutput);
        assert_eq!(OutputTarget::classify("piiEntities", false), OutputTarget::CollectionOutput);
        assert_eq!(OutputTarget::classify("languageCode", false), OutputTarget::ContentOutput);
        assert_eq!(OutputTarget::classify("textItems", false), OutputTarget::ContentOutput);
        assert_eq!(OutputTarget::classify("keyPhrases", true), OutputTarget::VectorOutput);
    }

    #[test]
    fn non_vector_schemas_are_structurally_identical() {
        let a = IndexSchema::for_run("idx-a", None);
        let b = IndexSchema::for_run("idx-b", None);
        assert_eq!(a.fields, b.fields);
        assert!(a.vector_search.is_none());
        let names: Vec<&str> = a.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "content", "content_output", "collection_output"]);
        assert!(a.field("id").unwrap().key);
        assert!(!a.has_field(OutputTarget::VectorOutput));
    }

    #[test]
    fn vector_schema_adds_sized_field_and_profile() {
        let schema = IndexSchema::for_run("idx-embed", Some(1536));
        let vector = schema.field(VECTOR_OUTPUT_FIELD).unwrap();
        assert_eq!(vector.dimensions, Some(1536));
        assert_eq!(vector.data_type, "Collection(Edm.Single)");

        let definition = schema.to_definition();
        assert_eq!(definition["vectorSearch"]["profiles"][0]["algorithm"], HNSW_ALGORITHM);
        assert_eq!(definition["fields"][4]["vectorSearchProfile"], VECTOR_PROFILE);
        assert_eq!(definition["fields"][4]["dimensions"], 1536);
        assert!(definition["fields"][0].get("dimensions").is_none());
    }
}
