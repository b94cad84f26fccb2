pub mod definition;
pub mod samples;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::config::{ EmbeddingSettings, HarnessConfig, DEFAULT_EMBEDDING_DEPLOYMENT, DEFAULT_EMBEDDING_DIMENSIONS };
use crate::error::{ HarnessError, Result };
use crate::input::{ BinaryKind, SkillInput };
use crate::schema::OutputTarget;

pub const VISION_VECTOR_DIMENSIONS: usize = 1024;

/// Built-in skills the harness knows how to exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SkillKind {
    LanguageDetection,
    KeyPhraseExtraction,
    EntityRecognition,
    Sentiment,
    PiiDetection,
    TextTranslation,
    EntityLinking,
    CustomEntityLookup,
    Ocr,
    ImageAnalysis,
    VisionVectorize,
    DocumentExtraction,
    DocumentIntelligenceLayout,
    Conditional,
    Merge,
    Shaper,
    Split,
    AzureOpenAIEmbedding,
}

impl SkillKind {
    pub const ALL: [SkillKind; 18] = [
        SkillKind::LanguageDetection,
        SkillKind::KeyPhraseExtraction,
        SkillKind::EntityRecognition,
        SkillKind::Sentiment,
        SkillKind::PiiDetection,
        SkillKind::TextTranslation,
        SkillKind::EntityLinking,
        SkillKind::CustomEntityLookup,
        SkillKind::Ocr,
        SkillKind::ImageAnalysis,
        SkillKind::VisionVectorize,
        SkillKind::DocumentExtraction,
        SkillKind::DocumentIntelligenceLayout,
        SkillKind::Conditional,
        SkillKind::Merge,
        SkillKind::Shaper,
        SkillKind::Split,
        SkillKind::AzureOpenAIEmbedding,
    ];

    /// Name as the search service and the front-end spell it.
    pub fn name(&self) -> &'static str {
        match self {
            SkillKind::LanguageDetection => "LanguageDetectionSkill",
            SkillKind::KeyPhraseExtraction => "KeyPhraseExtractionSkill",
            SkillKind::EntityRecognition => "EntityRecognitionSkill",
            SkillKind::Sentiment => "SentimentSkill",
            SkillKind::PiiDetection => "PIIDetectionSkill",
            SkillKind::TextTranslation => "TextTranslationSkill",
            SkillKind::EntityLinking => "EntityLinkingSkill",
            SkillKind::CustomEntityLookup => "CustomEntityLookupSkill",
            SkillKind::Ocr => "OcrSkill",
            SkillKind::ImageAnalysis => "ImageAnalysisSkill",
            SkillKind::VisionVectorize => "VisionVectorizeSkill",
            SkillKind::DocumentExtraction => "DocumentExtractionSkill",
            SkillKind::DocumentIntelligenceLayout => "DocumentIntelligenceLayoutSkill",
            SkillKind::Conditional => "ConditionalSkill",
            SkillKind::Merge => "MergeSkill",
            SkillKind::Shaper => "ShaperSkill",
            SkillKind::Split => "SplitSkill",
            SkillKind::AzureOpenAIEmbedding => "AzureOpenAIEmbeddingSkill",
        }
    }

    pub fn odata_type(&self) -> &'static str {
        match self {
            SkillKind::LanguageDetection => "#Microsoft.Skills.Text.LanguageDetectionSkill",
            SkillKind::KeyPhraseExtraction => "#Microsoft.Skills.Text.KeyPhraseExtractionSkill",
            SkillKind::EntityRecognition => "#Microsoft.Skills.Text.V3.EntityRecognitionSkill",
            SkillKind::Sentiment => "#Microsoft.Skills.Text.V3.SentimentSkill",
            SkillKind::PiiDetection => "#Microsoft.Skills.Text.PIIDetectionSkill",
            SkillKind::TextTranslation => "#Microsoft.Skills.Text.TranslationSkill",
            SkillKind::EntityLinking => "#Microsoft.Skills.Text.V3.EntityLinkingSkill",
            SkillKind::CustomEntityLookup => "#Microsoft.Skills.Text.CustomEntityLookupSkill",
            SkillKind::Ocr => "#Microsoft.Skills.Vision.OcrSkill",
            SkillKind::ImageAnalysis => "#Microsoft.Skills.Vision.ImageAnalysisSkill",
            SkillKind::VisionVectorize => "#Microsoft.Skills.Vision.VectorizeSkill",
            SkillKind::DocumentExtraction => "#Microsoft.Skills.Util.DocumentExtractionSkill",
            SkillKind::DocumentIntelligenceLayout =>
                "#Microsoft.Skills.Util.DocumentIntelligenceLayoutSkill",
            SkillKind::Conditional => "#Microsoft.Skills.Util.ConditionalSkill",
            SkillKind::Merge => "#Microsoft.Skills.Text.MergeSkill",
            SkillKind::Shaper => "#Microsoft.Skills.Util.ShaperSkill",
            SkillKind::Split => "#Microsoft.Skills.Text.SplitSkill",
            SkillKind::AzureOpenAIEmbedding => "#Microsoft.Skills.Text.AzureOpenAIEmbeddingSkill",
        }
    }
}

/// Families a batch run visits, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkillGroup {
    Text,
    Image,
    Document,
    Utility,
    Embedding,
}

impl SkillGroup {
    pub const ORDER: [SkillGroup; 5] = [
        SkillGroup::Text,
        SkillGroup::Image,
        SkillGroup::Document,
        SkillGroup::Utility,
        SkillGroup::Embedding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SkillGroup::Text => "Text",
            SkillGroup::Image => "Image",
            SkillGroup::Document => "Document",
            SkillGroup::Utility => "Utility",
            SkillGroup::Embedding => "Embedding",
        }
    }

    pub fn members(self) -> Vec<SkillKind> {
        SkillKind::ALL.iter()
            .copied()
            .filter(|kind| kind.group() == self)
            .collect()
    }
}

impl SkillKind {
    pub fn group(self) -> SkillGroup {
        match self {
            SkillKind::LanguageDetection |
            SkillKind::KeyPhraseExtraction |
            SkillKind::EntityRecognition |
            SkillKind::Sentiment |
            SkillKind::PiiDetection |
            SkillKind::TextTranslation |
            SkillKind::EntityLinking |
            SkillKind::CustomEntityLookup => SkillGroup::Text,
            SkillKind::Ocr | SkillKind::ImageAnalysis | SkillKind::VisionVectorize => SkillGroup::Image,
            SkillKind::DocumentExtraction | SkillKind::DocumentIntelligenceLayout => SkillGroup::Document,
            SkillKind::Conditional | SkillKind::Merge | SkillKind::Shaper | SkillKind::Split =>
                SkillGroup::Utility,
            SkillKind::AzureOpenAIEmbedding => SkillGroup::Embedding,
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SkillKind {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        if wanted == "translationskill" {
            return Ok(SkillKind::TextTranslation);
        }
        SkillKind::ALL.iter()
            .copied()
            .find(|kind| {
                let name = kind.name().to_lowercase();
                name == wanted || name.trim_end_matches("skill") == wanted
            })
            .ok_or_else(|| HarnessError::UnknownSkill(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputMapping {
    pub name: String,
    pub source: String,
}

/// Binds one skill output to an enrichment-tree node and a generic index field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputMapping {
    pub skill_output: String,
    pub enrichment_name: String,
    pub target: OutputTarget,
}

impl OutputMapping {
    /// `/document/<enrichment_name>`, the indexer's output mapping source.
    pub fn source_path(&self) -> String {
        format!("/document/{}", self.enrichment_name)
    }
}

/// Per-run knobs that feed the skill configuration builders.
#[derive(Debug, Clone)]
pub struct SkillOptions {
    pub embedding: EmbeddingSettings,
    pub translate_to: String,
}

impl Default for SkillOptions {
    fn default() -> Self {
        Self {
            embedding: EmbeddingSettings {
                resource_uri: None,
                deployment_id: DEFAULT_EMBEDDING_DEPLOYMENT.to_string(),
                api_key: None,
                dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            },
            translate_to: "es".to_string(),
        }
    }
}

impl SkillOptions {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            embedding: config.embedding.clone(),
            ..Self::default()
        }
    }
}

/// Built-in input used when a run is given neither text nor a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleInput {
    Text(&'static str),
    Image(&'static [u8]),
    Document(&'static [u8]),
}

impl SampleInput {
    pub fn to_input(self) -> SkillInput {
        match self {
            SampleInput::Text(text) => SkillInput::Text(text.to_string()),
            SampleInput::Image(bytes) => SkillInput::Binary { bytes: bytes.to_vec(), kind: BinaryKind::Image },
            SampleInput::Document(bytes) =>
                SkillInput::Binary { bytes: bytes.to_vec(), kind: BinaryKind::Document },
        }
    }

    pub fn as_text(self) -> Option<&'static str> {
        match self {
            SampleInput::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum VectorSize {
    Configured,
    Fixed(usize),
}

struct CatalogRow {
    kind: SkillKind,
    inputs: &'static [(&'static str, &'static str)],
    /// (skill output, enrichment name, pinned target; `None` infers from the output name)
    outputs: &'static [(&'static str, &'static str, Option<OutputTarget>)],
    cognitive: bool,
    image: bool,
    file_data: bool,
    vector: Option<VectorSize>,
    sample: SampleInput,
}

const TEXT_IN: &[(&str, &str)] = &[("text", "/document/content")];
const IMAGE_IN: &[(&str, &str)] = &[("image", "/document/normalized_images/*")];
const FILE_IN: &[(&str, &str)] = &[("file_data", "/document/file_data")];

/// One row per `SkillKind`, in declaration order.
static CATALOG: [CatalogRow; 18] = [
    CatalogRow {
        kind: SkillKind::LanguageDetection,
        inputs: TEXT_IN,
        outputs: &[("languageCode", "languageCode", None)],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::ENGLISH_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::KeyPhraseExtraction,
        inputs: TEXT_IN,
        outputs: &[("keyPhrases", "keyPhrases", None)],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::TEXT_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::EntityRecognition,
        inputs: TEXT_IN,
        outputs: &[
            ("persons", "persons", None),
            ("organizations", "organizations", None),
            ("locations", "locations", None),
        ],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::ENTITY_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::Sentiment,
        inputs: TEXT_IN,
        outputs: &[("sentiment", "sentiment", None)],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::MIXED_SENTIMENT_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::PiiDetection,
        inputs: TEXT_IN,
        outputs: &[
            ("piiEntities", "piiEntities", None),
            ("maskedText", "maskedText", None),
        ],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::PII_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::TextTranslation,
        inputs: TEXT_IN,
        outputs: &[("translatedText", "translatedText", None)],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::ENGLISH_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::EntityLinking,
        inputs: TEXT_IN,
        outputs: &[("entities", "linkedEntities", None)],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::ENTITY_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::CustomEntityLookup,
        inputs: TEXT_IN,
        outputs: &[("entities", "customEntities", Some(OutputTarget::CollectionOutput))],
        cognitive: true,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::TEXT_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::Ocr,
        inputs: IMAGE_IN,
        outputs: &[("text", "ocrText", None)],
        cognitive: true,
        image: true,
        file_data: false,
        vector: None,
        sample: SampleInput::Image(samples::TEXT_IMAGE),
    },
    CatalogRow {
        kind: SkillKind::ImageAnalysis,
        inputs: IMAGE_IN,
        outputs: &[
            ("tags", "imageTags", None),
            ("description", "imageDescription", None),
        ],
        cognitive: true,
        image: true,
        file_data: false,
        vector: None,
        sample: SampleInput::Image(samples::TEXT_IMAGE),
    },
    CatalogRow {
        kind: SkillKind::VisionVectorize,
        inputs: IMAGE_IN,
        outputs: &[("vector", "imageVector", None)],
        cognitive: true,
        image: true,
        file_data: false,
        vector: Some(VectorSize::Fixed(VISION_VECTOR_DIMENSIONS)),
        sample: SampleInput::Image(samples::TEXT_IMAGE),
    },
    CatalogRow {
        kind: SkillKind::DocumentExtraction,
        inputs: FILE_IN,
        outputs: &[("content", "extractedContent", None)],
        cognitive: false,
        image: false,
        file_data: true,
        vector: None,
        sample: SampleInput::Text("Sample document content for extraction testing"),
    },
    CatalogRow {
        kind: SkillKind::DocumentIntelligenceLayout,
        inputs: FILE_IN,
        outputs: &[
            ("markdown_document", "markdownDocument", Some(OutputTarget::CollectionOutput)),
        ],
        cognitive: true,
        image: false,
        file_data: true,
        vector: None,
        sample: SampleInput::Document(samples::LAYOUT_DOCUMENT),
    },
    CatalogRow {
        kind: SkillKind::Conditional,
        inputs: &[
            ("condition", "= $(/document/content) != null"),
            ("whenTrue", "/document/content"),
            ("whenFalse", "= 'no content'"),
        ],
        outputs: &[("output", "conditionalOutput", None)],
        cognitive: false,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::TEXT_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::Merge,
        inputs: &[
            ("text", "/document/content"),
            ("itemsToInsert", "/document/normalized_images/*/text"),
        ],
        outputs: &[("mergedText", "mergedText", None)],
        cognitive: false,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::TEXT_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::Shaper,
        inputs: &[
            ("text", "/document/content"),
            ("title", "/document/metadata_storage_name"),
        ],
        outputs: &[("output", "shapedDocument", None)],
        cognitive: false,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::TEXT_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::Split,
        inputs: TEXT_IN,
        outputs: &[("textItems", "pages", Some(OutputTarget::CollectionOutput))],
        cognitive: false,
        image: false,
        file_data: false,
        vector: None,
        sample: SampleInput::Text(samples::LONG_TEXT_SAMPLE),
    },
    CatalogRow {
        kind: SkillKind::AzureOpenAIEmbedding,
        inputs: TEXT_IN,
        outputs: &[("embedding", "textVector", None)],
        cognitive: false,
        image: false,
        file_data: false,
        vector: Some(VectorSize::Configured),
        sample: SampleInput::Text(samples::TEXT_SAMPLE),
    },
];

/// Everything the orchestrator needs to know about one skill under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillTestDescriptor {
    pub skill_kind: SkillKind,
    pub context: String,
    pub input_mappings: Vec<InputMapping>,
    pub output_mappings: Vec<OutputMapping>,
    pub requires_cognitive_services: bool,
    pub requires_image_input: bool,
    pub requires_file_data: bool,
    pub emits_vector: bool,
    pub vector_dimensions: Option<usize>,
    #[serde(skip)]
    pub sample_input: SampleInput,
}

impl SkillTestDescriptor {
    pub fn for_kind(kind: SkillKind, options: &SkillOptions) -> Self {
        let row = &CATALOG[kind as usize];

        let emits_vector = row.vector.is_some();
        let vector_dimensions = row.vector.map(|size| {
            match size {
                VectorSize::Configured => options.embedding.dimensions,
                VectorSize::Fixed(dims) => dims,
            }
        });

        Self {
            skill_kind: kind,
            context: "/document".to_string(),
            input_mappings: row.inputs
                .iter()
                .map(|(name, source)| InputMapping {
                    name: name.to_string(),
                    source: source.to_string(),
                })
                .collect(),
            output_mappings: row.outputs
                .iter()
                .map(|(output, enrichment, pinned)| OutputMapping {
                    skill_output: output.to_string(),
                    enrichment_name: enrichment.to_string(),
                    target: pinned.unwrap_or_else(|| OutputTarget::classify(output, emits_vector)),
                })
                .collect(),
            requires_cognitive_services: row.cognitive,
            requires_image_input: row.image,
            requires_file_data: row.file_data,
            emits_vector,
            vector_dimensions,
            sample_input: row.sample,
        }
    }

    pub fn all(options: &SkillOptions) -> Vec<Self> {
        SkillKind::ALL.iter()
            .map(|kind| Self::for_kind(*kind, options))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        self.skill_kind.name()
    }

    /// The generic index fields this skill's outputs land in.
    pub fn targets(&self) -> BTreeSet<&'static str> {
        self.output_mappings
            .iter()
            .map(|m| m.target.field_name())
            .collect()
    }

    /// The JSON skill object registered in the skillset.
    pub fn build_skill(&self, options: &SkillOptions) -> Result<Value> {
        definition::build_skill(self, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IndexSchema;

    #[test]
    fn catalog_rows_line_up_with_kinds() {
        for (index, kind) in SkillKind::ALL.iter().enumerate() {
            assert_eq!(CATALOG[index].kind, *kind);
            assert_eq!(*kind as usize, index);
        }
    }

    #[test]
    fn parses_names_case_insensitively_with_aliases() {
        assert_eq!("LanguageDetectionSkill".parse::<SkillKind>().unwrap(), SkillKind::LanguageDetection);
        assert_eq!("piidetectionskill".parse::<SkillKind>().unwrap(), SkillKind::PiiDetection);
        assert_eq!("TranslationSkill".parse::<SkillKind>().unwrap(), SkillKind::TextTranslation);
        assert_eq!("split".parse::<SkillKind>().unwrap(), SkillKind::Split);
        assert!(matches!("FooSkill".parse::<SkillKind>(), Err(HarnessError::UnknownSkill(_))));
    }

    #[test]
    fn descriptor_invariants_hold_for_every_kind() {
        let options = SkillOptions::default();
        for descriptor in SkillTestDescriptor::all(&options) {
            assert!(!descriptor.output_mappings.is_empty(), "{}", descriptor.name());
            assert_eq!(descriptor.emits_vector, descriptor.vector_dimensions.is_some());
            assert!(!descriptor.input_mappings.is_empty());
            if descriptor.requires_image_input {
                assert!(matches!(descriptor.sample_input, SampleInput::Image(_)), "{}", descriptor.name());
            }
        }
    }

    #[test]
    fn every_output_resolves_to_a_generic_field_present_in_the_schema() {
        let options = SkillOptions::default();
        for descriptor in SkillTestDescriptor::all(&options) {
            let schema = IndexSchema::for_run("idx", descriptor.vector_dimensions);
            let mut resolves_to_vector = false;
            for mapping in &descriptor.output_mappings {
                assert!(
                    matches!(
                        mapping.target,
                        OutputTarget::ContentOutput |
                            OutputTarget::CollectionOutput |
                            OutputTarget::VectorOutput
                    )
                );
                assert!(schema.has_field(mapping.target), "{} -> {:?}", descriptor.name(), mapping.target);
                resolves_to_vector |= mapping.target == OutputTarget::VectorOutput;
            }
            assert_eq!(schema.has_field(OutputTarget::VectorOutput), resolves_to_vector, "{}", descriptor.name());
        }
    }

    #[test]
    fn pinned_targets_only_override_the_name_rule_where_intended() {
        let options = SkillOptions::default();
        let mut overridden = Vec::new();
        for descriptor in SkillTestDescriptor::all(&options) {
            for mapping in &descriptor.output_mappings {
                let inferred = OutputTarget::classify(&mapping.skill_output, descriptor.emits_vector);
                if inferred != mapping.target {
                    overridden.push(descriptor.skill_kind);
                }
            }
        }
        assert_eq!(overridden, vec![SkillKind::DocumentIntelligenceLayout, SkillKind::Split]);
    }

    #[test]
    fn vector_dimensions_come_from_options_or_fixed_size() {
        let mut options = SkillOptions::default();
        options.embedding.dimensions = 3072;
        let embedding = SkillTestDescriptor::for_kind(SkillKind::AzureOpenAIEmbedding, &options);
        assert_eq!(embedding.vector_dimensions, Some(3072));
        assert_eq!(embedding.output_mappings[0].target, OutputTarget::VectorOutput);

        let vision = SkillTestDescriptor::for_kind(SkillKind::VisionVectorize, &options);
        assert_eq!(vision.vector_dimensions, Some(VISION_VECTOR_DIMENSIONS));
        assert!(vision.requires_image_input);
    }

    #[test]
    fn groups_cover_every_kind_once_in_catalog_order() {
        let visited: Vec<SkillKind> = SkillGroup::ORDER.iter()
            .flat_map(|group| group.members())
            .collect();
        assert_eq!(visited, SkillKind::ALL.to_vec());
        assert_eq!(SkillGroup::Embedding.members(), vec![SkillKind::AzureOpenAIEmbedding]);
    }

    #[test]
    fn key_phrases_map_to_collection_output() {
        let descriptor = SkillTestDescriptor::for_kind(SkillKind::KeyPhraseExtraction, &SkillOptions::default());
        assert_eq!(descriptor.output_mappings[0].source_path(), "/document/keyPhrases");
        assert_eq!(descriptor.targets().into_iter().collect::<Vec<_>>(), vec!["collection_output"]);
    }
}
