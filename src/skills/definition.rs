use serde_json::{ json, Map, Value };
use log::debug;

use super::{ SkillKind, SkillOptions, SkillTestDescriptor };
use crate::error::{ HarnessError, Result };

/// Builds the skill object registered in the skillset: the common envelope
/// (`@odata.type`, name, context, inputs, outputs) plus the kind's own parameters.
pub fn build_skill(descriptor: &SkillTestDescriptor, options: &SkillOptions) -> Result<Value> {
    let kind = descriptor.skill_kind;
    let mut skill = Map::new();
    skill.insert("@odata.type".to_string(), json!(kind.odata_type()));
    skill.insert("name".to_string(), json!(format!("{}-under-test", kind.name().to_lowercase())));
    skill.insert("context".to_string(), json!(descriptor.context));
    skill.insert(
        "inputs".to_string(),
        Value::Array(
            descriptor.input_mappings
                .iter()
                .map(|input| json!({ "name": input.name, "source": input.source }))
                .collect()
        )
    );
    skill.insert(
        "outputs".to_string(),
        Value::Array(
            descriptor.output_mappings
                .iter()
                .map(|output| json!({ "name": output.skill_output, "targetName": output.enrichment_name }))
                .collect()
        )
    );

    for (key, value) in parameters(kind, options)? {
        skill.insert(key.to_string(), value);
    }

    debug!("Built skill definition for {}: {:?}", kind, skill.keys().collect::<Vec<_>>());
    Ok(Value::Object(skill))
}

fn parameters(kind: SkillKind, options: &SkillOptions) -> Result<Vec<(&'static str, Value)>> {
    let params = match kind {
        SkillKind::LanguageDetection | SkillKind::KeyPhraseExtraction => Vec::new(),
        SkillKind::EntityRecognition =>
            vec![
                ("categories", json!(["Person", "Organization", "Location"])),
                ("minimumPrecision", json!(0.5))
            ],
        SkillKind::Sentiment => vec![("includeOpinionMining", json!(false))],
        SkillKind::PiiDetection =>
            vec![("maskingMode", json!("replace")), ("maskingCharacter", json!("*"))],
        SkillKind::TextTranslation =>
            vec![("defaultToLanguageCode", json!(options.translate_to))],
        SkillKind::EntityLinking => vec![("minimumPrecision", json!(0.5))],
        SkillKind::CustomEntityLookup =>
            vec![
                ("defaultLanguageCode", json!("en")),
                (
                    "inlineEntitiesDefinition",
                    json!([
                    {
                        "name": "Azure AI Search",
                        "description": "Cloud search service",
                        "caseSensitive": false,
                        "aliases": [{ "text": "Azure Cognitive Search" }]
                    },
                    { "name": "Contoso", "caseSensitive": false },
                    { "name": "Microsoft Azure", "caseSensitive": false }
                ]),
                )
            ],
        SkillKind::Ocr =>
            vec![("defaultLanguageCode", json!("en")), ("detectOrientation", json!(true))],
        SkillKind::ImageAnalysis => vec![("visualFeatures", json!(["tags", "description"]))],
        SkillKind::VisionVectorize => vec![("modelVersion", json!("2023-04-15"))],
        SkillKind::DocumentExtraction =>
            vec![
                ("parsingMode", json!("default")),
                ("dataToExtract", json!("contentAndMetadata"))
            ],
        SkillKind::DocumentIntelligenceLayout =>
            vec![("outputMode", json!("oneToMany")), ("markdownHeaderDepth", json!("h3"))],
        SkillKind::Conditional | SkillKind::Shaper => Vec::new(),
        SkillKind::Merge =>
            vec![("insertPreTag", json!(" ")), ("insertPostTag", json!(" "))],
        SkillKind::Split =>
            vec![
                ("textSplitMode", json!("pages")),
                ("maximumPageLength", json!(5000)),
                ("pageOverlapLength", json!(100))
            ],
        SkillKind::AzureOpenAIEmbedding => {
            let resource_uri = options.embedding.resource_uri
                .as_deref()
                .filter(|uri| !uri.is_empty())
                .ok_or_else(|| HarnessError::Skill {
                    skill: kind.name().to_string(),
                    message: "Azure OpenAI resource URI is required (set AOAI_RESOURCE_URI)".to_string(),
                })?;
            let mut params = vec![
                ("resourceUri", json!(resource_uri)),
                ("deploymentId", json!(options.embedding.deployment_id)),
                ("dimensions", json!(options.embedding.dimensions))
            ];
            if let Some(key) = options.embedding.api_key.as_deref().filter(|k| !k.is_empty()) {
                params.push(("apiKey", json!(key)));
            }
            params
        }
    };
    Ok(params)
}
