//! Local preview of skill outputs: hand-authored documents shaped like what a real
//! indexing run would store, produced without touching any service.

use serde::Serialize;
use serde_json::{ json, Map, Value };

use crate::skills::{ samples, SkillKind, SkillOptions, SkillTestDescriptor };

const CONTENT_PREVIEW_CHARS: usize = 200;
const SAMPLE_INPUT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub skill_definition: Value,
    pub sample_input: Value,
    pub index_document: Value,
}

/// Previews `skill_name` against `input`, or the skill's own sample when no input is given.
/// Names that do not resolve to a known skill get a generic placeholder document.
pub fn preview(skill_name: &str, input: Option<&str>) -> PreviewResult {
    let kind = skill_name.parse::<SkillKind>().ok();
    let text = input
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_input(kind).to_string());

    let sample_input = if kind.is_some_and(is_image_preview) {
        json!({ "recordId": "1", "data": { "imageUrl": image_url(&text) } })
    } else {
        let shown = if text.chars().count() > SAMPLE_INPUT_CHARS {
            format!("{}...", head(&text, SAMPLE_INPUT_CHARS))
        } else {
            text.clone()
        };
        json!({ "recordId": "1", "data": { "text": shown } })
    };

    let (skill_definition, index_document) = match kind {
        Some(kind) => (skill_definition(kind), index_document(kind, &text)),
        None => (json!({ "@odata.type": "Unknown", "outputs": ["output"] }), generic(&text)),
    };

    PreviewResult {
        skill_definition,
        sample_input,
        index_document: Value::Object(index_document),
    }
}

/// Output fields each preview document illustrates, besides `id` and `content`.
pub fn declared_outputs(kind: SkillKind) -> &'static [&'static str] {
    match kind {
        SkillKind::LanguageDetection => &["languageCode", "languageName", "score"],
        SkillKind::KeyPhraseExtraction => &["keyPhrases"],
        SkillKind::EntityRecognition => &["persons", "locations", "organizations", "namedEntities"],
        SkillKind::Sentiment => &["sentiment", "confidenceScores", "sentences"],
        SkillKind::PiiDetection => &["piiEntities", "maskedText"],
        SkillKind::TextTranslation => &["translatedText", "translatedToLanguageCode"],
        SkillKind::EntityLinking => &["entities"],
        SkillKind::CustomEntityLookup => &["customEntities"],
        SkillKind::Ocr => &["text", "layoutText"],
        SkillKind::ImageAnalysis => &["tags", "description", "categories", "imageType", "color"],
        SkillKind::VisionVectorize => &["imageVector"],
        SkillKind::DocumentExtraction => &["extractedContent", "normalized_images"],
        SkillKind::DocumentIntelligenceLayout => &["markdown_document"],
        SkillKind::Conditional => &["conditionalOutput"],
        SkillKind::Merge => &["mergedText"],
        SkillKind::Shaper => &["shapedOutput"],
        SkillKind::Split => &["textItems"],
        SkillKind::AzureOpenAIEmbedding => &["contentVector"],
    }
}

fn skill_definition(kind: SkillKind) -> Value {
    json!({
        "@odata.type": kind.odata_type(),
        "outputs": declared_outputs(kind)
    })
}

fn is_image_preview(kind: SkillKind) -> bool {
    matches!(
        kind,
        SkillKind::Ocr |
            SkillKind::ImageAnalysis |
            SkillKind::VisionVectorize |
            SkillKind::DocumentExtraction |
            SkillKind::DocumentIntelligenceLayout
    )
}

fn default_input(kind: Option<SkillKind>) -> &'static str {
    match kind {
        Some(SkillKind::Ocr | SkillKind::DocumentExtraction | SkillKind::DocumentIntelligenceLayout) =>
            samples::INVOICE_IMAGE,
        Some(SkillKind::ImageAnalysis | SkillKind::VisionVectorize) => samples::LANDSCAPE_IMAGE,
        Some(kind) =>
            SkillTestDescriptor::for_kind(kind, &SkillOptions::default()).sample_input
                .as_text()
                .unwrap_or(samples::TEXT_SAMPLE),
        None => samples::TEXT_SAMPLE,
    }
}

fn image_url(path: &str) -> String {
    let is_local = path.starts_with('/') || path.starts_with("C:") || path.starts_with("D:");
    if is_local {
        format!("file:///{}", path.replace('\\', "/").trim_start_matches('/'))
    } else {
        path.to_string()
    }
}

fn head(text: &str, chars: usize) -> String {
    text.chars().take(chars).collect()
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn document(content: String, fields: Value) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert("id".to_string(), json!("doc_001"));
    doc.insert("content".to_string(), Value::String(content));
    if let Value::Object(fields) = fields {
        doc.extend(fields);
    }
    doc
}

fn generic(text: &str) -> Map<String, Value> {
    document(
        head(text, CONTENT_PREVIEW_CHARS),
        json!({ "output": "[Skill output would appear here]" })
    )
}

fn index_document(kind: SkillKind, text: &str) -> Map<String, Value> {
    let content = head(text, CONTENT_PREVIEW_CHARS);
    let image_content = || format!("[Image: {}]", file_name(text));
    let document_content = || format!("[Document: {}]", file_name(text));

    match kind {
        SkillKind::LanguageDetection =>
            document(content, json!({ "languageCode": "en", "languageName": "English", "score": 1.0 })),
        SkillKind::KeyPhraseExtraction =>
            document(
                content,
                json!({
                "keyPhrases": [
                    "Azure AI Search",
                    "cloud search service",
                    "search experience",
                    "private heterogeneous content",
                    "Microsoft Azure",
                    "enterprise applications"
                ]
            })
            ),
        SkillKind::EntityRecognition =>
            document(
                content,
                json!({
                "persons": ["John Smith", "Satya Nadella"],
                "locations": ["Redmond", "Washington", "San Francisco"],
                "organizations": ["Microsoft", "Contoso Ltd", "Azure"],
                "namedEntities": [
                    { "text": "John Smith", "category": "Person", "subcategory": null, "confidenceScore": 0.98, "offset": 0, "length": 10 },
                    { "text": "Microsoft", "category": "Organization", "subcategory": null, "confidenceScore": 0.99, "offset": 50, "length": 9 },
                    { "text": "Redmond", "category": "Location", "subcategory": "GPE", "confidenceScore": 0.95, "offset": 120, "length": 7 }
                ]
            })
            ),
        SkillKind::Sentiment =>
            document(
                content,
                json!({
                "sentiment": "positive",
                "confidenceScores": { "positive": 0.89, "neutral": 0.10, "negative": 0.01 },
                "sentences": [
                    {
                        "text": "Azure AI Search is a cloud search service that gives developers infrastructure.",
                        "sentiment": "positive",
                        "confidenceScores": { "positive": 0.92, "neutral": 0.07, "negative": 0.01 },
                        "offset": 0,
                        "length": 78,
                        "targets": [],
                        "assessments": []
                    }
                ]
            })
            ),
        SkillKind::PiiDetection =>
            document(
                content,
                json!({
                "piiEntities": [
                    { "text": "john.smith@contoso.com", "type": "Email", "subtype": "", "score": 0.99, "offset": 150, "length": 22 },
                    { "text": "+1-425-555-0123", "type": "PhoneNumber", "subtype": "", "score": 0.95, "offset": 180, "length": 15 },
                    { "text": "859-98-0987", "type": "U.S. Social Security Number (SSN)", "subtype": "", "score": 0.85, "offset": 210, "length": 11 }
                ],
                "maskedText": "Contact: ******************** at *************** SSN: ***********"
            })
            ),
        SkillKind::TextTranslation =>
            document(
                content,
                json!({
                "translatedText": "Azure AI Search es un servicio de búsqueda en la nube que ofrece a los desarrolladores infraestructura, API y herramientas.",
                "translatedToLanguageCode": "es"
            })
            ),
        SkillKind::EntityLinking =>
            document(
                content,
                json!({
                "entities": [
                    {
                        "name": "Microsoft",
                        "matches": [{ "text": "Microsoft", "offset": 0, "length": 9, "confidenceScore": 0.98 }],
                        "language": "en",
                        "id": "Microsoft",
                        "url": "https://en.wikipedia.org/wiki/Microsoft",
                        "dataSource": "Wikipedia"
                    },
                    {
                        "name": "Microsoft Azure",
                        "matches": [{ "text": "Azure", "offset": 50, "length": 5, "confidenceScore": 0.95 }],
                        "language": "en",
                        "id": "Microsoft_Azure",
                        "url": "https://en.wikipedia.org/wiki/Microsoft_Azure",
                        "dataSource": "Wikipedia"
                    }
                ]
            })
            ),
        SkillKind::CustomEntityLookup =>
            document(
                content,
                json!({
                "customEntities": [
                    {
                        "name": "Azure AI Search",
                        "description": "Cloud search service",
                        "matches": [
                            { "text": "Azure AI Search", "offset": 0, "length": 15, "matchDistance": 0.0 },
                            { "text": "Azure Cognitive Search", "offset": 35, "length": 22, "matchDistance": 0.0 }
                        ]
                    },
                    {
                        "name": "Contoso",
                        "matches": [{ "text": "Contoso", "offset": 459, "length": 7, "matchDistance": 0.0 }]
                    }
                ]
            })
            ),
        SkillKind::Split =>
            document(
                content,
                json!({
                "textItems": [
                    "Azure AI Search (formerly known as Azure Cognitive Search) is a cloud search service...",
                    "Microsoft Azure was announced in October 2008 and released on February 1, 2010...",
                    "Azure provides more than 200 products and cloud services designed to help bring new solutions..."
                ]
            })
            ),
        SkillKind::Merge =>
            document(
                content,
                json!({
                "mergedText": format!("{} [OCR extracted text from embedded images would be merged here]", text)
            })
            ),
        SkillKind::Shaper =>
            document(
                content,
                json!({
                "shapedOutput": {
                    "documentInfo": {
                        "title": "Azure AI Search Overview",
                        "content": head(text, 100),
                        "metadata": {
                            "wordCount": text.split_whitespace().count(),
                            "charCount": text.chars().count()
                        }
                    }
                }
            })
            ),
        SkillKind::Conditional => {
            let output = if text.chars().count() > 100 {
                text.to_string()
            } else {
                "[Content too short - default value applied]".to_string()
            };
            document(content, json!({ "conditionalOutput": output }))
        }
        SkillKind::Ocr => document(image_content(), json!({ "text": OCR_TEXT, "layoutText": OCR_LAYOUT_TEXT })),
        SkillKind::ImageAnalysis =>
            document(
                image_content(),
                json!({
                "tags": [
                    { "name": "building", "confidence": 0.99 },
                    { "name": "skyscraper", "confidence": 0.98 },
                    { "name": "city", "confidence": 0.97 },
                    { "name": "architecture", "confidence": 0.95 },
                    { "name": "outdoor", "confidence": 0.94 },
                    { "name": "tower", "confidence": 0.92 },
                    { "name": "sky", "confidence": 0.88 },
                    { "name": "urban", "confidence": 0.85 }
                ],
                "description": {
                    "tags": ["building", "skyscraper", "city", "architecture", "outdoor"],
                    "captions": [{ "text": "an aerial view of the Empire State Building in New York City", "confidence": 0.94 }]
                },
                "categories": [
                    { "name": "building_", "score": 0.95 },
                    { "name": "outdoor_", "score": 0.75 }
                ],
                "imageType": { "clipArtType": 0, "lineDrawingType": 0 },
                "color": {
                    "dominantColorForeground": "Grey",
                    "dominantColorBackground": "Blue",
                    "dominantColors": ["Grey", "Blue", "White"],
                    "accentColor": "8C7B6E",
                    "isBwImg": false
                }
            })
            ),
        SkillKind::VisionVectorize =>
            document(
                image_content(),
                json!({
                "imageVector": [
                    0.0123, -0.0456, 0.0789, -0.0234, 0.0567, -0.0891, 0.0345, -0.0678,
                    0.0912, -0.0147, 0.0258, -0.0369, 0.0471, -0.0582, 0.0693, -0.0804,
                    "...(1024 dimensions total - Azure AI Vision 4.0 multimodal embeddings)"
                ]
            })
            ),
        SkillKind::DocumentExtraction =>
            document(
                document_content(),
                json!({
                "extractedContent": EXTRACTED_INVOICE,
                "normalized_images": [
                    {
                        "imageStoreUri": "/document-extraction/normalized/img_001.png",
                        "width": 2200,
                        "height": 1700,
                        "originalWidth": 2200,
                        "originalHeight": 1700,
                        "rotationFromOriginal": 0,
                        "contentOffset": 0,
                        "pageNumber": 1
                    }
                ]
            })
            ),
        SkillKind::DocumentIntelligenceLayout =>
            document(document_content(), json!({ "markdown_document": INVOICE_MARKDOWN })),
        SkillKind::AzureOpenAIEmbedding =>
            document(
                content,
                json!({
                "contentVector": [-0.006929, -0.005336, 0.004547, -0.027633, 0.025471, "...(1536 dimensions total)"]
            })
            ),
    }
}

const OCR_TEXT: &str =
    "CONTOSO LTD.
INVOICE

Invoice Number: INV-100
Invoice Date: November 15, 2019
Invoice Due Date: December 15, 2019
Charges: $110.00
VAT ID: GB123456789

From:
Contoso Consulting Ltd
123 456th St
New York, NY 10001

To:
Microsoft Finance Department
1020 Enterprise Way
Sunnyville, CA 87659

Service Period: 11/4/2019 - 11/15/2019
Consultant: John Smith
Total Hours: 10 @ $10.00/hr = $100.00
Amount Due: $110.00

Thank you for your business.";

const OCR_LAYOUT_TEXT: &str =
    "CONTOSO LTD.                                    INVOICE

Invoice Number: INV-100           Invoice Date: November 15, 2019
                                  Invoice Due Date: December 15, 2019
Charges: $110.00                  VAT ID: GB123456789

From:                             To:
Contoso Consulting Ltd            Microsoft Finance Department
123 456th St                      1020 Enterprise Way
New York, NY 10001                Sunnyville, CA 87659

-----------------------------------------------------------------
Service Period        Consultant       Hours    Rate     Amount
11/4/2019-11/15/2019  John Smith       10       $10.00   $100.00
-----------------------------------------------------------------
                                        Amount Due:      $110.00";

const EXTRACTED_INVOICE: &str =
    "CONTOSO LTD.
INVOICE

Invoice Number: INV-100
Invoice Date: November 15, 2019
Invoice Due Date: December 15, 2019

From: Contoso Consulting Ltd, 123 456th St, New York, NY 10001
To: Microsoft Finance Department, 1020 Enterprise Way, Sunnyville, CA 87659

Service Period: 11/4/2019 - 11/15/2019
Consultant: John Smith
Total Hours: 10
Rate: $10.00/hr
Amount Due: $110.00";

const INVOICE_MARKDOWN: &str =
    "# CONTOSO LTD.

## INVOICE

| Field | Value |
|-------|-------|
| Invoice Number | INV-100 |
| Invoice Date | November 15, 2019 |
| Invoice Due Date | December 15, 2019 |
| Charges | $110.00 |
| VAT ID | GB123456789 |

### From:
**Contoso Consulting Ltd**
123 456th St
New York, NY 10001

### To:
**Microsoft Finance Department**
1020 Enterprise Way
Sunnyville, CA 87659

### Service Details

| Period | Consultant | Hours | Rate | Amount |
|--------|-----------|-------|------|--------|
| 11/4/2019 - 11/15/2019 | John Smith | 10 | $10.00/hr | $100.00 |

**Amount Due: $110.00**

---
*Thank you for your business.*";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_previews_all_declared_outputs() {
        for kind in SkillKind::ALL {
            let result = preview(kind.name(), None);
            assert_eq!(result.skill_definition["@odata.type"], kind.odata_type());
            let document = result.index_document.as_object().unwrap();
            assert_eq!(document["id"], "doc_001");
            assert!(document.contains_key("content"));
            for field in declared_outputs(kind) {
                assert!(document.contains_key(*field), "{} missing {}", kind, field);
            }
            let declared = result.skill_definition["outputs"].as_array().unwrap();
            assert_eq!(declared.len(), declared_outputs(kind).len());
        }
    }

    #[test]
    fn unknown_skill_falls_back_to_placeholder() {
        let result = preview("HologramSkill", Some("hello"));
        assert_eq!(result.skill_definition["@odata.type"], "Unknown");
        assert_eq!(result.index_document["output"], "[Skill output would appear here]");
        assert_eq!(result.index_document["content"], "hello");
        assert_eq!(result.sample_input["data"]["text"], "hello");
    }

    #[test]
    fn image_skills_describe_the_image_input() {
        let result = preview("OcrSkill", None);
        assert_eq!(result.sample_input["data"]["imageUrl"], "samples/invoice.jpg");
        assert_eq!(result.index_document["content"], "[Image: invoice.jpg]");

        let local = preview("ImageAnalysisSkill", Some("C:\\images\\tower.png"));
        assert_eq!(local.sample_input["data"]["imageUrl"], "file:///C:/images/tower.png");
    }

    #[test]
    fn long_inputs_are_shortened_for_display() {
        let text = "word ".repeat(200);
        let result = preview("KeyPhraseExtractionSkill", Some(&text));
        let shown = result.sample_input["data"]["text"].as_str().unwrap();
        assert_eq!(shown.chars().count(), SAMPLE_INPUT_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(result.index_document["content"].as_str().unwrap().chars().count(), CONTENT_PREVIEW_CHARS);
    }

    #[test]
    fn shaper_counts_words_and_conditional_checks_length() {
        let shaped = preview("ShaperSkill", Some("three small words"));
        assert_eq!(shaped.index_document["shapedOutput"]["documentInfo"]["metadata"]["wordCount"], 3);
        let conditional = preview("ConditionalSkill", Some("short"));
        assert_eq!(conditional.index_document["conditionalOutput"], "[Content too short - default value applied]");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(preview("SentimentSkill", None)).unwrap();
        assert!(value.get("skillDefinition").is_some());
        assert!(value.get("sampleInput").is_some());
        assert_eq!(value["indexDocument"]["sentiment"], "positive");
    }
}
