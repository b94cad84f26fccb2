use futures::TryStreamExt;
use log::{ debug, info };

use crate::error::Result;
use crate::service::{ Document, SearchQuery, SearchService };

/// Keys starting with this prefix are protocol metadata (`@search.score` and friends).
pub const METADATA_PREFIX: char = '@';

/// Drops protocol metadata keys, keeping the rest in arrival order.
pub fn strip_metadata(document: Document) -> Document {
    document
        .into_iter()
        .filter(|(key, _)| !key.starts_with(METADATA_PREFIX))
        .collect()
}

/// Runs a match-all query against the index and returns every hit without metadata keys.
pub async fn fetch(service: &dyn SearchService, index_name: &str) -> Result<Vec<Document>> {
    debug!("Fetching all documents from index {}", index_name);
    let documents: Vec<Document> = service
        .search(index_name, SearchQuery::match_all())
        .map_ok(strip_metadata)
        .try_collect().await?;
    info!("Fetched {} documents from index {}", documents.len(), index_name);
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_only_metadata_keys_and_keeps_order() {
        let raw = json!({
            "@search.score": 1.0,
            "id": "aHR0cHM6Ly9h0",
            "content": "Hello",
            "@search.highlights": null,
            "content_output": "en"
        });
        let document = strip_metadata(raw.as_object().unwrap().clone());
        assert_eq!(document.keys().collect::<Vec<_>>(), vec!["id", "content", "content_output"]);
    }
}
