use std::sync::Arc;

use log::{ info, warn };
use serde::Serialize;
use serde_json::{ json, Value };

use crate::error::{ HarnessError, Result, ServiceError };
use crate::schema::{ IndexSchema, CONTENT_FIELD, ID_FIELD };
use crate::service::{ ResourceKind, SearchService };
use crate::skills::SkillTestDescriptor;

/// Whether an `ensure_*` call created the resource or found it already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyExists,
}

/// One entry of the indexer's `outputFieldMappings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFieldMapping {
    pub source_field_name: String,
    pub target_field_name: String,
}

/// Maps every skill output onto its generic index field.
pub fn output_field_mappings(descriptor: &SkillTestDescriptor) -> Vec<OutputFieldMapping> {
    descriptor.output_mappings
        .iter()
        .map(|mapping| OutputFieldMapping {
            source_field_name: mapping.source_path(),
            target_field_name: mapping.target.field_name().to_string(),
        })
        .collect()
}

/// Everything the indexer definition is built from.
#[derive(Debug, Clone)]
pub struct IndexerPlan {
    pub name: String,
    pub data_source_name: String,
    pub skillset_name: String,
    pub index_name: String,
    pub output_field_mappings: Vec<OutputFieldMapping>,
    pub needs_image_processing: bool,
    pub needs_file_data: bool,
}

impl IndexerPlan {
    pub fn to_definition(&self) -> Value {
        let mut parameters =
            json!({
            "batchSize": 1,
            "maxFailedItems": -1,
            "maxFailedItemsPerBatch": -1
        });

        let mut configuration = serde_json::Map::new();
        if self.needs_image_processing {
            configuration.insert("dataToExtract".to_string(), json!("contentAndMetadata"));
            configuration.insert("imageAction".to_string(), json!("generateNormalizedImages"));
        }
        if self.needs_file_data {
            configuration.insert("allowSkillsetToReadFileData".to_string(), json!(true));
        }
        if !configuration.is_empty() {
            parameters["configuration"] = Value::Object(configuration);
        }

        json!({
            "name": self.name,
            "dataSourceName": self.data_source_name,
            "skillsetName": self.skillset_name,
            "targetIndexName": self.index_name,
            "fieldMappings": [
                {
                    "sourceFieldName": "metadata_storage_path",
                    "targetFieldName": ID_FIELD,
                    "mappingFunction": { "name": "base64Encode" }
                },
                { "sourceFieldName": "content", "targetFieldName": CONTENT_FIELD }
            ],
            "outputFieldMappings": self.output_field_mappings,
            "parameters": parameters
        })
    }
}

/// Creates-or-reuses the four search-service resources of a skill run. Each operation
/// checks for an existing resource of the same name first and leaves it untouched.
pub struct Provisioner {
    service: Arc<dyn SearchService>,
}

impl Provisioner {
    pub fn new(service: Arc<dyn SearchService>) -> Self {
        Self { service }
    }

    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool> {
        self.service
            .get_resource(kind, name).await
            .map(|found| found.is_some())
            .map_err(|source| HarnessError::Provisioning { kind, name: name.to_string(), source })
    }

    async fn create(&self, kind: ResourceKind, name: &str, definition: &Value) -> Result<()> {
        self.service
            .create_or_update(kind, name, definition).await
            .map_err(|source| HarnessError::Provisioning { kind, name: name.to_string(), source })
    }

    /// `folder` limits the data source to one virtual directory of the container.
    pub async fn ensure_data_source(
        &self,
        name: &str,
        connection_string: &str,
        container_name: &str,
        folder: Option<&str>
    ) -> Result<Provisioned> {
        if self.exists(ResourceKind::DataSource, name).await? {
            info!("Data source {} already exists. Skipping creation.", name);
            return Ok(Provisioned::AlreadyExists);
        }
        let mut container = json!({ "name": container_name });
        if let Some(folder) = folder {
            container["query"] = json!(folder);
        }
        let definition =
            json!({
            "name": name,
            "type": "azureblob",
            "credentials": { "connectionString": connection_string },
            "container": container
        });
        self.create(ResourceKind::DataSource, name, &definition).await?;
        Ok(Provisioned::Created)
    }

    pub async fn ensure_skillset(
        &self,
        name: &str,
        skills: &[Value],
        cognitive_key: &str
    ) -> Result<Provisioned> {
        if self.exists(ResourceKind::Skillset, name).await? {
            info!("Skillset {} already exists. Skipping creation.", name);
            return Ok(Provisioned::AlreadyExists);
        }
        let definition =
            json!({
            "name": name,
            "description": "Skillset for testing",
            "skills": skills,
            "cognitiveServices": {
                "@odata.type": "#Microsoft.Azure.Search.CognitiveServicesByKey",
                "key": cognitive_key
            }
        });
        self.create(ResourceKind::Skillset, name, &definition).await?;
        Ok(Provisioned::Created)
    }

    pub async fn ensure_index(
        &self,
        name: &str,
        needs_vector: bool,
        vector_dimensions: Option<usize>
    ) -> Result<Provisioned> {
        if self.exists(ResourceKind::Index, name).await? {
            info!("Index {} already exists. Skipping creation.", name);
            return Ok(Provisioned::AlreadyExists);
        }
        let dimensions = match (needs_vector, vector_dimensions) {
            (true, Some(dims)) if dims > 0 => Some(dims),
            (true, _) => {
                return Err(HarnessError::Input(
                    format!("index {} needs a vector field but no positive dimension count was given", name)
                ));
            }
            (false, Some(_)) => {
                warn!("Ignoring vector dimensions for non-vector index {}", name);
                None
            }
            (false, None) => None,
        };
        let schema = IndexSchema::for_run(name, dimensions);
        info!(
            "Creating index: {} with fields: {:?}",
            name,
            schema.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>()
        );
        self.create(ResourceKind::Index, name, &schema.to_definition()).await?;
        Ok(Provisioned::Created)
    }

    /// Creates the indexer and triggers a run. An existing indexer is left alone and not
    /// re-run. The service starts a new indexer on creation, so a 409 from the explicit run
    /// means that first run is still going and is not an error.
    pub async fn ensure_and_run_indexer(&self, plan: &IndexerPlan) -> Result<Provisioned> {
        if self.exists(ResourceKind::Indexer, &plan.name).await? {
            info!("Indexer {} already exists. Skipping creation.", plan.name);
            return Ok(Provisioned::AlreadyExists);
        }
        self.create(ResourceKind::Indexer, &plan.name, &plan.to_definition()).await?;
        match self.service.run_indexer(&plan.name).await {
            Ok(()) => {}
            Err(ServiceError::Status { status: 409, .. }) => {
                warn!("Indexer {} is already running from its creation; not starting it again", plan.name);
            }
            Err(source) => {
                return Err(HarnessError::Provisioning {
                    kind: ResourceKind::Indexer,
                    name: plan.name.clone(),
                    source,
                });
            }
        }
        Ok(Provisioned::Created)
    }
}
