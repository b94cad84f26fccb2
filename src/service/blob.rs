use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD, Engine as _ };
use chrono::Utc;
use hmac::{ Hmac, Mac };
use reqwest::{ Client, Method, StatusCode, Url };
use sha2::Sha256;
use std::time::Duration;
use log::{ debug, info, error };

use super::BlobStore;
use crate::error::ServiceError;

const STORAGE_API_VERSION: &str = "2021-08-06";

pub struct AzureBlobStore {
    client: Client,
    endpoint: String,
    account_name: String,
    account_key: Vec<u8>,
    raw_account_key: String,
    container: String,
}

impl AzureBlobStore {
    pub fn new(
        endpoint: &str,
        account_name: &str,
        account_key: &str,
        container: &str
    ) -> Result<Self, ServiceError> {
        let decoded_key = STANDARD.decode(account_key.trim()).map_err(|e|
            ServiceError::Signing(format!("storage account key is not valid base64: {}", e))
        )?;
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        info!("Blob storage account '{}', container '{}'", account_name, container);

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            account_name: account_name.to_string(),
            account_key: decoded_key,
            raw_account_key: account_key.trim().to_string(),
            container: container.to_string(),
        })
    }

    /// Shared Key signature over the canonical request, see the Storage REST
    /// "Authorize with Shared Key" rules. Empty header slots stay empty lines.
    fn sign(
        &self,
        method: &Method,
        url: &Url,
        content_length: usize,
        content_type: &str,
        ms_headers: &[(&str, String)]
    ) -> Result<String, ServiceError> {
        let mut canonical_headers: Vec<(String, &str)> = ms_headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim()))
            .collect();
        canonical_headers.sort_by(|a, b| a.0.cmp(&b.0));

        let mut canonical_resource = format!("/{}{}", self.account_name, url.path());
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
            .collect();
        params.sort();
        for (k, v) in params {
            canonical_resource.push_str(&format!("\n{}:{}", k, v));
        }

        let length = if content_length == 0 { String::new() } else { content_length.to_string() };
        let mut string_to_sign = format!(
            "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n",
            method.as_str(),
            length,
            content_type
        );
        for (k, v) in canonical_headers {
            string_to_sign.push_str(&format!("{}:{}\n", k, v));
        }
        string_to_sign.push_str(&canonical_resource);

        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&self.account_key)
            .map_err(|e| ServiceError::Signing(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());
        Ok(format!("SharedKey {}:{}", self.account_name, signature))
    }

    async fn send_signed(
        &self,
        method: Method,
        url: &str,
        body: Vec<u8>,
        content_type: &str,
        extra_headers: &[(&str, String)]
    ) -> Result<reqwest::Response, ServiceError> {
        let parsed = Url::parse(url).map_err(|e| ServiceError::Signing(e.to_string()))?;
        let mut ms_headers: Vec<(&str, String)> = vec![
            ("x-ms-date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()),
            ("x-ms-version", STORAGE_API_VERSION.to_string())
        ];
        ms_headers.extend(extra_headers.iter().cloned());

        let authorization = self.sign(&method, &parsed, body.len(), content_type, &ms_headers)?;

        let mut request = self.client
            .request(method, parsed)
            .header("Authorization", authorization);
        if !content_type.is_empty() {
            request = request.header("Content-Type", content_type);
        }
        for (k, v) in ms_headers {
            request = request.header(k, v);
        }
        Ok(request.body(body).send().await?)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn ensure_container(&self) -> Result<(), ServiceError> {
        let url = format!("{}/{}?restype=container", self.endpoint, self.container);
        let resp = self.send_signed(Method::PUT, &url, Vec::new(), "", &[]).await?;
        let status = resp.status();

        if status.is_success() {
            info!("Created blob container: {}", self.container);
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT && text.contains("ContainerAlreadyExists") {
            debug!("Blob container '{}' already exists.", self.container);
            return Ok(());
        }
        error!("Failed to create container '{}' ({}): {}", self.container, status, text);
        Err(ServiceError::status(format!("create container '{}'", self.container), status.as_u16(), text))
    }

    async fn upload(
        &self,
        blob_path: &str,
        content: Vec<u8>,
        content_type: &str
    ) -> Result<(), ServiceError> {
        let url = format!("{}/{}/{}", self.endpoint, self.container, blob_path);
        let size = content.len();
        let resp = self.send_signed(
            Method::PUT,
            &url,
            content,
            content_type,
            &[("x-ms-blob-type", "BlockBlob".to_string())]
        ).await?;
        let status = resp.status();

        if status.is_success() {
            info!("Uploaded {} bytes to blob: {}", size, blob_path);
            Ok(())
        } else {
            let text = resp.text().await.unwrap_or_default();
            error!("Blob upload to '{}' failed ({}): {}", blob_path, status, text);
            Err(ServiceError::status(format!("upload blob '{}'", blob_path), status.as_u16(), text))
        }
    }

    fn connection_string(&self) -> String {
        format!(
            "DefaultEndpointsProtocol=https;AccountName={};AccountKey={};EndpointSuffix=core.windows.net",
            self.account_name,
            self.raw_account_key
        )
    }

    fn container_name(&self) -> &str {
        &self.container
    }
}
