use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{BoxError, Error, Result};

/// The link-local address the instance metadata service is served from
pub const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";

/// Upper bound for each request to the metadata service
///
/// Fixed so that no external configuration can make resolution hang
pub const TIMEOUT: Duration = Duration::from_secs(1);

const TOKEN_PATH: &str = "/latest/api/token";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_TTL_SECONDS: &str = "21600";
const INSTANCE_ID_PATH: &str = "/latest/meta-data/instance-id";
const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";

/// Facts about the instance the process runs on
#[async_trait]
pub trait MetadataService: Send + Sync {
  /// Whether the metadata service can be reached at all; never fails
  async fn available(&self) -> bool;

  /// The region the instance was launched in
  async fn region(&self) -> std::result::Result<String, BoxError>;
}

/// Subset of the instance identity document
///
/// https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instance-identity-documents.html
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDocument {
  #[serde(default)]
  region: String,
}

/// EC2 instance metadata service
///
/// Every request first asks for an IMDSv2 session token. When the token request is refused
/// with 403, 404 or 405 the request is sent without a token (IMDSv1). Any other failure of the
/// token request fails the metadata request.
#[derive(Clone, Debug)]
pub struct Ec2Metadata {
  client: reqwest::Client,
  endpoint: Url,
}

impl Ec2Metadata {
  /// Build a client for the metadata service
  ///
  /// `endpoint` replaces [`DEFAULT_ENDPOINT`]. Proxies are bypassed and the endpoint is never
  /// read from the environment, so only the caller can redirect the client.
  pub fn new(endpoint: Option<&str>) -> Result<Self> {
    let endpoint = endpoint.unwrap_or(DEFAULT_ENDPOINT);
    let url = Url::parse(endpoint).map_err(|source| Error::InvalidEndpoint {
      endpoint: endpoint.to_string(),
      source: source.into(),
    })?;

    let client = reqwest::Client::builder()
      .connect_timeout(TIMEOUT)
      .timeout(TIMEOUT)
      .no_proxy()
      .build()
      .map_err(|source| Error::Client(source.into()))?;

    Ok(Self { client, endpoint: url })
  }

  fn url(&self, path: &str) -> std::result::Result<Url, BoxError> {
    Ok(self.endpoint.join(path)?)
  }

  /// Fetch a session token, `None` when the service only speaks IMDSv1
  async fn token(&self) -> std::result::Result<Option<String>, BoxError> {
    let response = self
      .client
      .put(self.url(TOKEN_PATH)?)
      .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS)
      .send()
      .await?;

    match response.status() {
      status if status.is_success() => Ok(Some(response.text().await?)),
      StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => {
        debug!("Metadata token request refused with {}, using IMDSv1", response.status());
        Ok(None)
      }
      status => Err(format!("unexpected status {status} requesting metadata token").into()),
    }
  }

  async fn get(&self, path: &str) -> std::result::Result<String, BoxError> {
    let token = self.token().await?;

    let mut request = self.client.get(self.url(path)?);
    if let Some(token) = token {
      request = request.header(TOKEN_HEADER, token);
    }

    let response = request.send().await?.error_for_status()?;
    Ok(response.text().await?)
  }
}

#[async_trait]
impl MetadataService for Ec2Metadata {
  async fn available(&self) -> bool {
    match self.get(INSTANCE_ID_PATH).await {
      Ok(_) => true,
      Err(err) => {
        debug!("Instance metadata service is not available: {err}");
        false
      }
    }
  }

  async fn region(&self) -> std::result::Result<String, BoxError> {
    let document = self.get(IDENTITY_DOCUMENT_PATH).await?;
    parse_region(&document)
  }
}

fn parse_region(document: &str) -> std::result::Result<String, BoxError> {
  let document: IdentityDocument = serde_json::from_str(document)?;

  if document.region.is_empty() {
    return Err("invalid region received for instance metadata".into());
  }

  Ok(document.region)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn it_parses_identity_document_region() {
    let document = r#"{
      "accountId": "123456789012",
      "architecture": "x86_64",
      "availabilityZone": "eu-west-1b",
      "imageId": "ami-0123456789abcdef0",
      "instanceId": "i-0123456789abcdef0",
      "instanceType": "m5.large",
      "region": "eu-west-1"
    }"#;

    assert_eq!(parse_region(document).unwrap(), "eu-west-1");
  }

  #[test]
  fn it_rejects_missing_region() {
    let err = parse_region(r#"{"instanceId": "i-0123456789abcdef0"}"#).unwrap_err();

    assert_eq!(err.to_string(), "invalid region received for instance metadata");
  }

  #[test]
  fn it_rejects_malformed_document() {
    assert!(parse_region("<html>not found</html>").is_err());
  }

  #[test]
  fn it_rejects_invalid_endpoint() {
    let err = Ec2Metadata::new(Some("not a uri")).unwrap_err();

    assert!(matches!(err, Error::InvalidEndpoint { .. }));
  }

  #[test]
  fn it_joins_paths_onto_the_endpoint() {
    let metadata = Ec2Metadata::new(Some("http://127.0.0.1:1338")).unwrap();

    assert_eq!(
      metadata.url(IDENTITY_DOCUMENT_PATH).unwrap().as_str(),
      "http://127.0.0.1:1338/latest/dynamic/instance-identity/document"
    );
    assert_eq!(
      Ec2Metadata::new(None).unwrap().url(TOKEN_PATH).unwrap().as_str(),
      "http://169.254.169.254/latest/api/token"
    );
  }
}
