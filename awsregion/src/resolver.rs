use std::{fmt, sync::Arc};

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
  error::{Error, Result},
  imds::{Ec2Metadata, MetadataService},
  session::{SessionProvider, SharedConfigSession},
  DEFAULT_REGION,
};

/// Where a resolved region came from
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionSource {
  /// Supplied by the caller
  Configured,
  /// Environment variables or the shared config file
  SharedConfig,
  /// The instance metadata service
  InstanceMetadata,
  /// [`DEFAULT_REGION`]
  Default,
}

impl fmt::Display for RegionSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let source = match self {
      RegionSource::Configured => "configured",
      RegionSource::SharedConfig => "shared-config",
      RegionSource::InstanceMetadata => "instance-metadata",
      RegionSource::Default => "default",
    };
    f.write_str(source)
  }
}

/// A resolved region and the source that provided it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
  pub region: String,
  pub source: RegionSource,
}

impl Resolution {
  fn new(region: impl Into<String>, source: RegionSource) -> Self {
    Self {
      region: region.into(),
      source,
    }
  }
}

/// Resolves the region a process should use
///
/// More specific sources take precedence over less specific ones:
///
/// 1. The region supplied by the caller, meant for this invocation only
/// 2. Environment variables and the shared config file, shared by a user's invocations
/// 3. Instance metadata, shared by every invocation on the machine
/// 4. [`DEFAULT_REGION`]
///
/// Nothing is cached; every call walks the sources again.
#[derive(Clone)]
pub struct RegionResolver {
  session: Arc<dyn SessionProvider>,
  metadata: Arc<dyn MetadataService>,
}

impl fmt::Debug for RegionResolver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RegionResolver").finish_non_exhaustive()
  }
}

impl RegionResolver {
  /// Resolver reading the real environment, shared config and instance metadata service
  pub fn new() -> Result<Self> {
    Self::builder().build()
  }

  pub fn builder() -> RegionResolverBuilder {
    RegionResolverBuilder::default()
  }

  /// Resolve the region, returning only the region
  pub async fn resolve(&self, configured: Option<&str>) -> Result<String> {
    Ok(self.resolve_with_source(configured).await?.region)
  }

  /// Resolve the region along with the source that provided it
  ///
  /// An empty `configured` region is treated as not provided.
  pub async fn resolve_with_source(&self, configured: Option<&str>) -> Result<Resolution> {
    if let Some(region) = configured.filter(|r| !r.is_empty()) {
      debug!("Using configured region {region}");
      return Ok(Resolution::new(region, RegionSource::Configured));
    }

    let session = self.session.new_session().await.map_err(Error::Session)?;
    if let Some(region) = session.region() {
      debug!("Using region {region} from shared config");
      return Ok(Resolution::new(region, RegionSource::SharedConfig));
    }

    // Unreachable metadata is expected off EC2; only a failed query after a successful probe is an error
    if !self.metadata.available().await {
      warn!("No region configured and instance metadata is unavailable, defaulting to {DEFAULT_REGION}");
      return Ok(Resolution::new(DEFAULT_REGION, RegionSource::Default));
    }

    let region = self.metadata.region().await.map_err(Error::MetadataQuery)?;
    debug!("Using region {region} from instance metadata");

    Ok(Resolution::new(region, RegionSource::InstanceMetadata))
  }
}

/// Builder for [`RegionResolver`]
#[derive(Default)]
pub struct RegionResolverBuilder {
  session: Option<Arc<dyn SessionProvider>>,
  metadata: Option<Arc<dyn MetadataService>>,
  metadata_endpoint: Option<String>,
}

impl RegionResolverBuilder {
  /// Replace the environment and shared config session
  pub fn session(mut self, session: impl SessionProvider + 'static) -> Self {
    self.session = Some(Arc::new(session));
    self
  }

  /// Replace the instance metadata service
  ///
  /// Takes precedence over [`metadata_endpoint`](Self::metadata_endpoint).
  pub fn metadata(mut self, metadata: impl MetadataService + 'static) -> Self {
    self.metadata = Some(Arc::new(metadata));
    self
  }

  /// Point the instance metadata client at another endpoint, such as a local stub server
  pub fn metadata_endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.metadata_endpoint = Some(endpoint.into());
    self
  }

  pub fn build(self) -> Result<RegionResolver> {
    let session = match self.session {
      Some(session) => session,
      None => Arc::new(SharedConfigSession::new()),
    };
    let metadata = match self.metadata {
      Some(metadata) => metadata,
      None => Arc::new(Ec2Metadata::new(self.metadata_endpoint.as_deref())?),
    };

    Ok(RegionResolver { session, metadata })
  }
}
