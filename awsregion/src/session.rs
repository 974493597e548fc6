use async_trait::async_trait;
use aws_config::profile::{self, profile_file::ProfileFiles};
use aws_types::os_shim_internal::{Env, Fs};
use tracing::debug;

use crate::error::BoxError;

/// Environment variables read for the region, highest precedence first
const REGION_ENV_VARS: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];

/// Configuration merged from the environment and the local shared config file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
  region: Option<String>,
}

impl Session {
  /// An empty region is treated as absent; any other value is kept verbatim
  pub fn new(region: Option<String>) -> Self {
    Self {
      region: region.filter(|r| !r.is_empty()),
    }
  }

  /// The region this session carries, if any
  pub fn region(&self) -> Option<&str> {
    self.region.as_deref()
  }
}

/// Establishes a [`Session`]
///
/// Implementations decide how environment and shared config are layered; the resolver
/// only consumes the merged result.
#[async_trait]
pub trait SessionProvider: Send + Sync {
  async fn new_session(&self) -> Result<Session, BoxError>;
}

/// Session backed by the AWS SDK's shared configuration
///
/// Region precedence is `AWS_REGION`, then `AWS_DEFAULT_REGION`, then the `region` key of the
/// selected profile (`AWS_PROFILE` or `default`) in the shared config file (`AWS_CONFIG_FILE`
/// or `~/.aws/config`). A shared config file that exists but cannot be read or parsed fails
/// the session.
#[derive(Clone, Debug)]
pub struct SharedConfigSession {
  env: Env,
  fs: Fs,
}

impl Default for SharedConfigSession {
  fn default() -> Self {
    Self {
      env: Env::real(),
      fs: Fs::real(),
    }
  }
}

impl SharedConfigSession {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the process environment the session reads from
  pub fn with_env(mut self, env: Env) -> Self {
    self.env = env;
    self
  }

  /// Replace the filesystem the shared config files are read from
  pub fn with_fs(mut self, fs: Fs) -> Self {
    self.fs = fs;
    self
  }

  fn region_from_env(&self) -> Option<String> {
    REGION_ENV_VARS.iter().find_map(|key| {
      self
        .env
        .get(key)
        .ok()
        .filter(|value| !value.is_empty())
        .map(|value| {
          debug!("Region {value} found in {key}");
          value
        })
    })
  }
}

#[async_trait]
impl SessionProvider for SharedConfigSession {
  async fn new_session(&self) -> Result<Session, BoxError> {
    // Loaded even when the environment already names a region so a broken config file is reported
    let profiles = profile::load(&self.fs, &self.env, &ProfileFiles::default(), None).await?;

    let region = self.region_from_env().or_else(|| {
      let region = profiles.get("region").map(str::to_owned);
      if let Some(region) = &region {
        debug!("Region {region} found in shared config profile {}", profiles.selected_profile());
      }
      region
    });

    Ok(Session::new(region))
  }
}
