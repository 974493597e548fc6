pub mod cli;
pub mod error;
pub mod imds;
pub mod resolver;
pub mod session;

pub use cli::{Cli, Output};
pub use error::{BoxError, Error, Result};
pub use resolver::{RegionResolver, RegionResolverBuilder, RegionSource, Resolution};

/// Region used when nothing else provides one
///
/// `us-east-1` is where AWS first provides support for new features
pub const DEFAULT_REGION: &str = "us-east-1";

/// Get the region to use with AWS clients
///
/// Resolves against the real environment, shared config and instance metadata service.
/// See [`RegionResolver`] for the precedence order.
pub async fn get_region(configured: Option<&str>) -> Result<String> {
  RegionResolver::new()?.resolve(configured).await
}
