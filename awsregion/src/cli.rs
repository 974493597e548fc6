use anyhow::Result;
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::Verbosity;

use crate::RegionResolver;

/// Styles for CLI
fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .literal(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::BrightCyan))),
    )
    .usage(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Output {
  /// The region only
  #[default]
  Text,
  /// The region and the source it was resolved from
  Json,
}

/// Resolve the AWS region to use
///
/// Checks, in order: `--region`, the `AWS_REGION` and `AWS_DEFAULT_REGION` environment variables,
/// the shared config file, the EC2 instance metadata service. Falls back to `us-east-1`.
#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(styles=get_styles())]
pub struct Cli {
  /// Region to use, taking precedence over every other source
  #[arg(short, long)]
  pub region: Option<String>,

  /// Output format
  #[arg(short, long, value_enum, default_value_t)]
  pub output: Output,

  /// Disable colored log output
  #[arg(long)]
  pub no_color: bool,

  #[clap(flatten)]
  pub verbose: Verbosity,
}

impl Cli {
  pub async fn resolve(&self) -> Result<()> {
    let resolution = RegionResolver::new()?
      .resolve_with_source(self.region.as_deref())
      .await?;

    match self.output {
      Output::Text => println!("{}", resolution.region),
      Output::Json => println!("{}", serde_json::to_string(&resolution)?),
    }

    Ok(())
  }
}
