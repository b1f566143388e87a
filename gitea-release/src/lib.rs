//! A library for publishing releases to a self-hosted Gitea or Forgejo instance.
//!
//! Given a build context (tag, commit, version, and a template for the release name), it makes
//! sure a release exists for the tag, creating it or updating the existing one, and then uploads
//! built artifacts to it as release attachments.
//!
//! This project also ships a CLI tool named `gitea-release` that wraps this library.
//!
//! The main entry point for programmatic use is the [`GiteaBuilder`] struct. Here is an example of
//! its usage:
//!
//! ```ignore
//! use gitea_release::{Artifact, GiteaBuilder, ReleaseClient, ReleaseContextBuilder};
//! use std::fs::File;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gitea = GiteaBuilder::new()
//!         .api_base_url("https://gitea.example.com/api/v1")
//!         .build()?;
//!     let ctx = ReleaseContextBuilder::new()
//!         .project_name("precious")
//!         .name_template("{{ .ProjectName }} {{ .Version }}")
//!         .owner("houseabsolute")
//!         .repo("precious")
//!         .tag("v0.7.2")
//!         .commit("8b4a1c1d9c2fbd1f4f7c0e7d2e0b8a1b0c9d8e7f")
//!         .build()?;
//!
//!     let id = gitea.ensure_release(&ctx, "Bug fixes.").await?;
//!     let mut file = File::open("precious-Linux-x86_64.tar.gz")?;
//!     gitea
//!         .upload(&ctx, &id, &Artifact::new("precious-Linux-x86_64.tar.gz"), &mut file)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Release Names
//!
//! The release title is rendered from the context's name template with
//! [Handlebars](https://handlebarsjs.com/). The template can use these fields:
//!
//! - `ProjectName`
//! - `Version`
//! - `Tag`
//! - `Commit`
//! - `ShortCommit`
//! - `Owner`
//! - `Repo`
//! - `Draft`
//! - `Prerelease`
//! - `Env.<NAME>` for any entry added with [`ReleaseContextBuilder::env`]
//!
//! A field may be written with a leading dot, as in `{{ .Version }}`. Using a field that doesn't
//! exist is an error.
//!
//! ## Creating vs. Updating
//!
//! A release "exists" if the repo has a release with exactly the same tag name. When it does, its
//! title, notes, target commit, and draft and prerelease flags are all replaced with values from the
//! current context. Nothing is merged with the existing release.
//!
//! Looking up the release and then creating it are two separate requests. If something else
//! creates a release for the same tag in between, you may end up with two releases for that tag.
//!
//! ## Features
//!
//! This crate offers several features to control the TLS dependency used by `reqwest`:
//!
#![doc = document_features::document_features!()]

mod builder;
mod client;
mod context;
mod error;
mod gitea;
mod instance;
mod release;
mod template;

pub use crate::{
    builder::GiteaBuilder,
    client::ReleaseClient,
    context::{Artifact, ReleaseContext, ReleaseContextBuilder},
    error::ReleaseError,
    gitea::Gitea,
    instance::instance_url,
    release::{Attachment, Release},
};

// The version of the `gitea-release` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "logging")]
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};

/// This function initializes logging for the application. It's public for the sake of the
/// `gitea-release` binary, but it lives in the library crate so that test code can also enable
/// logging.
///
/// # Errors
///
/// This can return a `log::SetLoggerError` error.
#[cfg(feature = "logging")]
pub fn init_logger(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    let line_colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::BrightBlack)
        .debug(Color::BrightBlack)
        .trace(Color::BrightBlack);
    let level_colors = line_colors.info(Color::Green).debug(Color::Black);

    Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{color_line}[{target}][{level}{color_line}] {message}\x1B[0m",
                color_line = format_args!(
                    "\x1B[{}m",
                    line_colors.get_color(&record.level()).to_fg_str()
                ),
                target = record.target(),
                level = level_colors.color(record.level()),
                message = message,
            ));
        })
        .level(level)
        // This is very noisy.
        .level_for("hyper", log::LevelFilter::Error)
        .level_for("hyper_util", log::LevelFilter::Error)
        .chain(std::io::stderr())
        .apply()
}
