use anyhow::{Context, Error, Result};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use gitea_release::{
    Artifact, Gitea, GiteaBuilder, ReleaseClient, ReleaseContext, ReleaseContextBuilder,
};
use log::{error, info};
use std::{fs, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0:}")]
    InvalidArgsError(String),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cmd = cmd();
    let matches = cmd.get_matches();
    let res = init_logger_from_matches(&matches);
    if let Err(e) = res {
        eprintln!("Error creating logger: {e}");
        std::process::exit(126);
    }

    let status = match make_publisher(&matches) {
        Ok(p) => match p.publish().await {
            Ok(()) => 0,
            Err(e) => {
                print_err(&e);
                1
            }
        },
        Err(e) => {
            print_err(&e);
            127
        }
    };
    std::process::exit(status);
}

const MAX_TERM_WIDTH: usize = 100;

const REQUIRED_ARGS: &[&str] = &["api-base-url", "owner", "repo", "tag", "commit"];

#[allow(clippy::too_many_lines)]
fn cmd() -> Command {
    Command::new("gitea-release")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Dave Rolsky <autarch@urth.org>")
        .about("Create or update a release on a Gitea instance and upload artifacts to it")
        .arg(Arg::new("api-base-url").long("api-base-url").help(concat!(
            "The base URL for the instance's API, like `https://gitea.example.com/api/v1`.",
            " Only the scheme, host, and port are used.",
        )))
        .arg(
            Arg::new("token")
                .long("token")
                .help("The token to use for API requests. Defaults to the value of $GITEA_TOKEN."),
        )
        .arg(
            Arg::new("skip-tls-verify")
                .long("skip-tls-verify")
                .action(ArgAction::SetTrue)
                .help("Accept invalid TLS certificates from the instance."),
        )
        .arg(
            Arg::new("owner")
                .long("owner")
                .short('o')
                .help("The user or organization that owns the repo."),
        )
        .arg(
            Arg::new("repo")
                .long("repo")
                .short('r')
                .help("The name of the repo."),
        )
        .arg(
            Arg::new("tag")
                .long("tag")
                .short('t')
                .help("The tag to release."),
        )
        .arg(
            Arg::new("commit")
                .long("commit")
                .short('c')
                .help("The commit the tag points to."),
        )
        .arg(
            Arg::new("project-name")
                .long("project-name")
                .help("The name of the project. Defaults to the repo name."),
        )
        .arg(
            Arg::new("version-string")
                .long("version-string")
                .help("The version being released. Defaults to the tag without a leading `v`."),
        )
        .arg(
            Arg::new("name-template")
                .long("name-template")
                .short('n')
                .help(concat!(
                    "The template for the release's title, like",
                    " `{{ .ProjectName }} {{ .Version }}`. The available fields are ProjectName,",
                    " Version, Tag, Commit, ShortCommit, Owner, Repo, Draft, Prerelease, and",
                    " Env.<NAME> for any environment variable.",
                    " Defaults to `{{ Tag }}`.",
                )),
        )
        .arg(
            Arg::new("notes-file")
                .long("notes-file")
                .help("A file containing the release notes. Defaults to empty notes."),
        )
        .arg(
            Arg::new("draft")
                .long("draft")
                .action(ArgAction::SetTrue)
                .help("Mark the release as a draft."),
        )
        .arg(
            Arg::new("prerelease")
                .long("prerelease")
                .action(ArgAction::SetTrue)
                .help("Mark the release as a prerelease."),
        )
        .arg(
            Arg::new("artifacts")
                .action(ArgAction::Append)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Files to upload to the release. Each one is named after its file name."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output."),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debugging output."),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppresses most output."),
        )
        .group(ArgGroup::new("log-level").args(["verbose", "debug", "quiet"]))
        .max_term_width(MAX_TERM_WIDTH)
}

pub(crate) fn init_logger_from_matches(matches: &ArgMatches) -> Result<(), log::SetLoggerError> {
    let level = if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else if matches.get_flag("verbose") {
        log::LevelFilter::Info
    } else if matches.get_flag("quiet") {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Warn
    };

    gitea_release::init_logger(level)
}

#[derive(Debug)]
struct Publisher {
    gitea: Gitea,
    ctx: ReleaseContext,
    notes: String,
    artifacts: Vec<PathBuf>,
}

impl Publisher {
    async fn publish(&self) -> Result<()> {
        let id = self.gitea.ensure_release(&self.ctx, &self.notes).await?;
        info!("Release {id} is ready for tag `{}`", self.ctx.tag());

        for path in &self.artifacts {
            let name = path
                .file_name()
                .ok_or_else(|| {
                    CliError::InvalidArgsError(format!(
                        "The artifact path `{}` has no file name",
                        path.display()
                    ))
                })?
                .to_string_lossy()
                .into_owned();
            let mut file = fs::File::open(path)
                .with_context(|| format!("could not open `{}`", path.display()))?;

            self.gitea
                .upload(&self.ctx, &id, &Artifact::new(name.clone()), &mut file)
                .await?;
            info!(
                "Uploaded `{name}`, available at {}",
                self.gitea.download_url(&self.ctx, &name)?
            );
        }

        Ok(())
    }
}

fn make_publisher(matches: &ArgMatches) -> Result<Publisher> {
    validate_args(matches)?;

    let mut builder = GiteaBuilder::new();
    if let Some(u) = matches.get_one::<String>("api-base-url") {
        builder = builder.api_base_url(u);
    }
    if let Some(t) = matches.get_one::<String>("token") {
        builder = builder.token(t);
    }
    builder = builder.skip_tls_verify(matches.get_flag("skip-tls-verify"));
    let gitea = builder.build()?;

    Ok(Publisher {
        gitea,
        ctx: make_context(matches)?,
        notes: read_notes(matches)?,
        artifacts: matches
            .get_many::<PathBuf>("artifacts")
            .map(|a| a.cloned().collect())
            .unwrap_or_default(),
    })
}

fn make_context(matches: &ArgMatches) -> Result<ReleaseContext> {
    let mut builder = ReleaseContextBuilder::new()
        .draft(matches.get_flag("draft"))
        .prerelease(matches.get_flag("prerelease"));
    if let Some(o) = matches.get_one::<String>("owner") {
        builder = builder.owner(o);
    }
    if let Some(r) = matches.get_one::<String>("repo") {
        builder = builder.repo(r);
    }
    if let Some(t) = matches.get_one::<String>("tag") {
        builder = builder.tag(t);
    }
    if let Some(c) = matches.get_one::<String>("commit") {
        builder = builder.commit(c);
    }
    if let Some(p) = matches.get_one::<String>("project-name") {
        builder = builder.project_name(p);
    }
    if let Some(v) = matches.get_one::<String>("version-string") {
        builder = builder.version(v);
    }
    if let Some(t) = matches.get_one::<String>("name-template") {
        builder = builder.name_template(t);
    }
    // Variables that are not valid UTF-8 can't be used in a template, so they're skipped.
    for (k, v) in std::env::vars_os() {
        if let (Ok(k), Ok(v)) = (k.into_string(), v.into_string()) {
            builder = builder.env(k, v);
        }
    }

    builder.build()
}

fn read_notes(matches: &ArgMatches) -> Result<String> {
    let Some(path) = matches.get_one::<String>("notes-file") else {
        return Ok(String::new());
    };
    fs::read_to_string(path).with_context(|| format!("could not read notes from `{path}`"))
}

fn validate_args(matches: &ArgMatches) -> Result<()> {
    for a in REQUIRED_ARGS {
        if !matches.contains_id(a) {
            return Err(CliError::InvalidArgsError(format!("You must pass --{a}.")).into());
        }
    }

    Ok(())
}

fn print_err(e: &Error) {
    error!("{e}");
    if let Some(ce) = e.downcast_ref::<CliError>() {
        match ce {
            CliError::InvalidArgsError(_) => {
                println!();
                if let Err(e) = cmd().print_help() {
                    eprintln!("Error printing help: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const BASE_ARGS: &[&str] = &[
        "gitea-release",
        "--api-base-url",
        "https://gitea.example.com/api/v1",
        "--owner",
        "owner",
        "--repo",
        "repo",
        "--tag",
        "v1.2.3",
        "--commit",
        "0123456789abcdef",
    ];

    fn matches(extra: &[&str]) -> Result<ArgMatches> {
        let mut args = BASE_ARGS.to_vec();
        args.extend(extra);
        Ok(cmd().try_get_matches_from(args)?)
    }

    #[test]
    fn cmd_is_valid() {
        cmd().debug_assert();
    }

    #[rstest]
    #[case::api_base_url("api-base-url")]
    #[case::owner("owner")]
    #[case::repo("repo")]
    #[case::tag("tag")]
    #[case::commit("commit")]
    fn missing_required_arg(#[case] missing: &str) -> Result<()> {
        let flag = format!("--{missing}");
        let mut args = vec!["gitea-release"];
        for pair in BASE_ARGS[1..].chunks(2) {
            if pair[0] != flag {
                args.extend(pair);
            }
        }
        let matches = cmd().try_get_matches_from(args)?;

        let err = validate_args(&matches).unwrap_err();
        match err.downcast_ref::<CliError>() {
            Some(CliError::InvalidArgsError(msg)) => {
                assert_eq!(msg, &format!("You must pass {flag}."));
            }
            None => panic!("expected an invalid args error, got {err}"),
        }

        Ok(())
    }

    #[test]
    fn context_from_args() -> Result<()> {
        let m = matches(&[
            "--project-name",
            "project",
            "--name-template",
            "{{ .ProjectName }} {{ .Version }}",
            "--version-string",
            "1.2.3-final",
            "--draft",
        ])?;
        validate_args(&m)?;

        let ctx = make_context(&m)?;
        assert_eq!(ctx.owner(), "owner");
        assert_eq!(ctx.repo(), "repo");
        assert_eq!(ctx.tag(), "v1.2.3");
        assert_eq!(ctx.commit(), "0123456789abcdef");
        assert_eq!(ctx.version(), "1.2.3-final");
        assert_eq!(ctx.name_template(), "{{ .ProjectName }} {{ .Version }}");

        Ok(())
    }

    #[test]
    fn artifacts_from_args() -> Result<()> {
        let m = matches(&["a.tar.gz", "b.zip"])?;
        let p = make_publisher(&m)?;
        assert_eq!(
            p.artifacts,
            vec![PathBuf::from("a.tar.gz"), PathBuf::from("b.zip")]
        );
        assert_eq!(p.notes, "");
        Ok(())
    }

    #[test]
    fn notes_from_file() -> Result<()> {
        let td = tempfile::tempdir()?;
        let notes = td.path().join("notes.md");
        fs::write(&notes, "- Fixed a bug.\n")?;

        let m = matches(&["--notes-file", &notes.to_string_lossy()])?;
        assert_eq!(read_notes(&m)?, "- Fixed a bug.\n");

        let m = matches(&["--notes-file", "/no/such/notes.md"])?;
        assert!(read_notes(&m).is_err());

        Ok(())
    }
}
