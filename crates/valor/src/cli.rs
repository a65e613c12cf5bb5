//! Command line handling for `valor-changes`.

use core::fmt;
use core::str::FromStr;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result, anyhow};
use change_tracker::TrackerConfig;
use log::info;

use crate::script::parse_script;
use crate::session::Session;

pub const USAGE: &str =
    "usage: valor-changes <page.html> <script.json> [--format=markdown|json|history]";

/// How the final report is printed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    /// The committed history entries as JSON.
    History,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "history" => Ok(Self::History),
            other => Err(anyhow!("unknown format {other:?}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::History => "history",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub page: PathBuf,
    pub script: PathBuf,
    pub format: OutputFormat,
}

impl Invocation {
    /// Parse arguments, program name excluded.
    ///
    /// # Errors
    /// Returns an error on unknown flags, a bad format or a wrong number of paths.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut format = OutputFormat::default();
        let mut paths: Vec<PathBuf> = Vec::new();
        for arg in args {
            if let Some(value) = arg.strip_prefix("--format=") {
                format = value.parse()?;
            } else if arg.starts_with("--") {
                return Err(anyhow!("unknown flag {arg:?}\n{USAGE}"));
            } else {
                paths.push(PathBuf::from(arg));
            }
        }
        match <[PathBuf; 2]>::try_from(paths) {
            Ok([page, script]) => Ok(Self {
                page,
                script,
                format,
            }),
            Err(_) => Err(anyhow!("expected a page and a script\n{USAGE}")),
        }
    }
}

/// Render the session's report in `format`.
pub fn render(session: &Session, format: OutputFormat) -> Result<String> {
    let document = &session.document;
    Ok(match format {
        OutputFormat::Markdown => session.tracker.changes_as_text(document),
        OutputFormat::Json => session.tracker.changes_as_json(document),
        OutputFormat::History => {
            serde_json::to_string_pretty(&session.tracker.history(document))?
        }
    })
}

/// Load the page, replay the script and render the report.
///
/// # Errors
/// Returns an error when a file cannot be read, the page or script does not
/// parse, or a step fails.
pub fn execute(invocation: &Invocation) -> Result<String> {
    let page = fs::read_to_string(&invocation.page)
        .with_context(|| format!("reading {}", invocation.page.display()))?;
    let script = fs::read_to_string(&invocation.script)
        .with_context(|| format!("reading {}", invocation.script.display()))?;
    let steps = parse_script(&script)
        .with_context(|| format!("parsing {}", invocation.script.display()))?;

    let mut session = Session::load(&page, TrackerConfig::from_env())?;
    session.run(&steps)?;
    info!("rendering {} report", invocation.format);
    render(&session, invocation.format)
}
