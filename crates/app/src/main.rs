use std::fmt;
use std::io::{self, BufRead, Read, Write};
use std::time::Duration;

use outline_core::model::{Outline, OutlineDraft, OutlineId, OutlineStatus, SectionDraft};
use outline_core::progress::{OutlineFilter, OutlineProgress, StatusFilter};
use services::{AppServices, Clock, ServiceConfig, apply_generated};
use storage::repository::OutlineSort;
use tracing_subscriber::EnvFilter;

mod present;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidTimeout { raw: String },
    InvalidOutlineId { raw: String },
    InvalidStatus { raw: String },
    InvalidSort { raw: String },
    InvalidSection { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeout { raw } => write!(f, "invalid --timeout value: {raw}"),
            ArgsError::InvalidOutlineId { raw } => write!(f, "invalid outline id: {raw}"),
            ArgsError::InvalidStatus { raw } => write!(f, "invalid --status value: {raw}"),
            ArgsError::InvalidSort { raw } => write!(f, "invalid --sort value: {raw}"),
            ArgsError::InvalidSection { raw } => write!(f, "invalid --section value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app list     [--status <draft|active|completed|all>] [--search <text>] [--sort <key>]");
    eprintln!("  app create   --title <text> [--description <text>] --section <title[:minutes]>...");
    eprintln!("  app generate --title <text> [--description <text>]   # article on stdin");
    eprintln!("  app present  <outline_id>");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --db <sqlite_url>     default sqlite://outlines.sqlite3");
    eprintln!("  --timeout <secs>      store call timeout, default 10");
    eprintln!();
    eprintln!("Sort keys: -created_date (default), created_date, -updated_date, title");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  OUTLINE_DB_URL, OUTLINE_STORE_TIMEOUT_SECS, RUST_LOG");
    eprintln!("  OUTLINE_AI_API_KEY, OUTLINE_AI_BASE_URL, OUTLINE_AI_MODEL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Create,
    Generate,
    Present,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "create" => Some(Self::Create),
            "generate" => Some(Self::Generate),
            "present" => Some(Self::Present),
            _ => None,
        }
    }
}

/// Flags shared by every subcommand.
struct Common {
    db_url: String,
    store_timeout: Duration,
}

impl Common {
    fn from_env() -> Result<Self, ArgsError> {
        let db_url = std::env::var("OUTLINE_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| "sqlite://outlines.sqlite3".into(), normalize_sqlite_url);
        let store_timeout = match std::env::var("OUTLINE_STORE_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(raw)?,
            Err(_) => services::session::DEFAULT_STORE_TIMEOUT,
        };
        Ok(Self {
            db_url,
            store_timeout,
        })
    }

    /// Consume `arg` if it is a common flag.
    fn try_parse(
        &mut self,
        arg: &str,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<bool, ArgsError> {
        match arg {
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                self.db_url = normalize_sqlite_url(value);
                Ok(true)
            }
            "--timeout" => {
                self.store_timeout = parse_timeout(require_value(args, "--timeout")?)?;
                Ok(true)
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => Ok(false),
        }
    }
}

fn parse_timeout(raw: String) -> Result<Duration, ArgsError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ArgsError::InvalidTimeout { raw }),
    }
}

struct ListArgs {
    filter: OutlineFilter,
    sort: OutlineSort,
}

impl ListArgs {
    fn parse(
        common: &mut Common,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut filter = OutlineFilter::default();
        let mut sort = OutlineSort::default();
        while let Some(arg) = args.next() {
            if common.try_parse(&arg, args)? {
                continue;
            }
            match arg.as_str() {
                "--status" => {
                    let value = require_value(args, "--status")?;
                    filter.status = if value == "all" {
                        StatusFilter::All
                    } else {
                        let status = value
                            .parse::<OutlineStatus>()
                            .map_err(|_| ArgsError::InvalidStatus { raw: value.clone() })?;
                        StatusFilter::Only(status)
                    };
                }
                "--search" => filter.search = require_value(args, "--search")?,
                "--sort" => {
                    let value = require_value(args, "--sort")?;
                    sort = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSort { raw: value.clone() })?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Self { filter, sort })
    }
}

/// Shared by `create` and `generate`; only `create` takes `--section`.
struct DraftArgs {
    draft: OutlineDraft,
}

impl DraftArgs {
    fn parse(
        common: &mut Common,
        args: &mut impl Iterator<Item = String>,
        require_sections: bool,
    ) -> Result<Self, ArgsError> {
        let mut title = None;
        let mut draft = OutlineDraft::default();
        while let Some(arg) = args.next() {
            if common.try_parse(&arg, args)? {
                continue;
            }
            match arg.as_str() {
                "--title" => title = Some(require_value(args, "--title")?),
                "--description" => draft.description = require_value(args, "--description")?,
                "--section" if require_sections => {
                    draft
                        .sections
                        .push(parse_section(require_value(args, "--section")?)?);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        draft.title = title.ok_or(ArgsError::MissingFlag { flag: "--title" })?;
        if require_sections && draft.sections.is_empty() {
            return Err(ArgsError::MissingFlag { flag: "--section" });
        }
        Ok(Self { draft })
    }
}

/// `Title` or `Title:minutes`. A non-numeric suffix stays part of the title.
fn parse_section(raw: String) -> Result<SectionDraft, ArgsError> {
    if let Some((title, minutes)) = raw.rsplit_once(':') {
        let minutes = minutes.trim();
        if !minutes.is_empty() && minutes.bytes().all(|b| b.is_ascii_digit()) {
            return match minutes.parse::<u32>() {
                Ok(minutes) if minutes > 0 && !title.trim().is_empty() => {
                    Ok(SectionDraft::new(title, "").with_duration(minutes))
                }
                _ => Err(ArgsError::InvalidSection { raw: raw.clone() }),
            };
        }
    }
    if raw.trim().is_empty() {
        return Err(ArgsError::InvalidSection { raw });
    }
    Ok(SectionDraft::new(raw, ""))
}

fn parse_present(
    common: &mut Common,
    args: &mut impl Iterator<Item = String>,
) -> Result<OutlineId, ArgsError> {
    let mut id = None;
    while let Some(arg) = args.next() {
        if common.try_parse(&arg, args)? {
            continue;
        }
        if arg.starts_with("--") || id.is_some() {
            return Err(ArgsError::UnknownArg(arg));
        }
        let parsed = arg
            .parse::<OutlineId>()
            .map_err(|_| ArgsError::InvalidOutlineId { raw: arg.clone() })?;
        id = Some(parsed);
    }
    id.ok_or(ArgsError::MissingFlag {
        flag: "<outline_id>",
    })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_outline_row(out: &mut impl Write, outline: &Outline) -> io::Result<()> {
    let progress = OutlineProgress::of(outline);
    writeln!(
        out,
        "{:>4}  {:<9}  {:>3}%  {:>2}/{:<2}  {:>3} min  {}",
        outline.id(),
        outline.status(),
        progress.rounded_percent(),
        progress.completed,
        progress.total,
        outline.total_duration_minutes(),
        outline.title()
    )
}

/// Replace the draft's sections with generated ones and persist the outline.
async fn generate_outline(
    services: &AppServices,
    mut draft: OutlineDraft,
    article: &str,
) -> Result<Outline, Box<dyn std::error::Error>> {
    let generated = services.generator().generate(article).await?;
    if apply_generated(&mut draft, generated).is_none() {
        return Err("outline generator returned no usable sections".into());
    }
    Ok(services.outlines().create_outline(draft).await?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    tracing::debug!(?cmd, "dispatching command");
    let mut common = Common::from_env()?;
    let report = |e: ArgsError| {
        eprintln!("{e}");
        print_usage();
        e
    };

    let config = |common: &Common| ServiceConfig {
        store_timeout: common.store_timeout,
        ..ServiceConfig::default()
    };

    match cmd {
        Command::List => {
            let parsed = ListArgs::parse(&mut common, &mut argv).map_err(report)?;
            prepare_sqlite_file(&common.db_url)?;
            let services =
                AppServices::new_sqlite(&common.db_url, Clock::system(), config(&common)).await?;
            let dashboard = services
                .outlines()
                .dashboard(parsed.sort, &parsed.filter)
                .await?;

            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} outlines, {} active, {} completed",
                dashboard.stats.total, dashboard.stats.active, dashboard.stats.completed
            )?;
            for outline in &dashboard.outlines {
                print_outline_row(&mut out, outline)?;
            }
            Ok(())
        }
        Command::Create => {
            let parsed = DraftArgs::parse(&mut common, &mut argv, true).map_err(report)?;
            prepare_sqlite_file(&common.db_url)?;
            let services =
                AppServices::new_sqlite(&common.db_url, Clock::system(), config(&common)).await?;
            let outline = services.outlines().create_outline(parsed.draft).await?;
            print_outline_row(&mut io::stdout().lock(), &outline)?;
            Ok(())
        }
        Command::Generate => {
            let parsed = DraftArgs::parse(&mut common, &mut argv, false).map_err(report)?;
            prepare_sqlite_file(&common.db_url)?;
            let services =
                AppServices::new_sqlite(&common.db_url, Clock::system(), config(&common)).await?;
            if !services.generator_enabled() {
                return Err("outline generator is not configured: set OUTLINE_AI_API_KEY".into());
            }

            let mut article = String::new();
            io::stdin().read_to_string(&mut article)?;
            let outline = generate_outline(&services, parsed.draft, &article).await?;
            print_outline_row(&mut io::stdout().lock(), &outline)?;
            Ok(())
        }
        Command::Present => {
            let id = parse_present(&mut common, &mut argv).map_err(report)?;
            prepare_sqlite_file(&common.db_url)?;
            let services =
                AppServices::new_sqlite(&common.db_url, Clock::system(), config(&common)).await?;
            let presentations = services.presentations();
            let session = presentations.open_session(id).await?;
            let stdin = io::stdin().lock();
            present::run(&presentations, session, stdin.lines(), io::stdout().lock()).await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use outline_core::time::fixed_now;
    use services::{GeneratedSection, GeneratorError, OutlineGenerator};
    use std::sync::Arc;

    struct CannedGenerator(Vec<GeneratedSection>);

    #[async_trait]
    impl OutlineGenerator for CannedGenerator {
        async fn generate(&self, _source_text: &str) -> Result<Vec<GeneratedSection>, GeneratorError> {
            Ok(self.0.clone())
        }
    }

    fn services_with(items: Vec<GeneratedSection>) -> AppServices {
        AppServices::in_memory(Clock::fixed(fixed_now()), ServiceConfig::default())
            .with_generator(Arc::new(CannedGenerator(items)))
    }

    fn titled(title: &str) -> OutlineDraft {
        OutlineDraft {
            title: title.into(),
            ..OutlineDraft::default()
        }
    }

    #[test]
    fn section_flag_accepts_title_and_minutes() {
        let section = parse_section("Demo:12".into()).unwrap();
        assert_eq!(section.title, "Demo");
        assert_eq!(section.duration_minutes, Some(12));

        let section = parse_section("Q&A: live".into()).unwrap();
        assert_eq!(section.title, "Q&A: live");
        assert_eq!(section.duration_minutes, None);
    }

    #[test]
    fn section_flag_rejects_bad_minutes() {
        for raw in ["Demo:0", ":5", "Demo:99999999999", "   "] {
            assert!(
                matches!(parse_section(raw.into()), Err(ArgsError::InvalidSection { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn generate_creates_outline_from_generated_sections() {
        let services = services_with(vec![
            GeneratedSection {
                title: "Context".into(),
                content: "- why now".into(),
            },
            GeneratedSection {
                title: "Plan".into(),
                content: "- steps".into(),
            },
        ]);
        assert!(services.generator_enabled());

        let outline = generate_outline(&services, titled("Roadmap"), "an article")
            .await
            .unwrap();
        assert_eq!(outline.len(), 2);
        assert_eq!(outline.total_duration_minutes(), 10);
        assert_eq!(outline.status(), OutlineStatus::Draft);
    }

    #[tokio::test]
    async fn generate_without_usable_sections_creates_nothing() {
        let services = services_with(vec![GeneratedSection {
            title: "  ".into(),
            content: "- dropped".into(),
        }]);
        assert!(generate_outline(&services, titled("Roadmap"), "an article")
            .await
            .is_err());
        let listed = services
            .outlines()
            .list_outlines(OutlineSort::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
