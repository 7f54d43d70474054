mod decode;
mod scenario;


use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;
use clap::Parser;
use clap::Subcommand;
use pe_core::EnhancerError;
use pe_core::EnhancerResult;
use pe_dates::Clock;
use pe_dates::DateFormatter;
use pe_dates::FixedClock;
use pe_dates::Locale;
use pe_dates::SystemClock;
use pe_enhancer::EnhancementReport;
use pe_enhancer::EnhancerConfig;
use pe_enhancer::PageEnhancer;
use pe_host::Dialog;
use pe_host::Page;
use pe_html::HtmlParser;
use pe_html::HtmlSerializer;
use scenario::Scenario;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_PAGE_URL: &str = "http://localhost/";

/// Plataforma Educativa page enhancer and date helpers.
#[derive(Parser, Debug)]
#[command(name = "plataforma-enhancer")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enhance an HTML page, replay interactions and print the result
    Enhance {
        /// HTML file to load
        html: PathBuf,
        /// Address the page is served from
        #[arg(long, default_value = DEFAULT_PAGE_URL)]
        url: String,
        /// JSON file with interaction steps
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Character encoding label overriding `<meta charset>`
        #[arg(long)]
        charset: Option<String>,
        /// Print a JSON summary instead of bare HTML
        #[arg(long)]
        report: bool,
    },

    /// Render a date as a long calendar date
    FormatDate {
        date: String,
        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Describe how long ago a date was
    TimeAgo {
        date: String,
        /// Reference instant (RFC 3339); defaults to the system clock
        #[arg(long)]
        now: Option<String>,
        #[command(flatten)]
        display: DisplayArgs,
    },
}

#[derive(clap::Args, Debug)]
struct DisplayArgs {
    /// Output language tag
    #[arg(long, default_value = "es-ES")]
    locale: String,
    /// UTC offset used to render zoned instants, e.g. +01:00
    #[arg(long, default_value = "+00:00")]
    offset: String,
}

impl DisplayArgs {
    fn formatter(&self) -> EnhancerResult<DateFormatter> {
        let locale = Locale::from_tag(&self.locale).ok_or_else(|| {
            EnhancerError::new("cli.invalid_locale", format!("unsupported locale `{}`", self.locale))
        })?;
        let offset = parse_offset(&self.offset).ok_or_else(|| {
            EnhancerError::new(
                "cli.invalid_offset",
                format!("`{}` is not an offset like +01:00", self.offset),
            )
        })?;
        Ok(DateFormatter::new(locale, offset))
    }
}

/// Parses `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let digits = rest.replace(':', "");
    if digits.len() != 4 || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let hours = digits[..2].parse::<i32>().ok()?;
    let minutes = digits[2..].parse::<i32>().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[derive(Debug, Serialize)]
struct RunSummary {
    enhancement: EnhancementSummary,
    dialogs: Vec<DialogSummary>,
    scrolls: Vec<usize>,
    submissions: Vec<usize>,
    navigations: Vec<String>,
    console: Vec<String>,
    html: String,
}

#[derive(Debug, Serialize)]
struct EnhancementSummary {
    alerts_scheduled: usize,
    confirm_buttons: usize,
    validated_forms: usize,
    busy_form: bool,
    counters: usize,
    highlighted_links: usize,
    smooth_anchors: usize,
    password_toggles: usize,
    discarded_toggles: usize,
    guarded_forms: usize,
}

impl From<&EnhancementReport> for EnhancementSummary {
    fn from(report: &EnhancementReport) -> Self {
        Self {
            alerts_scheduled: report.alerts_scheduled,
            confirm_buttons: report.confirm_buttons,
            validated_forms: report.validated_forms,
            busy_form: report.busy_form,
            counters: report.counters,
            highlighted_links: report.highlighted_links,
            smooth_anchors: report.smooth_anchors,
            password_toggles: report.password_toggles,
            discarded_toggles: report.discarded_toggles,
            guarded_forms: report.guarded_forms,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct DialogSummary {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    accepted: Option<bool>,
}

impl From<&Dialog> for DialogSummary {
    fn from(dialog: &Dialog) -> Self {
        match dialog {
            Dialog::Alert { message } => Self {
                kind: "alert",
                message: message.clone(),
                accepted: None,
            },
            Dialog::Confirm { message, accepted } => Self {
                kind: "confirm",
                message: message.clone(),
                accepted: Some(*accepted),
            },
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(code = err.code, "{}", err.message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> EnhancerResult<String> {
    match cli.command {
        Command::Enhance {
            html,
            url,
            scenario,
            charset,
            report,
        } => {
            let body = std::fs::read(&html).map_err(|error| {
                EnhancerError::new("io.read", format!("{}: {error}", html.display()))
            })?;
            let scenario = match scenario {
                Some(path) => {
                    let text = std::fs::read_to_string(&path).map_err(|error| {
                        EnhancerError::new("io.read", format!("{}: {error}", path.display()))
                    })?;
                    Scenario::from_json(&text)?
                }
                None => Scenario::default(),
            };
            let summary = enhance_page(&body, &url, charset.as_deref(), &scenario)?;
            if report {
                serde_json::to_string_pretty(&summary)
                    .map_err(|error| EnhancerError::new("io.serialize", error.to_string()))
            } else {
                Ok(summary.html)
            }
        }
        Command::FormatDate { date, display } => Ok(display.formatter()?.format_date(&date)),
        Command::TimeAgo { date, now, display } => {
            let formatter = display.formatter()?;
            let clock: Box<dyn Clock> = match now {
                Some(now) => Box::new(FixedClock(parse_instant(&now)?)),
                None => Box::new(SystemClock),
            };
            Ok(formatter.time_ago(&date, clock.as_ref()))
        }
    }
}

fn enhance_page(
    body: &[u8],
    url: &str,
    charset: Option<&str>,
    scenario: &Scenario,
) -> EnhancerResult<RunSummary> {
    let location = Url::parse(url)
        .map_err(|error| EnhancerError::new("cli.invalid_url", format!("`{url}`: {error}")))?;
    let text = decode::decode_page(body, charset);
    let document = HtmlParser.parse(&text);
    info!(title = %document.title, %location, "page loaded");

    let mut page = Page::new(document, location);
    page.mark_ready();
    let report = PageEnhancer::new(EnhancerConfig::default()).attach(&mut page)?;
    scenario.replay(&mut page)?;

    let host = page.host();
    info!(
        dialogs = host.dialogs().len(),
        scrolls = host.scrolls().len(),
        submissions = page.submissions().len(),
        navigations = page.navigations().len(),
        pending_timers = host.pending_timers(),
        "scenario finished"
    );

    Ok(RunSummary {
        enhancement: EnhancementSummary::from(&report),
        dialogs: host.dialogs().iter().map(DialogSummary::from).collect(),
        scrolls: host.scrolls().iter().map(|scroll| scroll.node).collect(),
        submissions: page.submissions().to_vec(),
        navigations: page.navigations().to_vec(),
        console: host.console().to_vec(),
        html: HtmlSerializer.serialize(page.document()),
    })
}

fn parse_instant(value: &str) -> EnhancerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|error| EnhancerError::new("cli.invalid_now", format!("`{value}`: {error}")))
}
