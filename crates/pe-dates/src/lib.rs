//! Date formatting helpers with an injected clock and locale.

use chrono::DateTime;
use chrono::Datelike;
use chrono::FixedOffset;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Offset;
use chrono::TimeZone;
use chrono::Utc;

/// Rendering used when the input cannot be parsed.
pub const INVALID_DATE: &str = "Invalid Date";

const SECONDS_PER_YEAR: f64 = 31_536_000.0;
const SECONDS_PER_MONTH: f64 = 2_592_000.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for deterministic callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    /// es-ES, the platform default.
    #[default]
    SpanishSpain,
    English,
}

impl Locale {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "es" | "es-es" => Some(Self::SpanishSpain),
            "en" | "en-us" | "en-gb" => Some(Self::English),
            _ => None,
        }
    }

    fn month_name(self, month0: u32) -> &'static str {
        const ES: [&str; 12] = [
            "enero",
            "febrero",
            "marzo",
            "abril",
            "mayo",
            "junio",
            "julio",
            "agosto",
            "septiembre",
            "octubre",
            "noviembre",
            "diciembre",
        ];
        const EN: [&str; 12] = [
            "January",
            "February",
            "March",
            "April",
            "May",
            "June",
            "July",
            "August",
            "September",
            "October",
            "November",
            "December",
        ];
        let table = match self {
            Self::SpanishSpain => &ES,
            Self::English => &EN,
        };
        table.get(month0 as usize).copied().unwrap_or_default()
    }

    fn long_date(self, date: NaiveDate) -> String {
        let month = self.month_name(date.month0());
        match self {
            Self::SpanishSpain => format!("{} de {month} de {}", date.day(), date.year()),
            Self::English => format!("{month} {}, {}", date.day(), date.year()),
        }
    }

    /// Unit labels from largest to smallest: years, months, days, hours,
    /// minutes, seconds.
    fn unit_labels(self) -> [&'static str; 6] {
        match self {
            Self::SpanishSpain => ["años", "meses", "días", "horas", "minutos", "segundos"],
            Self::English => ["years", "months", "days", "hours", "minutes", "seconds"],
        }
    }
}

/// A parsed date string, keeping track of how its zone was expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParsedDate {
    /// ISO date-only forms; an instant at UTC midnight.
    DateOnly(NaiveDate),
    /// Explicit offset or `Z`.
    Zoned(DateTime<FixedOffset>),
    /// Date-time without offset; read in the formatter's local offset.
    Floating(NaiveDateTime),
}

/// Formats dates for one locale and one local UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormatter {
    pub locale: Locale,
    pub offset: FixedOffset,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self {
            locale: Locale::SpanishSpain,
            offset: Utc.fix(),
        }
    }
}

impl DateFormatter {
    pub fn new(locale: Locale, offset: FixedOffset) -> Self {
        Self { locale, offset }
    }

    /// Long-form calendar date such as `5 de marzo de 2024`.
    ///
    /// Never fails: unparseable input renders as [`INVALID_DATE`].
    pub fn format_date(&self, input: &str) -> String {
        let date = match parse_date_string(input) {
            Some(ParsedDate::DateOnly(date)) => date,
            Some(ParsedDate::Zoned(instant)) => instant.with_timezone(&self.offset).date_naive(),
            Some(ParsedDate::Floating(local)) => local.date(),
            None => return INVALID_DATE.to_owned(),
        };
        self.locale.long_date(date)
    }

    /// Coarse elapsed time from `input` to `clock.now()`, e.g. `3 horas`.
    ///
    /// Each unit is used only when strictly more than one of it has elapsed,
    /// future instants fall through to a negative seconds count, and
    /// unparseable input yields `NaN` seconds.
    pub fn time_ago(&self, input: &str, clock: &dyn Clock) -> String {
        let labels = self.locale.unit_labels();
        let Some(then) = self.instant(input) else {
            return format!("NaN {}", labels[5]);
        };

        let elapsed_ms = clock.now().timestamp_millis() - then.timestamp_millis();
        let seconds = elapsed_ms.div_euclid(1000);

        let thresholds = [
            SECONDS_PER_YEAR,
            SECONDS_PER_MONTH,
            SECONDS_PER_DAY,
            SECONDS_PER_HOUR,
            SECONDS_PER_MINUTE,
        ];
        for (unit, label) in thresholds.iter().zip(labels) {
            let interval = seconds as f64 / unit;
            if interval > 1.0 {
                return format!("{} {label}", interval.floor() as i64);
            }
        }

        format!("{seconds} {}", labels[5])
    }

    fn instant(&self, input: &str) -> Option<DateTime<Utc>> {
        match parse_date_string(input)? {
            ParsedDate::DateOnly(date) => Some(date.and_hms_opt(0, 0, 0)?.and_utc()),
            ParsedDate::Zoned(instant) => Some(instant.with_timezone(&Utc)),
            ParsedDate::Floating(local) => self
                .offset
                .from_local_datetime(&local)
                .single()
                .map(|instant| instant.with_timezone(&Utc)),
        }
    }
}

/// [`DateFormatter::format_date`] with the es-ES locale in UTC.
pub fn format_date(date_string: &str) -> String {
    DateFormatter::default().format_date(date_string)
}

/// [`DateFormatter::time_ago`] with the es-ES locale in UTC.
pub fn get_time_ago(date_string: &str, clock: &dyn Clock) -> String {
    DateFormatter::default().time_ago(date_string, clock)
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
];

const FLOATING_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

fn parse_date_string(input: &str) -> Option<ParsedDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ParsedDate::Zoned(instant));
    }

    let with_offset = match trimmed.strip_suffix(['Z', 'z']) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => trimmed.to_owned(),
    };
    for format in ZONED_FORMATS {
        if let Ok(instant) = DateTime::parse_from_str(&with_offset, format) {
            return Some(ParsedDate::Zoned(instant));
        }
    }

    if let Ok(instant) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(ParsedDate::Zoned(instant));
    }

    for format in FLOATING_FORMATS {
        if let Ok(local) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ParsedDate::Floating(local));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(ParsedDate::DateOnly(date));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y/%m/%d") {
        return date.and_hms_opt(0, 0, 0).map(ParsedDate::Floating);
    }
    if trimmed.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d") {
            return Some(ParsedDate::DateOnly(date));
        }
    }
    if trimmed.len() == 4 && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        let year = trimmed.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(ParsedDate::DateOnly);
    }

    None
}
