use regex::Regex;

pub const DEFAULT_THRESHOLD: u64 = 100;
pub const MIN_THRESHOLD: u64 = 1;
pub const MAX_THRESHOLD: u64 = 100_000;

pub const DEFAULT_DURATION_HOURS: u64 = 24;
pub const MIN_DURATION_HOURS: u64 = 1;
pub const MAX_DURATION_HOURS: u64 = 168;

/// Market parameters requested by a bot mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketCommand {
    pub threshold: u64,
    pub duration_hours: u64,
}

impl Default for MarketCommand {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            duration_hours: DEFAULT_DURATION_HOURS,
        }
    }
}

impl MarketCommand {
    pub fn duration_secs(&self) -> u64 {
        self.duration_hours * 3600
    }
}

/// Clamp a requested threshold: out-of-range values fall back to the default.
pub fn threshold_or_default(requested: Option<u64>) -> u64 {
    match requested {
        Some(t) if (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&t) => t,
        _ => DEFAULT_THRESHOLD,
    }
}

/// Clamp a requested duration in hours: out-of-range values fall back to the default.
pub fn duration_or_default(requested: Option<u64>) -> u64 {
    match requested {
        Some(h) if (MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(&h) => h,
        _ => DEFAULT_DURATION_HOURS,
    }
}

/// Parses `<mention> [<threshold> [likes]] [<n>h|<n>d]` out of cast text.
#[derive(Debug, Clone)]
pub struct CommandParser {
    mention: Regex,
    threshold: Regex,
    duration: Regex,
}

impl CommandParser {
    pub fn new(mention: &str) -> Result<Self, regex::Error> {
        let handle = regex::escape(mention.trim().trim_start_matches('@'));
        Ok(Self {
            mention: Regex::new(&format!(r"(?i)(?:^|[^\w@])@{handle}\b"))?,
            threshold: Regex::new(r"(?i)^(\d+)(?:likes?)?$")?,
            duration: Regex::new(r"(?i)^(\d+)(h|hrs?|hours?|d|days?)$")?,
        })
    }

    /// Returns `None` when the text does not mention the bot.
    pub fn parse(&self, text: &str) -> Option<MarketCommand> {
        let found = self.mention.find(text)?;
        let rest = &text[found.end()..];

        let mut threshold: Option<Option<u64>> = None;
        let mut duration: Option<Option<u64>> = None;

        for token in rest.split_whitespace() {
            let token = token.trim_end_matches(['.', ',', '!', '?']);

            if duration.is_none() {
                if let Some(caps) = self.duration.captures(token) {
                    let amount = caps[1].parse::<u64>().ok();
                    let in_days = caps[2].to_lowercase().starts_with('d');
                    duration = Some(amount.and_then(|n| if in_days { n.checked_mul(24) } else { Some(n) }));
                    continue;
                }
            }

            if threshold.is_none() && duration.is_none() {
                if let Some(caps) = self.threshold.captures(token) {
                    threshold = Some(caps[1].parse::<u64>().ok());
                    continue;
                }
            }

            if token.eq_ignore_ascii_case("like") || token.eq_ignore_ascii_case("likes") {
                continue;
            }

            break;
        }

        Some(MarketCommand {
            threshold: threshold_or_default(threshold.flatten()),
            duration_hours: duration_or_default(duration.flatten()),
        })
    }
}
