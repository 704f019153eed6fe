use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

use prisvarsel::config::AppConfig;

pub(crate) enum RunOutcome {
    Serve(AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    match resolve_config(&cli) {
        Ok(config) => RunOutcome::Serve(config),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "prisvarsel",
    version,
    about = "Price alert push service for a grocery price-sharing app"
)]
struct Cli {
    #[arg(long, env = "PRISVARSEL_DB", default_value = "prisvarsel.db")]
    db: PathBuf,
    #[arg(long, env = "PRISVARSEL_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(
        long,
        env = "PRISVARSEL_EXPO_URL",
        default_value = "https://exp.host/--/api/v2/push/send"
    )]
    expo_url: String,
    #[arg(long, env = "PRISVARSEL_PUSH_TIMEOUT", default_value = "10s")]
    push_timeout: String,
    /// Quiet period per device after a sent push.
    #[arg(long, env = "PRISVARSEL_COOLDOWN", default_value = "4h")]
    cooldown: String,
    /// How long a batch collects stores before it becomes due.
    #[arg(long, env = "PRISVARSEL_BATCH_DELAY", default_value = "10m")]
    batch_delay: String,
    /// Cadence of the in-process flush task; "off" leaves flushing to an
    /// external cron hitting the flush endpoint.
    #[arg(long, env = "PRISVARSEL_FLUSH_INTERVAL", default_value = "1m")]
    flush_interval: String,
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, String> {
    let push_timeout = to_std(parse_duration("push timeout", &cli.push_timeout)?)?;
    let cooldown = parse_duration("cooldown", &cli.cooldown)?;
    let batch_delay = parse_duration("batch delay", &cli.batch_delay)?;
    let flush_interval = match cli.flush_interval.trim() {
        "off" => None,
        raw => Some(to_std(parse_duration("flush interval", raw)?)?),
    };

    Ok(AppConfig {
        db_path: cli.db.clone(),
        listen: cli.listen,
        expo_url: cli.expo_url.clone(),
        push_timeout,
        cooldown,
        batch_delay,
        flush_interval,
    })
}

fn to_std(duration: Duration) -> Result<std::time::Duration, String> {
    duration
        .try_into()
        .map_err(|_| "duration must be positive".to_string())
}

fn parse_duration(label: &str, raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(format!("{label} cannot be empty"));
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid {label} '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err(format!("{label} must be greater than 0"));
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid {label} '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}
