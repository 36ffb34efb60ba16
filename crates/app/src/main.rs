use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use quiz_core::Clock;
use quiz_core::countdown::format_clock;
use quiz_core::model::{Question, QuizId};
use services::{
    AttemptSessionService, HttpQuizService, NavigationHost, QuizApiConfig, SessionRunner,
    SessionState,
};
use storage::{SnapshotRepository, SqliteSnapshotStore};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

struct Args {
    quiz_id: QuizId,
    db_url: String,
    base_url: Option<String>,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--quiz-id <id>] [--db <sqlite_url>] [--base-url <url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --quiz-id 1");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_ID, QUIZ_DB_URL, QUIZ_API_BASE_URL, QUIZ_API_TOKEN");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut quiz_id = std::env::var("QUIZ_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| QuizId::new(1), QuizId::new);
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut base_url = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuizId { raw: value.clone() })?;
                    quiz_id = QuizId::new(parsed);
                }
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--base-url" => {
                    base_url = Some(require_value(args, "--base-url")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            quiz_id,
            db_url,
            base_url,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }
    let trimmed = raw.trim().to_string();
    let path = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    format!("sqlite://{path}")
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
    let path = std::path::Path::new(path.split('?').next().unwrap_or(path));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
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

/// Navigation host for a terminal: no history to guard, so the exit guard
/// is a notice and navigation is a printed route.
struct TerminalNavigationHost;

impl NavigationHost for TerminalNavigationHost {
    fn push_checkpoint(&self) {}

    fn register_exit_guard(&self) {
        println!("(attempt in progress: quitting now would leave it unsubmitted)");
    }

    fn unregister_exit_guard(&self) {}

    fn navigate_to(&self, route: &str) {
        println!("-> {route}");
    }
}

fn print_questions(questions: &[Question]) {
    for (qi, question) in questions.iter().enumerate() {
        println!("{}. {}", qi + 1, question.prompt());
        for (oi, option) in question.options().iter().enumerate() {
            println!("   {}) {option}", oi + 1);
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let store = SqliteSnapshotStore::connect(&args.db_url).await?;
    let snapshots = SnapshotRepository::new(Arc::new(store));

    let config = match args.base_url {
        Some(base_url) => QuizApiConfig::new(base_url, QuizApiConfig::from_env().bearer_token),
        None => QuizApiConfig::from_env(),
    };
    let quizzes = Arc::new(HttpQuizService::new(config));
    let navigation = Arc::new(TerminalNavigationHost);

    let service = Arc::new(AttemptSessionService::new(
        Clock::default_clock(),
        quizzes,
        snapshots,
        navigation,
    ));

    let mut session = service.load(args.quiz_id).await?;
    let questions = session.questions().to_vec();

    println!("{}", session.quiz().title());
    if let Some(minutes) = session.quiz().time_limit_minutes() {
        println!("time limit: {minutes} minute(s)");
    }
    print_questions(&questions);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    match session.state() {
        SessionState::NotStarted => {
            println!("press enter to start the attempt");
            lines.next_line().await?;
            service.start(&mut session).await?;
        }
        _ => println!("resuming attempt in progress"),
    }

    let runner = SessionRunner::spawn(Arc::clone(&service), session);

    // Countdown display; quiet except near round marks and the final stretch.
    let mut remaining = runner.remaining();
    let ticker = tokio::spawn(async move {
        while remaining.changed().await.is_ok() {
            if let Some(secs) = *remaining.borrow() {
                if secs <= 10 || secs % 30 == 0 {
                    println!("time left: {}", format_clock(secs));
                }
            }
        }
    });

    println!("commands: answer <question#> <option#> | save | submit | quit");
    let mut runner = runner;
    while let Some(line) = lines.next_line().await? {
        if runner.state().await == SessionState::Submitted {
            println!("attempt was submitted when the time ran out");
            break;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["answer", question, option] => {
                match resolve_answer(&questions, question, option) {
                    Some((question_id, choice)) => {
                        match runner.answer(question_id, choice).await {
                            Ok(()) => println!("answer recorded"),
                            Err(err) => eprintln!("{err}"),
                        }
                    }
                    None => eprintln!("no such question/option number"),
                }
            }
            ["save"] => match runner.save_draft().await {
                Ok(()) => println!("draft saved"),
                Err(err) => eprintln!("{err}"),
            },
            ["submit"] => match runner.submit().await {
                Ok(()) => {
                    println!("submitted");
                    break;
                }
                Err(err) => eprintln!("{err}"),
            },
            ["quit"] => break,
            [] => {}
            _ => eprintln!("unknown command: {line}"),
        }

        if runner.state().await == SessionState::Submitted {
            break;
        }
    }

    ticker.abort();
    Ok(())
}

fn resolve_answer<'a>(
    questions: &'a [Question],
    question: &str,
    option: &str,
) -> Option<(quiz_core::model::QuestionId, &'a str)> {
    let qi: usize = question.parse().ok()?;
    let oi: usize = option.parse().ok()?;
    let question = questions.get(qi.checked_sub(1)?)?;
    let choice = question.options().get(oi.checked_sub(1)?)?;
    Some((question.id(), choice.as_str()))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
