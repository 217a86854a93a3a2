use std::fmt;
use std::sync::{Arc, MutexGuard};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use exam_core::Clock;
use exam_core::model::TestId;
use services::attempt::{format_remaining, palette};
use services::{
    AttemptLoopService, AttemptPhase, AttemptSession, AttemptSubmissionService, Countdown,
    ExamApiClient, ExamApiConfig, ExamContentService, Expired, SharedAttempt,
};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTestId { raw: String },
    MissingTestId,
    MissingToken,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTestId { raw } => write!(f, "invalid --test-id value: {raw}"),
            ArgsError::MissingTestId => write!(f, "--test-id is required"),
            ArgsError::MissingToken => {
                write!(f, "no bearer token: pass --token or set EDUPRAYAS_API_TOKEN")
            }
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
    eprintln!("  cargo run -p app -- --test-id <id> [--base-url <url>] [--token <bearer>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --base-url {}", ExamApiConfig::DEFAULT_BASE_URL);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EDUPRAYAS_API_BASE_URL, EDUPRAYAS_API_TOKEN");
}

struct Args {
    test_id: TestId,
    base_url: String,
    token: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut test_id: Option<TestId> = None;
        let mut base_url = std::env::var("EDUPRAYAS_API_BASE_URL")
            .unwrap_or_else(|_| ExamApiConfig::DEFAULT_BASE_URL.to_string());
        let mut token = std::env::var("EDUPRAYAS_API_TOKEN").ok();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--test-id" => {
                    let value = require_value(args, "--test-id")?;
                    test_id = Some(
                        value
                            .parse()
                            .map_err(|_| ArgsError::InvalidTestId { raw: value.clone() })?,
                    );
                }
                "--base-url" => {
                    base_url = require_value(args, "--base-url")?;
                }
                "--token" => {
                    token = Some(require_value(args, "--token")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let test_id = test_id.ok_or(ArgsError::MissingTestId)?;
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ArgsError::MissingToken)?;

        Ok(Self {
            test_id,
            base_url,
            token,
        })
    }
}

enum Flow {
    Continue,
    Done,
}

fn lock(shared: &SharedAttempt) -> Result<MutexGuard<'_, AttemptSession>, Box<dyn std::error::Error>> {
    shared
        .lock()
        .map_err(|_| services::AttemptError::Poisoned.into())
}

fn print_question(session: &AttemptSession) {
    let question = session.current_question();
    let status = session
        .status(question.id())
        .map(|s| s.to_string())
        .unwrap_or_default();

    println!();
    println!(
        "[{}] Q{}/{} ({status})",
        format_remaining(session.remaining_secs()),
        session.current_index() + 1,
        session.test().question_count(),
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        let marker = if session.answer(question.id()) == Some(option.as_str()) {
            "*"
        } else {
            " "
        };
        println!("  {marker}{}. {option}", i + 1);
    }
}

fn print_palette(session: &AttemptSession) {
    for entry in palette(session) {
        let cursor = if entry.is_current { ">" } else { " " };
        println!("{cursor} {} {}", entry.question_id, entry.status);
    }
}

fn print_summary(session: &AttemptSession) {
    let summary = session.summary();
    println!("Total questions:    {}", summary.total);
    println!("Answered:           {}", summary.answered);
    println!("Not answered:       {}", summary.not_answered);
    println!("Marked for review:  {}", summary.marked_for_review);
    println!("Not visited:        {}", summary.not_visited);
}

fn print_help() {
    println!("Commands:");
    println!("  1..9          select the numbered option");
    println!("  n / p         next / previous question");
    println!("  g <num>       jump to question <num>");
    println!("  m             mark current question for review");
    println!("  c             clear current answer");
    println!("  pal           show the question palette");
    println!("  sum           show the summary counts");
    println!("  s             submit (asks for confirmation)");
    println!("  q             abandon the attempt");
}

async fn handle_line(
    line: &str,
    shared: &SharedAttempt,
    loop_svc: &AttemptLoopService,
) -> Result<Flow, Box<dyn std::error::Error>> {
    // Submission retry is the only command accepted once the attempt has
    // left the active phase.
    if lock(shared)?.phase() == AttemptPhase::Submitting {
        return match line {
            "s" | "submit" | "y" => try_submit(shared, loop_svc).await,
            "q" => Ok(Flow::Done),
            _ => {
                println!("submission pending; type 's' to retry or 'q' to quit");
                Ok(Flow::Continue)
            }
        };
    }

    let outcome = {
        let mut session = lock(shared)?;
        match line {
            "" => Ok(()),
            "n" | "next" if session.confirm_pending() => session.cancel_submit(),
            "n" | "next" => session.go_next(),
            "p" | "prev" => session.go_previous(),
            "m" | "mark" => {
                let id = session.current_question().id().clone();
                session.mark_for_review(&id)
            }
            "c" | "clear" => {
                let id = session.current_question().id().clone();
                session.clear_answer(&id)
            }
            "pal" | "palette" => {
                print_palette(&session);
                Ok(())
            }
            "sum" | "summary" => {
                print_summary(&session);
                Ok(())
            }
            "h" | "help" => {
                print_help();
                Ok(())
            }
            "q" | "quit" => return Ok(Flow::Done),
            "y" if session.confirm_pending() => {
                drop(session);
                return try_submit(shared, loop_svc).await;
            }
            "s" | "submit" => {
                let result = session.request_submit();
                if result.is_ok() {
                    print_summary(&session);
                    println!("Submit now? Once submitted you cannot change your answers. (y/n)");
                }
                result
            }
            "no" | "cancel" => session.cancel_submit(),
            other => {
                if let Some(rest) = other.strip_prefix("g ") {
                    match rest.trim().parse::<usize>() {
                        Ok(number) if number >= 1 => session.jump_to(number - 1),
                        _ => {
                            println!("usage: g <question number>");
                            Ok(())
                        }
                    }
                } else if let Ok(number) = other.parse::<usize>() {
                    let question = session.current_question();
                    match question.options().get(number.wrapping_sub(1)) {
                        Some(option) => {
                            let id = question.id().clone();
                            let option = option.clone();
                            session.select_option(&id, &option)
                        }
                        None => {
                            println!("no option {number} on this question");
                            Ok(())
                        }
                    }
                } else {
                    println!("unknown command {other:?} (type 'h' for help)");
                    Ok(())
                }
            }
        }
    };

    if let Err(err) = outcome {
        println!("{err}");
    }
    print_question(&*lock(shared)?);
    Ok(Flow::Continue)
}

async fn try_submit(
    shared: &SharedAttempt,
    loop_svc: &AttemptLoopService,
) -> Result<Flow, Box<dyn std::error::Error>> {
    match loop_svc.submit(shared).await {
        Ok(receipt) => {
            let session = lock(shared)?;
            println!("Attempt submitted: {}", receipt.message);
            print_summary(&session);
            Ok(Flow::Done)
        }
        Err(err) => {
            println!("Submission failed: {err}");
            println!("Your answers are preserved; type 's' to retry or 'q' to quit.");
            Ok(Flow::Continue)
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

    let config = ExamApiConfig::new(args.base_url, args.token)?;
    let client = Arc::new(ExamApiClient::new(config));
    let content: Arc<dyn ExamContentService> = client.clone();
    let submissions: Arc<dyn AttemptSubmissionService> = client;
    let loop_svc = AttemptLoopService::new(Clock::default_clock(), content, submissions);

    let shared = loop_svc.start_attempt_shared(&args.test_id).await?;
    tracing::debug!(test_id = %args.test_id, "attempt session ready");
    {
        let session = lock(&shared)?;
        let test = session.test();
        println!(
            "{} — {} questions, {} minutes",
            test.title(),
            test.question_count(),
            test.duration_minutes()
        );
        print_help();
        print_question(&session);
    }

    let (countdown, mut expired) = Countdown::spawn(Arc::clone(&shared));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(Expired) = expired.recv() => {
                println!("Time is up! Submitting your attempt...");
                match try_submit(&shared, &loop_svc).await? {
                    Flow::Done => break,
                    Flow::Continue => {}
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_line(line.trim(), &shared, &loop_svc).await? {
                    Flow::Done => break,
                    Flow::Continue => {}
                }
            }
        }
    }

    countdown.cancel();
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
