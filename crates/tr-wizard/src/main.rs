use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tr_core::core::{
    format_hms, AnnotationKey, ConversationId, CriteriaCatalog, Message, Phase, ProjectId, Role,
    SystemClock, Transition, UserId,
};
use tr_wizard::cache::FileCache;
use tr_wizard::command::{resubmit_command, Command};
use tr_wizard::remote::ReviewApi;
use tr_wizard::session::{AnnotationSession, Collaborators, RestoreSource, SessionError};

const FINAL_FLUSH_DEADLINE: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "tr-wizard", about = "Rate a conversation turn by turn")]
struct Args {
    #[arg(long, default_value = "http://localhost:8080")]
    api_base: String,
    #[arg(long)]
    project_id: String,
    /// Picks a random conversation of the project when omitted.
    #[arg(long)]
    conversation_id: Option<String>,
    #[arg(long)]
    user_id: String,
    #[arg(long, default_value = ".turnrate")]
    cache_dir: PathBuf,
    #[arg(long, default_value_t = 1000)]
    debounce_ms: u64,
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn prompt_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(input.trim().to_owned())),
        Err(err) => Err(err),
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::Tool => "Tool",
        Role::System => "System",
    }
}

fn print_message(message: &Message) {
    let label = format!("{}:", role_label(message.role));
    let label = match message.role {
        Role::User => label.bright_cyan(),
        Role::Assistant => label.bright_green(),
        Role::Tool => label.bright_magenta(),
        Role::System => label.dimmed(),
    };
    println!("{label} {}", message.content);
    for call in &message.tool_calls {
        println!("    {} {}({})", "->".dimmed(), call.name.yellow(), call.arguments);
    }
}

fn render(session: &AnnotationSession) {
    let wizard = session.wizard();
    let state = wizard.state();
    let progress = wizard.progress();

    println!();
    let heading = match state.current_phase {
        Phase::Turns => format!(
            "Turn {} of {}",
            state.current_turn_index + 1,
            wizard.unit_count()
        ),
        Phase::Conversation => "Whole conversation".to_owned(),
    };
    println!(
        "{}  step {}/{} ({}%)  time {}  session {}",
        heading.bold(),
        progress.current_step,
        progress.total_steps,
        progress.percent(),
        format_hms(session.annotation_elapsed_ms()),
        format_hms(session.session_elapsed_ms()),
    );
    println!("{}", "-".repeat(60).dimmed());

    match state.current_phase {
        Phase::Turns => {
            if let Some(unit) = wizard.current_unit() {
                unit.messages().iter().for_each(print_message);
            }
        }
        Phase::Conversation => {
            for unit in wizard.units() {
                unit.messages().iter().for_each(print_message);
            }
        }
    }
    println!("{}", "-".repeat(60).dimmed());

    let ratings = wizard.active_ratings();
    let mut number = 0;
    for category in &wizard.active_criteria().categories {
        println!("{}", category.label.bold().underline());
        for criterion in &category.criteria {
            number += 1;
            let current = match ratings.get(&criterion.id) {
                Some(value) => value.to_string().bright_green(),
                None => "-".red(),
            };
            let options: Vec<String> = criterion
                .rating_options
                .iter()
                .map(|value| match criterion.describe(*value) {
                    Some(text) => format!("{value}={text}"),
                    None => value.to_string(),
                })
                .collect();
            println!(
                "  {number:>2}. [{current}] {}  {}",
                criterion.label,
                options.join(", ").dimmed()
            );
        }
    }

    if !wizard.active_comment().is_empty() {
        println!("{} {}", "Comment:".bold(), wizard.active_comment());
    }
    if wizard.active_skipped() {
        println!("{}", "Skipped (u to unskip)".yellow());
    }
}

fn print_help() {
    println!("  r <criterion#> <value>   rate (same value again clears it)");
    println!("  c <text>                 set comment");
    println!("  n / b                    next / back");
    println!("  s / u                    skip / unskip");
    println!("  q                        save and quit");
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

enum Flow {
    Continue,
    Done,
}

async fn confirm_and_submit(session: &mut AnnotationSession) -> Flow {
    match prompt_line("Submit this annotation? [y/N]: ") {
        Ok(Some(answer)) if answer.eq_ignore_ascii_case("y") => {}
        Ok(_) => return Flow::Continue,
        Err(err) => {
            eprintln!("{}", format!("Failed to read input: {err}").red());
            return Flow::Continue;
        }
    }

    match session.submit().await {
        Ok(()) => {
            println!(
                "{}",
                format!(
                    "Annotation submitted in {}.",
                    format_hms(session.annotation_elapsed_ms())
                )
                .bright_green()
            );
            Flow::Done
        }
        Err(err) => {
            let retry = resubmit_command(session.wizard());
            eprintln!(
                "{}",
                format!(
                    "{err}. Your work is saved locally; press {} to submit again.",
                    retry.shortcut()
                )
                .red()
            );
            Flow::Continue
        }
    }
}

async fn handle(session: &mut AnnotationSession, command: Command) -> Result<Flow, SessionError> {
    let transition = match command {
        Command::Rate { criterion, value } => {
            let id = session
                .wizard()
                .active_criteria()
                .criteria()
                .nth(criterion - 1)
                .map(|c| c.id.clone());
            let Some(id) = id else {
                eprintln!("{}", format!("No criterion #{criterion}.").yellow());
                return Ok(Flow::Continue);
            };
            let outcome = session.rate(&id, value)?;
            if outcome.skip_cleared {
                println!("{}", "Skip flag cleared.".dimmed());
            }
            if outcome.surface_complete {
                println!("{}", "All criteria rated.".bright_green());
            }
            return Ok(Flow::Continue);
        }
        Command::Comment(text) => {
            session.set_comment(text)?;
            return Ok(Flow::Continue);
        }
        Command::Unskip => {
            session.unskip()?;
            return Ok(Flow::Continue);
        }
        Command::Help => {
            print_help();
            return Ok(Flow::Continue);
        }
        Command::Quit => return Ok(Flow::Done),
        Command::Next => session.next()?,
        Command::Back => session.back()?,
        Command::Skip => session.skip()?,
    };

    match transition {
        Transition::Blocked { missing_labels } => {
            eprintln!(
                "{}",
                format!("Missing: {}", missing_labels.join(", ")).yellow()
            );
            Ok(Flow::Continue)
        }
        Transition::ReadyToSubmit => Ok(confirm_and_submit(session).await),
        Transition::Moved { .. } | Transition::Stayed => Ok(Flow::Continue),
    }
}

async fn open_session(args: &Args) -> Result<AnnotationSession, String> {
    let api = Arc::new(ReviewApi::new(&args.api_base));
    let project_id = ProjectId::new(args.project_id.clone());

    let catalog = match api.criteria().await {
        Ok(catalog) => catalog,
        Err(err) => {
            tracing::warn!(error = %err, "criteria unavailable, using built-in rubric");
            CriteriaCatalog::default_rubric()
        }
    };

    let conversation_id = match &args.conversation_id {
        Some(id) => ConversationId::new(id.clone()),
        None => {
            let (id, _) = api
                .next_conversation(&project_id)
                .await
                .map_err(|err| format!("No conversation to annotate: {err}"))?;
            id
        }
    };

    let cache = FileCache::new(&args.cache_dir).map_err(|err| err.to_string())?;
    let key = AnnotationKey::new(conversation_id, project_id, UserId::new(args.user_id.clone()));
    let deps = Collaborators {
        conversations: api.clone(),
        remote: api,
        cache: Arc::new(cache),
        clock: Arc::new(SystemClock),
    };

    AnnotationSession::open(
        key,
        deps,
        Arc::new(catalog),
        Duration::from_millis(args.debounce_ms),
    )
    .await
    .map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut session = match open_session(&args).await {
        Ok(session) => session,
        Err(message) => {
            eprintln!("{}", message.red());
            std::process::exit(1);
        }
    };

    match session.restored_from() {
        RestoreSource::Remote => println!("{}", "Resumed saved progress.".dimmed()),
        RestoreSource::LocalCache => println!("{}", "Resumed unsynced local progress.".dimmed()),
        RestoreSource::Fresh => {}
    }
    println!("Conversation {}", session.key().conversation_id.to_string().bold());
    print_help();

    loop {
        render(&session);

        let input = match prompt_line(&format!("{} ", ">".bright_cyan())) {
            Ok(Some(input)) => input,
            Ok(None) => {
                println!();
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Failed to read input: {err}").red());
                continue;
            }
        };

        let command = match Command::parse(&input) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message.yellow());
                continue;
            }
        };

        match handle(&mut session, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Done) => break,
            Err(err) => eprintln!("{}", err.to_string().red()),
        }
    }

    let flush = session.close();
    if tokio::time::timeout(FINAL_FLUSH_DEADLINE, flush).await.is_err() {
        tracing::warn!("final save did not finish in time");
    }
}
