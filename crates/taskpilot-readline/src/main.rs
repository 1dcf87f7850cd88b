use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing_subscriber::EnvFilter;

use taskpilot_api::{ApiGateway, ChatApi, SessionController, TaskApi};
use taskpilot_application::{ChatOrchestrator, TurnOutcome};
use taskpilot_core::conversation::MessageRole;
use taskpilot_core::gateway::{ChatGateway, TaskGateway};
use taskpilot_core::task::{Priority, TaskCreate, TaskUpdate};
use taskpilot_infrastructure::{AVAILABLE_MODELS, ChatStateStore, TaskpilotPaths, TokenStore};

const COMMANDS: [&str; 17] = [
    "/help",
    "/login",
    "/register",
    "/logout",
    "/tasks",
    "/add",
    "/done",
    "/priority",
    "/rm",
    "/conversations",
    "/switch",
    "/new",
    "/delete",
    "/model",
    "/retry",
    "/dismiss",
    "/quit",
];

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

enum Flow {
    Continue,
    Quit,
}

/// The wired-up application: session, task gateway, chat workflow.
struct App {
    session: SessionController,
    tasks: Arc<dyn TaskGateway>,
    orchestrator: ChatOrchestrator,
}

impl App {
    /// Dispatches one line of input. Slash commands are handled here;
    /// anything else is a chat turn for the assistant.
    async fn handle_line(&mut self, line: &str, rl: &mut Editor<CliHelper, rustyline::history::DefaultHistory>) -> Result<Flow> {
        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "/quit" | "/exit" => return Ok(Flow::Quit),
            "/help" => print_help(),
            "/login" => self.login(rest).await,
            "/register" => self.register(rest).await,
            "/logout" => {
                self.session.logout().await;
                println!("{}", "Logged out.".dimmed());
            }
            _ if !self.session.is_authenticated() => {
                // Route guard: everything below needs a live credential
                println!(
                    "{}",
                    "Please /login <email> <password> first (or /register).".yellow()
                );
            }
            "/tasks" => self.show_tasks().await,
            "/add" => self.add_task(rest).await,
            "/done" => self.toggle_task(rest).await,
            "/priority" => self.reprioritize_task(rest).await,
            "/rm" => self.remove_task(rest).await,
            "/conversations" => self.show_conversations(),
            "/switch" => self.switch_conversation(rest).await,
            "/new" => {
                self.orchestrator.new_conversation();
                println!("{}", "Started a new conversation.".dimmed());
            }
            "/delete" => self.delete_conversation(rest, rl).await,
            "/model" => self.select_model(rest),
            "/dismiss" => self.orchestrator.dismiss_failure(),
            "/retry" => {
                let before = self.orchestrator.messages().len();
                if self.orchestrator.retry().await {
                    self.print_transcript_from(before);
                } else {
                    println!("{}", "Nothing to retry.".dimmed());
                }
            }
            _ if command.starts_with('/') => {
                println!("{}", format!("Unknown command: {command}").yellow());
            }
            _ => self.chat_turn(line, rl).await,
        }

        Ok(Flow::Continue)
    }

    async fn login(&mut self, args: &str) {
        let Some((email, password)) = split_credentials(args) else {
            println!("{}", "Usage: /login <email> <password>".yellow());
            return;
        };
        match self.session.login(email, password).await {
            Ok(_) => {
                println!("{}", format!("Logged in as {email}.").green());
                self.orchestrator.initialize().await;
            }
            Err(e) => println!("{}", format!("Login failed: {e}").red()),
        }
    }

    async fn register(&self, args: &str) {
        let Some((email, password)) = split_credentials(args) else {
            println!("{}", "Usage: /register <email> <password>".yellow());
            return;
        };
        match self.session.register(email, password).await {
            Ok(user) => println!(
                "{}",
                format!("Registered {}. Now /login to start.", user.email).green()
            ),
            Err(e) => println!("{}", format!("Registration failed: {e}").red()),
        }
    }

    async fn show_tasks(&self) {
        match self.tasks.list_tasks().await {
            Ok(tasks) => {
                if tasks.is_empty() {
                    println!("{}", "No tasks yet. Try: /add buy milk".dimmed());
                    return;
                }
                let pending = tasks.iter().filter(|t| !t.completed).count();
                let completed = tasks.len() - pending;
                for task in &tasks {
                    let marker = if task.completed { "[x]" } else { "[ ]" };
                    let mut line = format!("{marker} #{} {} ({})", task.id, task.title, task.priority);
                    if let Some(description) = &task.description {
                        line.push_str(&format!(" — {description}"));
                    }
                    if task.completed {
                        println!("{}", line.dimmed());
                    } else {
                        println!("{line}");
                    }
                }
                println!(
                    "{}",
                    format!("{pending} pending, {completed} completed").dimmed()
                );
            }
            Err(e) => println!("{}", format!("Failed to list tasks: {e}").red()),
        }
    }

    async fn add_task(&self, args: &str) {
        if args.is_empty() {
            println!("{}", "Usage: /add <title> [!low|!medium|!high]".yellow());
            return;
        }
        let (title, priority) = split_priority(args);
        let draft = TaskCreate::new(title).with_priority(priority);
        match self.tasks.create_task(&draft).await {
            Ok(task) => println!("{}", format!("Created task #{}: {}", task.id, task.title).green()),
            Err(e) => println!("{}", format!("Failed to create task: {e}").red()),
        }
    }

    async fn toggle_task(&self, args: &str) {
        let Some(task_id) = parse_id(args) else {
            println!("{}", "Usage: /done <task id>".yellow());
            return;
        };
        match self.tasks.toggle_task(task_id).await {
            Ok(task) => {
                let state = if task.completed { "completed" } else { "reopened" };
                println!("{}", format!("Task #{} {state}: {}", task.id, task.title).green());
            }
            Err(e) => println!("{}", format!("Failed to toggle task: {e}").red()),
        }
    }

    async fn reprioritize_task(&self, args: &str) {
        let mut parts = args.split_whitespace();
        let task_id = parts.next().and_then(|s| s.parse().ok());
        let priority = parts.next().map(str::parse::<Priority>);
        let (Some(task_id), Some(Ok(priority))) = (task_id, priority) else {
            println!("{}", "Usage: /priority <task id> <low|medium|high>".yellow());
            return;
        };
        let update = TaskUpdate {
            priority: Some(priority),
            ..Default::default()
        };
        match self.tasks.update_task(task_id, &update).await {
            Ok(task) => println!(
                "{}",
                format!("Task #{} is now {} priority.", task.id, task.priority).green()
            ),
            Err(e) => println!("{}", format!("Failed to update task: {e}").red()),
        }
    }

    async fn remove_task(&self, args: &str) {
        let Some(task_id) = parse_id(args) else {
            println!("{}", "Usage: /rm <task id>".yellow());
            return;
        };
        match self.tasks.delete_task(task_id).await {
            Ok(()) => println!("{}", format!("Deleted task #{task_id}.").green()),
            Err(e) => println!("{}", format!("Failed to delete task: {e}").red()),
        }
    }

    fn show_conversations(&self) {
        let conversations = self.orchestrator.conversations();
        if conversations.is_empty() {
            println!("{}", "No conversations yet.".dimmed());
            return;
        }
        let active = self.orchestrator.conversation_id();
        for summary in conversations {
            let marker = if active == Some(summary.id) { "*" } else { " " };
            println!(
                "{marker} #{} {} ({} messages)",
                summary.id,
                summary.display_label(),
                summary.message_count
            );
        }
    }

    async fn switch_conversation(&mut self, args: &str) {
        let Some(conversation_id) = parse_id(args) else {
            println!("{}", "Usage: /switch <conversation id>".yellow());
            return;
        };
        match self.orchestrator.select_conversation(conversation_id).await {
            Ok(()) => {
                println!(
                    "{}",
                    format!("Switched to conversation #{conversation_id}.").dimmed()
                );
                self.print_transcript_from(0);
            }
            Err(e) => println!("{}", format!("Failed to switch: {e}").red()),
        }
    }

    async fn delete_conversation(
        &mut self,
        args: &str,
        rl: &mut Editor<CliHelper, rustyline::history::DefaultHistory>,
    ) {
        let Some(conversation_id) = parse_id(args) else {
            println!("{}", "Usage: /delete <conversation id>".yellow());
            return;
        };
        let prompt = format!("Delete conversation #{conversation_id}? (yes/no) ");
        if !matches!(rl.readline(&prompt).as_deref(), Ok("yes") | Ok("y")) {
            println!("{}", "Kept the conversation.".dimmed());
            return;
        }
        match self.orchestrator.delete_conversation(conversation_id).await {
            Ok(()) => println!(
                "{}",
                format!("Deleted conversation #{conversation_id}.").dimmed()
            ),
            Err(e) => println!("{}", format!("Failed to delete conversation: {e}").red()),
        }
    }

    fn select_model(&mut self, args: &str) {
        if args.is_empty() {
            let current = self.orchestrator.selected_model();
            for model in AVAILABLE_MODELS {
                let marker = if model == current { "*" } else { " " };
                println!("{marker} {model}");
            }
            return;
        }
        if !AVAILABLE_MODELS.contains(&args) {
            println!("{}", format!("Unknown model '{args}'.").yellow());
            return;
        }
        self.orchestrator.select_model(args);
        println!("{}", format!("Model set to {args}.").dimmed());
    }

    async fn chat_turn(
        &mut self,
        content: &str,
        rl: &mut Editor<CliHelper, rustyline::history::DefaultHistory>,
    ) {
        let before = self.orchestrator.messages().len();
        match self.orchestrator.handle_input(content).await {
            Ok(TurnOutcome::ConfirmationRequested) => {
                self.confirm_delete(rl).await;
            }
            Ok(TurnOutcome::Completed) => self.print_transcript_from(before),
            Err(e) => println!("{}", e.to_string().red()),
        }
    }

    /// The confirmation gate: nothing reaches the backend until the
    /// user answers.
    async fn confirm_delete(
        &mut self,
        rl: &mut Editor<CliHelper, rustyline::history::DefaultHistory>,
    ) {
        let Some(pending) = self.orchestrator.pending_delete() else {
            return;
        };
        println!(
            "{}",
            format!(
                "Delete {}? This action cannot be undone.",
                pending.task_label
            )
            .yellow()
        );
        let before = self.orchestrator.messages().len();
        match rl.readline("confirm (yes/no) ").as_deref() {
            Ok("yes") | Ok("y") => {
                if self.orchestrator.confirm_pending_delete().await.is_ok() {
                    self.print_transcript_from(before);
                }
            }
            _ => {
                self.orchestrator.cancel_pending_delete();
                self.print_transcript_from(before);
            }
        }
    }

    /// Prints transcript entries appended since `from`, then the retry
    /// hint when the last turn failed.
    fn print_transcript_from(&self, from: usize) {
        for message in &self.orchestrator.messages()[from..] {
            match message.role {
                MessageRole::User => {
                    println!("{} {}", "you:".bright_blue(), message.content)
                }
                MessageRole::Assistant => {
                    println!("{} {}", "assistant:".bright_green(), message.content)
                }
            }
        }
        if let Some(failure) = self.orchestrator.last_failure() {
            if failure.offers_retry() {
                println!("{}", "(/retry to send that again)".dimmed());
            }
        }
    }
}

fn split_credentials(args: &str) -> Option<(&str, &str)> {
    let mut parts = args.split_whitespace();
    let email = parts.next()?;
    let password = parts.next()?;
    Some((email, password))
}

/// Splits a trailing `!priority` marker off a task title.
fn split_priority(args: &str) -> (&str, Priority) {
    for (marker, priority) in [
        ("!low", Priority::Low),
        ("!medium", Priority::Medium),
        ("!high", Priority::High),
    ] {
        if let Some(title) = args.strip_suffix(marker) {
            return (title.trim_end(), priority);
        }
    }
    (args, Priority::default())
}

fn parse_id(args: &str) -> Option<i64> {
    args.trim().parse().ok()
}

fn print_help() {
    println!("Chat with the assistant by typing anything, or use:");
    println!("  /login <email> <password>    log in");
    println!("  /register <email> <password> create an account");
    println!("  /logout                      log out");
    println!("  /tasks                       list your tasks");
    println!("  /add <title> [!high]         create a task");
    println!("  /done <id>                   toggle a task");
    println!("  /priority <id> <level>       change a task's priority");
    println!("  /rm <id>                     delete a task");
    println!("  /conversations               list conversations");
    println!("  /switch <id>                 resume a conversation");
    println!("  /new                         start a fresh conversation");
    println!("  /delete <id>                 delete a conversation");
    println!("  /model [name]                show or set the model");
    println!("  /retry                       resend the last message");
    println!("  /dismiss                     clear the last error");
    println!("  /quit                        exit");
}

/// The taskpilot REPL.
///
/// Wires the token store, request gateway, session controller, and
/// chat orchestrator together, then reads lines until EOF. Protected
/// commands are gated on credential presence only; the backend is
/// never consulted for the guard itself.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let paths = TaskpilotPaths::new()?;
    let tokens = TokenStore::new(&paths);
    let gateway = ApiGateway::from_env(tokens);
    let session = SessionController::new(gateway.clone());
    let tasks: Arc<dyn TaskGateway> = Arc::new(TaskApi::new(gateway.clone()));
    let chat: Arc<dyn ChatGateway> = Arc::new(ChatApi::new(gateway));
    let prefs = ChatStateStore::new(&paths);
    let mut app = App {
        session,
        tasks,
        orchestrator: ChatOrchestrator::new(chat, prefs),
    };

    println!("{}", "taskpilot — your tasks, one conversation away".bold());
    println!("{}", "Type /help for commands.".dimmed());

    if app.session.is_authenticated() {
        app.orchestrator.initialize().await;
        if let Some(conversation_id) = app.orchestrator.conversation_id() {
            println!(
                "{}",
                format!("Resumed conversation #{conversation_id}.").dimmed()
            );
        }
    }

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    loop {
        let prompt = if app.session.is_authenticated() {
            "you> "
        } else {
            "taskpilot> "
        };
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                match app.handle_line(&line, &mut rl).await? {
                    Flow::Continue => {}
                    Flow::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}", format!("Input error: {e}").red());
                break;
            }
        }
    }

    println!("{}", "Bye.".dimmed());
    Ok(())
}
