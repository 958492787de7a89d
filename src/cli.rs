//! Line-oriented front end over the task service.
//!
//! Each input line is tokenized and parsed as a clap multicall command, so
//! `add "Buy milk" --due 2024-05-01` works the same as a shell invocation
//! would. Everything runs against in-memory storage for a single local user.

use std::io::{BufRead, Write};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::models::{NewTask, Task, TaskPatch, TaskStatus};
use crate::services::{DomainError, TaskService};
use crate::storage::InMemoryTaskStore;

const PROMPT: &str = "todo> ";
const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Parser)]
#[command(multicall = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// YYYY-MM-DD or "YYYY-MM-DD HH:MM" (UTC)
        #[arg(long, value_parser = parse_due)]
        due: Option<DateTime<Utc>>,
    },
    /// List tasks, oldest first
    #[command(visible_alias = "ls")]
    List {
        #[arg(short, long)]
        status: Option<TaskStatus>,
    },
    /// Show one task in full
    Show { id: String },
    /// Change title, description or due date
    Update {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        /// An empty string clears the description
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_due)]
        due: Option<DateTime<Utc>>,
    },
    /// Set the status explicitly (pending, in_progress, completed)
    Status { id: String, status: TaskStatus },
    /// Mark a task in progress
    Start { id: String },
    /// Mark a task completed
    #[command(visible_alias = "done")]
    Complete { id: String },
    /// Move a task back to pending
    Reopen { id: String },
    /// Delete a task
    #[command(visible_alias = "rm")]
    Delete { id: String },
    /// Leave the shell
    #[command(visible_alias = "quit")]
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Interactive session bound to one local principal.
pub struct Repl {
    service: TaskService,
    owner: Uuid,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

impl Repl {
    pub fn new() -> Self {
        Self {
            service: TaskService::new(Arc::new(InMemoryTaskStore::new())),
            owner: Uuid::new_v4(),
        }
    }

    /// Reads commands until `exit` or end of input.
    pub async fn run<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> anyhow::Result<()> {
        writeln!(out, "Todo shell. Type 'help' for commands.")?;
        write!(out, "{PROMPT}")?;
        out.flush()?;

        for line in input.lines() {
            let line = line?;
            if self.execute(&line, out).await? == Flow::Exit {
                break;
            }
            write!(out, "{PROMPT}")?;
            out.flush()?;
        }
        writeln!(out)?;
        Ok(())
    }

    async fn execute<W: Write>(&self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let args = match split_args(line) {
            Ok(args) if args.is_empty() => return Ok(Flow::Continue),
            Ok(args) => args,
            Err(e) => {
                writeln!(out, "Error: {e}")?;
                return Ok(Flow::Continue);
            }
        };

        let command = match Line::try_parse_from(args) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                // Covers `help` and `--help` too
                write!(out, "{}", e.render())?;
                return Ok(Flow::Continue);
            }
        };

        if let Command::Exit = command {
            return Ok(Flow::Exit);
        }
        match self.dispatch(command, out).await {
            Ok(()) => {}
            Err(CliError::Domain(DomainError::Internal(e))) => return Err(e),
            Err(e) => writeln!(out, "Error: {e}")?,
        }
        Ok(Flow::Continue)
    }

    async fn dispatch<W: Write>(&self, command: Command, out: &mut W) -> Result<(), CliError> {
        match command {
            Command::Add {
                title,
                description,
                due,
            } => {
                let new_task = NewTask {
                    title: title.join(" "),
                    description,
                    due_date: due,
                };
                let task = self.service.create(self.owner, new_task).await?;
                writeln!(out, "Created {} {}", short_id(&task), task.title)?;
            }
            Command::List { status } => {
                let mut tasks = self.service.list(self.owner, status).await?;
                if tasks.is_empty() {
                    writeln!(out, "No tasks.")?;
                }
                tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
                for task in &tasks {
                    writeln!(out, "{}", summary_line(task))?;
                }
            }
            Command::Show { id } => {
                let task = self.service.get(self.owner, self.resolve(&id).await?).await?;
                write_details(&task, out)?;
            }
            Command::Update {
                id,
                title,
                description,
                due,
            } => {
                let patch = TaskPatch {
                    title,
                    description,
                    status: None,
                    due_date: due,
                };
                if patch.is_empty() {
                    return Err(CliError::Usage(
                        "nothing to update (use --title, --description or --due)".into(),
                    ));
                }
                let id = self.resolve(&id).await?;
                let task = self.service.update(self.owner, id, patch).await?;
                writeln!(out, "Updated {}", summary_line(&task))?;
            }
            Command::Status { id, status } => self.change_status(&id, status, out).await?,
            Command::Start { id } => self.change_status(&id, TaskStatus::InProgress, out).await?,
            Command::Complete { id } => self.change_status(&id, TaskStatus::Completed, out).await?,
            Command::Reopen { id } => self.change_status(&id, TaskStatus::Pending, out).await?,
            Command::Delete { id } => {
                let id = self.resolve(&id).await?;
                if self.service.delete(self.owner, id).await? {
                    writeln!(out, "Deleted {}", &id.to_string()[..SHORT_ID_LEN])?;
                } else {
                    return Err(DomainError::NotFound.into());
                }
            }
            Command::Exit => {}
        }
        Ok(())
    }

    async fn change_status<W: Write>(
        &self,
        id: &str,
        status: TaskStatus,
        out: &mut W,
    ) -> Result<(), CliError> {
        let id = self.resolve(id).await?;
        let task = self.service.set_status(self.owner, id, status).await?;
        writeln!(out, "{}", summary_line(&task))?;
        Ok(())
    }

    /// Accepts a full id or any prefix that matches exactly one task.
    async fn resolve(&self, prefix: &str) -> Result<Uuid, CliError> {
        if let Ok(id) = Uuid::parse_str(prefix) {
            return Ok(id);
        }

        let prefix = prefix.to_ascii_lowercase();
        let matches: Vec<Uuid> = self
            .service
            .list(self.owner, None)
            .await?
            .into_iter()
            .map(|t| t.id)
            .filter(|id| id.to_string().starts_with(&prefix))
            .collect();

        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(CliError::Usage(format!("no task matches '{prefix}'"))),
            many => Err(CliError::Usage(format!(
                "'{prefix}' is ambiguous ({} tasks match)",
                many.len()
            ))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0}")]
    Usage(String),
    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
}

fn short_id(task: &Task) -> String {
    task.id.to_string()[..SHORT_ID_LEN].to_string()
}

fn summary_line(task: &Task) -> String {
    let mut line = format!("{}  [{:<11}] {}", short_id(task), task.status, task.title);
    if let Some(due) = task.due_date {
        line.push_str(&format!("  (due {})", due.format("%Y-%m-%d %H:%M")));
    }
    line
}

fn write_details<W: Write>(task: &Task, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "id:          {}", task.id)?;
    writeln!(out, "title:       {}", task.title)?;
    writeln!(
        out,
        "description: {}",
        task.description.as_deref().unwrap_or("-")
    )?;
    writeln!(out, "status:      {}", task.status)?;
    match task.due_date {
        Some(due) => writeln!(out, "due:         {}", due.format("%Y-%m-%d %H:%M"))?,
        None => writeln!(out, "due:         -")?,
    }
    writeln!(out, "created:     {}", task.created_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "updated:     {}", task.updated_at.format("%Y-%m-%d %H:%M:%S"))?;
    Ok(())
}

fn parse_due(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date '{value}' (expected YYYY-MM-DD [HH:MM])"))
}

/// Whitespace splitting with single and double quotes. Quotes group words and
/// are dropped; `""` yields an empty argument.
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".into());
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}
