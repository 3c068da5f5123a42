use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    DirectoryController, ImportFile, ListQuery, Outcome, ProxyClient, UserForm,
};
use shared::domain::UserId;
use tracing_subscriber::EnvFilter;

mod download;
mod form_args;
mod prompt;
mod render;

use download::TempFileSink;
use form_args::UserArgs;
use prompt::StdioPrompt;

#[derive(Parser, Debug)]
#[command(name = "userdir", about = "Manage the user directory through the proxy")]
struct Cli {
    #[arg(long, env = "USERDIR_PROXY_URL", default_value = "http://127.0.0.1:3000")]
    proxy_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List users in server order.
    List {
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        /// Print the raw JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show one user with secondary emails and education history.
    Show {
        user_id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Create a user from the given fields.
    Create(UserArgs),
    /// Update a user. Child collections are replaced as a whole.
    Update {
        user_id: i64,
        #[command(flatten)]
        fields: UserArgs,
        /// Drop existing secondary emails before adding new ones.
        #[arg(long)]
        clear_secondary_emails: bool,
        /// Drop existing education entries before adding new ones.
        #[arg(long)]
        clear_educations: bool,
    },
    /// Delete a user after confirmation.
    Delete {
        user_id: i64,
        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },
    /// Download all users as CSV.
    Export {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Upload a CSV file of users.
    Import { path: PathBuf },
}

type Controller =
    DirectoryController<ProxyClient, StdioPrompt<std::io::StdinLock<'static>, std::io::Stdout>>;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let assume_yes = matches!(cli.command, Command::Delete { yes: true, .. });
    let controller = DirectoryController::new(
        ProxyClient::new(cli.proxy_url),
        StdioPrompt::stdio(assume_yes),
    );

    let outcome = run(controller, cli.command).await?;
    Ok(match outcome {
        Outcome::Failed => ExitCode::FAILURE,
        Outcome::Succeeded | Outcome::Skipped => ExitCode::SUCCESS,
    })
}

async fn run(mut ctl: Controller, command: Command) -> Result<Outcome> {
    let outcome = match command {
        Command::List { skip, limit, json } => {
            let mut ctl = ctl.with_query(ListQuery { skip, limit });
            let outcome = ctl.fetch_users().await;
            if outcome == Outcome::Succeeded {
                if json {
                    println!("{}", serde_json::to_string_pretty(ctl.users())?);
                } else {
                    print!("{}", render::render_users(ctl.users(), render::terminal_width()));
                }
            }
            report_error(&ctl);
            outcome
        }
        Command::Show { user_id, json } => {
            let outcome = ctl.fetch_user_detail(UserId(user_id)).await;
            if let Some(user) = ctl.detail().user() {
                if json {
                    println!("{}", serde_json::to_string_pretty(user)?);
                } else {
                    print!("{}", render::render_detail(user));
                }
            }
            if let Some(message) = ctl.detail().phase().failure() {
                eprintln!("{message}");
            }
            outcome
        }
        Command::Create(fields) => {
            let missing = fields.missing_required();
            if !missing.is_empty() {
                eprintln!("missing required fields: {}", missing.join(", "));
                return Ok(Outcome::Failed);
            }
            ctl.open_create();
            if let Some(draft) = ctl.draft_mut() {
                fields.apply(draft);
            }
            let outcome = ctl.submit_form().await;
            report_error(&ctl);
            outcome
        }
        Command::Update {
            user_id,
            fields,
            clear_secondary_emails,
            clear_educations,
        } => {
            if ctl.fetch_user_detail(UserId(user_id)).await == Outcome::Failed {
                if let Some(message) = ctl.detail().phase().failure() {
                    eprintln!("{message}");
                }
                return Ok(Outcome::Failed);
            }
            let Some(user) = ctl.detail().user().cloned() else {
                return Ok(Outcome::Failed);
            };
            ctl.open_edit(user);
            if let Some(draft) = ctl.draft_mut() {
                edit_draft(draft, fields, clear_secondary_emails, clear_educations);
            }
            let outcome = ctl.submit_form().await;
            report_error(&ctl);
            outcome
        }
        Command::Delete { user_id, .. } => ctl.delete_user(UserId(user_id)).await,
        Command::Export { out_dir } => {
            let mut sink = TempFileSink::new(out_dir);
            let outcome = ctl.export_csv(&mut sink).await;
            for path in sink.saved() {
                println!("Saved {}", path.display());
            }
            outcome
        }
        Command::Import { path } => {
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "import.csv".to_string());
            ctl.select_file(Some(ImportFile { name, bytes }));
            ctl.import_selected().await
        }
    };
    Ok(outcome)
}

fn edit_draft(
    draft: &mut UserForm,
    fields: UserArgs,
    clear_secondary_emails: bool,
    clear_educations: bool,
) {
    if clear_secondary_emails {
        draft.secondary_emails.clear();
    }
    if clear_educations {
        draft.educations.clear();
    }
    fields.apply(draft);
}

fn report_error(ctl: &Controller) {
    if let Some(message) = ctl.error() {
        eprintln!("{message}");
    }
}
