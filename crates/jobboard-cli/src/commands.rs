//! Command definitions and their execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::debug;

use jobboard_client::{AuthStore, BoardConfig, Caller, JobBoard};
use jobboard_models::{
    csv_to_list, lines_to_list, JobStatus, JobType, ListingDraft, ListingFilters, DEFAULT_PAGE_SIZE,
};
use jobboard_supabase::{AuthClient, JobRepository, SessionManager, SignUpOutcome, SupabaseClient};

use crate::output::{print_json, render_filters, render_listing, render_page};
use crate::session::{default_session_path, FileSessionStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and manage job listings", long_about = None)]
pub struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long)]
    pub location: Option<String>,
    /// Full-Time, Part-Time or Contract
    #[arg(long)]
    pub job_type: Option<JobType>,
}

impl ListArgs {
    fn filters(&self) -> ListingFilters {
        ListingFilters {
            location: self.location.clone(),
            job_type: self.job_type,
            poster_id: None,
        }
    }
}

/// Form fields settable from flags. List fields take one entry per line.
#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub job_type: Option<JobType>,
    #[arg(long)]
    pub responsibilities: Option<String>,
    #[arg(long)]
    pub requirements: Option<String>,
    #[arg(long)]
    pub benefits: Option<String>,
    /// Separated by commas, pipes or newlines
    #[arg(long)]
    pub tags: Option<String>,
}

impl FieldArgs {
    /// Overwrite the form fields given on the command line.
    fn apply(self, mut draft: ListingDraft) -> ListingDraft {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(company) = self.company {
            draft.company_name = company;
        }
        if let Some(location) = self.location {
            draft.location = location;
        }
        if let Some(job_type) = self.job_type {
            draft.job_type = job_type;
        }
        if let Some(text) = self.responsibilities {
            draft.responsibilities = lines_to_list(&text);
        }
        if let Some(text) = self.requirements {
            draft.requirements = lines_to_list(&text);
        }
        if let Some(text) = self.benefits {
            draft.benefits = lines_to_list(&text);
        }
        if let Some(text) = self.tags {
            draft.tags = csv_to_list(&text);
        }
        draft
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Display name stored with the account
        #[arg(long)]
        name: Option<String>,
    },
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "JOBBOARD_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    SignOut,
    /// Show the signed-in user
    Whoami,
    /// Browse published listings
    Browse {
        #[command(flatten)]
        list: ListArgs,
        /// Only your own published listings
        #[arg(long)]
        mine: bool,
    },
    /// Show filter values
    Filters {
        #[arg(long)]
        mine: bool,
    },
    /// Show one published listing
    Show { slug: String },
    /// List your listings in every status
    Mine {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Print an empty listing form as JSON
    Template,
    /// Create a listing from a JSON form and/or field flags
    Create {
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Edit one of your listings
    Edit {
        slug: String,
        /// Replace every field with this JSON form
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long)]
        status: Option<JobStatus>,
        /// Publish with the current time
        #[arg(long)]
        publish_now: bool,
    },
    /// Delete one of your listings
    Delete {
        slug: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Read one line from stdin after printing `message`.
async fn prompt(message: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        use std::io::Write;
        eprint!("{}", message);
        std::io::stderr().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    })
    .await?
}

async fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
    match password {
        Some(p) if !p.is_empty() => Ok(p),
        _ => prompt("Password: ".to_string()).await,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn read_draft(path: &Path) -> anyhow::Result<ListingDraft> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a valid listing form", path.display()))
}

/// Apply `edit` flags on top of a form.
fn apply_edit_flags(mut draft: ListingDraft, status: Option<JobStatus>, publish_now: bool) -> ListingDraft {
    if let Some(status) = status {
        draft.job_status = status;
    }
    if publish_now {
        draft.job_status = JobStatus::Published;
        draft.publish_immediately = true;
    }
    draft
}

/// Signed-in CLI context.
pub struct App {
    board: JobBoard,
    auth: AuthStore,
    json: bool,
}

impl App {
    /// Connect to the configured project and restore the saved session.
    pub async fn connect(json: bool) -> anyhow::Result<Self> {
        let client = SupabaseClient::from_env().context("Supabase connection is not configured")?;

        let session_path = default_session_path()?;
        debug!(path = %session_path.display(), "Using session file");
        let manager = SessionManager::new(
            AuthClient::new(client.clone()),
            Arc::new(FileSessionStore::new(session_path)),
        );
        let auth = AuthStore::new(Arc::new(manager));
        // Follows auth changes until the process exits
        let _listener = auth.start().await.context("Failed to restore session")?;

        let page_size = std::env::var("PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let board = JobBoard::new(
            Arc::new(JobRepository::new(client)),
            BoardConfig {
                page_size,
                ..BoardConfig::default()
            },
        );

        Ok(Self { board, auth, json })
    }

    async fn caller(&self) -> anyhow::Result<Caller> {
        self.auth
            .fresh_caller()
            .await?
            .ok_or_else(|| anyhow!("Not signed in. Run `jobboard sign-in --email <email>` first."))
    }

    pub async fn run(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::SignUp { email, password, name } => {
                let password = password_or_prompt(password).await?;
                let metadata = name.map_or_else(|| json!({}), |n| json!({ "name": n }));
                match self.auth.manager().sign_up(&email, &password, &metadata).await? {
                    SignUpOutcome::SignedIn(session) => {
                        println!("Signed up and signed in as {}", session.user.display_name());
                    }
                    SignUpOutcome::ConfirmationRequired(_) => {
                        println!("Check {} for a link to confirm your account, then sign in.", email);
                    }
                }
            }
            Command::SignIn { email, password } => {
                let password = password_or_prompt(password).await?;
                let session = self.auth.manager().sign_in(&email, &password).await?;
                println!("Signed in as {}", session.user.display_name());
            }
            Command::SignOut => {
                self.auth.manager().sign_out().await?;
                self.board.clear_cache().await;
                println!("Signed out");
            }
            Command::Whoami => match self.auth.manager().current_user().await? {
                Some(user) if self.json => print_json(&user)?,
                Some(user) => println!("{} ({})", user.display_name(), user.id),
                None => println!("Not signed in"),
            },
            Command::Browse { list, mine } => {
                let mut filters = list.filters();
                if mine {
                    filters.poster_id = Some(self.caller().await?.user_id);
                }
                let page = self.board.browse(filters, list.page).await?;
                if self.json {
                    print_json(&page)?;
                } else {
                    print!("{}", render_page(&page, false));
                }
            }
            Command::Filters { mine } => {
                let options = if mine {
                    let caller = self.caller().await?;
                    self.board.my_filter_options(Some(&caller)).await?
                } else {
                    self.board.filter_options(None).await?
                };
                if self.json {
                    print_json(&options)?;
                } else {
                    print!("{}", render_filters(&options));
                }
            }
            Command::Show { slug } => {
                let listing = self
                    .board
                    .listing(&slug)
                    .await?
                    .ok_or_else(|| anyhow!("No published listing with slug {}", slug))?;
                if self.json {
                    print_json(&listing)?;
                } else {
                    print!("{}", render_listing(&listing));
                }
            }
            Command::Mine { list } => {
                let caller = self.caller().await?;
                let page = self.board.my_listings(Some(&caller), list.filters(), list.page).await?;
                if self.json {
                    print_json(&page)?;
                } else {
                    print!("{}", render_page(&page, true));
                }
            }
            Command::Template => print_json(&ListingDraft::default())?,
            Command::Create { file, fields } => {
                let caller = self.caller().await?;
                let draft = match file {
                    Some(path) => read_draft(&path).await?,
                    None => ListingDraft::default(),
                };
                let draft = fields.apply(draft);
                let listing = self.board.create_listing(Some(&caller), draft).await?;
                if self.json {
                    print_json(&listing)?;
                } else {
                    println!("Created {} ({})", listing.slug, listing.job_status.label());
                }
            }
            Command::Edit {
                slug,
                file,
                fields,
                status,
                publish_now,
            } => {
                let caller = self.caller().await?;
                let draft = match file {
                    Some(path) => read_draft(&path).await?,
                    None => {
                        let current = self
                            .board
                            .my_listing(Some(&caller), &slug)
                            .await?
                            .ok_or_else(|| anyhow!("You have no listing with slug {}", slug))?;
                        ListingDraft::from_listing(&current)
                    }
                };
                let draft = apply_edit_flags(fields.apply(draft), status, publish_now);
                let listing = self.board.update_listing(Some(&caller), &slug, draft).await?;
                if self.json {
                    print_json(&listing)?;
                } else {
                    println!("Updated {} ({})", listing.slug, listing.job_status.label());
                }
            }
            Command::Delete { slug, yes } => {
                let caller = self.caller().await?;
                if !yes {
                    let answer = prompt(format!("Delete listing {}? This cannot be undone. [y/N] ", slug)).await?;
                    if !is_yes(&answer) {
                        bail!("Deletion cancelled");
                    }
                }
                self.board.delete_listing(Some(&caller), &slug).await?;
                println!("Deleted {}", slug);
            }
        }
        Ok(())
    }
}
