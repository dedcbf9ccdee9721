//! services/cli/src/commands.rs
//!
//! The `sage` command line and the application that executes it.
//! Each subcommand performs one action against the workspace and returns the
//! text to print.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use sage_core::identity::Identity;
use sage_core::ports::AuthClient;
use sage_core::workspace::Workspace;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::CliError;
use crate::render;

#[derive(Parser, Debug)]
#[command(name = "sage", version, about = "Summarize notes, then study them.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and sign in.
    Signup { email: String, password: String },
    /// Sign in with email and password.
    Signin { email: String, password: String },
    /// Sign in with a Google ID token.
    Google { credential: String },
    /// Forget the stored session. Saved summaries stay on disk.
    Signout,
    /// Show who the workspace belongs to.
    Whoami,
    /// Summarize text from an argument, a file, a URL, or stdin.
    Summarize(SummarizeArgs),
    /// List summaries, newest first.
    List,
    /// Show one summary.
    Show { id: i64 },
    /// Delete every summary.
    Clear,
    /// Group summaries into spaces.
    #[command(subcommand)]
    Space(SpaceCommand),
    /// Ask a question about a summary.
    Chat { id: i64, question: String },
    /// Show the conversation about a summary.
    History { id: i64 },
    /// Show flashcards for a summary, generating them if there are none.
    Flashcards {
        id: i64,
        /// Replace the stored deck with a new one.
        #[arg(long)]
        regenerate: bool,
    },
    /// Show or edit the notes attached to a summary.
    Notes {
        id: i64,
        /// Replace the notes text.
        #[arg(long)]
        set: Option<String>,
        /// Replace the notes title.
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct SummarizeArgs {
    /// The text to summarize.
    #[arg(conflicts_with_all = ["file", "url"])]
    pub text: Option<String>,
    /// Read the text from a UTF-8 file.
    #[arg(long, conflicts_with = "url")]
    pub file: Option<PathBuf>,
    /// Fetch the text from a web page.
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SpaceCommand {
    Create { name: String },
    List,
    Delete { id: Uuid },
    /// Move a summary into a space.
    Add { space: Uuid, summary: i64 },
    /// Choose the space new summaries join.
    Use {
        #[arg(required_unless_present = "none")]
        id: Option<Uuid>,
        /// Stop adding new summaries to a space.
        #[arg(long, conflicts_with = "id")]
        none: bool,
    },
}

/// Everything a command needs: the local workspace, the auth service, and config.
pub struct App {
    workspace: Workspace,
    auth: Arc<dyn AuthClient>,
    config: Config,
}

impl App {
    pub fn new(workspace: Workspace, auth: Arc<dyn AuthClient>, config: Config) -> Self {
        Self {
            workspace,
            auth,
            config,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn run(&self, command: Command) -> Result<String, CliError> {
        debug!("Running {:?}", command);
        match command {
            Command::Signup { email, password } => {
                let session = self.auth.signup(&email, &password).await?;
                let identity = self.workspace.sign_in(&session)?;
                Ok(format!("Account created. {}", signed_in(&identity)))
            }
            Command::Signin { email, password } => {
                let session = self.auth.signin(&email, &password).await?;
                Ok(signed_in(&self.workspace.sign_in(&session)?))
            }
            Command::Google { credential } => {
                let session = self.auth.google(&credential).await?;
                Ok(signed_in(&self.workspace.sign_in(&session)?))
            }
            Command::Signout => {
                self.workspace.sign_out()?;
                Ok("Signed out.".to_string())
            }
            Command::Whoami => {
                let identity = self.workspace.identity()?;
                if identity.is_guest() {
                    return Ok("Guest (not signed in)".to_string());
                }
                Ok(signed_in(&identity))
            }
            Command::Summarize(args) => {
                self.config.require_ai_api_key()?;
                let text = self.read_input(args).await?;
                let record = self.workspace.summarize(&text).await?;
                Ok(render::summary(&record))
            }
            Command::List => Ok(render::summary_list(&self.workspace.summaries()?)),
            Command::Show { id } => Ok(render::summary(&self.workspace.summary(id)?)),
            Command::Clear => {
                self.workspace.clear_summaries()?;
                Ok("All summaries cleared.".to_string())
            }
            Command::Space(command) => self.run_space(command),
            Command::Chat { id, question } => {
                self.config.require_ai_api_key()?;
                let reply = self.workspace.ask(id, &question).await?;
                Ok(reply.text)
            }
            Command::History { id } => {
                self.workspace.summary(id)?;
                Ok(render::chat_history(&self.workspace.chat_history(id)?))
            }
            Command::Flashcards { id, regenerate } => {
                self.workspace.summary(id)?;
                let stored = self.workspace.flashcards(id)?;
                let cards = if regenerate || stored.is_empty() {
                    self.config.require_ai_api_key()?;
                    self.workspace.generate_flashcards(id).await?
                } else {
                    stored
                };
                Ok(render::flashcards(&cards))
            }
            Command::Notes { id, set, title } => {
                if let Some(notes) = set {
                    self.workspace.set_notes(id, &notes)?;
                }
                if let Some(title) = title {
                    self.workspace.set_notes_title(id, &title)?;
                }
                Ok(format!(
                    "{}\n\n{}",
                    self.workspace.notes_title(id)?,
                    self.workspace.notes(id)?
                ))
            }
        }
    }

    fn run_space(&self, command: SpaceCommand) -> Result<String, CliError> {
        match command {
            SpaceCommand::Create { name } => {
                let space = self.workspace.create_space(&name)?;
                Ok(format!("Created space {} ({})", space.name, space.id))
            }
            SpaceCommand::List => {
                let active = self.workspace.active_space()?.map(|s| s.id);
                Ok(render::spaces(&self.workspace.spaces()?, active))
            }
            SpaceCommand::Delete { id } => {
                self.workspace.delete_space(id)?;
                Ok(format!("Deleted space {}", id))
            }
            SpaceCommand::Add { space, summary } => {
                let space = self.workspace.add_to_space(space, summary)?;
                Ok(format!("Added summary {} to {}", summary, space.name))
            }
            SpaceCommand::Use { id, none } => match (id, none) {
                (_, true) => {
                    self.workspace.set_active_space(None)?;
                    Ok("No active space.".to_string())
                }
                (Some(id), false) => {
                    self.workspace.set_active_space(Some(id))?;
                    Ok(format!("New summaries will join space {}", id))
                }
                (None, false) => Err(CliError::Usage(
                    "Give a space id, or --none to clear the active space.".to_string(),
                )),
            },
        }
    }

    /// Resolves the summarize input: the argument, then a file, then a URL, then stdin.
    async fn read_input(&self, args: SummarizeArgs) -> Result<String, CliError> {
        if let Some(text) = args.text {
            return Ok(text);
        }
        if let Some(path) = args.file {
            return tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| CliError::Input {
                    path: path.display().to_string(),
                    source,
                });
        }
        if let Some(url) = args.url {
            return Ok(self.auth.fetch_url(&url).await?);
        }

        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| CliError::Input {
                path: "stdin".to_string(),
                source,
            })?;
        Ok(text)
    }
}

fn signed_in(identity: &Identity) -> String {
    format!("Signed in as {}", identity.display_name())
}
