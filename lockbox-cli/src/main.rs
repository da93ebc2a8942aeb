use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use lockbox_core::db::has_table;
use lockbox_core::{
    db, Config, Database, EntryUpdate, EntryVault, FolderFilter, FolderRegistry, IdentityStore,
    LockboxError, NewEntry, SchemaCaps, SecretCipher, SessionStore,
};

/// LockBox CLI - a self-hosted password manager
#[derive(Parser)]
#[command(name = "lockbox")]
#[command(about = "Self-hosted password manager", long_about = None)]
struct Cli {
    /// Account username (or email) for commands that need a login
    #[arg(long, global = true, env = "LOCKBOX_USERNAME")]
    user: Option<String>,

    /// Account password for commands that need a login
    #[arg(long, global = true, env = "LOCKBOX_PASSWORD")]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account
    Register {
        username: String,

        /// Optional email address
        #[arg(long)]
        email: Option<String>,

        /// Account password (validated against the strength rules)
        #[arg(long)]
        new_password: String,
    },

    /// Verify credentials
    Login,

    /// Apply pending schema migrations
    Migrate,

    /// Add a credential entry
    Add {
        /// Title for the entry
        #[arg(long)]
        title: String,

        /// Login name stored in the entry
        #[arg(long)]
        username: String,

        /// Secret stored in the entry
        #[arg(long)]
        secret: String,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Folder id to file the entry under
        #[arg(long)]
        folder: Option<i64>,
    },

    /// List folders and entries (0 = unorganized)
    List {
        /// Restrict to one folder id
        #[arg(long)]
        folder: Option<i64>,
    },

    /// Edit an entry
    Edit {
        /// Entry id
        id: i64,

        #[arg(long)]
        title: String,

        #[arg(long)]
        username: String,

        /// New secret; omit to keep the stored one
        #[arg(long)]
        secret: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete an entry
    Delete {
        /// Entry id
        id: i64,
    },

    /// Create a folder
    CreateFolder {
        name: String,
    },

    /// Generate a strong random password
    Generate {
        /// Password length
        #[arg(long, default_value_t = 16)]
        length: usize,
    },
}

struct App {
    identity: IdentityStore,
    folders: FolderRegistry,
    vault: EntryVault,
    sessions: SessionStore,
}

impl App {
    fn build(config: &Config) -> Result<Self> {
        let cipher = SecretCipher::from_base64(&config.encryption_key)
            .context("LOCKBOX_ENCRYPTION_KEY is not a valid key")?;

        let database = Database::open(&config.db_path)
            .with_context(|| format!("failed to open {}", config.db_path.display()))?;

        // A fresh database gets the current schema; an existing one is
        // left untouched and its capabilities are detected, so the CLI
        // runs against pre-migration databases too.
        if !has_table(database.conn(), "users")? {
            database.initialize_schema()?;
        }
        let caps = SchemaCaps::detect(database.conn())?;

        let database = Arc::new(Mutex::new(database));
        Ok(Self {
            identity: IdentityStore::new(Arc::clone(&database), caps),
            folders: FolderRegistry::new(Arc::clone(&database), caps),
            vault: EntryVault::new(Arc::clone(&database), caps, cipher),
            sessions: SessionStore::with_ttl(Duration::from_secs(config.session_timeout_secs)),
        })
    }

    /// Authenticate the invocation's credentials and bind a session.
    /// Returns the user id the session resolves to; every subsequent
    /// operation is scoped by it.
    fn login(&self, user: &Option<String>, password: &Option<String>) -> Result<i64> {
        let (Some(user), Some(password)) = (user, password) else {
            bail!("this command requires --user and --password");
        };
        let account = self.identity.authenticate(user, password)?;
        let token = self.sessions.open(account.id);
        let user_id = self.sessions.resolve(&token)?;
        Ok(user_id)
    }
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    // Password generation needs neither a database nor a key
    if let Commands::Generate { length } = &cli.command {
        println!("{}", lockbox_core::generate_password(*length));
        return Ok(());
    }

    let config = Config::from_env()?;
    let app = App::build(&config)?;

    match cli.command {
        Commands::Generate { .. } => unreachable!("handled above"),

        Commands::Register {
            username,
            email,
            new_password,
        } => {
            let id = app
                .identity
                .register(&username, email.as_deref(), &new_password)?;
            println!("Registered user {} (id {}). Please log in.", username, id);
        }

        Commands::Login => {
            app.login(&cli.user, &cli.password)?;
            println!("Login OK.");
        }

        Commands::Migrate => {
            let dbh = Database::open(&config.db_path)?;
            db::migrations::migrate_to_latest(dbh.conn())?;
            println!("Database is up to date.");
        }

        Commands::Add {
            title,
            username,
            secret,
            url,
            notes,
            folder,
        } => {
            let user_id = app.login(&cli.user, &cli.password)?;
            let id = app.vault.add_entry(
                user_id,
                NewEntry {
                    title,
                    username,
                    password: secret,
                    url,
                    notes,
                    folder_id: folder,
                },
            )?;
            println!("Added entry {}.", id);
        }

        Commands::List { folder } => {
            let user_id = app.login(&cli.user, &cli.password)?;

            match app.folders.ensure_default_folders(user_id) {
                Ok(()) => {
                    for summary in app.folders.list_folders(user_id)? {
                        println!(
                            "[folder {}] {} ({} entries)",
                            summary.folder.id, summary.folder.name, summary.entry_count
                        );
                    }
                    println!(
                        "[unorganized] {} entries",
                        app.vault.unorganized_count(user_id)?
                    );
                }
                // Pre-folders database: entries only
                Err(LockboxError::SchemaUnsupported(_)) => {}
                Err(e) => return Err(e.into()),
            }

            for entry in app
                .vault
                .list_entries(user_id, FolderFilter::from_param(folder))?
            {
                let folder_name = entry.folder_name.as_deref().unwrap_or("-");
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.id,
                    entry.title,
                    entry.username,
                    entry.password,
                    folder_name
                );
            }
        }

        Commands::Edit {
            id,
            title,
            username,
            secret,
            url,
            notes,
        } => {
            let user_id = app.login(&cli.user, &cli.password)?;
            app.vault.update_entry(
                id,
                user_id,
                EntryUpdate {
                    title,
                    username,
                    password: secret,
                    url,
                    notes,
                },
            )?;
            println!("Updated entry {}.", id);
        }

        Commands::Delete { id } => {
            let user_id = app.login(&cli.user, &cli.password)?;
            if app.vault.delete_entry(id, user_id)? {
                println!("Deleted entry {}.", id);
            } else {
                println!("Entry {} not found.", id);
            }
        }

        Commands::CreateFolder { name } => {
            let user_id = app.login(&cli.user, &cli.password)?;
            let folder = app.folders.create_folder(user_id, &name)?;
            println!("Created folder {} (id {}).", folder.name, folder.id);
        }
    }

    Ok(())
}
