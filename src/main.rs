mod clipboard;
mod prompt;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};
use otpdeck::config::{self, Settings};
use otpdeck::edit::ImportOutcome;
use otpdeck::encoding::{self, Domain, OtpType};
use otpdeck::live::LiveEntryState;
use otpdeck::otpauth::OtpAuthUri;
use otpdeck::{
    EditMode, EntryEditSession, KeyBackend, LiveCodeRegistry, Navigation, TickOutcome, Vault,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::clipboard::copy_to_clipboard;
use crate::prompt::{prompt_new_password, prompt_password_hidden, prompt_required};

#[derive(Parser, Debug)]
#[command(name = "otpdeck", version, about = "One-time password authenticator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the encrypted vault
    Init,

    /// Add a new entry
    ///
    /// Examples:
    ///   otpdeck add --identifier github --secret JBSWY3DPEHPK3PXP
    ///   otpdeck add --uri 'otpauth://totp/GitHub:me?secret=JBSWY3DPEHPK3PXP'
    Add {
        /// otpauth:// URI from a QR code
        #[arg(long)]
        uri: Option<String>,
        #[command(flatten)]
        fields: EntryArgs,
    },

    /// Change an existing entry
    Edit {
        identifier: String,
        /// otpauth:// URI from a QR code
        #[arg(long)]
        uri: Option<String>,
        #[command(flatten)]
        fields: EntryArgs,
    },

    /// Delete an entry
    Rm { identifier: String },

    /// Advance the counter of an HOTP entry
    Next { identifier: String },

    /// List entries with their current codes
    Ls,

    /// Keep the list on screen, updating every second
    Watch,

    /// Print (or copy) the current code of one entry
    Code {
        identifier: String,
        /// Copy to the clipboard instead of printing
        #[arg(long)]
        clip: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print settings and paths
    Show,
    /// Change a setting, e.g. `otpdeck config set show_issuer true`
    Set { key: String, value: String },
}

/// Form fields. Anything given here counts as typed by the user.
#[derive(Args, Debug, Default)]
struct EntryArgs {
    #[arg(long)]
    identifier: Option<String>,
    #[arg(long)]
    issuer: Option<String>,
    #[arg(long)]
    secret: Option<String>,
    /// HEX or Base32
    #[arg(long)]
    encoding: Option<String>,
    /// TOTP or HOTP
    #[arg(long = "type")]
    otp_type: Option<String>,
    /// 6, 7 or 8
    #[arg(long, allow_negative_numbers = true)]
    digits: Option<i64>,
    /// SHA1, SHA256 or SHA512
    #[arg(long)]
    algorithm: Option<String>,
    /// TOTP time step in seconds
    #[arg(long, allow_negative_numbers = true)]
    period: Option<i64>,
    /// HOTP counter or TOTP time offset
    #[arg(long, allow_negative_numbers = true)]
    counter: Option<i64>,
}

impl EntryArgs {
    fn apply(self, session: &mut EntryEditSession) {
        if let Some(v) = self.identifier {
            session.set_identifier(v);
        }
        if let Some(v) = self.issuer {
            session.set_issuer(v);
        }
        if let Some(v) = self.secret {
            session.set_secret(v);
        }
        if let Some(v) = self.encoding {
            session.set_secret_encoding(v);
        }
        if let Some(v) = self.otp_type {
            session.set_otp_type(v);
        }
        if let Some(v) = self.digits {
            session.set_digit_count(v);
        }
        if let Some(v) = self.algorithm {
            session.set_hash_algorithm(v);
        }
        if let Some(v) = self.period {
            session.set_period(v);
        }
        if let Some(v) = self.counter {
            session.set_counter_or_offset(v);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let _guard = init_logging(&settings)?;

    match cli.command {
        Commands::Init => cmd_init(&settings)?,
        Commands::Add { uri, fields } => cmd_edit(&settings, EditMode::New, uri, fields)?,
        Commands::Edit {
            identifier,
            uri,
            fields,
        } => cmd_edit(&settings, EditMode::Editing(identifier), uri, fields)?,
        Commands::Rm { identifier } => cmd_rm(&settings, &identifier)?,
        Commands::Next { identifier } => cmd_next(&settings, &identifier)?,
        Commands::Ls => cmd_ls(&settings)?,
        Commands::Watch => cmd_watch(&settings)?,
        Commands::Code { identifier, clip } => cmd_code(&settings, &identifier, clip)?,
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Show => cmd_config_show(&settings)?,
            ConfigCommands::Set { key, value } => cmd_config_set(settings, &key, &value)?,
        },
    }

    Ok(())
}

/// stderr by default; the daily log file under the data dir when
/// `log_to_file` is on. `RUST_LOG` picks the level.
fn init_logging(settings: &Settings) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if settings.log_to_file {
        let log_dir = config::data_dir()?.join("logs");
        std::fs::create_dir_all(&log_dir)?;
        let file_appender = tracing_appender::rolling::daily(log_dir, "otpdeck.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(false)
            .init();
        return Ok(Some(guard));
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(None)
}

fn open_vault(settings: &Settings) -> anyhow::Result<Arc<Vault>> {
    let path = settings.vault_path()?;
    if !path.exists() {
        bail!("No vault at {}, run `otpdeck init` first.", path.display());
    }
    let password = prompt_password_hidden("Master password: ")?;
    Ok(Arc::new(Vault::open(&path, &password)?))
}

fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let path = settings.vault_path()?;
    if path.exists() {
        println!("Vault already exists at: {}", path.display());
        return Ok(());
    }

    let password = prompt_new_password()?;
    Vault::create(&path, &password)?;
    println!("Initialized vault at {}", path.display());
    Ok(())
}

fn cmd_edit(
    settings: &Settings,
    mode: EditMode,
    uri: Option<String>,
    fields: EntryArgs,
) -> anyhow::Result<()> {
    let vault = open_vault(settings)?;
    let mut session = EntryEditSession::start(vault.clone(), mode)?;

    if let Some(uri) = uri {
        match session.apply_import(&OtpAuthUri::parse(&uri))? {
            ImportOutcome::Applied => {}
            ImportOutcome::NotReady => bail!("Not an otpauth:// URI: {uri}"),
        }
    }
    fields.apply(&mut session);

    if session.form().identifier.trim().is_empty() {
        session.set_identifier(prompt_required("Identifier: ")?);
    }
    if session.form().secret.trim().is_empty() {
        session.set_secret(prompt_password_hidden("Secret: ")?);
    }

    if let Some(reason) = session.save_blocker() {
        bail!("{reason}");
    }
    let navigation = session.commit()?;
    println!("Saved entry {}", session.form().identifier.trim());

    // Editing closes the detail view too: land back on the list.
    if navigation == Navigation::CloseEditorAndDetail {
        println!("Closed edit and detail views ({} levels).", navigation.levels());
        let mut registry = LiveCodeRegistry::new(vault);
        registry.refresh();
        print_entries(&registry, settings);
    }
    Ok(())
}

fn cmd_rm(settings: &Settings, identifier: &str) -> anyhow::Result<()> {
    let vault = open_vault(settings)?;
    if !vault.delete_entry(identifier) {
        bail!("Failed to remove the entry '{identifier}'");
    }
    println!("Removed {identifier}");
    Ok(())
}

fn cmd_next(settings: &Settings, identifier: &str) -> anyhow::Result<()> {
    let vault = open_vault(settings)?;
    if !vault.increment_hotp_counter(identifier) {
        bail!("Cannot increment the HOTP counter for '{identifier}'");
    }
    cmd_code_with(vault, identifier, false)
}

fn cmd_ls(settings: &Settings) -> anyhow::Result<()> {
    let vault = open_vault(settings)?;
    let mut registry = LiveCodeRegistry::new(vault);
    registry.refresh();
    print_entries(&registry, settings);
    Ok(())
}

fn cmd_watch(settings: &Settings) -> anyhow::Result<()> {
    let vault = open_vault(settings)?;
    let mut registry = LiveCodeRegistry::new(vault);
    registry.refresh();

    loop {
        // Clear screen, cursor home.
        print!("\x1b[2J\x1b[H");
        print_entries(&registry, settings);
        println!("\nCtrl+C to quit.");
        std::thread::sleep(Duration::from_secs(1));
        // The tick counts from each refresh; the real window may end first.
        if registry.tick() == TickOutcome::Advanced && registry.next_rollover() == Some(0) {
            registry.refresh();
        }
    }
}

fn cmd_code(settings: &Settings, identifier: &str, clip: bool) -> anyhow::Result<()> {
    let vault = open_vault(settings)?;
    cmd_code_with(vault, identifier, clip)
}

fn cmd_code_with(vault: Arc<Vault>, identifier: &str, clip: bool) -> anyhow::Result<()> {
    let mut registry = LiveCodeRegistry::new(vault);
    registry.refresh();
    let entry = registry
        .get(identifier)
        .ok_or_else(|| anyhow!("No entry named '{identifier}'"))?;
    if let Some(reason) = entry.error() {
        bail!("{identifier}: {reason}");
    }

    if clip {
        copy_to_clipboard(&entry.code)?;
        println!("OTP code copied to clipboard.");
    } else {
        println!("{}", entry.code);
    }
    Ok(())
}

fn cmd_config_show(settings: &Settings) -> anyhow::Result<()> {
    println!("config: {}", config::config_path()?.display());
    println!("vault:  {}", settings.vault_path()?.display());
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

fn cmd_config_set(mut settings: Settings, key: &str, value: &str) -> anyhow::Result<()> {
    settings.set(key, value)?;
    settings.save_to(&config::config_path()?)?;
    println!("{key} = {value}");
    Ok(())
}

fn print_entries(registry: &LiveCodeRegistry, settings: &Settings) {
    if registry.is_empty() {
        println!("No entries yet, add one with `otpdeck add`.");
        return;
    }
    for entry in registry.entries() {
        println!("{}", entry_line(entry, settings));
    }
}

fn entry_line(entry: &LiveEntryState, settings: &Settings) -> String {
    if let Some(reason) = entry.error() {
        return format!("{:<28} ERROR: {reason}", entry.identifier);
    }

    let is_hotp = OtpType::from_code(entry.otp_type) == Some(OtpType::Hotp);
    let mut line = format!("{:<28} {:>9}", entry.identifier, entry.display_code);
    if !is_hotp {
        let left = entry.seconds_left();
        line.push_str(&format!(
            "  {} {left:>2}s",
            countdown_bar(entry.period - left, entry.period)
        ));
    }
    if settings.show_issuer {
        if let Some(issuer) = &entry.issuer {
            line.push_str(&format!("  [{issuer}]"));
        }
    }
    if settings.show_hash_algorithm {
        line.push_str(&format!(
            "  {}",
            encoding::to_label(entry.hash_algorithm, Domain::HashAlgorithm)
        ));
    }
    if settings.show_hotp_counter && is_hotp {
        line.push_str(&format!("  #{}", entry.hotp_counter));
    }
    line
}

/// Ten-cell bar for the part of the period already used up.
fn countdown_bar(used: i64, period: i64) -> String {
    let cells = if period > 0 {
        (used.clamp(0, period) * 10 / period) as usize
    } else {
        0
    };
    format!("{}{}", "#".repeat(cells), ".".repeat(10 - cells))
}
