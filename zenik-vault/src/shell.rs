//! Interactive vault shell.
//!
//! A line-oriented front end over `SessionManager`. Item positions are shown
//! and entered 1-based; the session itself is 0-based.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::{Result, ZenikError};
use crate::events::EventSink;
use crate::storage::{save_settings, AppSettings};
use crate::vault::{
    Item, ItemEdit, ItemField, ItemKind, NewLogin, SessionManager, VaultError, VaultStatus,
};

const HELP: &str = "\
Commands:
  unlock                 unlock the vault with the master password
  lock                   lock the vault
  status                 show vault and clipboard status
  list [tag]             list items, optionally only those tagged <tag>
  search <text>          search all item fields
  show <n> [--reveal]    show item <n>, secret masked unless --reveal
  copy <n> <field>       copy a field (title, username, password, url, note, value)
  add-note               add a note
  add-login              add a login
  edit <n>               edit item <n>
  delete <n>             delete item <n>
  settings               show settings
  set autolock <min>     set the auto-lock timeout in minutes
  set clear <sec>        set the clipboard auto-clear delay in seconds
  destroy                delete the vault and its salt
  help                   show this help
  quit                   lock and exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    AutolockMinutes,
    ClipboardClearSeconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Status,
    Unlock,
    Lock,
    List(Option<String>),
    Search(String),
    Show { index: usize, reveal: bool },
    Copy { index: usize, field: ItemField },
    AddNote,
    AddLogin,
    Edit(usize),
    Delete(usize),
    Settings,
    Set { setting: Setting, value: u64 },
    Destroy,
    Quit,
}

/// Parse a 1-based position into a 0-based index.
fn parse_position(arg: Option<&str>) -> std::result::Result<usize, String> {
    let arg = arg.ok_or_else(|| "missing item number".to_string())?;
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("invalid item number '{}'", arg)),
    }
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();

        let parsed = match command.as_str() {
            "help" | "?" => ShellCommand::Help,
            "status" => ShellCommand::Status,
            "unlock" => ShellCommand::Unlock,
            "lock" => ShellCommand::Lock,
            "list" | "ls" => ShellCommand::List(words.next().map(str::to_string)),
            "search" | "find" => {
                let query = words.by_ref().collect::<Vec<_>>().join(" ");
                if query.is_empty() {
                    return Err("usage: search <text>".into());
                }
                ShellCommand::Search(query)
            }
            "show" | "view" => {
                let index = parse_position(words.next())?;
                let reveal = match words.next() {
                    None => false,
                    Some("--reveal" | "-r") => true,
                    Some(other) => return Err(format!("unknown option '{}'", other)),
                };
                ShellCommand::Show { index, reveal }
            }
            "copy" | "cp" => {
                let index = parse_position(words.next())?;
                let field = words
                    .next()
                    .ok_or_else(|| "usage: copy <n> <field>".to_string())?
                    .parse::<ItemField>()?;
                ShellCommand::Copy { index, field }
            }
            "add-note" => ShellCommand::AddNote,
            "add-login" => ShellCommand::AddLogin,
            "edit" => ShellCommand::Edit(parse_position(words.next())?),
            "delete" | "rm" => ShellCommand::Delete(parse_position(words.next())?),
            "settings" => ShellCommand::Settings,
            "set" => {
                let setting = match words.next() {
                    Some("autolock") => Setting::AutolockMinutes,
                    Some("clear") => Setting::ClipboardClearSeconds,
                    _ => return Err("usage: set autolock <min> | set clear <sec>".into()),
                };
                let value = words
                    .next()
                    .and_then(|v| v.parse::<u64>().ok())
                    .ok_or_else(|| "expected a whole number".to_string())?;
                ShellCommand::Set { setting, value }
            }
            "destroy" => ShellCommand::Destroy,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => return Err(format!("unknown command '{}' (try 'help')", other)),
        };

        if words.next().is_some() && !matches!(parsed, ShellCommand::Search(_)) {
            return Err(format!("too many arguments for '{}'", command));
        }
        Ok(parsed)
    }
}

/// Source of user input. `None` means end of input.
pub trait Prompter {
    fn line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    /// Read without echo.
    fn secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads from the terminal; secrets are read with echo disabled.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut buf = String::new();
        if io::stdin().lock().read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(secret) => Ok(Some(secret)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub struct Shell<P: Prompter, W: Write> {
    session: SessionManager,
    settings: AppSettings,
    config_path: PathBuf,
    events: Arc<dyn EventSink>,
    prompter: P,
    out: W,
}

impl<P: Prompter, W: Write> Shell<P, W> {
    pub fn new(
        session: SessionManager,
        settings: AppSettings,
        config_path: PathBuf,
        events: Arc<dyn EventSink>,
        prompter: P,
        out: W,
    ) -> Self {
        Self {
            session,
            settings,
            config_path,
            events,
            prompter,
            out,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Run until `quit` or end of input, then lock.
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.out, "zenik vault. Type 'help' for commands.")?;

        loop {
            let was_unlocked = self.session.status().is_unlocked();
            if was_unlocked && self.session.is_idle_locked() {
                writeln!(
                    self.out,
                    "Auto-locked after {} min inactivity.",
                    self.session.autolock().as_secs() / 60
                )?;
            }

            let prompt = match self.session.status() {
                VaultStatus::Unlocked => "vault> ",
                VaultStatus::Locked => "vault (locked)> ",
            };
            let Some(line) = self.prompter.line(prompt)? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match line.parse::<ShellCommand>() {
                Ok(command) => command,
                Err(msg) => {
                    writeln!(self.out, "{}", msg)?;
                    continue;
                }
            };
            if command == ShellCommand::Quit {
                break;
            }

            match self.execute(command) {
                Ok(()) => {}
                Err(ZenikError::Vault(e)) if e.requires_unlock() => {
                    writeln!(self.out, "{}. Use 'unlock' first.", e)?;
                }
                Err(ZenikError::Vault(VaultError::ClipboardUnavailable(msg))) => {
                    writeln!(
                        self.out,
                        "Clipboard unavailable ({}). Use 'show <n> --reveal' instead.",
                        msg
                    )?;
                }
                Err(ZenikError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                    return Err(ZenikError::Io(e));
                }
                Err(e) => writeln!(self.out, "Error: {}", e)?,
            }
        }

        self.session.lock();
        Ok(())
    }

    pub fn execute(&mut self, command: ShellCommand) -> Result<()> {
        match command {
            ShellCommand::Help => writeln!(self.out, "{}", HELP)?,
            ShellCommand::Status => self.status()?,
            ShellCommand::Unlock => self.unlock()?,
            ShellCommand::Lock => {
                self.session.lock();
                writeln!(self.out, "Vault locked.")?;
            }
            ShellCommand::List(tag) => {
                let items = self.session.list(tag.as_deref())?;
                print_items(&mut self.out, &items)?;
            }
            ShellCommand::Search(query) => {
                let hits = self.session.search(&query)?;
                print_items(&mut self.out, &hits)?;
            }
            ShellCommand::Show { index, reveal } => self.show(index, reveal)?,
            ShellCommand::Copy { index, field } => {
                self.session.copy_field(index, field)?;
                if field.is_secret() {
                    writeln!(
                        self.out,
                        "Copied {} (auto-clear in {}s).",
                        field,
                        self.session.clipboard_clear_seconds()
                    )?;
                } else {
                    writeln!(self.out, "Copied {}.", field)?;
                }
            }
            ShellCommand::AddNote => self.add_note()?,
            ShellCommand::AddLogin => self.add_login()?,
            ShellCommand::Edit(index) => self.edit(index)?,
            ShellCommand::Delete(index) => self.delete(index)?,
            ShellCommand::Settings => {
                writeln!(
                    self.out,
                    "Vault autolock minutes: {}",
                    self.settings.vault_autolock_minutes
                )?;
                writeln!(
                    self.out,
                    "Vault clipboard clear seconds: {}",
                    self.settings.vault_clipboard_clear_seconds
                )?;
            }
            ShellCommand::Set { setting, value } => self.set(setting, value)?,
            ShellCommand::Destroy => self.destroy()?,
            ShellCommand::Quit => {}
        }
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        Ok(self.prompter.line(prompt)?)
    }

    fn ask_secret(&mut self, prompt: &str) -> Result<Option<Zeroizing<String>>> {
        Ok(self.prompter.secret(prompt)?.map(Zeroizing::new))
    }

    fn cancelled(&mut self) -> Result<()> {
        writeln!(self.out, "Cancelled.")?;
        Ok(())
    }

    fn status(&mut self) -> Result<()> {
        let clipboard_ok = self.session.clipboard().backend().is_available();
        writeln!(
            self.out,
            "Vault: {} | Auto-lock: {} min | Clipboard: {} | Auto-clear: {}s",
            self.session.status(),
            self.session.autolock().as_secs() / 60,
            if clipboard_ok { "OK" } else { "NO" },
            self.session.clipboard_clear_seconds()
        )?;
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        let Some(password) = self.ask_secret("Master password: ")? else {
            return self.cancelled();
        };
        if password.is_empty() {
            return self.cancelled();
        }

        match self.session.unlock(&password) {
            Ok(()) => {
                let count = self.session.item_count()?;
                writeln!(self.out, "Vault unlocked ({} items).", count)?;
            }
            Err(VaultError::Authentication) => {
                writeln!(self.out, "Wrong master password (or vault corrupted).")?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn show(&mut self, index: usize, reveal: bool) -> Result<()> {
        let view = self.session.view(index, reveal)?;

        writeln!(self.out, "{} ({})", view.title, view.kind)?;
        if let Some(username) = &view.username {
            writeln!(self.out, "  Username: {}", username)?;
        }
        let label = match view.secret_field {
            ItemField::Password => "Password",
            _ => "Text",
        };
        writeln!(self.out, "  {}: {}", label, view.secret)?;
        if let Some(url) = view.url.as_deref().filter(|u| !u.is_empty()) {
            writeln!(self.out, "  URL: {}", url)?;
        }
        if let Some(note) = &view.note {
            writeln!(self.out, "  Note: {}", note)?;
        }
        if !view.tags.is_empty() {
            writeln!(self.out, "  Tags: {}", view.tags)?;
        }
        writeln!(self.out, "  Created: {}", view.created_at)?;
        if let Some(updated) = &view.updated_at {
            writeln!(self.out, "  Updated: {}", updated)?;
        }
        Ok(())
    }

    fn add_note(&mut self) -> Result<()> {
        let Some(title) = self.ask("Title: ")? else {
            return self.cancelled();
        };
        let Some(value) = self.ask("Text: ")?.map(Zeroizing::new) else {
            return self.cancelled();
        };
        let tags = self.ask("Tags (comma separated): ")?.unwrap_or_default();

        let item = self.session.add_note(&title, &value, &tags)?;
        writeln!(self.out, "Added {}.", item.summary())?;
        Ok(())
    }

    fn add_login(&mut self) -> Result<()> {
        let Some(title) = self.ask("Title: ")? else {
            return self.cancelled();
        };
        let Some(username) = self.ask("Username: ")? else {
            return self.cancelled();
        };
        let Some(password) = self.ask_secret("Password: ")? else {
            return self.cancelled();
        };
        let url = self.ask("URL (optional): ")?.unwrap_or_default();
        let note = self.ask("Note (optional): ")?.unwrap_or_default();
        let tags = self.ask("Tags (comma separated): ")?.unwrap_or_default();

        let item = self.session.add_login(NewLogin {
            title: &title,
            username: &username,
            password: &password,
            url: Some(url.as_str()),
            note: Some(note.as_str()),
            tags: &tags,
        })?;
        writeln!(self.out, "Added {}.", item.summary())?;
        Ok(())
    }

    fn edit(&mut self, index: usize) -> Result<()> {
        let kind = self.session.get(index)?.kind();
        writeln!(self.out, "Leave a field blank to keep it.")?;

        let mut edit = ItemEdit {
            title: self.ask_optional("Title: ")?,
            ..Default::default()
        };
        match kind {
            ItemKind::Note => {
                edit.value = self.ask_optional("Text: ")?;
            }
            ItemKind::Login => {
                edit.username = self.ask_optional("Username: ")?;
                edit.password = self
                    .ask_secret("Password: ")?
                    .filter(|p| !p.is_empty())
                    .map(|p| p.to_string());
                edit.url = self.ask_optional("URL: ")?;
                edit.note = self.ask_optional("Note: ")?;
            }
        }
        edit.tags = self.ask_optional("Tags (comma separated): ")?;

        let item = self.session.edit(index, &edit);
        wipe_edit(&mut edit);
        writeln!(self.out, "Updated {}.", item?.summary())?;
        Ok(())
    }

    fn ask_optional(&mut self, prompt: &str) -> Result<Option<String>> {
        Ok(self.ask(prompt)?.filter(|answer| !answer.is_empty()))
    }

    fn delete(&mut self, index: usize) -> Result<()> {
        let title = self.session.get(index)?.title().to_string();
        let answer = self.ask(&format!("Delete '{}'? [y/N] ", title))?;
        if !matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes")) {
            return self.cancelled();
        }

        let removed = self.session.delete(index)?;
        writeln!(self.out, "Deleted '{}'.", removed.title())?;
        Ok(())
    }

    fn set(&mut self, setting: Setting, value: u64) -> Result<()> {
        let message = match setting {
            Setting::AutolockMinutes => {
                self.settings.vault_autolock_minutes = value.max(1);
                format!(
                    "Settings: vault_autolock_minutes set to {}.",
                    self.settings.vault_autolock_minutes
                )
            }
            Setting::ClipboardClearSeconds => {
                self.settings.vault_clipboard_clear_seconds = value;
                format!(
                    "Settings: vault_clipboard_clear_seconds set to {}.",
                    self.settings.vault_clipboard_clear_seconds
                )
            }
        };

        save_settings(&self.settings, &self.config_path)?;
        self.session.apply_settings(&self.settings);
        self.events.record(&message);
        writeln!(self.out, "Saved.")?;
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        let answer = self.ask("This deletes every item. Type DESTROY to confirm: ")?;
        if answer.as_deref().map(str::trim) != Some("DESTROY") {
            return self.cancelled();
        }
        self.session.destroy()?;
        writeln!(self.out, "Vault destroyed.")?;
        Ok(())
    }
}

fn wipe_edit(edit: &mut ItemEdit) {
    use zeroize::Zeroize;
    if let Some(password) = edit.password.as_mut() {
        password.zeroize();
    }
    if let Some(value) = edit.value.as_mut() {
        value.zeroize();
    }
}

fn print_items<W: Write>(out: &mut W, items: &[(usize, &Item)]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "(no items)");
    }
    for (index, item) in items {
        writeln!(out, "{:>3}. {}", index + 1, item.summary())?;
    }
    Ok(())
}
