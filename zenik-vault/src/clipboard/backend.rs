//! Clipboard backends.
//!
//! The vault only needs `set` and `get` on plain text. `SystemClipboard`
//! drives whichever platform clipboard tool is installed; `MemoryClipboard`
//! keeps the contents in-process.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroize;

#[derive(Error, Debug)]
pub enum ClipboardError {
    /// No clipboard service could be found.
    #[error("{0}")]
    Unavailable(String),

    /// The clipboard service failed.
    #[error("{0}")]
    Backend(String),
}

pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

/// Plain-text access to a clipboard.
pub trait ClipboardBackend: Send + Sync {
    fn set(&self, text: &str) -> ClipboardResult<()>;
    fn get(&self) -> ClipboardResult<String>;

    /// Whether the clipboard can be read. Whatever was read is wiped.
    fn is_available(&self) -> bool {
        self.get().map(|mut text| text.zeroize()).is_ok()
    }
}

/// A command line with its arguments.
#[derive(Debug, Clone)]
struct ToolCommand {
    program: PathBuf,
    args: &'static [&'static str],
}

impl ToolCommand {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args);
        cmd
    }
}

/// Clipboard backed by an external tool (`pbcopy`, `wl-copy`, `xclip`, ...).
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    name: &'static str,
    copy: ToolCommand,
    paste: ToolCommand,
    /// Dedicated clear command for tools that reject empty input.
    clear: Option<ToolCommand>,
}

struct ClipboardTool {
    name: &'static str,
    copy: (&'static str, &'static [&'static str]),
    paste: (&'static str, &'static [&'static str]),
    clear: Option<(&'static str, &'static [&'static str])>,
    wayland_only: bool,
}

const TOOLS: &[ClipboardTool] = &[
    ClipboardTool {
        name: "pbcopy",
        copy: ("pbcopy", &[]),
        paste: ("pbpaste", &[]),
        clear: None,
        wayland_only: false,
    },
    ClipboardTool {
        name: "wl-clipboard",
        copy: ("wl-copy", &[]),
        paste: ("wl-paste", &["--no-newline"]),
        clear: Some(("wl-copy", &["--clear"])),
        wayland_only: true,
    },
    ClipboardTool {
        name: "xclip",
        copy: ("xclip", &["-selection", "clipboard", "-in"]),
        paste: ("xclip", &["-selection", "clipboard", "-out"]),
        clear: None,
        wayland_only: false,
    },
    ClipboardTool {
        name: "xsel",
        copy: ("xsel", &["--clipboard", "--input"]),
        paste: ("xsel", &["--clipboard", "--output"]),
        clear: None,
        wayland_only: false,
    },
    ClipboardTool {
        name: "windows",
        copy: ("clip.exe", &[]),
        paste: ("powershell.exe", &["-NoProfile", "-Command", "Get-Clipboard"]),
        clear: None,
        wayland_only: false,
    },
];

fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

impl SystemClipboard {
    /// Find the first usable clipboard tool on `PATH`.
    pub fn detect() -> ClipboardResult<Self> {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();

        for tool in TOOLS {
            if tool.wayland_only && !wayland {
                continue;
            }
            let (Some(copy), Some(paste)) =
                (find_in_path(tool.copy.0), find_in_path(tool.paste.0))
            else {
                continue;
            };
            let clear = tool.clear.and_then(|(program, args)| {
                find_in_path(program).map(|program| ToolCommand { program, args })
            });

            debug!("Using {} for clipboard access", tool.name);
            return Ok(Self {
                name: tool.name,
                copy: ToolCommand {
                    program: copy,
                    args: tool.copy.1,
                },
                paste: ToolCommand {
                    program: paste,
                    args: tool.paste.1,
                },
                clear,
            });
        }

        Err(ClipboardError::Unavailable(
            "no clipboard tool found (install xclip, xsel or wl-clipboard)".into(),
        ))
    }

    pub fn name(&self) -> &str {
        self.name
    }

    fn run(&self, tool: &ToolCommand, input: &str) -> ClipboardResult<()> {
        let mut child = tool
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::Backend(format!("{}: {}", self.name, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| ClipboardError::Backend(format!("{}: {}", self.name, e)))?;
        }

        let status = child
            .wait()
            .map_err(|e| ClipboardError::Backend(format!("{}: {}", self.name, e)))?;
        if !status.success() {
            return Err(ClipboardError::Backend(format!(
                "{} exited with {}",
                self.name, status
            )));
        }
        Ok(())
    }
}

impl ClipboardBackend for SystemClipboard {
    fn set(&self, text: &str) -> ClipboardResult<()> {
        match (&self.clear, text.is_empty()) {
            (Some(clear), true) => self.run(clear, ""),
            _ => self.run(&self.copy, text),
        }
    }

    fn get(&self) -> ClipboardResult<String> {
        let output = self
            .paste
            .command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ClipboardError::Backend(format!("{}: {}", self.name, e)))?;

        // wl-paste exits non-zero on an empty clipboard
        if !output.status.success() {
            return Ok(String::new());
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if self.name == "windows" && text.ends_with("\r\n") {
            text.truncate(text.len() - 2);
        }
        Ok(text)
    }
}

/// In-process clipboard.
#[derive(Debug)]
pub struct MemoryClipboard {
    contents: Mutex<String>,
    available: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self {
            contents: Mutex::new(String::new()),
            available: true,
        }
    }

    /// A clipboard that behaves like a missing clipboard service.
    pub fn unavailable() -> Self {
        Self {
            contents: Mutex::new(String::new()),
            available: false,
        }
    }

    fn check(&self) -> ClipboardResult<()> {
        if !self.available {
            return Err(ClipboardError::Unavailable("clipboard service not present".into()));
        }
        Ok(())
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn set(&self, text: &str) -> ClipboardResult<()> {
        self.check()?;
        *self.contents.lock() = text.to_string();
        Ok(())
    }

    fn get(&self) -> ClipboardResult<String> {
        self.check()?;
        Ok(self.contents.lock().clone())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard() {
        let clip = MemoryClipboard::new();
        assert_eq!(clip.get().unwrap(), "");
        clip.set("hello").unwrap();
        assert_eq!(clip.get().unwrap(), "hello");
    }

    #[test]
    fn test_unavailable_clipboard() {
        let clip = MemoryClipboard::unavailable();
        assert!(matches!(clip.set("x"), Err(ClipboardError::Unavailable(_))));
        assert!(matches!(clip.get(), Err(ClipboardError::Unavailable(_))));
    }

    #[test]
    fn test_is_available() {
        let clip = MemoryClipboard::new();
        clip.set("secret").unwrap();
        assert!(clip.is_available());
        assert_eq!(clip.get().unwrap(), "secret");
        assert!(!MemoryClipboard::unavailable().is_available());
    }

    /// Implements only `set` and `get`, so `is_available` goes through `get`.
    struct PasteOnly(Option<&'static str>);

    impl ClipboardBackend for PasteOnly {
        fn set(&self, _text: &str) -> ClipboardResult<()> {
            Ok(())
        }

        fn get(&self) -> ClipboardResult<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| ClipboardError::Backend("xclip exited with 1".into()))
        }
    }

    #[test]
    fn test_default_is_available_follows_get() {
        assert!(PasteOnly(Some("secret")).is_available());
        assert!(!PasteOnly(None).is_available());
    }

    #[test]
    fn test_find_in_path_misses_unknown_program() {
        assert!(find_in_path("definitely-not-a-clipboard-tool-4821").is_none());
    }
}
