//! Shell Kind Classification
//!
//! Classifies a shell executable path into one of a fixed set of shell
//! kinds. Classification is a pure, total function: every path maps to a
//! kind, with [`ShellKind::Other`] as the fallback.

use serde::{Deserialize, Serialize};

/// Kind of shell a session is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ShellKind {
    /// Bourne Again Shell
    Bash,
    /// Bash shipped with Git for Windows
    GitBash,
    /// Z Shell
    Zsh,
    /// Fish Shell
    Fish,
    /// Korn Shell
    Ksh,
    /// C Shell
    Csh,
    /// Tcsh
    Tcsh,
    /// Dash
    Dash,
    /// POSIX sh
    Sh,
    /// Nushell
    Nushell,
    /// Windows PowerShell or PowerShell Core
    PowerShell,
    /// Command Prompt
    Cmd,
    /// Windows Subsystem for Linux launcher
    Wsl,
    /// Other/Unknown shell
    #[default]
    Other,
}

impl ShellKind {
    /// Classify a shell executable path
    ///
    /// Both `/` and `\` are treated as separators so Windows paths classify
    /// correctly on every platform. Matching is case-insensitive and ignores
    /// an `.exe` suffix.
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim().trim_matches('"');
        let file_name = trimmed
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(trimmed)
            .to_lowercase();
        let stem = file_name.strip_suffix(".exe").unwrap_or(&file_name);

        match stem {
            "bash" if Self::is_git_install(trimmed) => ShellKind::GitBash,
            "bash" => ShellKind::Bash,
            "zsh" => ShellKind::Zsh,
            "fish" => ShellKind::Fish,
            "ksh" | "mksh" | "pdksh" => ShellKind::Ksh,
            "csh" => ShellKind::Csh,
            "tcsh" => ShellKind::Tcsh,
            "dash" => ShellKind::Dash,
            "sh" => ShellKind::Sh,
            "nu" | "nushell" => ShellKind::Nushell,
            "pwsh" | "powershell" => ShellKind::PowerShell,
            "cmd" => ShellKind::Cmd,
            "wsl" => ShellKind::Wsl,
            _ => ShellKind::Other,
        }
    }

    fn is_git_install(path: &str) -> bool {
        path.to_lowercase()
            .split(['/', '\\'])
            .any(|component| component == "git")
    }

    /// Get a string representation of the shell kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellKind::Bash => "bash",
            ShellKind::GitBash => "git-bash",
            ShellKind::Zsh => "zsh",
            ShellKind::Fish => "fish",
            ShellKind::Ksh => "ksh",
            ShellKind::Csh => "csh",
            ShellKind::Tcsh => "tcsh",
            ShellKind::Dash => "dash",
            ShellKind::Sh => "sh",
            ShellKind::Nushell => "nu",
            ShellKind::PowerShell => "powershell",
            ShellKind::Cmd => "cmd",
            ShellKind::Wsl => "wsl",
            ShellKind::Other => "other",
        }
    }

    /// Human-readable name, used as the fallback tab title
    pub fn display_name(&self) -> &'static str {
        match self {
            ShellKind::Bash => "Bash",
            ShellKind::GitBash => "Git Bash",
            ShellKind::Zsh => "Zsh",
            ShellKind::Fish => "Fish",
            ShellKind::Ksh => "Ksh",
            ShellKind::Csh => "Csh",
            ShellKind::Tcsh => "Tcsh",
            ShellKind::Dash => "Dash",
            ShellKind::Sh => "sh",
            ShellKind::Nushell => "Nushell",
            ShellKind::PowerShell => "PowerShell",
            ShellKind::Cmd => "Command Prompt",
            ShellKind::Wsl => "WSL",
            ShellKind::Other => "Terminal",
        }
    }

    /// Whether the shell understands POSIX syntax
    pub fn is_posix(&self) -> bool {
        matches!(
            self,
            ShellKind::Bash
                | ShellKind::GitBash
                | ShellKind::Zsh
                | ShellKind::Ksh
                | ShellKind::Dash
                | ShellKind::Sh
                | ShellKind::Wsl
        )
    }
}

impl std::fmt::Display for ShellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
