//! Pattern tables describing which paths to track

use dots_meta::Category;
use serde::{Deserialize, Serialize};

/// One tracked location, relative to the table's base directory.
///
/// A trailing `/` marks a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub pattern: String,
    pub category: Category,
}

impl PatternEntry {
    pub fn new(pattern: impl Into<String>, category: Category) -> Self {
        Self {
            pattern: pattern.into(),
            category,
        }
    }

    /// Pattern with any trailing slash removed, ready to join onto a base.
    pub fn relative(&self) -> &str {
        self.pattern.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatternTable {
    #[serde(default)]
    pub entries: Vec<PatternEntry>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, patterns: &[&str]) -> Self {
        self.entries
            .extend(patterns.iter().map(|p| PatternEntry::new(*p, category)));
        self
    }

    pub fn push(&mut self, entry: PatternEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatternEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Config files under the scan root.
    pub fn default_files() -> Self {
        Self::new()
            .with(
                Category::Shell,
                &[
                    ".zshrc",
                    ".bashrc",
                    ".bash_profile",
                    ".profile",
                    ".zprofile",
                    ".p10k.zsh",
                    ".fzf.bash",
                    ".fzf.zsh",
                ],
            )
            .with(Category::Git, &[".gitconfig", ".gitignore_global"])
            .with(
                Category::Editor,
                &[
                    ".vimrc",
                    ".vim/",
                    ".emacs",
                    ".emacs.d/",
                    ".ideavimrc",
                    ".config/Code/User/settings.json",
                    ".vscode/settings.json",
                ],
            )
            .with(
                Category::Cloud,
                &[".aws/config", ".azure/config", ".config/gcloud/"],
            )
            .with(Category::Docker, &[".docker/config.json", ".dockerignore"])
            .with(
                Category::Language,
                &[".npmrc", ".gemrc", ".pypirc", ".cargo/config"],
            )
            .with(
                Category::Assistant,
                &[
                    ".claude/CLAUDE.md",
                    ".claude/settings.json",
                    ".claude/preferences.md",
                ],
            )
            .with(
                Category::Documentation,
                &[
                    ".aws_cheatsheet.md",
                    ".azure_cheatsheet.md",
                    ".gcp_cheatsheet.md",
                    ".zsh_cheatsheet.md",
                    ".omz_plugin_recommendations.md",
                ],
            )
    }

    /// Application preference files under `Library/Preferences`.
    pub fn default_preferences() -> Self {
        Self::new()
            .with(
                Category::Shell,
                &["com.apple.Terminal.plist", "com.googlecode.iterm2.plist"],
            )
            .with(
                Category::Editor,
                &["com.microsoft.VSCode.plist", "com.sublimetext.3.plist"],
            )
    }
}

/// Name and path fragments that are never synced.
pub fn default_excludes() -> Vec<String> {
    [
        "id_rsa",
        "id_dsa",
        "id_ecdsa",
        "id_ed25519",
        "credentials",
        "password",
        "secret",
        "token",
        "_history",
        ".lesshst",
        ".viminfo",
        "cache/",
        "Cache/",
        ".DS_Store",
        ".CFUserTextEncoding",
        "_sessions/",
        ".claude/history.jsonl",
        ".swp",
        ".tmp",
        ".temp",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
