//! Priority rules

use dots_meta::{Category, Priority};

const CRITICAL_FILES: &[&str] = &[".zshrc", ".bashrc", ".bash_profile", ".gitconfig", ".vimrc"];

/// Terminal profiles are tedious to rebuild by hand.
const HIGH_PRIORITY_FRAGMENTS: &[&str] = &["Terminal.plist", "iterm2.plist"];

/// Decide a file's priority. Rules apply in order; the first hit wins.
pub fn priority_for(filename: &str, category: Category) -> Priority {
    if CRITICAL_FILES.contains(&filename) {
        return Priority::Critical;
    }
    if HIGH_PRIORITY_FRAGMENTS.iter().any(|f| filename.contains(f)) {
        return Priority::High;
    }
    match category {
        Category::Shell | Category::Git | Category::Assistant => Priority::High,
        Category::Editor | Category::Cloud | Category::Docker => Priority::Medium,
        _ => Priority::Low,
    }
}
