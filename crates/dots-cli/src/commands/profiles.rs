//! Profiles command

use colored::Colorize;
use dots_core::select_profile;
use dots_meta::SyncProfile;

use crate::context::Context;
use crate::error::Result;

/// List the built-in profiles, first persisting `select` as the active one.
pub fn run_profiles(ctx: &Context, select: Option<&str>) -> Result<()> {
    let active = match select {
        Some(name) => {
            let profile = select_profile(&ctx.state_store()?, name)?;
            println!("{} Active profile is now {}", "OK".green().bold(), profile.name.bold());
            println!();
            profile
        }
        None => ctx.profile()?,
    };
    for profile in SyncProfile::builtin() {
        let marker = if profile.name == active.name {
            "*".green().bold()
        } else {
            " ".normal()
        };
        let categories: Vec<&str> = profile.categories.iter().map(|c| c.as_str()).collect();
        println!("{} {:<8} {}", marker, profile.name.bold(), profile.description.dimmed());
        println!("           {}", categories.join(", "));
    }
    Ok(())
}
