//! Saved-facility management for one user.

use ald_core::AppConfig;
use ald_store::UserStore;
use clap::Subcommand;

use crate::{build_backend, print_json};

/// Sub-commands available under `saved`.
#[derive(Debug, Subcommand)]
pub enum SavedCommands {
    /// Print the user's saved facility snapshots
    List {
        #[arg(long)]
        user: String,
    },
    /// Save a facility for the user
    Add {
        #[arg(long)]
        user: String,
        /// Facility id
        id: String,
    },
    /// Remove a facility from the user's saved list
    Remove {
        #[arg(long)]
        user: String,
        /// Facility id
        id: String,
    },
}

pub(crate) async fn run_saved(config: &AppConfig, command: SavedCommands) -> anyhow::Result<()> {
    let backend = build_backend(config)?;
    match command {
        SavedCommands::List { user } => {
            let saved = backend.saved_facilities(&user).await?;
            tracing::info!(user_id = %user, count = saved.len(), "saved: listed");
            print_json(&saved)
        }
        SavedCommands::Add { user, id } => {
            backend.add_saved(&user, &id).await?;
            tracing::info!(user_id = %user, facility_id = %id, "saved: added");
            Ok(())
        }
        SavedCommands::Remove { user, id } => {
            backend.remove_saved(&user, &id).await?;
            tracing::info!(user_id = %user, facility_id = %id, "saved: removed");
            Ok(())
        }
    }
}
