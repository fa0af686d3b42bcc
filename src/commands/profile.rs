use crate::cli::ProfileCommand;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use texsort_config::Config;
use texsort_learning::{ImportMode, ProfileManager};

pub async fn run(config: Config, command: ProfileCommand) -> Result<()> {
    let manager = ProfileManager::new(&config.profiles_dir);
    match command {
        ProfileCommand::New { game, serial, author, output } => {
            manager.create(&game, serial.as_deref(), author.as_deref());
            let path = manager.save(output.as_deref()).await.or_raise(|| ErrorKind::Profile)?;
            println!("created {}", path.display());
        },
        ProfileCommand::List => {
            let profiles =
                ProfileManager::list_profiles(&config.profiles_dir).await.or_raise(|| ErrorKind::Profile)?;
            if profiles.is_empty() {
                println!("no profiles in {}", config.profiles_dir.display());
            }
            for profile in profiles {
                println!(
                    "{}  {}{}  ({} mappings, updated {})",
                    profile.filename,
                    profile.game_name,
                    profile.game_serial.map(|s| format!(" [{s}]")).unwrap_or_default(),
                    profile.entry_count,
                    profile.updated_at.date(),
                );
            }
        },
        ProfileCommand::Show { path } => {
            let profile = manager.load(&path).await.or_raise(|| ErrorKind::Profile)?;
            let statistics = manager.statistics().or_raise(|| ErrorKind::Profile)?;
            let metadata = &profile.metadata;
            println!("game:       {}", metadata.game_name);
            if let Some(serial) = &metadata.game_serial {
                println!("serial:     {serial}");
            }
            if let Some(author) = &metadata.author {
                println!("author:     {author}");
            }
            println!("created:    {}", metadata.created_at);
            println!("updated:    {}", metadata.updated_at);
            println!(
                "mappings:   {} ({} accepted, {} corrected)",
                statistics.total_entries, statistics.accepted, statistics.corrected
            );
            for (name, keywords) in &profile.custom_categories {
                let keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
                println!("category:   {name} [{}]", keywords.join(", "));
            }
            for (destination, weight) in &statistics.most_used {
                println!("  {weight:>6.1}  {destination}");
            }
        },
        ProfileCommand::Export { path, output, password } => {
            manager.load(&path).await.or_raise(|| ErrorKind::Profile)?;
            manager.export(&output, password.as_deref()).await.or_raise(|| ErrorKind::Profile)?;
            let how = if password.is_some() { "encrypted" } else { "plain" };
            println!("exported {} ({how})", output.display());
        },
        ProfileCommand::Import { file, into, replace, password } => {
            if let Some(into) = &into {
                manager.load(into).await.or_raise(|| ErrorKind::Profile)?;
            }
            let mode = if replace { ImportMode::Replace } else { ImportMode::Merge };
            let summary =
                manager.import(&file, password.as_deref(), mode).await.or_raise(|| ErrorKind::Profile)?;
            let path = manager.save(into.as_deref()).await.or_raise(|| ErrorKind::Profile)?;
            println!(
                "imported {}: {} added, {} updated, {} unchanged, {} categories added",
                summary.game_name,
                summary.entries_added,
                summary.entries_updated,
                summary.entries_unchanged,
                summary.categories_added
            );
            println!("saved to {}", path.display());
        },
        ProfileCommand::Delete { path } => {
            manager.delete_profile(&path).await.or_raise(|| ErrorKind::Profile)?;
            println!("deleted {}", path.display());
        },
        ProfileCommand::Category { path, name, keywords } => {
            manager.load(&path).await.or_raise(|| ErrorKind::Profile)?;
            manager.add_custom_category(&name, &keywords).or_raise(|| ErrorKind::Profile)?;
            manager.save(Some(path.as_path())).await.or_raise(|| ErrorKind::Profile)?;
            println!("category {name} saved to {}", path.display());
        },
        ProfileCommand::Clear { path } => {
            manager.load(&path).await.or_raise(|| ErrorKind::Profile)?;
            manager.clear_history().or_raise(|| ErrorKind::Profile)?;
            manager.save(Some(path.as_path())).await.or_raise(|| ErrorKind::Profile)?;
            println!("cleared {}", path.display());
        },
    }
    Ok(())
}
