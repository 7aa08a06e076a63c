use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use chrono::{Local, SecondsFormat, Timelike, Utc};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;

use crate::host::PresetDialogs;
use crate::metabolism::{self, custom_fast_type, find_fast_type, COMMON_FAST_TYPES};
use crate::models::{ActivityLevel, Gender, NewProgressEntry, Theme, WeightUnit};
use crate::session::VaultSession;
use crate::settings::default_settings_path;
use crate::timer::{FastProgress, FastStatus};

/// Help Me Fast - fasting timer and progress journal
#[derive(Parser)]
#[command(name = "help-me-fast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Settings file (defaults to the user data directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Vault directory; falls back to the remembered vault
    #[arg(long, global = true)]
    vault: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open (and initialize) a vault and remember it
    Open,
    /// Show the current fast
    Status,
    /// Start a fast
    Start {
        /// Target length in hours
        #[arg(long, conflicts_with = "preset")]
        hours: Option<f64>,
        /// Preset id, e.g. 16-8 or 24h
        #[arg(long)]
        preset: Option<String>,
    },
    /// End the running fast and record it
    End,
    /// Show or edit the profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Set the profile photo from an image file
    Avatar { image: PathBuf },
    /// Progress journal
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },
    /// Edit vault preferences
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Forget the remembered vault
    Disconnect,
    /// Follow the running fast until the target is reached
    Watch,
    /// List preset fast lengths
    Presets,
}

#[derive(Subcommand)]
enum ProfileCommands {
    Show,
    Set(ProfileArgs),
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long)]
    name: Option<String>,
    /// Body weight in the vault's weight unit
    #[arg(long)]
    weight: Option<f64>,
    /// Height in cm
    #[arg(long)]
    height: Option<f64>,
    #[arg(long)]
    age: Option<f64>,
    #[arg(long, value_parser = parse_lowercase::<Gender>)]
    gender: Option<Gender>,
    /// sedentary, light, moderate, active or very_active
    #[arg(long, value_parser = parse_lowercase::<ActivityLevel>)]
    activity: Option<ActivityLevel>,
    /// Daily expenditure in kcal; computed when omitted
    #[arg(long)]
    tmb: Option<f64>,
}

#[derive(Subcommand)]
enum JournalCommands {
    Add {
        /// Entry date; defaults to now
        #[arg(long)]
        date: Option<String>,
        /// Weight in the vault's weight unit
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        photo: Option<PathBuf>,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    Set {
        #[arg(long, value_parser = parse_lowercase::<Theme>)]
        theme: Option<Theme>,
        #[arg(long)]
        notifications: Option<bool>,
        #[arg(long, value_parser = parse_lowercase::<WeightUnit>)]
        weight_unit: Option<WeightUnit>,
    },
}

/// Parses a value the same way the vault documents spell it.
fn parse_lowercase<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|err| err.to_string())
}

pub async fn execute(cli: Cli) -> Result<()> {
    let settings_path = match cli.settings {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let session = VaultSession::with_settings(settings_path);

    match cli.command {
        Commands::Disconnect => {
            session.disconnect().await?;
            println!("Vault forgotten.");
            return Ok(());
        }
        Commands::Presets => {
            print_presets();
            return Ok(());
        }
        _ => {}
    }

    connect(&session, cli.vault).await?;

    match cli.command {
        Commands::Open => {
            if let Some(path) = session.vault_path().await {
                println!("Vault: {}", path.display());
            }
            if session.needs_profile_setup().await {
                println!("Profile is incomplete; run `help-me-fast profile set`.");
            }
        }
        Commands::Status => print_status(&session).await,
        Commands::Start { hours, preset } => {
            let fast_type = match (hours, preset) {
                (Some(hours), _) => custom_fast_type(hours),
                (None, Some(id)) => {
                    find_fast_type(&id).ok_or_else(|| anyhow!("unknown preset '{id}'"))?
                }
                (None, None) => bail!("pass --hours or --preset"),
            };
            session.start_fast(fast_type.hours).await?;
            println!("Started {} fast.", fast_type.name);
        }
        Commands::End => match session.end_fast().await? {
            Some(entry) => {
                let unit = weight_unit(&session).await;
                let secs = entry.duration.unwrap_or_default();
                println!(
                    "Fast recorded: {} ({}), est. {}",
                    format_hms(secs),
                    entry.id,
                    show_weight(unit, entry.weight_loss.unwrap_or_default())
                );
            }
            None => println!("No fast is running."),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Show => print_profile(&session).await,
            ProfileCommands::Set(args) => set_profile(&session, args).await?,
        },
        Commands::Avatar { image } => {
            let host = PresetDialogs {
                image: Some(image),
                ..PresetDialogs::default()
            };
            let inlined = session
                .select_image(&host)
                .await?
                .ok_or_else(|| anyhow!("no image selected"))?;
            let mut profile = session.snapshot().await.profile.unwrap_or_default();
            profile.avatar = Some(inlined);
            session.save_profile(profile).await?;
            println!("Avatar updated.");
        }
        Commands::Journal { command } => journal(&session, command).await?,
        Commands::Config { command } => match command {
            ConfigCommands::Set {
                theme,
                notifications,
                weight_unit,
            } => {
                let mut config = session.snapshot().await.config.unwrap_or_default();
                if let Some(theme) = theme {
                    config.theme = theme;
                }
                if let Some(notifications) = notifications {
                    config.notifications = notifications;
                }
                if let Some(unit) = weight_unit {
                    config.weight_unit = unit;
                }
                session.save_config(config).await?;
                println!("Config saved.");
            }
        },
        Commands::Watch => watch(&session).await?,
        Commands::Disconnect | Commands::Presets => {}
    }
    Ok(())
}

async fn connect(session: &VaultSession, vault: Option<PathBuf>) -> Result<()> {
    if vault.is_some() {
        let host = PresetDialogs {
            directory: vault,
            ..PresetDialogs::default()
        };
        session.select_vault_folder(&host).await?;
        return Ok(());
    }
    if !session.auto_load().await? {
        bail!("no vault remembered; pass --vault <dir>");
    }
    Ok(())
}

async fn weight_unit(session: &VaultSession) -> WeightUnit {
    session
        .snapshot()
        .await
        .config
        .map(|config| config.weight_unit)
        .unwrap_or_default()
}

async fn print_status(session: &VaultSession) {
    let progress = session.progress().await;
    let state = session.snapshot().await;
    let config = state.config.clone().unwrap_or_default();

    if progress.status == FastStatus::Idle {
        println!("No fast running.");
    } else {
        print_progress(&progress, config.weight_unit);
        let hours = progress.elapsed_hours();
        let phase = metabolism::current_phase(hours);
        println!(
            "Phase: {} ({:.0}%)",
            phase.name,
            metabolism::phase_progress(hours) * 100.0
        );
        println!("{}", metabolism::current_message(hours).message);
        for line in estimate_lines(&progress, state.tmb(), config.weight_unit) {
            println!("{line}");
        }
    }

    if config.in_danger_zone(Local::now().hour()) {
        println!("Heads up: you are in one of your danger zones.");
    }
    if let Some(history) = state.history {
        println!(
            "{} fasts recorded, est. {} lost",
            history.fasts.len(),
            show_weight(config.weight_unit, history.total_weight_loss())
        );
    }
}

/// Fat burned so far and what the full target would add up to.
fn estimate_lines(progress: &FastProgress, tmb: f64, unit: WeightUnit) -> Vec<String> {
    let mut lines = vec![format!(
        "Fat burned: {} g",
        metabolism::fat_burned_grams(progress.elapsed_secs as f64, tmb)
    )];
    if let Some(target) = progress.target_hours {
        lines.push(format!(
            "At {target}h: est. {} lost, {} kcal",
            show_weight(unit, metabolism::projected_weight_loss_kg(target, tmb)),
            metabolism::projected_calories(target, tmb)
        ));
    }
    lines
}

fn print_progress(progress: &FastProgress, unit: WeightUnit) {
    println!(
        "Elapsed {}  remaining {}  {:.1}%  est. {}",
        format_hms(progress.elapsed_secs),
        format_hms(progress.remaining_secs),
        progress.progress * 100.0,
        show_weight(unit, progress.weight_loss)
    );
}

async fn print_profile(session: &VaultSession) {
    let state = session.snapshot().await;
    let unit = state
        .config
        .map(|config| config.weight_unit)
        .unwrap_or_default();
    let Some(profile) = state.profile else {
        println!("No profile.");
        return;
    };
    println!("Name:     {}", profile.name.as_deref().unwrap_or(""));
    println!("Weight:   {}", show_weight(unit, profile.weight));
    println!("Height:   {} cm", profile.height);
    println!("Age:      {}", profile.age);
    println!("Gender:   {:?}", profile.gender);
    println!("Activity: {:?}", profile.activity_level);
    println!("TMB:      {} kcal/day", profile.tmb);
    println!("Avatar:   {}", if profile.avatar.is_some() { "set" } else { "none" });
}

async fn set_profile(session: &VaultSession, args: ProfileArgs) -> Result<()> {
    let unit = weight_unit(session).await;
    let mut profile = session.snapshot().await.profile.unwrap_or_default();
    let metrics_changed = args.weight.is_some()
        || args.height.is_some()
        || args.age.is_some()
        || args.gender.is_some()
        || args.activity.is_some();

    if let Some(name) = args.name {
        profile.name = Some(name);
    }
    if let Some(weight) = args.weight {
        profile.weight = unit.to_kg(weight);
    }
    if let Some(height) = args.height {
        profile.height = height;
    }
    if let Some(age) = args.age {
        profile.age = age;
    }
    if let Some(gender) = args.gender {
        profile.gender = gender;
    }
    if let Some(activity) = args.activity {
        profile.activity_level = activity;
    }
    match args.tmb {
        Some(tmb) => profile.tmb = tmb,
        None if metrics_changed => profile.tmb = 0.0,
        None => {}
    }

    let saved = session.save_profile(profile).await?;
    if let Some(entry) = session.seed_starting_weight().await? {
        println!("Journal started with {}", show_weight(unit, entry.weight.unwrap_or_default()));
    }
    println!("Profile saved (TMB {} kcal/day).", saved.tmb);
    Ok(())
}

async fn journal(session: &VaultSession, command: JournalCommands) -> Result<()> {
    let unit = weight_unit(session).await;
    match command {
        JournalCommands::Add {
            date,
            weight,
            photo,
            notes,
        } => {
            let photo_base64 = match photo {
                Some(path) => {
                    let host = PresetDialogs {
                        image: Some(path),
                        ..PresetDialogs::default()
                    };
                    session.select_image(&host).await?
                }
                None => None,
            };
            let entry = session
                .add_entry(NewProgressEntry {
                    date: date.unwrap_or_else(|| {
                        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
                    }),
                    weight: weight.map(|value| unit.to_kg(value)),
                    photo_base64,
                    notes,
                })
                .await?;
            println!("Added {}", entry.id);
        }
        JournalCommands::List => {
            let entries = session.entries().await?;
            if entries.is_empty() {
                println!("Journal is empty.");
            }
            for view in entries {
                let entry = view.entry;
                println!(
                    "{}  {}  {}{}{}",
                    entry.date,
                    entry.id,
                    entry.weight.map(|kg| show_weight(unit, kg)).unwrap_or_default(),
                    if view.photo_base64.is_some() { "  [photo]" } else { "" },
                    entry.notes.map(|notes| format!("  {notes}")).unwrap_or_default()
                );
            }
        }
        JournalCommands::Delete { id } => {
            if session.delete_entry(&id).await? {
                println!("Deleted {id}");
            } else {
                println!("No entry {id}");
            }
        }
    }
    Ok(())
}

async fn watch(session: &VaultSession) -> Result<()> {
    let unit = weight_unit(session).await;
    let mut updates = session.timer().subscribe();
    if updates.borrow().status == FastStatus::Idle {
        println!("No fast running.");
        return Ok(());
    }

    loop {
        let progress = *updates.borrow_and_update();
        print_progress(&progress, unit);
        if progress.target_reached() {
            println!("Target reached!");
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    session.timer().stop_ticker();
    Ok(())
}

fn print_presets() {
    for (id, name, hours) in COMMON_FAST_TYPES {
        println!("{id:<6} {name:<18} {hours}h");
    }
}

fn format_hms(total: u64) -> String {
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn show_weight(unit: WeightUnit, kg: f64) -> String {
    format!("{} {}", unit.format(kg), unit.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::FastState;

    #[test]
    fn estimates_cover_elapsed_and_target() {
        let start = 1_700_000_000_000;
        let progress = FastState::running(start, 24.0).progress(start + 12 * 3_600_000, 2000.0);

        let lines = estimate_lines(&progress, 2000.0, WeightUnit::Kg);
        assert_eq!(
            lines,
            vec![
                "Fat burned: 129.8701 g".to_string(),
                "At 24h: est. 0.3 kg lost, 2000 kcal".to_string(),
            ]
        );
    }

    #[test]
    fn estimates_are_zero_without_tmb() {
        let start = 1_700_000_000_000;
        let progress = FastState::running(start, 16.0).progress(start + 3_600_000, 0.0);

        let lines = estimate_lines(&progress, 0.0, WeightUnit::Lbs);
        assert_eq!(lines[0], "Fat burned: 0 g");
        assert_eq!(lines[1], "At 16h: est. 0.0 lbs lost, 0 kcal");
    }
}
