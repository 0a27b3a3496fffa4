//! Inspect or edit rule settings.

use headput_common::config::AppConfig;
use headput_gesture_engine::{SettingUpdate, SettingsManager};

use crate::SettingsAction;

pub fn run(config: &AppConfig, action: SettingsAction) -> anyhow::Result<()> {
    let mut manager = SettingsManager::open(&config.settings_path);

    match action {
        SettingsAction::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(manager.all_settings())?);
                return Ok(());
            }
            println!("Settings: {}", manager.path().display());
            println!();
            for (name, setting) in manager.all_settings() {
                println!(
                    "{name} ({}){}",
                    setting.display_name,
                    if setting.enabled { "" } else { " [disabled]" }
                );
                println!(
                    "  {} {:?} threshold {} x{}",
                    setting.coordinate, setting.direction, setting.threshold, setting.sensitivity
                );
                println!(
                    "  key {} | mouse {} | {}",
                    if setting.key.is_empty() { "-" } else { setting.key.as_str() },
                    setting.mouse_action_type,
                    if setting.continuous { "continuous" } else { "edge" }
                );
            }
        }
        SettingsAction::Reset => {
            manager
                .reset_to_defaults()
                .map_err(|e| anyhow::anyhow!("Failed to reset settings: {e}"))?;
            println!("Settings reset to defaults: {}", manager.path().display());
        }
        SettingsAction::Set { rule, field, value } => {
            let update = SettingUpdate::parse(&field, &value)?;
            if !manager.update_setting(&rule, update)? {
                anyhow::bail!("No rule named '{rule}'");
            }
            println!("{rule}.{field} = {value}");
        }
    }

    Ok(())
}
