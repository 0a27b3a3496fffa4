//! Validate the rule settings file.

use headput_actuator::KeyCode;
use headput_common::config::AppConfig;
use headput_face_model::{ActuationKind, Channel, MovementSetting};
use headput_gesture_engine::{LoadOutcome, SettingsManager};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("HeadPut Settings Check");
    println!("{}", "=".repeat(50));

    let mut manager = SettingsManager::open(&config.settings_path);
    match manager.load() {
        LoadOutcome::Loaded | LoadOutcome::Created | LoadOutcome::Backfilled { .. } => {
            println!("[OK] Settings file: {}", manager.path().display());
        }
        LoadOutcome::Fallback => {
            println!(
                "[WARN] Settings file: {} could not be parsed, defaults are in use",
                manager.path().display()
            );
        }
    }

    let settings = manager.all_settings();
    let enabled = settings.values().filter(|s| s.enabled).count();
    println!("[OK] Rules: {} ({enabled} enabled)", settings.len());

    let issues: Vec<String> = settings
        .iter()
        .flat_map(|(name, setting)| setting_issues(setting).into_iter().map(move |i| format!("{name}: {i}")))
        .collect();

    println!();
    if issues.is_empty() {
        println!("All rules are valid.");
    } else {
        println!("Issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        println!("\n{} issue(s) found. Affected rules may never trigger.", issues.len());
    }

    Ok(())
}

fn setting_issues(setting: &MovementSetting) -> Vec<String> {
    let mut issues = Vec::new();

    if Channel::from_name(&setting.coordinate).is_none() {
        issues.push(format!("unknown channel '{}'", setting.coordinate));
    }
    if setting.mouse_action_type == ActuationKind::Key && KeyCode::parse(&setting.key).is_none() {
        issues.push(format!("unknown key '{}'", setting.key));
    }
    if setting.threshold < 0.0 {
        issues.push(format!(
            "negative threshold {} (its magnitude is used)",
            setting.threshold
        ));
    }
    if !setting.sensitivity.is_finite() || setting.sensitivity == 0.0 {
        issues.push(format!("sensitivity {} never moves the value", setting.sensitivity));
    }

    issues
}
