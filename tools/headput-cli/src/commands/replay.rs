//! Replay a recorded sample stream through the engine.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use headput_actuator::writer::CommandLogHeader;
use headput_actuator::{CommandWriter, RecordingActuator};
use headput_common::clock::SessionClock;
use headput_common::config::AppConfig;
use headput_gesture_engine::{GestureEngine, InputTimeoutMonitor, SettingsManager, StaticSettings};
use headput_ingest::read_samples;

pub fn run(
    config: &AppConfig,
    samples_path: PathBuf,
    output: Option<PathBuf>,
    frame_ms: u64,
) -> anyhow::Result<()> {
    let file = File::open(&samples_path)
        .with_context(|| format!("Failed to open {}", samples_path.display()))?;
    let samples = read_samples(BufReader::new(file))
        .with_context(|| format!("Failed to read samples from {}", samples_path.display()))?;

    let rules = SettingsManager::open(&config.settings_path).rules();
    let recorder = RecordingActuator::new();
    let mut engine = GestureEngine::new(
        config.engine.clone(),
        Box::new(recorder.clone()),
        Box::new(StaticSettings::new(rules)),
    );
    let monitor = InputTimeoutMonitor::from_config(&config.timeout);

    let clock = SessionClock::start();
    let header = CommandLogHeader::new(clock.epoch_wall(), samples_path.display().to_string());
    let mut writer = output
        .map(|path| CommandWriter::new(path, &header))
        .transpose()
        .context("Failed to create command log")?;

    let mut emitted = 0u64;
    let mut emit = |recorder: &RecordingActuator, t_ns: u64| -> anyhow::Result<()> {
        for command in recorder.take() {
            emitted += 1;
            match writer.as_mut() {
                Some(writer) => writer.write_command(t_ns, &command)?,
                None => println!("{:>10.3}s  {command}", SessionClock::ns_to_secs(t_ns)),
            }
        }
        Ok(())
    };

    let mut now = clock.epoch();
    for (index, sample) in samples.iter().enumerate() {
        now = clock.instant_at(Duration::from_millis(frame_ms.saturating_mul(index as u64)));
        monitor.check(&mut engine, now);
        engine.poll_scheduled_releases(now);
        engine.process_at(sample, now);
        emit(&recorder, clock.ns_at(now))?;
    }

    let end = now + engine.discrete_release();
    engine.poll_scheduled_releases(end);
    engine.shutdown();
    emit(&recorder, clock.ns_at(end))?;

    if let Some(writer) = writer.as_mut() {
        writer.flush()?;
        println!(
            "Wrote {} command(s) to {}",
            writer.commands_written(),
            writer.path().display()
        );
    }
    println!(
        "Replayed {} sample(s), {emitted} command(s), calibrated: {}",
        samples.len(),
        engine.is_calibrated()
    );

    Ok(())
}
