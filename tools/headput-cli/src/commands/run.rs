//! Listen for capture samples and actuate.

use std::sync::atomic::Ordering;

use anyhow::Context;
use headput_actuator::{detect_best_backend, DebouncedActuator};
use headput_common::config::AppConfig;
use headput_gesture_engine::{GestureEngine, GestureHandle, GestureService, SettingsManager};
use headput_ingest::SampleListener;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let settings = SettingsManager::open(&config.settings_path);
    let rule_count = settings.all_settings().len();

    let actuator = DebouncedActuator::new(detect_best_backend());
    let engine = GestureEngine::new(config.engine.clone(), Box::new(actuator), Box::new(settings));
    let service = GestureService::start(engine, &config.timeout);

    let listener = SampleListener::bind(&config.listener, service.handle(), service.stop_flag())
        .await
        .context("Failed to start sample listener")?;
    let addr = listener.local_addr()?;
    let listener_task = tokio::spawn(listener.run());

    println!("HeadPut listening on {addr}");
    println!("  Settings: {} ({rule_count} rules)", config.settings_path.display());
    println!("  Warm-up samples: {}", config.engine.warmup_samples);
    println!();
    println!("Commands: c = recalibrate, r = reload settings, p = pause/resume, q = quit (or Ctrl+C)");
    println!();

    control_loop(service.handle()).await?;

    println!();
    service.stop_flag().store(true, Ordering::Relaxed);
    let stats = listener_task.await??;
    service.shutdown().await;

    println!(
        "Stopped after {} sample(s) from {} client(s)",
        stats.samples, stats.clients
    );
    Ok(())
}

async fn control_loop(handle: GestureHandle) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                return Ok(());
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match line.trim() {
                    "c" | "calibrate" => handle.request_recalibration(),
                    "r" | "reload" => handle.refresh_settings(),
                    "p" | "pause" => {
                        if handle.toggle_pause() {
                            println!("Paused, press p again to resume");
                        } else {
                            println!("Resumed");
                        }
                    }
                    "q" | "quit" => return Ok(()),
                    "" => {}
                    other => println!("Unknown command: {other}"),
                },
                Ok(None) => {
                    tokio::signal::ctrl_c().await?;
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin, waiting for Ctrl+C");
                    tokio::signal::ctrl_c().await?;
                    return Ok(());
                }
            },
        }
    }
}
