mod app;
mod config;
mod database;
mod logger;
mod motion;
mod mqtt;
mod plotter;
mod sensor;
mod types;
mod upload;
mod utils;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::bounded;
use eframe::egui;
use log::{error, info, warn};

use app::FlailMeterApp;
use config::{AppConfig, ConfigManager, SensorBackend};
use database::{run_store_handler, KeyValueStore, MemoryStore, StoreHandle};
use mqtt::MqttResultSink;
use sensor::{run_simulated_feed, sensor_channels, SensorControl, SensorSenders};
use upload::{NullSink, ResultSink};

const CONFIG_PATH: &str = "config.toml";

type WorkerHandle = JoinHandle<()>;

fn main() {
    logger::init_logger();
    info!("Application starting");

    let config = match ConfigManager::load_from_file(CONFIG_PATH) {
        Ok(config) => {
            info!("Loaded configuration from {}", CONFIG_PATH);
            config
        }
        Err(e) => {
            warn!("Using default configuration ({}): {}", CONFIG_PATH, e);
            ConfigManager::new()
        }
    };
    let app_config = config.get_config().clone();
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let mut workers: Vec<(&'static str, WorkerHandle)> = Vec::new();

    let (senders, source, control_receiver) = sensor_channels(app_config.channels.sensor_channel_capacity);
    let sink = start_sensor_feed(
        &app_config,
        senders,
        control_receiver,
        &shutdown_signal,
        &mut workers,
    );
    let store = start_store(&app_config, &shutdown_signal, &mut workers);

    let options = eframe::NativeOptions {
        vsync: app_config.window.vsync,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        renderer: eframe::Renderer::Glow,
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([app_config.window.width, app_config.window.height])
            .with_resizable(app_config.window.resizable),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        &app_config.window.title,
        options,
        Box::new(move |_cc| Ok(Box::new(FlailMeterApp::new(config, source, store, sink)))),
    ) {
        error!("GUI failed: {}", e);
    }

    info!("GUI closed, signaling worker threads to shut down");
    shutdown_signal.store(true, Ordering::Relaxed);

    for (name, handle) in workers {
        match handle.join() {
            Ok(()) => info!("{} thread shut down gracefully", name),
            Err(e) => error!("{} thread panicked: {:?}", name, e),
        }
    }
}

/// Spawn the thread that feeds the sensor channels and pick the result sink
/// that goes with it.
fn start_sensor_feed(
    config: &AppConfig,
    senders: SensorSenders,
    control_receiver: crossbeam_channel::Receiver<SensorControl>,
    shutdown_signal: &Arc<AtomicBool>,
    workers: &mut Vec<(&'static str, WorkerHandle)>,
) -> Box<dyn ResultSink> {
    let shutdown = Arc::clone(shutdown_signal);

    match config.sensor.backend {
        SensorBackend::Simulator => {
            let interval = config.update_interval();
            let handle = thread::spawn(move || {
                if let Err(e) = run_simulated_feed(senders, control_receiver, shutdown, interval) {
                    error!("Simulator thread failed: {}", e);
                }
            });
            workers.push(("Simulator", handle));
            if config.measurement.upload_enabled {
                info!("Simulator backend has no broker, uploads are dropped");
            }
            Box::new(NullSink)
        }
        SensorBackend::Mqtt => {
            let (client, connection) = match mqtt::connect(&config.mqtt) {
                Ok(pair) => pair,
                Err(e) => {
                    // dropping the senders marks both sensors unavailable
                    error!("MQTT setup failed: {}", e);
                    return Box::new(NullSink);
                }
            };

            let qos = mqtt::qos_from_level(config.mqtt.qos);
            let sink: Box<dyn ResultSink> = if config.measurement.upload_enabled {
                Box::new(MqttResultSink::new(client.clone(), config.mqtt.topics.results.clone(), qos))
            } else {
                Box::new(NullSink)
            };

            let topics = config.mqtt.topics.clone();
            let handle = thread::spawn(move || {
                if let Err(e) = mqtt::run_mqtt_feed(
                    client,
                    connection,
                    topics,
                    qos,
                    senders,
                    control_receiver,
                    shutdown,
                ) {
                    error!("MQTT thread failed: {}", e);
                }
            });
            workers.push(("MQTT", handle));
            sink
        }
    }
}

/// In-memory store, or a DuckDB store thread behind a `StoreHandle`
fn start_store(
    config: &AppConfig,
    shutdown_signal: &Arc<AtomicBool>,
    workers: &mut Vec<(&'static str, WorkerHandle)>,
) -> Box<dyn KeyValueStore> {
    if config.database.in_memory {
        info!("Using in-memory store, calibration and history are not persisted");
        return Box::new(MemoryStore::new());
    }

    let (task_sender, task_receiver) = bounded(config.channels.store_task_channel_capacity);
    let db_path = config.get_database_path();
    let shutdown = Arc::clone(shutdown_signal);
    let handle = thread::spawn(move || {
        if let Err(e) = run_store_handler(db_path, task_receiver, shutdown) {
            error!("Store thread failed: {}", e);
        }
    });
    workers.push(("Store", handle));

    Box::new(StoreHandle::new(task_sender, config.store_timeout()))
}
