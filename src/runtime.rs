//! # Runtime wiring
//!
//! Loads configuration and datasets, constructs the bus and every
//! operator, spawns one OS thread per participant (plus the Clock's
//! separate timer thread), and waits for the system to shut down.
//!
//! Mirrors the teacher's own `SomeIpRuntime::load` + thread-spawning
//! bootstrap, with `tokio` swapped out for bare `std::thread` throughout —
//! this system has no async runtime.

use crate::bus::MessageBus;
use crate::config::SystemConfig;
use crate::datasource;
use crate::error::CoreError;
use crate::messages::BroadcastKind;
use crate::operators::clock::{self, Clock, ClockState};
use crate::operators::fusion::{Fusion, FusionReport};
use crate::operators::{camera::Camera, lidar::Lidar, pose::Pose, FUSION_ID};
use crate::participant::{self, ReadyBarrier};
use crate::stats::Statistics;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Runs the whole simulation to completion and returns whatever report
/// Fusion produced.
pub fn run(config_path: &Path) -> Result<FusionReport, CoreError> {
    log::info!("loading config from {}", config_path.display());
    let config = SystemConfig::load(config_path)?;

    let camera_data = datasource::load_camera_dataset(&config.cameras.camera_datas_path)?;
    let lidar_db = datasource::load_lidar_dataset(&config.lidar_workers.lidars_data_path)?;
    let pose_data = datasource::load_pose_dataset(&config.pose_json_file)?;

    let bus = Arc::new(MessageBus::new());
    let stats = Arc::new(Statistics::new());
    // Sensors (cameras + lidars + pose) plus Fusion all signal readiness;
    // the Clock's timer waits for every one of them.
    let ready = ReadyBarrier::new(config.sensor_count() + 1);
    let clock_state = Arc::new(ClockState::new(config.sensor_count()));
    log::info!(
        "spawning {} camera(s), {} lidar worker(s), 1 pose and 1 fusion operator",
        config.cameras.cameras_configurations.len(),
        config.lidar_workers.lidar_configurations.len()
    );

    // A SIGINT is turned into the same synthetic crash path a faulty
    // sensor would trigger, so the Clock's ordinary latch-and-unwind logic
    // produces a crash snapshot instead of leaving partial state on disk.
    {
        let bus = bus.clone();
        let _ = ctrlc::set_handler(move || {
            log::warn!("SIGINT received, posting a synthetic crash broadcast");
            bus.send_broadcast(BroadcastKind::Crashed {
                sender: "external".to_string(),
                error_maker: "external".to_string(),
                message: "interrupted".to_string(),
            });
        });
    }

    let report_slot: Arc<Mutex<Option<FusionReport>>> = Arc::new(Mutex::new(None));
    let mut handles = Vec::new();

    for cam_cfg in &config.cameras.cameras_configurations {
        let frames = camera_data
            .get(&cam_cfg.camera_key)
            .cloned()
            .ok_or_else(|| CoreError::MissingCameraKey(cam_cfg.camera_key.clone()))?;
        let stats = stats.clone();
        let camera = Camera::new(cam_cfg.id.clone(), cam_cfg.frequency, frames, stats);
        // `participant::spawn` registers, initializes (subscribes) and
        // signals readiness synchronously before handing the message
        // loop to its own thread, so no broadcast sent once every
        // readiness signal is in can be missed by a late subscriber.
        handles.push(participant::spawn(bus.clone(), camera, &ready));
    }

    for lidar_cfg in &config.lidar_workers.lidar_configurations {
        let stats = stats.clone();
        let db = lidar_db.clone();
        let lidar = Lidar::new(lidar_cfg.id.clone(), lidar_cfg.frequency, db, stats);
        handles.push(participant::spawn(bus.clone(), lidar, &ready));
    }

    {
        let pose_op = Pose::new("Pose", pose_data);
        handles.push(participant::spawn(bus.clone(), pose_op, &ready));
    }

    {
        let bus = bus.clone();
        let ready = ready.clone();
        let stats = stats.clone();
        let report_slot = report_slot.clone();
        let fusion = Fusion::new(FUSION_ID, stats);
        // Fusion needs its report extracted after the loop exits, so it
        // runs its own copy of the register/initialize/spawn sequence
        // rather than the generic `participant::spawn` helper (which
        // consumes the participant without giving it back).
        handles.push(run_fusion(&bus, fusion, &ready, report_slot));
    }

    {
        let state = clock_state.clone();
        let clock_participant = Clock::new(state);
        // Clock's own participant loop is not one of the parties the
        // timer waits on, and its subscriptions must be in place before
        // the timer (gated by the real barrier below) can start
        // broadcasting ticks — so it's spawned synchronously here
        // against a private, uncounted barrier rather than the shared
        // one, closing both the readiness-barrier race and the
        // subscribe-before-first-tick race in one move.
        let solo_ready = ReadyBarrier::new(0);
        handles.push(participant::spawn(bus.clone(), clock_participant, &solo_ready));
    }

    {
        let bus = bus.clone();
        let state = clock_state;
        let stats = stats.clone();
        let tick_period = Duration::from_secs(config.tick_time_secs);
        let duration = config.duration;
        let ready = ready.clone();
        handles.push(thread::spawn(move || {
            clock::run_timer(bus, state, stats, tick_period, duration, ready);
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    let report = report_slot
        .lock()
        .unwrap()
        .take()
        .expect("fusion always produces a report before its thread exits");
    Ok(report)
}

fn run_fusion(
    bus: &Arc<MessageBus>,
    mut fusion: Fusion,
    ready: &ReadyBarrier,
    report_slot: Arc<Mutex<Option<FusionReport>>>,
) -> thread::JoinHandle<()> {
    use crate::participant::{ControlFlow, Participant};

    let mailbox = bus.register(fusion.id());
    fusion.initialize(bus);
    ready.signal();

    let bus = bus.clone();
    thread::spawn(move || {
        loop {
            match mailbox.await_message() {
                None => break,
                Some(msg) => {
                    if let ControlFlow::Terminate = fusion.handle(&bus, msg) {
                        break;
                    }
                }
            }
        }

        bus.unregister(fusion.id());
        *report_slot.lock().unwrap() = fusion.into_report();
    })
}
