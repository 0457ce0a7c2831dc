#![allow(dead_code, unused_imports)]

use archetype_stream::assets::{Mesh, MeshData};
use archetype_stream::prelude::*;
use std::sync::Arc;
use std::{fs::File, time::Instant};

#[cfg(feature = "profiling")]
use tracing_subscriber::{self, prelude::*};

const MESH_COUNT: usize = 2_000;

fn populate(storage: &MemoryStorage) {
    let bytes = MeshData::unit_cube().to_bytes().unwrap();
    for i in 0..MESH_COUNT {
        storage.insert(format!("meshes/cube_{i:05}.mesh"), bytes.clone());
    }
}

#[cfg(feature = "profiling")]
#[tracing::instrument(skip(manager))]
fn profile_streaming(manager: &AssetManager, count: usize) {
    let hashes: Vec<NameHash> = (0..count)
        .map(|i| manager.compute_name_hash(format!("meshes/cube_{i:05}.mesh")))
        .collect();

    let handles = {
        let _span = tracing::info_span!("async_submit", count = count).entered();
        hashes
            .iter()
            .map(|hash| manager.load::<Mesh>(*hash, LoadMode::Async).unwrap())
            .collect::<Vec<_>>()
    };

    let mut diagnostics = PumpDiagnostics::new();
    let mut frame = 0;
    while manager.has_assets_to_enable() {
        let start = Instant::now();
        let report = manager.update();
        diagnostics.record(start.elapsed().as_secs_f32() * 1000.0, &report);
        if frame % 10 == 0 {
            tracing::info!("Frame {}: enabled {}", frame, report.enabled);
        }
        frame += 1;
    }
    diagnostics.print();

    drop(handles);
    let report = manager.collect_garbage();
    tracing::info!("Collected {} assets", report.collected);
}

#[cfg(feature = "profiling")]
fn main() {
    // Set up tracing subscriber to write to a file
    let file = File::create("trace.json").unwrap();
    let (non_blocking, _guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .init();

    let storage = Arc::new(MemoryStorage::new());
    populate(&storage);

    let config = StreamConfig {
        async_load_window_us: 1_000,
        ..StreamConfig::game("assets")
    };
    let workers = Arc::new(archetype_stream::RayonWorkerPool::new(0).unwrap());
    let context = StreamContext::new(storage, workers, Arc::new(HeadlessBackend::new()));
    let manager = AssetManager::new(config, context).unwrap();

    println!("Profiling async streaming of {MESH_COUNT} meshes...");
    let start = Instant::now();
    profile_streaming(&manager, MESH_COUNT);
    println!("Streaming complete in: {:?}", start.elapsed());
    StreamInspector::print_summary(&manager);
}

#[cfg(not(feature = "profiling"))]
fn main() {
    println!("profile_streaming binary requires --features profiling");
}
