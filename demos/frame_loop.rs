//! Example: streaming assets across a simulated frame loop
//!
//! Registers an in-memory archive, requests meshes asynchronously and pumps
//! the manager once per frame until everything is resident.

use archetype_stream::assets::{Font, Mesh, MeshData};
use archetype_stream::prelude::*;
use std::sync::Arc;
use std::time::Instant;

fn main() {
    let storage = Arc::new(MemoryStorage::new());
    let cube = MeshData::unit_cube().to_bytes().expect("encode cube");
    for i in 0..64 {
        storage.insert(format!("meshes/rock_{i:02}.mesh"), cube.clone());
    }
    storage.insert("fonts/ui.ttf", b"OTTOui".to_vec());
    storage.insert("system/missing.ttf", b"trueMISSING".to_vec());

    let context = StreamContext::new(
        storage,
        Arc::new(ImmediateWorkerPool),
        Arc::new(HeadlessBackend::new()),
    );
    let config = StreamConfig {
        async_load_window_us: 250,
        ..StreamConfig::game("assets")
    };
    let manager = AssetManager::new(config, context).expect("create asset manager");

    println!("Manifest has {} entries", manager.manifest_len());

    // The UI font is needed immediately
    let font = manager
        .load_path::<Font>("fonts/ui.ttf", LoadMode::Sync)
        .expect("load font");
    println!("Font loaded: {}", font.is_loaded());

    let rocks: Vec<AssetHandle<Mesh>> = (0..64)
        .map(|i| {
            manager
                .load_path::<Mesh>(format!("meshes/rock_{i:02}.mesh"), LoadMode::Async)
                .expect("request rock")
        })
        .collect();

    let mut diagnostics = PumpDiagnostics::new();
    let mut frame = 0;
    while manager.has_assets_to_enable() {
        let start = Instant::now();
        let report = manager.update();
        diagnostics.record(start.elapsed().as_secs_f32() * 1000.0, &report);

        let resident = rocks.iter().filter(|rock| rock.is_loaded()).count();
        println!("Frame {frame}: enabled {}, {resident}/64 rocks", report.enabled);
        frame += 1;
    }
    diagnostics.print();

    // Release half the rocks and let the collector reclaim them
    let kept: Vec<_> = rocks.into_iter().step_by(2).collect();
    let report = manager.update();
    println!(
        "Collected {} meshes, {} still held",
        report.collection.collected,
        kept.len()
    );

    StreamInspector::print_summary(&manager);
    StreamInspector::print_resident(&manager);
}
