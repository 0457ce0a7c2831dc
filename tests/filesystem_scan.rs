use archetype_stream::assets::{Mesh, MeshData, Texture};
use archetype_stream::manifest::TextureFilter;
use archetype_stream::prelude::*;
use image::{ImageFormat, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn write(root: &Path, path: &str, bytes: impl AsRef<[u8]>) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, bytes).unwrap();
}

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "meshes/cube.mesh", MeshData::unit_cube().to_bytes().unwrap());
    write(root, "meshes/cube.mesh.meta", r#"{"type":"Mesh","scale":3.0}"#);
    write(root, "textures/grass.png", png_bytes(16, 4));
    write(
        root,
        "textures/grass.png.meta",
        r#"{"type":"Texture","srgb":false,"generate_mipmaps":false,"filter":"Nearest"}"#,
    );
    write(root, "system/missing.png", png_bytes(2, 2));
    write(root, "README.txt", "not an asset");
    dir
}

#[test]
fn test_scan_registers_assets_and_sidecars() {
    let dir = project();
    let manager = AssetManager::from_config(StreamConfig::game(dir.path())).unwrap();
    assert_eq!(manager.manifest_len(), 3);

    let mesh_hash = manager.compute_name_hash("meshes/cube.mesh");
    let mesh = manager.load::<Mesh>(mesh_hash, LoadMode::Sync).unwrap();
    assert_eq!(mesh.get().unwrap().bounds_max.x, 1.5);

    let texture = manager
        .load_path::<Texture>(dir.path().join("textures/grass.png"), LoadMode::Sync)
        .unwrap();
    let texture = texture.get().unwrap();
    assert_eq!((texture.width, texture.height), (16, 4));
    assert_eq!(texture.mip_levels, 1);
    assert!(!texture.srgb);
    assert_eq!(texture.filter, TextureFilter::Nearest);
}

#[test]
fn test_system_missing_texture_is_used_as_fallback() {
    let dir = project();
    let manager = AssetManager::from_config(StreamConfig::game(dir.path())).unwrap();

    let missing = manager.get_missing_asset::<Texture>().unwrap();
    assert_eq!(missing.name_hash(), manager.compute_name_hash("system/missing.png"));
    assert_eq!(missing.get().unwrap().width, 2);

    let entry = manager.get_manifest_entry(missing.name_hash()).unwrap();
    assert!(entry.is_system);
    assert!(manager.get_system_asset::<Texture>("missing.png").is_ok());
}

#[test]
fn test_async_loads_through_worker_threads() {
    let dir = project();
    let config = StreamConfig {
        worker_threads: 2,
        ..StreamConfig::game(dir.path())
    };
    let manager = AssetManager::from_config(config).unwrap();
    let handle = manager
        .load_path::<Texture>("textures/grass.png", LoadMode::Async)
        .unwrap();

    let mut frames = 0;
    while manager.has_assets_to_enable() && frames < 1_000 {
        manager.update();
        std::thread::sleep(Duration::from_millis(1));
        frames += 1;
    }
    assert!(handle.is_loaded());
    assert_eq!(handle.get().unwrap().width, 16);
}

#[test]
fn test_persisted_manifest_replaces_scan() {
    let dir = project();
    let config = StreamConfig {
        manifest_file: Some("manifest.json".to_string()),
        ..StreamConfig::editor(dir.path())
    };
    let manager = AssetManager::from_config(config.clone()).unwrap();
    assert!(manager.remove_from_manifest("meshes/cube.mesh").unwrap());
    manager.save_manifest().unwrap();
    drop(manager);

    // The saved manifest is not an asset, and it wins over a fresh scan
    let reloaded = AssetManager::from_config(config).unwrap();
    assert_eq!(reloaded.manifest_len(), 2);
    assert!(reloaded
        .load_path::<Mesh>("meshes/cube.mesh", LoadMode::Sync)
        .is_err());
}

#[test]
fn test_config_file_drives_the_manager() {
    let dir = project();
    let config_path = dir.path().join("stream.json");
    let json = format!(
        r#"{{"import_root": {:?}, "mode": "Editor", "async_load_window_us": 500}}"#,
        dir.path().display().to_string()
    );
    fs::write(&config_path, json).unwrap();

    let config = StreamConfig::from_file(&config_path).unwrap();
    assert!(config.is_editor());
    assert_eq!(config.async_load_window(), Duration::from_micros(500));

    let manager = AssetManager::from_config(config).unwrap();
    assert_eq!(manager.mode(), OperatingMode::Editor);
    assert_eq!(manager.manifest_len(), 3);
}

#[test]
fn test_mismatched_sidecar_fails_the_scan() {
    let dir = project();
    write(dir.path(), "meshes/cube.mesh.meta", r#"{"type":"Font"}"#);
    let result = AssetManager::from_config(StreamConfig::game(dir.path()));
    assert!(matches!(result, Err(StreamError::Manifest(_))));
}

#[test]
fn test_missing_import_root_scans_empty() {
    let dir = tempfile::tempdir().unwrap();
    let manager =
        AssetManager::from_config(StreamConfig::game(dir.path().join("does-not-exist"))).unwrap();
    assert_eq!(manager.manifest_len(), 0);
    assert!(manager.get_missing_asset::<Mesh>().unwrap().is_loaded());
}
