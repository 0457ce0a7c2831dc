use archetype_stream::assets::{Font, Mesh, MeshData, Shader};
use archetype_stream::manifest::{FontMetadata, MeshMetadata, ShaderMetadata, ShaderStage};
use archetype_stream::prelude::*;
use std::io::Read;
use std::sync::Arc;

fn storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert("meshes/cube.mesh", MeshData::unit_cube().to_bytes().unwrap());
    storage.insert("meshes/props/crate.mesh", MeshData::unit_cube().to_bytes().unwrap());
    storage.insert("fonts/mono.ttf", b"OTTOmono".to_vec());
    storage.insert("system/missing.ttf", b"trueMISSING".to_vec());
    storage
}

fn editor(storage: Arc<MemoryStorage>) -> AssetManager {
    let context = StreamContext::new(
        storage,
        Arc::new(ImmediateWorkerPool),
        Arc::new(HeadlessBackend::new()),
    );
    AssetManager::new(StreamConfig::editor("assets"), context).unwrap()
}

/// Hashes two chosen paths to the same value
struct CollidingStorage {
    inner: MemoryStorage,
    colliding: [&'static str; 2],
}

impl StorageBackend for CollidingStorage {
    fn open(&self, path: &str) -> archetype_stream::Result<Box<dyn Read + Send>> {
        self.inner.open(path)
    }

    fn hash(&self, path: &str) -> NameHash {
        if self.colliding.contains(&path) {
            NameHash(0xc011_1de)
        } else {
            self.inner.hash(path)
        }
    }

    fn list_directory(&self, path: &str) -> archetype_stream::Result<Vec<String>> {
        self.inner.list_directory(path)
    }
}

#[test]
fn test_append_and_remove_entries() {
    let storage = storage();
    let manager = editor(storage.clone());
    let before = manager.manifest_len();

    storage.insert("shaders/lit.frag", b"void fs_main() {}".to_vec());
    let hash = manager
        .append_to_manifest(
            "shaders/lit.frag",
            Some(AssetMetadata::Shader(ShaderMetadata {
                stage: ShaderStage::Fragment,
                entry_point: "fs_main".to_string(),
            })),
        )
        .unwrap();
    assert_eq!(manager.manifest_len(), before + 1);
    assert_eq!(
        manager.get_asset_path_copy(hash).as_deref(),
        Some("shaders/lit.frag")
    );

    let shader = manager.load::<Shader>(hash, LoadMode::Sync).unwrap();
    assert_eq!(shader.get().unwrap().stage, ShaderStage::Fragment);

    assert!(manager.remove_from_manifest("shaders/lit.frag").unwrap());
    assert!(!manager.remove_from_manifest("shaders/lit.frag").unwrap());
    // Resident copies stay usable after the entry is gone
    assert!(shader.is_loaded());
    assert!(manager.get_metadata_copy(hash).is_none());
}

#[test]
fn test_append_rejects_wrong_metadata_and_extension() {
    let manager = editor(storage());
    assert!(matches!(
        manager.append_to_manifest("notes/readme.txt", None),
        Err(StreamError::UnsupportedAsset(_))
    ));
    assert!(matches!(
        manager.append_to_manifest(
            "fonts/sans.ttf",
            Some(AssetMetadata::default_for(AssetType::Mesh, "x.mesh"))
        ),
        Err(StreamError::Manifest(_))
    ));
}

#[test]
fn test_refresh_reloads_resident_asset_in_place() {
    let storage = storage();
    let manager = editor(storage.clone());
    let hash = manager.compute_name_hash("fonts/mono.ttf");
    let font = manager.load::<Font>(hash, LoadMode::Sync).unwrap();
    assert_eq!(font.get().unwrap().data, b"OTTOmono");

    storage.insert("fonts/mono.ttf", b"OTTOmono-v2".to_vec());
    manager
        .request_asset_refresh(AssetType::Font, "fonts/mono.ttf")
        .unwrap();
    assert_eq!(font.get().unwrap().data, b"OTTOmono-v2");
    assert_eq!(font.ref_count(), 1);

    assert!(matches!(
        manager.request_asset_refresh(AssetType::Mesh, "fonts/mono.ttf"),
        Err(StreamError::AssetTypeMismatch { .. })
    ));
}

#[test]
fn test_refresh_registers_new_files() {
    let storage = storage();
    let manager = editor(storage.clone());
    storage.insert("fonts/serif.ttf", b"trueserif".to_vec());

    manager
        .request_asset_refresh(AssetType::Font, "fonts/serif.ttf")
        .unwrap();
    let hash = manager.compute_name_hash("fonts/serif.ttf");
    assert_eq!(
        manager.get_metadata_copy(hash),
        Some(AssetMetadata::Font(FontMetadata::default()))
    );
    assert!(!manager.is_resident(hash));
}

#[test]
fn test_deleting_a_resident_asset_degrades_to_missing() {
    let manager = editor(storage());
    let hash = manager.compute_name_hash("fonts/mono.ttf");
    let font = manager.load::<Font>(hash, LoadMode::Sync).unwrap();

    assert_eq!(manager.request_asset_deletion("fonts/mono.ttf", false).unwrap(), 1);
    assert!(manager.get_manifest_entry(hash).is_none());
    assert!(font.is_loaded());
    assert!(font.get().unwrap().is_placeholder);
    assert_eq!(font.name_hash(), hash);
}

#[test]
fn test_deleting_a_directory() {
    let manager = editor(storage());
    let removed = manager.request_asset_deletion("meshes", true).unwrap();
    assert_eq!(removed, 2);
    assert!(manager
        .load_path::<Mesh>("meshes/cube.mesh", LoadMode::Sync)
        .is_err());
}

#[test]
fn test_moving_a_directory_keeps_handles() {
    let manager = editor(storage());
    let old_hash = manager.compute_name_hash("meshes/props/crate.mesh");
    let handle = manager.load::<Mesh>(old_hash, LoadMode::Sync).unwrap();

    let moved = manager.request_asset_move("meshes", "models", true).unwrap();
    assert_eq!(moved, 2);

    let new_hash = manager.compute_name_hash("models/props/crate.mesh");
    assert_eq!(handle.name_hash(), new_hash);
    assert!(manager.get_manifest_entry(old_hash).is_none());
    assert!(!manager.is_resident(old_hash));

    let again = manager.load::<Mesh>(new_hash, LoadMode::Sync).unwrap();
    assert_eq!(again.slot_id(), handle.slot_id());
    assert_eq!(handle.ref_count(), 2);
}

#[test]
fn test_move_onto_deleted_but_referenced_path() {
    let manager = editor(storage());
    let cube = manager
        .load_path::<Mesh>("meshes/cube.mesh", LoadMode::Sync)
        .unwrap();
    let orphan = manager
        .load_path::<Mesh>("meshes/props/crate.mesh", LoadMode::Sync)
        .unwrap();
    assert_eq!(
        manager.request_asset_deletion("meshes/props/crate.mesh", false).unwrap(),
        1
    );

    let moved = manager
        .request_asset_move("meshes/cube.mesh", "meshes/props/crate.mesh", false)
        .unwrap();
    assert_eq!(moved, 1);

    let new_hash = manager.compute_name_hash("meshes/props/crate.mesh");
    assert_eq!(cube.name_hash(), new_hash);
    let again = manager.load::<Mesh>(new_hash, LoadMode::Sync).unwrap();
    assert_eq!(again.slot_id(), cube.slot_id());
    assert_ne!(orphan.slot_id(), cube.slot_id());

    // The retired slot is reclaimed without touching the moved entry
    drop(orphan);
    assert_eq!(manager.collect_garbage().collected, 1);
    assert!(manager.is_resident(new_hash));
    assert!(again.is_loaded());
}

#[test]
fn test_reappending_a_deleted_resident_asset_reloads_it() {
    let storage = storage();
    let manager = editor(storage.clone());
    let handle = manager
        .load_path::<Mesh>("meshes/props/crate.mesh", LoadMode::Sync)
        .unwrap();
    manager
        .request_asset_deletion("meshes/props/crate.mesh", false)
        .unwrap();

    let mut bigger = MeshData::unit_cube();
    bigger.positions.iter_mut().for_each(|v| *v *= 4.0);
    storage.insert("meshes/props/crate.mesh", bigger.to_bytes().unwrap());
    manager
        .append_to_manifest("meshes/props/crate.mesh", None)
        .unwrap();

    assert_eq!(handle.get().unwrap().bounds_max.x, 2.0);
    let again = manager
        .load_path::<Mesh>("meshes/props/crate.mesh", LoadMode::Sync)
        .unwrap();
    assert_eq!(again.slot_id(), handle.slot_id());
    assert_eq!(again.get().unwrap().bounds_max.x, 2.0);

    // Re-appending with new settings applies them to the resident copy
    manager
        .append_to_manifest(
            "meshes/props/crate.mesh",
            Some(AssetMetadata::Mesh(MeshMetadata { scale: 0.5 })),
        )
        .unwrap();
    assert_eq!(again.get().unwrap().bounds_max.x, 1.0);
}

#[test]
fn test_deleted_shader_keeps_its_stage() {
    let storage = storage();
    storage.insert("shaders/skin.vert", b"@vertex fn main() {}".to_vec());
    let manager = editor(storage);
    let shader = manager
        .load_path::<Shader>("shaders/skin.vert", LoadMode::Sync)
        .unwrap();

    manager.request_asset_deletion("shaders", true).unwrap();
    let placeholder = shader.get().unwrap();
    assert_eq!(placeholder.stage, ShaderStage::Vertex);
    assert!(placeholder.source.starts_with("@vertex"));
}

#[test]
fn test_move_onto_registered_path_is_skipped() {
    let manager = editor(storage());
    let moved = manager
        .request_asset_move("meshes/cube.mesh", "meshes/props/crate.mesh", false)
        .unwrap();
    assert_eq!(moved, 0);
    assert!(manager
        .get_manifest_entry(manager.compute_name_hash("meshes/cube.mesh"))
        .is_some());
}

#[test]
fn test_remove_non_system_entries() {
    let manager = editor(storage());
    let removed = manager.remove_non_system_assets_from_manifest().unwrap();
    assert_eq!(removed, 3);
    assert_eq!(manager.manifest_len(), 1);
    assert!(manager.get_system_asset::<Font>("missing.ttf").is_ok());
}

#[test]
fn test_hash_collision_is_detected_before_registration() {
    let inner = MemoryStorage::new();
    inner.insert("a.mesh", MeshData::unit_cube().to_bytes().unwrap());
    inner.insert("b.mesh", MeshData::unit_cube().to_bytes().unwrap());
    let storage = Arc::new(CollidingStorage {
        inner,
        colliding: ["a.mesh", "b.mesh"],
    });
    let context = StreamContext::new(
        storage,
        Arc::new(ImmediateWorkerPool),
        Arc::new(HeadlessBackend::new()),
    );
    let manager = AssetManager::new(StreamConfig::editor("assets"), context).unwrap();

    // The scan kept the first path and skipped the second
    assert_eq!(manager.manifest_len(), 1);
    assert_eq!(
        manager.get_asset_path_copy(NameHash(0xc011_1de)).as_deref(),
        Some("a.mesh")
    );

    let collision = manager.check_for_hash_collision("b.mesh").unwrap();
    assert_eq!(collision.existing_path, "a.mesh");
    assert_eq!(collision.incoming_path, "b.mesh");
    assert!(manager.check_for_hash_collision("a.mesh").is_none());

    assert!(matches!(
        manager.append_to_manifest("b.mesh", None),
        Err(StreamError::HashCollision(_))
    ));
    assert_eq!(manager.manifest_len(), 1);
}

#[test]
fn test_game_mode_rejects_every_editor_operation() {
    let context = StreamContext::new(
        storage(),
        Arc::new(ImmediateWorkerPool),
        Arc::new(HeadlessBackend::new()),
    );
    let manager = AssetManager::new(StreamConfig::game("assets"), context).unwrap();

    let results = [
        manager.append_to_manifest("fonts/new.ttf", None).err(),
        manager.remove_from_manifest("fonts/mono.ttf").err(),
        manager
            .request_asset_refresh(AssetType::Font, "fonts/mono.ttf")
            .err(),
        manager.request_asset_deletion("fonts", true).err(),
        manager.request_asset_move("fonts", "type", true).err(),
        manager.remove_non_system_assets_from_manifest().err(),
    ];
    assert!(results
        .iter()
        .all(|err| matches!(err, Some(StreamError::EditorOnly(_)))));

    // Read accessors keep working
    let hash = manager.compute_name_hash("fonts/mono.ttf");
    assert!(manager.get_metadata_copy(hash).is_some());
}

#[test]
fn test_manifest_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = StreamConfig {
        manifest_file: Some("manifest.json".to_string()),
        ..StreamConfig::editor(dir.path())
    };
    let context = StreamContext::new(
        storage(),
        Arc::new(ImmediateWorkerPool),
        Arc::new(HeadlessBackend::new()),
    );
    let manager = AssetManager::new(config, context).unwrap();
    manager.save_manifest().unwrap();

    let bytes = std::fs::read(dir.path().join("manifest.json")).unwrap();
    let restored = archetype_stream::Manifest::from_json_bytes(&bytes).unwrap();
    assert_eq!(restored.len(), manager.manifest_len());

    // A saved manifest is used instead of scanning
    let replay = MemoryStorage::new();
    replay.insert("manifest.json", bytes);
    let context = StreamContext::new(
        Arc::new(replay),
        Arc::new(ImmediateWorkerPool),
        Arc::new(HeadlessBackend::new()),
    );
    let config = StreamConfig {
        manifest_file: Some("manifest.json".to_string()),
        preload_system_assets: false,
        ..StreamConfig::game("assets")
    };
    let from_file = AssetManager::new(config, context).unwrap();
    assert_eq!(from_file.manifest_len(), 4);
}
