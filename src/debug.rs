use crate::manager::{AssetManager, FrameReport, ResidentAsset, TypeSummary};
use crate::manifest::AssetType;
use std::collections::VecDeque;

/// Asset manager inspector for debugging
pub struct StreamInspector;

impl StreamInspector {
    pub fn resident_count(manager: &AssetManager) -> usize {
        manager.loaded_count()
    }

    /// Slot usage per asset type
    pub fn type_summaries(manager: &AssetManager) -> Vec<TypeSummary> {
        AssetType::ALL
            .iter()
            .map(|asset_type| manager.type_summary(*asset_type))
            .collect()
    }

    pub fn resident_assets(manager: &AssetManager) -> Vec<ResidentAsset> {
        manager.resident_assets()
    }

    /// Print manager summary to console
    pub fn print_summary(manager: &AssetManager) {
        let stats = manager.stats();
        println!("=== Asset Streaming Summary ===");
        println!("Mode: {:?}", manager.mode());
        println!("Manifest entries: {}", manager.manifest_len());
        println!("Resident assets: {}", Self::resident_count(manager));
        println!(
            "Loads: {} sync, {} async, {} fetch hits ({:.1}% hit ratio)",
            stats.sync_loads,
            stats.async_loads,
            stats.fetch_hits,
            stats.fetch_hit_ratio() * 100.0
        );
        println!(
            "Enabled: {}, collected: {}, leaked: {}, read failures: {}",
            stats.enabled, stats.collected, stats.leaked, stats.read_failures
        );

        println!("\n=== Types ===");
        for summary in Self::type_summaries(manager) {
            println!(
                "{}: {} slots, {} free, {} pending",
                summary.asset_type, summary.slots, summary.free, summary.pending
            );
        }
    }

    /// Print every resident asset
    pub fn print_resident(manager: &AssetManager) {
        println!("=== Resident Assets ===");
        for asset in Self::resident_assets(manager) {
            println!(
                "{} {} {} refs={} {} {}",
                asset.asset_type,
                asset.slot,
                asset.name_hash,
                asset.ref_count,
                if asset.pending {
                    "pending"
                } else if asset.loaded {
                    "loaded"
                } else {
                    "empty"
                },
                asset.path.as_deref().unwrap_or("<not in manifest>")
            );
        }
    }
}

/// Frame pump timings
#[derive(Clone, Debug)]
pub struct PumpDiagnostics {
    pump_times: VecDeque<f32>,
    enabled: VecDeque<usize>,
    max_samples: usize,
}

impl PumpDiagnostics {
    pub fn new() -> Self {
        Self::with_samples(60)
    }

    pub fn with_samples(max_samples: usize) -> Self {
        Self {
            pump_times: VecDeque::new(),
            enabled: VecDeque::new(),
            max_samples: max_samples.max(1),
        }
    }

    /// Record one `update()` and how long it took in milliseconds
    pub fn record(&mut self, time_ms: f32, report: &FrameReport) {
        self.pump_times.push_back(time_ms);
        self.enabled.push_back(report.enabled);
        if self.pump_times.len() > self.max_samples {
            self.pump_times.pop_front();
            self.enabled.pop_front();
        }
    }

    pub fn avg_pump_time(&self) -> f32 {
        if self.pump_times.is_empty() {
            return 0.0;
        }
        self.pump_times.iter().sum::<f32>() / self.pump_times.len() as f32
    }

    pub fn max_pump_time(&self) -> f32 {
        self.pump_times.iter().copied().fold(0.0, f32::max)
    }

    /// Average assets enabled per frame
    pub fn avg_enabled(&self) -> f32 {
        if self.enabled.is_empty() {
            return 0.0;
        }
        self.enabled.iter().sum::<usize>() as f32 / self.enabled.len() as f32
    }

    pub fn print(&self) {
        println!("=== Pump Diagnostics ===");
        println!("Avg Pump Time: {:.3}ms", self.avg_pump_time());
        println!("Max Pump Time: {:.3}ms", self.max_pump_time());
        println!("Avg Enabled/Frame: {:.2}", self.avg_enabled());
    }
}

impl Default for PumpDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}
