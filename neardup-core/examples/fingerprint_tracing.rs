//! Example demonstrating fingerprint tracing instrumentation.
//!
//! Run with: cargo run -p neardup-core --example fingerprint_tracing -- a.png b.jpg

use tracing_subscriber::{fmt, EnvFilter};
use neardup_core::{DetectorConfig, FingerprintRecord, MemoryCandidates};

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with debug level
    fmt()
        .with_env_filter(EnvFilter::new("neardup_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Near-duplicate Tracing Demo ===\n");

    let config = match DetectorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };
    println!("Config: {:?}\n", config);

    let hasher = config.hasher();
    let detector = match config.detector() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };

    let mut store = MemoryCandidates::new();
    for path in std::env::args().skip(1) {
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                println!("❌ {}: {}", path, e);
                continue;
            }
        };

        let result = match hasher.fingerprint_with_timeout(bytes).await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ {}: {}", path, e);
                continue;
            }
        };

        match detector.check(&result.fingerprint, &store) {
            Ok(Some(m)) => println!("🔁 {} duplicates {} (distance {})", path, m.identity, m.distance),
            Ok(None) => {
                println!("✅ {} -> {}", path, result.fingerprint);
                store.insert(FingerprintRecord::new(path.clone(), path, result.fingerprint));
            }
            Err(e) => println!("❌ {}", e),
        }
    }
}
