// src/performance_test.rs
// Times commitment and proof generation for a large allowlist held in memory.
use rand::Rng;
use std::time::Instant;

use verifiable_allowlist::domain::model::h256_to_hex;
use verifiable_allowlist::{verify_membership_proof, AllowlistRegistry, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let num_items: usize = std::env::args()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .unwrap_or(10_000);
    println!(
        "--- Allowlist Performance Test: commitment over {} addresses ---",
        num_items
    );

    let registry = AllowlistRegistry::new(MemoryStore::new());
    let mut rng = rand::thread_rng();
    let addresses: Vec<String> = (0..num_items)
        .map(|_| format!("0x{}", hex::encode(rng.gen::<[u8; 20]>())))
        .collect();

    // --- Bulk insert ---
    let start_time = Instant::now();
    let added = registry.add_batch(&addresses).await;
    println!("Inserted {} addresses in {} ms", added, start_time.elapsed().as_millis());

    // --- Root ---
    let start_time = Instant::now();
    let root = registry
        .compute_commitment()
        .await
        .ok_or_else(|| anyhow::anyhow!("allowlist is empty"))?;
    let root_ms = start_time.elapsed().as_millis();

    // --- Proofs for a random sample ---
    let samples = num_items.min(100);
    let start_time = Instant::now();
    let mut verified = 0;
    for _ in 0..samples {
        let address = &addresses[rng.gen_range(0..addresses.len())];
        if let Some(proof) = registry.prove_membership(address).await {
            if verify_membership_proof(root, proof.leaf, &proof.siblings) {
                verified += 1;
            }
        }
    }
    let proof_duration = start_time.elapsed();

    println!("\n--- Results ---");
    println!("Root: {}", h256_to_hex(&root));
    println!("Time to compute root: {} ms", root_ms);
    println!(
        "Proofs: {}/{} verified, average {:.2} ms per proof (tree rebuilt each time)",
        verified,
        samples,
        proof_duration.as_micros() as f64 / samples.max(1) as f64 / 1000.0
    );
    Ok(())
}
