//! CountingBloomFilter capacity planning example.
//!
//! Run with: cargo run --example capacity_planning

use cbloom::builder::CountingBloomFilterBuilder;
use cbloom::core::params::{bits_per_element, false_positive_probability};

fn main() -> cbloom::Result<()> {
    println!("CountingBloomFilter Capacity Planning Examples\n");

    let workloads = vec![
        ("Session Tracker", 10_000, 0.01),
        ("Web Cache Summary", 250_000, 0.02),
        ("Packet Dedup", 1_000_000, 0.001),
        ("Small Lookup Table", 500, 0.05),
    ];

    for (name, capacity, fpr) in workloads {
        let (filter, metadata) = CountingBloomFilterBuilder::new()
            .expected_items(capacity)
            .false_positive_rate(fpr)
            .build_with_metadata()?;

        println!("{}", name);
        println!("  capacity:          {}", capacity);
        println!("  target fpr:        {}", fpr);
        println!("  counters (m):      {}", metadata.counters);
        println!("  hash count (k):    {}", metadata.hash_count);
        println!("  counters per key:  {:.2}", bits_per_element(metadata.counters, capacity));
        println!("  counter bytes:     {}", metadata.counter_bytes);
        println!("  total bytes:       {}", filter.memory_usage());

        // How the rate degrades when the filter is overfilled.
        for load in [1, 2, 4] {
            let n = capacity * load;
            println!(
                "  fpr at {}x load:    {:.6}",
                load,
                false_positive_probability(metadata.counters, metadata.hash_count, n)
            );
        }
        println!();
    }

    Ok(())
}
