//! Filter types.
//!
//! | Type                    | Storage                  | Remove | Concurrency                 |
//! |-------------------------|--------------------------|--------|-----------------------------|
//! | [`CountingBloomFilter`] | in-process 4-bit counters | yes   | striped writers, lock-free reads |
//! | [`StoreBloomFilter`]    | any [`BitStore`]         | no     | whatever the store provides |
//!
//! The two are independent; they share only the
//! [`OffsetGenerator`](crate::hash::OffsetGenerator).

pub mod counting;
pub mod store;

pub use counting::CountingBloomFilter;
pub use store::{BitStore, MemoryBitStore, StoreBloomFilter};
