//! Seeded pseudo-random generator.
//!
//! Each pipeline phase owns one instance so that the number of draws made by
//! the crawler never shifts the sampler's sequence (and vice versa).

/// xorshift64* generator. Deterministic for a given seed on every platform.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        // splitmix64 finaliser so that nearby seeds (2025, 2026) diverge immediately
        let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        // Avoid the degenerate all-zero state.
        let state = if z == 0 { 0x9e37_79b9_7f4a_7c15 } else { z };
        Self { state }
    }

    /// Independent stream for a named phase of a run (`"crawl"`, `"sample"`).
    pub fn for_phase(seed: u64, phase: &str) -> Self {
        // FNV-1a over the phase name
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in phase.bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x0000_0100_0000_01b3);
        }
        Self::new(seed ^ h)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Uniform float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `[0, upper)`; returns 0 when `upper` is 0.
    pub fn gen_index(&mut self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        (self.next_u64() % (upper as u64)) as usize
    }

    /// Uniform integer in the inclusive range `[low, high]`.
    pub fn gen_range_inclusive(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        low + self.gen_index(high - low + 1)
    }

    /// Uniform float in `[0, upper)`.
    pub fn uniform(&mut self, upper: f64) -> f64 {
        self.next_f64() * upper
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_index(i + 1);
            items.swap(i, j);
        }
    }
}
