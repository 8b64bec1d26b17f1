//! Optimal Bloom filter parameter calculation
//!
//! Formulas:
//! - m(k) = -k*n / ln(1 - p^(1/k))   -- bits needed for k hash functions
//! - FPR  = (1 - e^(-kn/m))^k
//! - n*   = -(m/k) * ln(1 - X/m)     -- cardinality from X set bits

/// Hash counts searched when sizing a filter.
pub const MAX_HASH_COUNT: usize = 1000;

/// Smallest false positive rate the sizing accepts (one wire micro-unit).
pub const MIN_FPP: f64 = 1e-6;

/// Largest false positive rate the sizing accepts.
pub const MAX_FPP: f64 = 0.5;

/// Largest table, in bytes, a filter is ever given. Bit indices are derived
/// from 32-bit salted hashes, so bits past 2^32 are unreachable.
pub const MAX_TABLE_SIZE: usize = 1 << 29;

/// Bloom filter sizing
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilterParams {
    /// Table size in bytes
    pub table_size: usize,
    /// Number of hash functions (salts)
    pub hash_count: usize,
    /// Expected false positive rate at the target size
    pub expected_fpr: f64,
}

/// Clamp a requested false positive rate into the range the sizing handles.
pub fn sanitize_fpp(fpp: f64) -> f64 {
    if fpp.is_nan() {
        return MAX_FPP;
    }
    fpp.clamp(MIN_FPP, MAX_FPP)
}

/// Calculate the smallest table that meets `target_fpp` for
/// `expected_elements` unique inserts.
///
/// Searches k in `1..MAX_HASH_COUNT` for the minimum m(k); the table is
/// rounded up to whole bytes, never empty, and capped at [`MAX_TABLE_SIZE`].
pub fn calculate_optimal_parameters(expected_elements: u64, target_fpp: f64) -> BloomFilterParams {
    let n = expected_elements.max(1) as f64;
    let p = sanitize_fpp(target_fpp);

    let mut min_m = f64::INFINITY;
    let mut min_k = 1usize;
    for k in 1..MAX_HASH_COUNT {
        let kf = k as f64;
        let m = (-kf * n) / (1.0 - p.powf(1.0 / kf)).ln();
        if m < min_m {
            min_m = m;
            min_k = k;
        }
    }

    let bits = min_m.ceil().clamp(8.0, (MAX_TABLE_SIZE * 8) as f64) as usize;
    let table_size = bits.div_ceil(8);
    let expected_fpr = calculate_fpr(
        table_size.saturating_mul(8),
        expected_elements.max(1) as usize,
        min_k,
    );

    BloomFilterParams {
        table_size,
        hash_count: min_k,
        expected_fpr,
    }
}

/// Calculate the false positive rate for given parameters
///
/// Formula: FPR = (1 - e^(-kn/m))^k
pub fn calculate_fpr(m: usize, n: usize, k: usize) -> f64 {
    if m == 0 {
        return 1.0;
    }
    let exponent = -(k as f64) * (n as f64) / (m as f64);
    (1.0 - exponent.exp()).powi(k as i32)
}

/// Estimate how many unique values produced `bits_set` of `m` bits with
/// `k` hash functions. Infinite once every bit is set.
pub fn estimate_cardinality(bits_set: usize, m: usize, k: usize) -> f64 {
    if m == 0 || k == 0 {
        return 0.0;
    }
    if bits_set >= m {
        return f64::INFINITY;
    }
    let m = m as f64;
    -(m / k as f64) * (1.0 - bits_set as f64 / m).ln()
}
