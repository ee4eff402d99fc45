//! Module implement common utility functions and types.

use cbordata::{Cbor, FromCbor, IntoCbor};
use rand::Rng;

use std::{
    cmp,
    sync::atomic::{AtomicU64, Ordering::SeqCst},
};

use crate::{Error, Result};

pub mod spinlock;

pub use spinlock::Spinlock;

/// Number of random base36 characters in a generated document-id.
const ID_RANDOM_LEN: usize = 9;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static LAST_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Helper function to serialize value `T` implementing IntoCbor, into byte-string.
pub fn into_cbor_bytes<T>(val: T) -> Result<Vec<u8>>
where
    T: IntoCbor,
{
    let mut data: Vec<u8> = vec![];
    let n = err_at!(
        FailCbor,
        err_at!(FailCbor, val.into_cbor())?.encode(&mut data)
    )?;
    if n != data.len() {
        err_at!(Fatal, msg: "cbor encoding len mistmatch {} {}", n, data.len())
    } else {
        Ok(data)
    }
}

/// Helper function to deserialize value `T` implementing FromCbor, from byte-string.
/// Return (value, bytes-consumed).
pub fn from_cbor_bytes<T>(mut data: &[u8]) -> Result<(T, usize)>
where
    T: FromCbor,
{
    let (val, n) = err_at!(FailCbor, Cbor::decode(&mut data))?;
    Ok((err_at!(FailCbor, T::from_cbor(val))?, n))
}

/// Fold the 128-bit city-hash digest of `bytes` into two decorrelated
/// 32-bit words, `(bucket-hash, shard-hash)`. The low half feeds bucket
/// placement within a table, the high half selects the shard, so the two
/// never correlate for the same key.
pub fn hash_pair(bytes: &[u8]) -> (u32, u32) {
    let digest = cityhash_rs::cityhash_110_128(bytes);
    let lo = digest as u64;
    let hi = (digest >> 64) as u64;
    (fold64(lo), fold64(hi))
}

#[inline]
fn fold64(word: u64) -> u32 {
    ((word >> 32) as u32) ^ ((word & 0xFFFFFFFF) as u32)
}

/// Generate a fresh document-id, as `<millis>_<base36-random>`. The
/// millis component never decreases across calls, so ids sort
/// lexicographically in rough insertion order.
pub fn gen_id() -> String {
    let now = cmp::max(chrono::Utc::now().timestamp_millis(), 0) as u64;
    let prev = match LAST_MILLIS.fetch_update(SeqCst, SeqCst, |last| Some(cmp::max(last, now))) {
        Ok(prev) => prev,
        Err(prev) => prev,
    };
    let millis = cmp::max(now, prev);

    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();

    format!("{}_{}", millis, suffix)
}

/// Round `n` up to the next power of two, with a floor of `min`.
pub fn to_pow2(n: usize, min: usize) -> Result<usize> {
    let n = cmp::max(n, min);
    match n.checked_next_power_of_two() {
        Some(n) => Ok(n),
        None => err_at!(FailConvert, msg: "{} too large for power-of-2", n),
    }
}
