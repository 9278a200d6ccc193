//! Customer-facing reservation numbers: `EV` + UTC date + `-` + 4 characters,
//! e.g. `EV20250114-7KQ2`.
//!
//! The suffix is random. Uniqueness comes from the UNIQUE index on
//! `reservations.reservation_number`; callers retry with a fresh suffix when
//! the insert collides.

use chrono::{NaiveDate, Utc};
use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 4;

pub fn reservation_number<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("EV{}-{}", date.format("%Y%m%d"), suffix)
}

/// A number for today (UTC).
pub fn generate() -> String {
    reservation_number(Utc::now().date_naive(), &mut rand::thread_rng())
}
