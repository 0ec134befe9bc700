//! Time-ordered child keys.
//!
//! A push id is 20 characters from a 64-character alphabet that sorts the same way as the
//! character codes. The first 8 characters encode the creation time in milliseconds, most
//! significant first; the remaining 12 are random. Ids created within the same millisecond
//! reuse the previous random part incremented by one, so keys always sort in creation order.

use uuid::Uuid;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

/// Generates push ids. Not synchronized; the store calls it under its write lock.
#[derive(Debug, Default)]
pub(crate) struct PushIdGenerator {
    last_millis: u64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the id for a child created at `now_millis`.
    pub(crate) fn next(&mut self, now_millis: u64) -> String {
        if now_millis == self.last_millis {
            self.increment();
        } else {
            self.last_millis = now_millis;
            self.reseed();
        }

        let mut id = [0u8; TIME_CHARS + RANDOM_CHARS];

        let mut time = now_millis;
        for slot in id[..TIME_CHARS].iter_mut().rev() {
            *slot = PUSH_CHARS[(time % 64) as usize];
            time /= 64;
        }

        for (slot, digit) in id[TIME_CHARS..].iter_mut().zip(self.last_random) {
            *slot = PUSH_CHARS[digit as usize];
        }

        id.iter().map(|&c| char::from(c)).collect()
    }

    fn reseed(&mut self) {
        // Byte 6 carries the UUID version; every other byte is random in its low six bits.
        let bytes = Uuid::new_v4().into_bytes();
        let random = bytes
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != 6)
            .map(|(_, byte)| byte % 64);

        for (slot, digit) in self.last_random.iter_mut().zip(random) {
            *slot = digit;
        }
    }

    fn increment(&mut self) {
        for digit in self.last_random.iter_mut().rev() {
            if *digit == 63 {
                *digit = 0;
            } else {
                *digit += 1;
                break;
            }
        }
    }
}
