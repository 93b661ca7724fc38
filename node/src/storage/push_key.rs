//! Chronologically sortable child names for appended entries.
//!
//! A key is eight characters of millisecond timestamp followed by twelve
//! random characters, all drawn from an alphabet whose symbols are in ASCII
//! order. Keys produced in the same millisecond reuse the previous random
//! tail incremented by one, so one generator never goes backwards.

use rand::Rng;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

pub const PUSH_KEY_LEN: usize = TIME_CHARS + RANDOM_CHARS;

#[derive(Debug, Default)]
struct State {
    last_ms: u64,
    tail: [u8; RANDOM_CHARS],
}

#[derive(Debug, Default)]
pub struct PushKeyGenerator {
    state: Mutex<State>,
}

impl PushKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> String {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.generate_at(now_ms)
    }

    pub(crate) fn generate_at(&self, now_ms: u64) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        // A clock that steps back keeps using the last timestamp.
        if now_ms > state.last_ms || state.last_ms == 0 {
            state.last_ms = now_ms;
            let mut rng = rand::thread_rng();
            for digit in state.tail.iter_mut() {
                *digit = rng.gen_range(0..64);
            }
        } else {
            increment(&mut state.tail);
        }

        let mut key = Vec::with_capacity(PUSH_KEY_LEN);
        let mut time = state.last_ms;
        let mut time_chars = [0u8; TIME_CHARS];
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(time % 64) as usize];
            time /= 64;
        }
        key.extend_from_slice(&time_chars);
        key.extend(state.tail.iter().map(|d| PUSH_CHARS[*d as usize]));

        String::from_utf8(key).unwrap_or_default()
    }
}

fn increment(tail: &mut [u8; RANDOM_CHARS]) {
    for digit in tail.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
