//! Demo Mode - Simulated 8217 scale for testing
//!
//! Answers each `W` request the way a real 8217 scale would. Items are placed
//! on the platter at random intervals: the scale reports motion while it
//! settles, then reports the stable weight until the next item arrives.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::protocol::{ScaleLink, CR, POLL_COMMAND, STX};

/// Largest simulated load
const MAX_LOAD: f64 = 30.0;

/// Chance that a response is preceded by line noise
const NOISE_PROBABILITY: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
enum PlatterState {
    /// Load changing, scale reports motion
    Settling { polls_left: u32, target: f64 },
    /// Stable weight
    Stable { polls_left: u32, weight: f64 },
}

/// Simulated scale speaking the 8217 wire protocol
pub struct SimulatedScale {
    state: PlatterState,
    pending: VecDeque<u8>,
    rng: StdRng,
    requests: u64,
}

impl Default for SimulatedScale {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedScale {
    /// Create a simulator seeded from entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a reproducible simulator
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: PlatterState::Stable {
                polls_left: 5,
                weight: 0.0,
            },
            pending: VecDeque::new(),
            rng,
            requests: 0,
        }
    }

    /// Number of `W` requests answered so far
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Advance the platter and build the payload for one request
    fn next_payload(&mut self) -> Vec<u8> {
        self.state = match self.state {
            PlatterState::Settling { polls_left: 0, target } => PlatterState::Stable {
                polls_left: self.rng.gen_range(10..40),
                weight: target,
            },
            PlatterState::Settling { polls_left, target } => PlatterState::Settling {
                polls_left: polls_left - 1,
                target,
            },
            PlatterState::Stable { polls_left: 0, .. } => {
                let target = if self.rng.gen_bool(0.3) {
                    0.0
                } else {
                    self.rng.gen_range(0.05..MAX_LOAD)
                };
                PlatterState::Settling {
                    polls_left: self.rng.gen_range(2..6),
                    target,
                }
            }
            PlatterState::Stable { polls_left, weight } => PlatterState::Stable {
                polls_left: polls_left - 1,
                weight,
            },
        };

        match self.state {
            PlatterState::Settling { .. } => vec![b'?', 0x01],
            PlatterState::Stable { weight, .. } => format!("{:.3}", weight).into_bytes(),
        }
    }

    fn respond(&mut self) {
        self.requests += 1;
        if self.rng.gen_bool(NOISE_PROBABILITY) {
            self.pending.push_back(CR);
            self.pending.push_back(self.rng.gen_range(0x20..0x7f));
        }
        let payload = self.next_payload();
        self.pending.push_back(STX);
        self.pending.extend(payload);
        self.pending.push_back(CR);
    }
}

impl Read for SimulatedScale {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for SimulatedScale {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == POLL_COMMAND {
                self.respond();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ScaleLink for SimulatedScale {
    fn describe(&self) -> String {
        "demo".to_string()
    }
}
