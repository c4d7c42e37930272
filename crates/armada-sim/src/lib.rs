//! Deterministic per-battle combat simulator.
//!
//! One [`BattleSimulator`] owns one battle's unit table, spatial index,
//! and RNG, and advances as a pure function of `(dt, wall_now)`: the
//! same normalized starting state, seed, and input sequence always
//! produce the same delta stream. The only randomness is the initial
//! weapon-cooldown stagger, drawn from a seeded `ChaCha8Rng`.

pub mod grid;
pub mod simulator;
pub mod systems;

pub use simulator::BattleSimulator;
