//! Per-tick systems, run in a fixed order by the simulator:
//! targeting, movement, weapons, shields. Each system is a free
//! function over the unit table so it can be tested in isolation.

pub mod movement;
pub mod shields;
pub mod targeting;
pub mod weapons;
