//! Particle records
//!
//! Both kinds are `#[repr(C)]` and `Pod`, so the field can lend its
//! collections to the renderer as flat `f64` arrays without copying.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::normalize_degrees;
use crate::vector::Vector2;

/// A particle still random-walking through the field
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct FreeParticle {
    pub pos: Vector2,
    pub vel: Vector2,
    /// Simulation time at admission; the renderer fades particles in from here
    pub since: f64,
    /// Host-defined bits, carried verbatim
    pub flags: u64,
}

impl FreeParticle {
    /// f64 slots per record in the flat render view
    pub const STRIDE: usize = size_of::<Self>() / size_of::<f64>();

    pub fn new(pos: Vector2, vel: Vector2, since: f64) -> Self {
        Self {
            pos,
            vel,
            since,
            flags: 0,
        }
    }

    pub fn with_flags(mut self, flags: u64) -> Self {
        self.flags = flags;
        self
    }

    /// Seconds spent free at simulation time `now`
    #[inline]
    pub fn age(&self, now: f64) -> f64 {
        now - self.since
    }
}

/// Port occupancy and binding configuration of a bound particle
///
/// Kept as two plain fields; `pack` produces the single 64-bit word the
/// renderer reads, with `port_mask` in the high half and `config_id` in the
/// low half. On little-endian targets the in-memory layout of this struct
/// is exactly that word.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct BindingState {
    /// Row in the binding-site registry
    pub config_id: u32,
    /// Bit i set: port i is occupied by a child
    pub port_mask: u32,
}

impl BindingState {
    pub const fn new(config_id: u32) -> Self {
        Self {
            config_id,
            port_mask: 0,
        }
    }

    #[inline]
    pub fn is_port_free(&self, port: usize) -> bool {
        port < u32::BITS as usize && self.port_mask & (1 << port) == 0
    }

    /// Mark a port occupied; false if it already was (or does not exist)
    pub fn claim(&mut self, port: usize) -> bool {
        if !self.is_port_free(port) {
            return false;
        }
        self.port_mask |= 1 << port;
        true
    }

    #[inline]
    pub fn busy_ports(&self) -> u32 {
        self.port_mask.count_ones()
    }

    pub const fn pack(&self) -> u64 {
        ((self.port_mask as u64) << 32) | self.config_id as u64
    }

    pub const fn unpack(word: u64) -> Self {
        Self {
            config_id: word as u32,
            port_mask: (word >> 32) as u32,
        }
    }
}

/// A particle fixed in the aggregate; never moves, never removed
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct BoundParticle {
    pub pos: Vector2,
    /// Rotation of the port layout, degrees in [0, 360)
    pub rot: f64,
    pub binding: BindingState,
}

impl BoundParticle {
    /// f64 slots per record in the flat render view
    pub const STRIDE: usize = size_of::<Self>() / size_of::<f64>();

    pub fn new(pos: Vector2, rot: f64, config_id: u32) -> Self {
        Self {
            pos,
            rot: normalize_degrees(rot),
            binding: BindingState::new(config_id),
        }
    }

    /// Free-standing seed: unrotated, no ports occupied
    pub fn seed(pos: Vector2, config_id: u32) -> Self {
        Self::new(pos, 0.0, config_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(FreeParticle::STRIDE, 6);
        assert_eq!(BoundParticle::STRIDE, 4);
        assert_eq!(size_of::<BindingState>(), size_of::<u64>());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let mut state = BindingState::new(0);
        assert!(state.claim(3));
        assert!(!state.claim(3));
        assert!(!state.is_port_free(3));
        assert!(state.is_port_free(2));
        assert_eq!(state.busy_ports(), 1);
        assert!(!state.claim(32));
    }

    #[test]
    fn test_pack_layout() {
        let state = BindingState {
            config_id: 2,
            port_mask: 0b101,
        };
        let word = state.pack();
        assert_eq!(word, (0b101u64 << 32) | 2);
        assert_eq!(BindingState::unpack(word), state);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_memory_layout_matches_packed_word() {
        let state = BindingState {
            config_id: 9,
            port_mask: 0b110,
        };
        let word: u64 = bytemuck::cast(state);
        assert_eq!(word, state.pack());
    }

    #[test]
    fn test_new_bound_normalizes_rotation() {
        let p = BoundParticle::new(Vector2::ZERO, -90.0, 0);
        assert_eq!(p.rot, 270.0);
        assert_eq!(p.binding.port_mask, 0);
    }

    #[test]
    fn test_flags_carried() {
        let p = FreeParticle::new(Vector2::ZERO, Vector2::X, 1.5).with_flags(0xF0);
        assert_eq!(p.flags, 0xF0);
        assert_eq!(p.age(4.0), 2.5);
    }
}
