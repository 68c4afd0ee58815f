//! Priority lanes.
//!
//! Every update is tagged with the lane it was requested under, and the root
//! keeps the union of all lanes with outstanding work. Only the synchronous
//! lane exists today; the set type keeps the door open for more.

use bitflags::bitflags;

bitflags! {
    /// A set of priority lanes. A single-bit value is one lane.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Lanes: u32 {
        /// Flushed in a microtask, coalescing every update of the current
        /// synchronous turn.
        const SYNC = 1 << 0;
    }
}

impl Lanes {
    pub const NO_LANES: Lanes = Lanes::empty();

    pub fn merge(self, other: Lanes) -> Lanes {
        self.union(other)
    }

    /// The most urgent lane in the set; lower bits are more urgent.
    pub fn highest_priority(self) -> Lanes {
        let bits = self.bits();
        Lanes::from_bits_retain(bits & bits.wrapping_neg())
    }

    pub fn includes(self, lane: Lanes) -> bool {
        self.intersects(lane)
    }
}

/// The lane for an update requested right now.
pub fn request_update_lane() -> Lanes {
    Lanes::SYNC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_priority_picks_lowest_bit() {
        let lanes = Lanes::from_bits_retain(0b0110);
        assert_eq!(lanes.highest_priority().bits(), 0b0010);
        assert_eq!(Lanes::NO_LANES.highest_priority(), Lanes::NO_LANES);
    }

    #[test]
    fn requested_lane_is_sync() {
        let pending = Lanes::NO_LANES.merge(request_update_lane());
        assert!(pending.includes(Lanes::SYNC));
    }
}
