//! Alert flags reported by cheating detection

/// Alert flags (1 byte, 5 bits used)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AlertFlags(pub u8);

impl AlertFlags {
    pub const NONE: AlertFlags = AlertFlags(0);

    // Flag bits
    pub const MULTIPLE_FACES: u8 = 0b0000_0001;
    pub const BRIGHTNESS_CHANGE: u8 = 0b0000_0010;
    pub const EXCESSIVE_MOTION: u8 = 0b0000_0100;
    pub const NO_FACE: u8 = 0b0000_1000;
    pub const LOOKING_AWAY: u8 = 0b0001_0000;

    /// Every defined bit
    pub const ALL: u8 = 0b0001_1111;

    /// Build from a raw guest result, dropping undefined bits
    #[inline]
    pub fn from_raw(bits: u32) -> Self {
        AlertFlags((bits & Self::ALL as u32) as u8)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    pub fn multiple_faces(self) -> bool {
        self.contains(Self::MULTIPLE_FACES)
    }

    #[inline]
    pub fn brightness_change(self) -> bool {
        self.contains(Self::BRIGHTNESS_CHANGE)
    }

    #[inline]
    pub fn excessive_motion(self) -> bool {
        self.contains(Self::EXCESSIVE_MOTION)
    }

    #[inline]
    pub fn no_face(self) -> bool {
        self.contains(Self::NO_FACE)
    }

    #[inline]
    pub fn looking_away(self) -> bool {
        self.contains(Self::LOOKING_AWAY)
    }

    #[inline]
    pub fn set(&mut self, bit: u8, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl From<u8> for AlertFlags {
    fn from(bits: u8) -> Self {
        AlertFlags(bits)
    }
}

impl From<AlertFlags> for u8 {
    fn from(flags: AlertFlags) -> Self {
        flags.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_operations() {
        let mut flags = AlertFlags::NONE;
        assert!(flags.is_empty());

        flags.set(AlertFlags::NO_FACE, true);
        assert!(flags.no_face());

        flags.set(AlertFlags::EXCESSIVE_MOTION, true);
        assert!(flags.excessive_motion());
        assert_eq!(flags.count(), 2);

        flags.set(AlertFlags::NO_FACE, false);
        assert!(!flags.no_face());
        assert!(flags.excessive_motion());
    }

    #[test]
    fn test_flag_bit_positions() {
        assert_eq!(AlertFlags::MULTIPLE_FACES, 1 << 0);
        assert_eq!(AlertFlags::BRIGHTNESS_CHANGE, 1 << 1);
        assert_eq!(AlertFlags::EXCESSIVE_MOTION, 1 << 2);
        assert_eq!(AlertFlags::NO_FACE, 1 << 3);
        assert_eq!(AlertFlags::LOOKING_AWAY, 1 << 4);
    }

    #[test]
    fn test_from_raw_masks_unknown_bits() {
        let flags = AlertFlags::from_raw(0xFFFF_FFE2);
        assert_eq!(flags.0, AlertFlags::BRIGHTNESS_CHANGE);
    }
}
