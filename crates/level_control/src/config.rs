/// Number of district slots the host supports, including the unassigned district 0.
pub const MAX_DISTRICTS: usize = 128;

/// Highest 0-based level a residential building can reach (level 5 in the UI).
pub const MAX_RESIDENTIAL_LEVEL: u8 = 4;

/// Highest 0-based level any non-residential building can reach (level 3 in the UI).
pub const MAX_WORKPLACE_LEVEL: u8 = 2;

/// Number of workplace education tiers tracked per building.
pub const WORKPLACE_TIERS: usize = 4;
