//! Director release detection from the raw version code stored in
//! `imap` (Standard) or `Fver` (Afterburner).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }

    pub const D2_0: Version = Version::new(2, 0, 0);
    pub const D3_0: Version = Version::new(3, 0, 0);
    pub const D3_1: Version = Version::new(3, 1, 0);
    pub const D4_0: Version = Version::new(4, 0, 0);
    pub const D4_0_4: Version = Version::new(4, 0, 4);
    pub const D5_0: Version = Version::new(5, 0, 0);
    pub const D6_0: Version = Version::new(6, 0, 0);
    pub const D7_0: Version = Version::new(7, 0, 0);
    pub const D8_0: Version = Version::new(8, 0, 0);
    pub const D8_5: Version = Version::new(8, 5, 0);
    pub const D10_0: Version = Version::new(10, 0, 0);
    pub const D11_0: Version = Version::new(11, 0, 0);
    pub const D11_5: Version = Version::new(11, 5, 0);
    pub const D12_0: Version = Version::new(12, 0, 0);

    /// Map a raw version code to a release: the entry with the greatest
    /// threshold not above the code wins.
    pub fn from_code(code: i32) -> Version {
        VERSION_THRESHOLDS
            .iter()
            .find(|(threshold, _)| code >= *threshold)
            .map(|(_, version)| *version)
            .unwrap_or(Version::D2_0)
    }
}

/// Sorted descending by threshold
const VERSION_THRESHOLDS: [(i32, Version); 13] = [
    (1951, Version::D12_0),
    (1922, Version::D11_5),
    (1921, Version::D11_0),
    (1851, Version::D10_0),
    (1700, Version::D8_5),
    (1410, Version::D8_0),
    (1224, Version::D7_0),
    (1218, Version::D6_0),
    (1201, Version::D5_0),
    (1117, Version::D4_0_4),
    (1115, Version::D4_0),
    (1029, Version::D3_1),
    (1028, Version::D3_0),
];

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Version { major, minor, patch } = *self;
        match major {
            11.. => write!(f, "Adobe Director {}.{}.{}", major, minor, patch),
            // "2004" separates 10 from MX (9)
            10 => write!(f, "Macromedia Director MX 2004 ({}.{}.{})", major, minor, patch),
            9 => write!(f, "Macromedia Director MX ({}.{}.{})", major, minor, patch),
            _ => write!(f, "Macromedia Director {}.{}.{}", major, minor, patch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_greatest_threshold_not_above_code() {
        assert_eq!(Version::from_code(1218), Version::D6_0);
        assert_eq!(Version::from_code(1223), Version::D6_0);
        assert_eq!(Version::from_code(1224), Version::D7_0);
        assert_eq!(Version::from_code(1858), Version::D10_0);
        assert_eq!(Version::from_code(5000), Version::D12_0);
    }

    #[test]
    fn low_codes_fall_back_to_d2() {
        assert_eq!(Version::from_code(0), Version::D2_0);
        assert_eq!(Version::from_code(-1), Version::D2_0);
        assert_eq!(Version::from_code(1027), Version::D2_0);
    }

    #[test]
    fn ordering_is_monotonic() {
        let mut last = Version::D2_0;
        for code in (1000..2100).step_by(7) {
            let v = Version::from_code(code);
            assert!(v >= last);
            last = v;
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(Version::D8_5.to_string(), "Macromedia Director 8.5.0");
        assert_eq!(Version::D10_0.to_string(), "Macromedia Director MX 2004 (10.0.0)");
        assert_eq!(Version::D11_5.to_string(), "Adobe Director 11.5.0");
    }
}
