use std::fmt::{Display, Formatter};

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The one-way mode ratchet of an election's cast vote record data.
///
/// Starts `Unlocked`; the first accepted export locks it to that export's
/// mode until all cast vote record data is cleared.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    Unlocked,
    Test,
    Official,
}

impl FileMode {
    /// The mode claimed by an export's `is_test_mode` flag.
    pub fn from_test_flag(is_test_mode: bool) -> Self {
        if is_test_mode {
            Self::Test
        } else {
            Self::Official
        }
    }

    /// Whether an export claiming `claimed` may be accepted under this mode.
    pub fn admits(self, claimed: FileMode) -> bool {
        self == Self::Unlocked || self == claimed
    }
}

impl Display for FileMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unlocked => "unlocked",
            Self::Test => "test",
            Self::Official => "official",
        };
        f.write_str(name)
    }
}

impl From<FileMode> for Bson {
    fn from(mode: FileMode) -> Self {
        to_bson(&mode).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratchet_admits() {
        assert!(FileMode::Unlocked.admits(FileMode::Test));
        assert!(FileMode::Unlocked.admits(FileMode::Official));
        assert!(FileMode::Test.admits(FileMode::Test));
        assert!(!FileMode::Test.admits(FileMode::Official));
        assert!(!FileMode::Official.admits(FileMode::Test));
    }
}
