//! The process-wide pipeline mode.
//!
//! `Boot` is held until the first full load reaches the accumulator, after
//! which the pipeline runs `Live`. The ordering `Boot < Live` lets observers
//! check that the mode never moves backwards.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    #[default]
    Boot,
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Boot => "BOOT",
            Mode::Live => "LIVE",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOT" => Ok(Mode::Boot),
            "LIVE" => Ok(Mode::Live),
            _ => Err(CoreError::InvalidMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_boot() {
        assert_eq!(Mode::default(), Mode::Boot);
    }

    #[test]
    fn boot_orders_before_live() {
        assert!(Mode::Boot < Mode::Live);
    }

    #[test]
    fn parses_known_values() {
        assert_eq!("BOOT".parse::<Mode>().unwrap(), Mode::Boot);
        assert_eq!("LIVE".parse::<Mode>().unwrap(), Mode::Live);
    }

    #[test]
    fn parsing_is_exact() {
        for raw in ["live", "Boot", " LIVE", "BOOT\n"] {
            assert_eq!(
                raw.parse::<Mode>().unwrap_err(),
                CoreError::InvalidMode(raw.to_string())
            );
        }
    }

    #[test]
    fn rejects_unknown_values() {
        let err = "READY".parse::<Mode>().unwrap_err();
        assert_eq!(err, CoreError::InvalidMode("READY".to_string()));

        assert!("".parse::<Mode>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Mode::Live).unwrap(), "\"LIVE\"");
    }
}
