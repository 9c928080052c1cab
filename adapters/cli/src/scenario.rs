use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

const SUPPORTED_SCENARIO_VERSION: u32 = 1;

/// Building floor used when no scenario file is given: 30 agents, one fire
/// and four exits in the corners.
pub(crate) const REFERENCE_MAP: [&str; 23] = [
    "===================",
    "=S   =P   P =    S=",
    "=  P        =   = =",
    "=    =      =PP   =",
    "=   P       =  PP =",
    "=   P       == PP =",
    "=   P  P    ===   =",
    "=P====  =   ==   P=",
    "= =  = ==   =     =",
    "= =  = ==P        =",
    "= == =  ==F       =",
    "= == =  ==P      ==",
    "=P=  = ==P       ==",
    "= =  = ==    = P=P=",
    "=   PP       = =  =",
    "=   P       ===   =",
    "=            ==   =",
    "=    == P    =    =",
    "= P  == P    =    =",
    "= P     ==        =",
    "=       ==        =",
    "=S   P  ==P      S=",
    "===================",
];

/// Map plus optional overrides of the run parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Scenario {
    /// Rows of the character map.
    pub(crate) map: Vec<String>,
    /// Parameters that replace the built-in defaults.
    #[serde(default)]
    pub(crate) tuning: Tuning,
}

/// Optional run parameters carried by a scenario file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Tuning {
    pub(crate) rollout: Option<u32>,
    pub(crate) end_ticks: Option<u32>,
    pub(crate) iter: Option<u32>,
    pub(crate) hazard_interval: Option<u32>,
    pub(crate) max_ticks: Option<u64>,
    pub(crate) seed: Option<u64>,
}

impl Scenario {
    /// Scenario backed by [`REFERENCE_MAP`] without overrides.
    #[must_use]
    pub(crate) fn reference() -> Self {
        Self {
            map: REFERENCE_MAP.iter().map(|row| (*row).to_owned()).collect(),
            tuning: Tuning::default(),
        }
    }

    /// Reads and parses the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Parses a scenario from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file: ScenarioFile =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if file.version != SUPPORTED_SCENARIO_VERSION {
            bail!(
                "unsupported scenario version {}; expected {}",
                file.version,
                SUPPORTED_SCENARIO_VERSION
            );
        }
        if file.scenario.map.is_empty() {
            bail!("scenario map has no rows");
        }
        Ok(file.scenario)
    }
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    version: u32,
    #[serde(flatten)]
    scenario: Scenario,
}

#[cfg(test)]
mod tests {
    use fire_evac_core::MapLayout;

    use super::*;

    #[test]
    fn reference_map_is_valid() {
        let layout = MapLayout::parse(REFERENCE_MAP).expect("reference map parses");
        assert_eq!(layout.agents().len(), 30);
        assert_eq!(layout.safe_zones().len(), 4);
        assert_eq!(layout.hazard_seeds().len(), 1);
        assert_eq!(layout.grid().rows(), 23);
        assert_eq!(layout.grid().columns(), 19);
    }

    #[test]
    fn scenario_with_tuning_is_parsed() {
        let scenario = Scenario::parse(
            r#"
version = 1
map = ["=====", "=P S=", "====="]

[tuning]
rollout = 40
hazard_interval = 3
"#,
        )
        .expect("valid scenario");

        assert_eq!(scenario.map.len(), 3);
        assert_eq!(scenario.tuning.rollout, Some(40));
        assert_eq!(scenario.tuning.hazard_interval, Some(3));
        assert_eq!(scenario.tuning.seed, None);
    }

    #[test]
    fn tuning_is_optional() {
        let scenario = Scenario::parse("version = 1\nmap = [\"PS\"]\n").expect("valid scenario");
        assert_eq!(scenario.tuning, Tuning::default());
    }

    #[test]
    fn unsupported_versions_are_rejected() {
        let error = Scenario::parse("version = 2\nmap = [\"PS\"]\n").unwrap_err();
        assert!(error.to_string().contains("unsupported scenario version 2"));
    }

    #[test]
    fn unknown_tuning_keys_are_rejected() {
        let result = Scenario::parse("version = 1\nmap = [\"PS\"]\n[tuning]\nspeed = 2\n");
        assert!(result.is_err());
    }
}
