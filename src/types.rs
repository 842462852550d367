use std::str::FromStr;
use serde::Deserialize;

/// Canonical stage name type (one stage per asset class).
pub type StageName = String;

/// Which tree a stage writes its artifacts into.
///
/// - `Output`: beneath `[config].output_dir` (the normal case; wiped by `clean`).
/// - `Source`: beneath `[config].source_dir`, for pre-processing utilities
///   such as OTF -> TTF conversion whose results are themselves sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageTarget {
    Output,
    Source,
}

impl Default for StageTarget {
    fn default() -> Self {
        StageTarget::Output
    }
}

impl FromStr for StageTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "output" => Ok(StageTarget::Output),
            "source" => Ok(StageTarget::Source),
            other => Err(format!(
                "invalid stage target: {other} (expected \"output\" or \"source\")"
            )),
        }
    }
}

/// Named execution plan selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanKind {
    /// `clean`, then every build stage concurrently; exits when done.
    Build,
    /// `build` plus the watch loop and the dev server; runs until Ctrl-C.
    Watch,
    /// Delete the output tree only.
    Clean,
    /// Run one named stage on its own, without cleaning.
    Stage(StageName),
}

impl PlanKind {
    /// One-shot plans exit once all dispatched stages are idle.
    pub fn is_one_shot(&self) -> bool {
        !matches!(self, PlanKind::Watch)
    }
}

impl Default for PlanKind {
    fn default() -> Self {
        PlanKind::Watch
    }
}

impl FromStr for PlanKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("plan name must not be empty".to_string());
        }
        Ok(match s {
            "build" => PlanKind::Build,
            "watch" | "default" => PlanKind::Watch,
            "clean" => PlanKind::Clean,
            other => PlanKind::Stage(other.to_string()),
        })
    }
}
