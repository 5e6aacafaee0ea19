use serde::{Deserialize, Serialize};

/// One file the harness must find reachable over HTTP.
///
/// `path` is relative to the served root; the empty path means the root page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub description: String,
}

impl ManifestEntry {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }
}

pub mod images {
    pub const CHARACTERS: &[&str] = &["char_engineer.png", "char_warrior.png"];
    pub const BOSSES: &[&str] = &["boss_spider.png", "boss_golem.png", "boss_captain.png"];
    pub const SLOT_SYMBOLS: &[&str] = &[
        "slot_crystal.png",
        "slot_sword.png",
        "slot_shield.png",
        "slot_armor.png",
        "slot_gear.png",
        "slot_pipe.png",
        "slot_potion.png",
        "slot_button.png",
    ];
    pub const UI_CHROME: &[&str] = &["ui_health_bg.png", "ui_slot_frame.png", "ui_spin_button.png"];
}

/// The fixed set of files a playable deployment must serve, in the order the
/// harness probes and reports them.
pub fn manifest() -> Vec<ManifestEntry> {
    let mut entries = vec![
        ManifestEntry::new("", "Main game page (index.html)"),
        ManifestEntry::new("css/style.css", "Game stylesheet"),
        ManifestEntry::new("js/game.js", "Game JavaScript"),
    ];
    let groups = [
        images::CHARACTERS,
        images::BOSSES,
        images::SLOT_SYMBOLS,
        images::UI_CHROME,
    ];
    for img in groups.iter().flat_map(|g| g.iter()) {
        entries.push(ManifestEntry::new(
            format!("assets/images/{img}"),
            format!("Image: {img}"),
        ));
    }
    entries
}

/// Substrings the root page body must contain, each checked and reported
/// independently. Absence is reported per item, never fatal to the run.
pub const CONTENT_CHECKS: &[(&str, &str)] = &[
    ("<!DOCTYPE html>", "HTML5 doctype"),
    ("Steampunk Slot Machine RPG", "Game title"),
    ("game-container", "Game container element"),
    ("css/style.css", "CSS stylesheet link"),
    ("js/game.js", "JavaScript game file"),
    ("assets/images/", "Asset references"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum CheckOutcome {
    Passed {
        /// Body length for file probes; content checks carry no byte count.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes: Option<u64>,
    },
    Failed {
        reason: String,
    },
}

/// Outcome of probing one manifest entry or one content-substring check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub description: String,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

impl CheckResult {
    pub fn passed_file(description: impl Into<String>, bytes: u64) -> Self {
        Self {
            description: description.into(),
            outcome: CheckOutcome::Passed { bytes: Some(bytes) },
        }
    }

    pub fn passed(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            outcome: CheckOutcome::Passed { bytes: None },
        }
    }

    pub fn failed(description: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            outcome: CheckOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self.outcome, CheckOutcome::Passed { .. })
    }
}

/// Aggregate of one verification run.
///
/// `server_ok` tracks only whether the root-page GET itself succeeded; the
/// per-substring content results never flip it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub server_ok: bool,
    pub content: Vec<CheckResult>,
    pub assets: Vec<CheckResult>,
}

impl TestReport {
    pub fn passed(&self) -> usize {
        self.assets.iter().filter(|c| c.is_passed()).count()
    }

    pub fn total(&self) -> usize {
        self.assets.len()
    }

    pub fn assets_ok(&self) -> bool {
        self.passed() == self.total()
    }

    pub fn is_pass(&self) -> bool {
        self.server_ok && self.assets_ok()
    }
}
