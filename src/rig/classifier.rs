//! Region Classifier
//!
//! Assigns an anatomical [`Region`] to a bone from its name, or from the
//! standard humanoid slot it fills when the rig exposes one.
//!
//! # Pattern table
//!
//! Name classification walks an ordered [`RegionPatternTable`]. Each rule
//! lists keywords (any one must appear in the compact name), the
//! [`BodyPart`] it yields and whether that part is paired. Paired rules take
//! their side from [`detect_side`]; a paired rule whose side cannot be
//! determined does not match and classification moves on to the next rule.
//! The first matching rule wins, so specific parts (fingers, shoulders) are
//! listed before generic ones (`arm`, `leg`).
//!
//! The table is plain data and can be loaded from JSON:
//!
//! ```json
//! { "rules": [ { "part": "Thumb", "keywords": ["thumb"], "paired": true } ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RetargetError};
use crate::rig::naming::{detect_side, normalize_bone_name};
use crate::rig::region::{BodyPart, Region, Side};

/// One entry of the pattern table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRule {
    pub part: BodyPart,
    /// Compact (lower-case, separator-free) substrings; any one matches.
    pub keywords: Vec<String>,
    #[serde(default)]
    pub paired: bool,
}

impl RegionRule {
    fn new(part: BodyPart, keywords: &[&str]) -> Self {
        Self {
            part,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            paired: part.is_paired(),
        }
    }

    fn matches(&self, compact: &str) -> bool {
        self.keywords.iter().any(|k| compact.contains(k.as_str()))
    }
}

/// Ordered region rules. First match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionPatternTable {
    pub rules: Vec<RegionRule>,
}

impl RegionPatternTable {
    /// Parses and validates a table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut table: Self = serde_json::from_str(json)?;
        table.normalize_keywords();
        table.validate()?;
        Ok(table)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that every rule is usable.
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(RetargetError::InvalidPatternTable(
                "table has no rules".to_string(),
            ));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.keywords.is_empty() || rule.keywords.iter().any(String::is_empty) {
                return Err(RetargetError::InvalidPatternTable(format!(
                    "rule {i} ({:?}) has an empty keyword list or keyword",
                    rule.part
                )));
            }
            if rule.paired != rule.part.is_paired() {
                return Err(RetargetError::InvalidPatternTable(format!(
                    "rule {i} declares {:?} as {}paired",
                    rule.part,
                    if rule.paired { "" } else { "un" }
                )));
            }
        }
        Ok(())
    }

    /// Brings hand-written keywords into compact form.
    fn normalize_keywords(&mut self) {
        for rule in &mut self.rules {
            for keyword in &mut rule.keywords {
                *keyword = normalize_bone_name(keyword);
            }
        }
    }
}

impl Default for RegionPatternTable {
    fn default() -> Self {
        use BodyPart as P;
        Self {
            rules: vec![
                // Fingers before hands.
                RegionRule::new(P::Thumb, &["thumb"]),
                RegionRule::new(P::Index, &["index", "pointer"]),
                RegionRule::new(P::Middle, &["middle"]),
                RegionRule::new(P::Ring, &["ring"]),
                RegionRule::new(P::Little, &["little", "pinky", "pinkie"]),
                // Face
                RegionRule::new(P::Eye, &["eye"]),
                RegionRule::new(P::Jaw, &["jaw"]),
                // Extremities
                RegionRule::new(P::Toes, &["toe"]),
                RegionRule::new(P::Foot, &["foot", "ankle"]),
                RegionRule::new(P::Hand, &["hand", "wrist", "palm"]),
                // Arms
                RegionRule::new(P::Shoulder, &["shoulder", "clavicle", "collar"]),
                RegionRule::new(P::LowerArm, &["lowerarm", "forearm", "elbow"]),
                RegionRule::new(P::UpperArm, &["upperarm", "arm"]),
                // Legs
                RegionRule::new(P::UpperLeg, &["upperleg", "upleg", "thigh"]),
                RegionRule::new(P::LowerLeg, &["lowerleg", "calf", "shin", "knee", "leg"]),
                // Torso chain
                RegionRule::new(P::Head, &["head"]),
                RegionRule::new(P::Neck, &["neck"]),
                RegionRule::new(P::UpperChest, &["upperchest"]),
                RegionRule::new(P::Chest, &["chest", "ribcage"]),
                RegionRule::new(P::Spine, &["spine", "torso", "abdomen", "waist"]),
                RegionRule::new(P::Hips, &["hips", "hip", "pelvis"]),
            ],
        }
    }
}

/// Pure, deterministic bone classifier over a pattern table.
#[derive(Debug, Clone, Default)]
pub struct RegionClassifier {
    table: RegionPatternTable,
}

impl RegionClassifier {
    #[must_use]
    pub fn new(table: RegionPatternTable) -> Self {
        Self { table }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(RegionPatternTable::from_json(json)?))
    }

    #[must_use]
    pub fn table(&self) -> &RegionPatternTable {
        &self.table
    }

    /// Classifies a bone.
    ///
    /// A recognized humanoid slot is authoritative and short-circuits name
    /// inspection. Otherwise the first matching pattern rule decides; no
    /// match yields [`Region::Other`].
    #[must_use]
    pub fn classify(&self, name: &str, humanoid_slot: Option<&str>) -> Region {
        if let Some(region) = humanoid_slot.and_then(Region::from_humanoid_slot) {
            return region;
        }

        let compact = normalize_bone_name(name);
        if compact.is_empty() {
            return Region::Other;
        }

        // Side detection is only needed once a paired rule matches.
        let mut side: Option<Side> = None;
        for rule in &self.table.rules {
            if !rule.matches(&compact) {
                continue;
            }
            let rule_side = if rule.paired {
                *side.get_or_insert_with(|| detect_side(name))
            } else {
                Side::Center
            };
            if let Some(region) = Region::from_part(rule.part, rule_side) {
                return region;
            }
        }

        Region::Other
    }
}
