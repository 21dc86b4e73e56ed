//! Bone name normalization and side detection.
//!
//! Bone names arrive in every convention authoring tools produce:
//! `mixamorig:LeftUpLeg`, `UpperArm.L`, `l_forearm`, `Left Hand`,
//! `Spine_02`. Matching works on two derived forms:
//!
//! - the *compact* form: namespace removed, lower-cased, separators removed
//!   (`UpperArm.L` -> `upperarml`)
//! - the *token* form: split at separators and lower-to-upper case
//!   transitions (`UpperArm.L` -> `["upper", "arm", "l"]`)

use crate::rig::region::Side;

const SEPARATORS: [char; 5] = [' ', '_', '-', '.', '\t'];

/// Removes rig namespace prefixes (`mixamorig:Hips`, `Armature|Hips`).
#[must_use]
pub fn strip_namespace(name: &str) -> &str {
    let name = name.trim();
    match name.rfind([':', '|']) {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Compact form of a bone name: namespace stripped, lower-cased,
/// separators removed.
#[must_use]
pub fn normalize_bone_name(name: &str) -> String {
    strip_namespace(name)
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lower-cased word tokens of a bone name.
#[must_use]
pub fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for part in strip_namespace(name).split(|c: char| SEPARATORS.contains(&c)) {
        let mut current = String::new();
        let mut prev_lower = false;
        for c in part.chars() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                tokens.push(std::mem::take(&mut current).to_lowercase());
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.push(c);
        }
        if !current.is_empty() {
            tokens.push(current.to_lowercase());
        }
    }
    tokens
}

/// Detects the body side a bone name refers to.
///
/// Recognized markers: a `left`/`right` word, a standalone `l`/`r` token
/// (covering `l_`/`r_` prefixes and `_l`/`_r`/`.l`/`.r` suffixes), and a
/// compact form starting or ending with `left`/`right`. Conflicting markers
/// yield [`Side::Center`].
#[must_use]
pub fn detect_side(name: &str) -> Side {
    let tokens = name_tokens(name);
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));

    let mut left = has(&["left", "l"]);
    let mut right = has(&["right", "r"]);

    if !left && !right {
        let compact = normalize_bone_name(name);
        left = compact.starts_with("left") || compact.ends_with("left");
        right = compact.starts_with("right") || compact.ends_with("right");
    }

    match (left, right) {
        (true, false) => Side::Left,
        (false, true) => Side::Right,
        _ => Side::Center,
    }
}
