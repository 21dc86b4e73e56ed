use serde::{Deserialize, Serialize};

/// Body side of a paired region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Center,
}

/// Side-less anatomical part, as referenced by region pattern rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyPart {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    Jaw,
    Eye,
    Shoulder,
    UpperArm,
    LowerArm,
    Hand,
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
    UpperLeg,
    LowerLeg,
    Foot,
    Toes,
}

impl BodyPart {
    /// Whether the part exists once per body side.
    #[must_use]
    pub fn is_paired(self) -> bool {
        !matches!(
            self,
            Self::Hips
                | Self::Spine
                | Self::Chest
                | Self::UpperChest
                | Self::Neck
                | Self::Head
                | Self::Jaw
        )
    }
}

/// Anatomical region assigned to a bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    /// Not classified yet.
    Unknown,
    /// Classified, but no anatomical match (props, helpers, cloth bones).
    Other,

    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    Jaw,
    LeftEye,
    RightEye,

    LeftShoulder,
    RightShoulder,
    LeftUpperArm,
    RightUpperArm,
    LeftLowerArm,
    RightLowerArm,
    LeftHand,
    RightHand,

    LeftThumb,
    RightThumb,
    LeftIndex,
    RightIndex,
    LeftMiddle,
    RightMiddle,
    LeftRing,
    RightRing,
    LeftLittle,
    RightLittle,

    LeftUpperLeg,
    RightUpperLeg,
    LeftLowerLeg,
    RightLowerLeg,
    LeftFoot,
    RightFoot,
    LeftToes,
    RightToes,
}

impl Region {
    /// Combines a part and a side. Returns `None` when the side does not fit
    /// the part (a paired part without a side, or a sided central part).
    #[must_use]
    pub fn from_part(part: BodyPart, side: Side) -> Option<Self> {
        use BodyPart as P;
        use Side::{Center, Left, Right};

        let region = match (part, side) {
            (P::Hips, Center) => Self::Hips,
            (P::Spine, Center) => Self::Spine,
            (P::Chest, Center) => Self::Chest,
            (P::UpperChest, Center) => Self::UpperChest,
            (P::Neck, Center) => Self::Neck,
            (P::Head, Center) => Self::Head,
            (P::Jaw, Center) => Self::Jaw,

            (P::Eye, Left) => Self::LeftEye,
            (P::Eye, Right) => Self::RightEye,
            (P::Shoulder, Left) => Self::LeftShoulder,
            (P::Shoulder, Right) => Self::RightShoulder,
            (P::UpperArm, Left) => Self::LeftUpperArm,
            (P::UpperArm, Right) => Self::RightUpperArm,
            (P::LowerArm, Left) => Self::LeftLowerArm,
            (P::LowerArm, Right) => Self::RightLowerArm,
            (P::Hand, Left) => Self::LeftHand,
            (P::Hand, Right) => Self::RightHand,
            (P::Thumb, Left) => Self::LeftThumb,
            (P::Thumb, Right) => Self::RightThumb,
            (P::Index, Left) => Self::LeftIndex,
            (P::Index, Right) => Self::RightIndex,
            (P::Middle, Left) => Self::LeftMiddle,
            (P::Middle, Right) => Self::RightMiddle,
            (P::Ring, Left) => Self::LeftRing,
            (P::Ring, Right) => Self::RightRing,
            (P::Little, Left) => Self::LeftLittle,
            (P::Little, Right) => Self::RightLittle,
            (P::UpperLeg, Left) => Self::LeftUpperLeg,
            (P::UpperLeg, Right) => Self::RightUpperLeg,
            (P::LowerLeg, Left) => Self::LeftLowerLeg,
            (P::LowerLeg, Right) => Self::RightLowerLeg,
            (P::Foot, Left) => Self::LeftFoot,
            (P::Foot, Right) => Self::RightFoot,
            (P::Toes, Left) => Self::LeftToes,
            (P::Toes, Right) => Self::RightToes,

            _ => return None,
        };
        Some(region)
    }

    /// True for every region except `Unknown` and `Other`.
    #[inline]
    #[must_use]
    pub fn is_anatomical(self) -> bool {
        !matches!(self, Self::Unknown | Self::Other)
    }

    #[must_use]
    pub fn side(self) -> Side {
        use Region as R;
        match self {
            R::LeftEye
            | R::LeftShoulder
            | R::LeftUpperArm
            | R::LeftLowerArm
            | R::LeftHand
            | R::LeftThumb
            | R::LeftIndex
            | R::LeftMiddle
            | R::LeftRing
            | R::LeftLittle
            | R::LeftUpperLeg
            | R::LeftLowerLeg
            | R::LeftFoot
            | R::LeftToes => Side::Left,
            R::RightEye
            | R::RightShoulder
            | R::RightUpperArm
            | R::RightLowerArm
            | R::RightHand
            | R::RightThumb
            | R::RightIndex
            | R::RightMiddle
            | R::RightRing
            | R::RightLittle
            | R::RightUpperLeg
            | R::RightLowerLeg
            | R::RightFoot
            | R::RightToes => Side::Right,
            _ => Side::Center,
        }
    }

    /// Region for a standard humanoid rig slot name.
    ///
    /// Accepts PascalCase (`LeftUpperArm`) and camelCase (`leftUpperArm`)
    /// slot names. Finger slots (`LeftIndexProximal`, ...) map to their
    /// finger region.
    #[must_use]
    pub fn from_humanoid_slot(slot: &str) -> Option<Self> {
        let key = slot.to_ascii_lowercase();
        let key = ["proximal", "intermediate", "distal", "metacarpal"]
            .iter()
            .find_map(|suffix| key.strip_suffix(suffix))
            .unwrap_or(&key);

        HUMANOID_SLOTS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, region)| *region)
    }
}

/// Lower-cased humanoid slot names (finger phalanx suffix removed).
const HUMANOID_SLOTS: [(&str, Region); 35] = [
    ("hips", Region::Hips),
    ("spine", Region::Spine),
    ("chest", Region::Chest),
    ("upperchest", Region::UpperChest),
    ("neck", Region::Neck),
    ("head", Region::Head),
    ("jaw", Region::Jaw),
    ("lefteye", Region::LeftEye),
    ("righteye", Region::RightEye),
    ("leftshoulder", Region::LeftShoulder),
    ("rightshoulder", Region::RightShoulder),
    ("leftupperarm", Region::LeftUpperArm),
    ("rightupperarm", Region::RightUpperArm),
    ("leftlowerarm", Region::LeftLowerArm),
    ("rightlowerarm", Region::RightLowerArm),
    ("lefthand", Region::LeftHand),
    ("righthand", Region::RightHand),
    ("leftthumb", Region::LeftThumb),
    ("rightthumb", Region::RightThumb),
    ("leftindex", Region::LeftIndex),
    ("rightindex", Region::RightIndex),
    ("leftmiddle", Region::LeftMiddle),
    ("rightmiddle", Region::RightMiddle),
    ("leftring", Region::LeftRing),
    ("rightring", Region::RightRing),
    ("leftlittle", Region::LeftLittle),
    ("rightlittle", Region::RightLittle),
    ("leftupperleg", Region::LeftUpperLeg),
    ("rightupperleg", Region::RightUpperLeg),
    ("leftlowerleg", Region::LeftLowerLeg),
    ("rightlowerleg", Region::RightLowerLeg),
    ("leftfoot", Region::LeftFoot),
    ("rightfoot", Region::RightFoot),
    ("lefttoes", Region::LeftToes),
    ("righttoes", Region::RightToes),
];
