use crate::core::definitions::{Condition, Feature, Particle, Transformation};
use crate::core::errors::PtErrorKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four artifact kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Transformation,
    Condition,
    Feature,
    Particle,
}

impl ArtifactKind {
    /// Replay order of a full reload: dependencies first.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Transformation,
        ArtifactKind::Condition,
        ArtifactKind::Feature,
        ArtifactKind::Particle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Transformation => "transformation",
            ArtifactKind::Condition => "condition",
            ArtifactKind::Feature => "feature",
            ArtifactKind::Particle => "particle",
        }
    }

    /// Directory name under the storage root.
    pub fn plural(&self) -> &'static str {
        match self {
            ArtifactKind::Transformation => "transformations",
            ArtifactKind::Condition => "conditions",
            ArtifactKind::Feature => "features",
            ArtifactKind::Particle => "particles",
        }
    }

    /// Revert raised by a contract whose name is already taken on chain.
    pub fn already_registered(&self) -> PtErrorKind {
        match self {
            ArtifactKind::Transformation => PtErrorKind::TransformationAlreadyRegistered,
            ArtifactKind::Condition => PtErrorKind::ConditionAlreadyRegistered,
            ArtifactKind::Feature => PtErrorKind::FeatureAlreadyRegistered,
            ArtifactKind::Particle => PtErrorKind::ParticleAlreadyRegistered,
        }
    }

    pub fn parse(s: &str) -> Option<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.plural() == s)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A definition together with the owner that registered it.
///
/// `owner` stays a string until the loader parses it, so a malformed owner is
/// reported as an address error rather than a JSON error.
pub trait Record: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Definition: Clone + fmt::Debug + Send + Sync + 'static;

    const KIND: ArtifactKind;

    fn definition(&self) -> &Self::Definition;

    fn owner(&self) -> &str;

    fn name(&self) -> &str;
}

macro_rules! define_record {
    ($record:ident, $field:ident, $def:ty, $kind:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $record {
            pub $field: $def,
            pub owner: String,
        }

        impl $record {
            pub fn new($field: $def, owner: impl Into<String>) -> Self {
                Self {
                    $field,
                    owner: owner.into(),
                }
            }
        }

        impl Record for $record {
            type Definition = $def;

            const KIND: ArtifactKind = ArtifactKind::$kind;

            fn definition(&self) -> &$def {
                &self.$field
            }

            fn owner(&self) -> &str {
                &self.owner
            }

            fn name(&self) -> &str {
                &self.$field.name
            }
        }
    };
}

define_record!(TransformationRecord, transformation, Transformation, Transformation);
define_record!(ConditionRecord, condition, Condition, Condition);
define_record!(FeatureRecord, feature, Feature, Feature);
define_record!(ParticleRecord, particle, Particle, Particle);
