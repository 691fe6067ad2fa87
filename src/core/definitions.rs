use serde::{Deserialize, Serialize};

/// A transformation: `run(x, args[]) -> value` written as a contract body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub name: String,
    /// Body of `run`; `args[N]` references determine the argument count.
    pub sol_src: String,
}

/// A condition: `check(args[]) -> bool` written as a contract body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub sol_src: String,
}

/// A transformation name with its bound arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationDef {
    pub name: String,
    #[serde(default)]
    pub args: Vec<u32>,
}

/// Ordered chain of transformations applied along one axis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    #[serde(default)]
    pub transformations: Vec<TransformationDef>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
}

impl Feature {
    /// Every transformation name referenced by any dimension, in order.
    pub fn transformation_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions
            .iter()
            .flat_map(|d| d.transformations.iter())
            .map(|t| t.name.as_str())
    }
}

/// A particle binds a feature and a condition, and may delegate individual
/// dimensions to other particles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Particle {
    pub name: String,
    pub feature_name: String,
    /// One entry per feature dimension; an empty string means no composite.
    #[serde(default)]
    pub composite_names: Vec<String>,
    pub condition_name: String,
    #[serde(default)]
    pub condition_args: Vec<i32>,
}

impl Particle {
    /// `(dimension index, particle name)` for every non-empty composite.
    pub fn composites(&self) -> impl Iterator<Item = (u32, &str)> {
        self.composite_names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (i as u32, name.as_str()))
    }
}

/// True for `[A-Za-z_$][A-Za-z0-9_$]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("Add"));
        assert!(is_identifier("_x$1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("../etc"));
        assert!(!is_identifier("Añ"));
    }

    #[test]
    fn composites_skip_empty_dimensions() {
        let particle = Particle {
            composite_names: vec!["".into(), "Inner".into(), "".into(), "Other".into()],
            ..Default::default()
        };
        let composites: Vec<_> = particle.composites().collect();
        assert_eq!(composites, vec![(1, "Inner"), (3, "Other")]);
    }

    #[test]
    fn feature_json_uses_snake_case() {
        let json = r#"{"name":"F","dimensions":[{"transformations":[{"name":"Add","args":[1]},{"name":"Nop"}]}]}"#;
        let feature: Feature = serde_json::from_str(json).unwrap();
        assert_eq!(feature.dimensions[0].transformations[1].args, Vec::<u32>::new());
        let names: Vec<_> = feature.transformation_names().collect();
        assert_eq!(names, vec!["Add", "Nop"]);
    }
}
