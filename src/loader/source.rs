//! Contract source generation.
//!
//! Each artifact is wrapped in a contract deriving from its kind's base
//! contract. The constructor takes the registry address and registers the
//! artifact under its name.

use crate::core::definitions::{Condition, Feature, Particle, Transformation};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("argument index `{0}` is out of range")]
    ArgumentIndex(String),
}

/// Number of arguments a snippet reads: one past the largest `N` in
/// `args[N]`, or zero when it reads none.
pub fn args_count(src: &str, max_index: u64) -> Result<u32, SourceError> {
    let mut count = 0u32;
    let mut rest = src;
    while let Some(at) = rest.find("args[") {
        rest = &rest[at + 5..];
        let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len == 0 || !rest[digits_len..].starts_with(']') {
            continue;
        }
        let digits = &rest[..digits_len];
        let index = digits
            .parse::<u64>()
            .ok()
            .filter(|&i| i <= max_index)
            .ok_or_else(|| SourceError::ArgumentIndex(digits.to_string()))?;
        count = count.max(index as u32 + 1);
        rest = &rest[digits_len..];
    }
    Ok(count)
}

pub fn transformation_source(transformation: &Transformation) -> Result<String, SourceError> {
    let argc = args_count(&transformation.sol_src, u32::MAX as u64 - 1)?;
    Ok(format!(
        "//SPDX-License-Identifier: MIT\n\
         pragma solidity ^0.8.0;\n\
         import \"transformation/TransformationBase.sol\";\n\
         contract {name} is TransformationBase{{\n\
         constructor(address registryAddr) TransformationBase(registryAddr, \"{name}\", {argc}) {{}}\n\
         function run(uint32 x, uint32 [] calldata args) view external returns (uint32){{\n\
         require(args.length == this.getArgsCount(), \"wrong number of arguments\");\n\
         {src}\n}}\n}}",
        name = transformation.name,
        argc = argc,
        src = transformation.sol_src,
    ))
}

pub fn condition_source(condition: &Condition) -> Result<String, SourceError> {
    let argc = args_count(&condition.sol_src, i32::MAX as u64)?;
    Ok(format!(
        "//SPDX-License-Identifier: MIT\n\
         pragma solidity >=0.8.2 <0.9.0;\n\
         import \"condition/ConditionBase.sol\";\n\
         contract {name} is ConditionBase{{\n\
         constructor(address registryAddr) ConditionBase(registryAddr, \"{name}\", {argc}) {{}}\n\
         function check(int32 [] calldata args) view external returns (bool){{\n\
         require(args.length == this.getArgsCount(), \"wrong number of arguments\");\n\
         {src}\n}}\n}}",
        name = condition.name,
        argc = argc,
        src = condition.sol_src,
    ))
}

pub fn feature_source(feature: &Feature) -> String {
    let mut body = String::new();
    for (i, dimension) in feature.dimensions.iter().enumerate() {
        for transformation in &dimension.transformations {
            if transformation.args.is_empty() {
                body += &format!("getCallDef().push({}, \"{}\");\n", i, transformation.name);
            } else {
                let args: Vec<String> = transformation
                    .args
                    .iter()
                    .map(|a| format!("uint32({})", a))
                    .collect();
                body += &format!(
                    "getCallDef().push({}, \"{}\", [{}]);\n",
                    i,
                    transformation.name,
                    args.join(", ")
                );
            }
        }
    }
    format!(
        "//SPDX-License-Identifier: MIT\n\
         pragma solidity >=0.8.2 <0.9.0;\n\
         import \"feature/FeatureBase.sol\";\n\
         contract {name} is FeatureBase{{\n\
         constructor(address registryAddr) FeatureBase(registryAddr, \"{name}\", {dims}) {{\n\
         {body}super.init();\n}}\n}}",
        name = feature.name,
        dims = feature.dimensions.len(),
        body = body,
    )
}

pub fn particle_source(particle: &Particle) -> String {
    let composites: Vec<(u32, &str)> = particle.composites().collect();
    let mut dim_ids = String::new();
    let mut names = String::new();
    for (i, (dim, name)) in composites.iter().enumerate() {
        dim_ids += &format!("compositeDimIds[{}] = uint32({});\n", i, dim);
        names += &format!("compositeNames[{}] = \"{}\";\n", i, name);
    }
    let mut condition_args = String::new();
    for (i, arg) in particle.condition_args.iter().enumerate() {
        condition_args += &format!("conditionArgs[{}] = int32({});\n", i, arg);
    }

    format!(
        "//SPDX-License-Identifier: MIT\n\
         pragma solidity >=0.8.2 <0.9.0;\n\
         import \"particle/ParticleBase.sol\";\n\
         contract {name} is ParticleBase{{\n\
         function _compositeDimIds() internal pure returns (uint32[] memory compositeDimIds) {{\
         compositeDimIds = new uint32[]({count});{dim_ids}}}\n\
         function _compositeNames() internal pure returns (string[] memory compositeNames) {{\
         compositeNames = new string[]({count});{names}}}\n\
         function _conditionArgs() internal pure returns (int32[] memory conditionArgs) {{\
         conditionArgs = new int32[]({argc});{condition_args}}}\n\
         constructor(address registryAddr) ParticleBase(registryAddr, \"{name}\", \"{feature}\", \
         _compositeDimIds(), _compositeNames(), \"{condition}\", _conditionArgs()) {{}}\n}}",
        name = particle.name,
        count = composites.len(),
        dim_ids = dim_ids,
        names = names,
        argc = particle.condition_args.len(),
        condition_args = condition_args,
        feature = particle.feature_name,
        condition = particle.condition_name,
    )
}
