//! Condition model: an immutable rule binding one method signature to an
//! ordered list of requirements and the implementation that answers them.
//!
//! Two input shapes are accepted for requirements:
//! - struct form: `{ kind: param, predicate: isVault, arg_index: 0 }`
//! - tuple form:  `["param", "isVault", "0"]` / `["target", "isVaultToken"]`

use std::fmt;

use serde::{Deserialize, Serialize};

use callguard_core::abi::{MethodSignature, Selector};
use callguard_core::error::{CallGuardError, Result};

/// What a requirement's predicate is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    Target,
    Param,
}

impl RequirementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementKind::Target => "target",
            RequirementKind::Param => "param",
        }
    }
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One target- or parameter-level check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RequirementRepr")]
pub struct Requirement {
    pub kind: RequirementKind,
    pub predicate: String,
    #[serde(rename = "argIndex", skip_serializing_if = "Option::is_none")]
    pub arg_index: Option<usize>,
}

impl Requirement {
    pub fn target(predicate: &str) -> Self {
        Self {
            kind: RequirementKind::Target,
            predicate: predicate.to_string(),
            arg_index: None,
        }
    }

    pub fn param(predicate: &str, arg_index: usize) -> Self {
        Self {
            kind: RequirementKind::Param,
            predicate: predicate.to_string(),
            arg_index: Some(arg_index),
        }
    }

    fn checked(
        kind: RequirementKind,
        predicate: String,
        arg_index: Option<usize>,
    ) -> std::result::Result<Self, String> {
        if predicate.trim().is_empty() {
            return Err("requirement predicate must be non-empty".into());
        }
        match (kind, arg_index) {
            (RequirementKind::Target, Some(_)) => {
                Err(format!("target requirement {predicate} must not carry an argument index"))
            }
            (RequirementKind::Param, None) => {
                Err(format!("param requirement {predicate} needs an argument index"))
            }
            _ => Ok(Self {
                kind,
                predicate,
                arg_index,
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementRepr {
    Tuple(Vec<String>),
    Struct(RequirementFields),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RequirementFields {
    kind: RequirementKind,
    predicate: String,
    #[serde(default, alias = "argIndex")]
    arg_index: Option<usize>,
}

impl TryFrom<RequirementRepr> for Requirement {
    type Error = String;

    fn try_from(repr: RequirementRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            RequirementRepr::Struct(f) => Requirement::checked(f.kind, f.predicate, f.arg_index),
            RequirementRepr::Tuple(items) => {
                let (kind, predicate, index) = match items.as_slice() {
                    [kind, predicate] => (kind, predicate, None),
                    [kind, predicate, index] => (kind, predicate, Some(index)),
                    _ => {
                        return Err(format!(
                            "requirement tuple must have 2 or 3 entries, got {}",
                            items.len()
                        ))
                    }
                };
                let kind = match kind.as_str() {
                    "target" => RequirementKind::Target,
                    "param" => RequirementKind::Param,
                    other => return Err(format!("unknown requirement kind: {other}")),
                };
                let arg_index = index
                    .map(|s| {
                        s.trim()
                            .parse::<usize>()
                            .map_err(|_| format!("invalid argument index: {s}"))
                    })
                    .transpose()?;
                Requirement::checked(kind, predicate.clone(), arg_index)
            }
        }
    }
}

/// Condition as supplied by an owner (config file, `conditions.json`, API).
///
/// Field names follow the `conditions.json` camelCase layout; snake_case
/// aliases are accepted for YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ConditionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "implementation_id")]
    pub implementation_id: String,
    #[serde(alias = "method_name")]
    pub method_name: String,
    #[serde(default, alias = "param_types")]
    pub param_types: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl ConditionSpec {
    pub fn new(implementation_id: &str, method_name: &str, param_types: &[&str]) -> Self {
        Self {
            id: None,
            implementation_id: implementation_id.to_string(),
            method_name: method_name.to_string(),
            param_types: param_types.iter().map(|t| t.to_string()).collect(),
            requirements: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }
}

/// Stored rule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    id: String,
    implementation_id: String,
    signature: MethodSignature,
    selector: Selector,
    requirements: Vec<Requirement>,
}

impl Condition {
    /// Parse the method signature and check every param index against it.
    /// `fallback_id` names conditions whose `id` is `None`.
    pub fn compile(spec: ConditionSpec, fallback_id: impl FnOnce(&MethodSignature) -> String) -> Result<Self> {
        let signature = MethodSignature::parse(&spec.method_name, &spec.param_types)?;

        if spec.implementation_id.trim().is_empty() {
            return Err(CallGuardError::InvalidRequirement(format!(
                "{signature}: implementation id must be non-empty"
            )));
        }

        for req in &spec.requirements {
            if let Some(index) = req.arg_index {
                if index >= signature.params().len() {
                    return Err(CallGuardError::InvalidRequirement(format!(
                        "{signature}: {} argument index {index} out of range ({} params)",
                        req.predicate,
                        signature.params().len()
                    )));
                }
            }
        }

        let id = match spec.id {
            Some(id) if id.trim().is_empty() => {
                return Err(CallGuardError::InvalidRequirement(format!(
                    "{signature}: condition id must be non-empty"
                )))
            }
            Some(id) => id,
            None => fallback_id(&signature),
        };

        Ok(Self {
            id,
            implementation_id: spec.implementation_id,
            selector: signature.selector(),
            signature,
            requirements: spec.requirements,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn implementation_id(&self) -> &str {
        &self.implementation_id
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Back to the owner-facing shape, with the id made explicit.
    pub fn to_spec(&self) -> ConditionSpec {
        ConditionSpec {
            id: Some(self.id.clone()),
            implementation_id: self.implementation_id.clone(),
            method_name: self.signature.name().to_string(),
            param_types: self.signature.params().iter().map(ToString::to_string).collect(),
            requirements: self.requirements.clone(),
        }
    }
}
