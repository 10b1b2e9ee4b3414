use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::admission_request::GroupVersionKind;
use crate::admission_response::StatusReason;
use crate::constants::{APP_LABEL, DEFAULT_RULE_NAME, DENIAL_CODE, POD_KIND};
use crate::errors::PolicyConfigError;
use crate::resource::Resource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(Denial),
}

/// Why a resource has been rejected. All the fields end up inside of the
/// `status` of the AdmissionResponse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub message: String,
    pub code: u16,
    pub reason: StatusReason,
}

impl Denial {
    pub fn forbidden(message: String) -> Denial {
        Denial {
            message,
            code: DENIAL_CODE,
            reason: StatusReason::Forbidden,
        }
    }
}

/// A pure check run against the resource embedded in an AdmissionRequest.
/// `kind` is the kind matched by the owning rule, used to build messages.
pub trait Predicate: fmt::Debug + Send + Sync {
    fn evaluate(&self, kind: &str, resource: &Resource) -> Verdict;
}

/// Rejects resources that do not have the given label. Only the presence of
/// the key is checked, an empty value is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireLabel {
    key: String,
}

impl RequireLabel {
    pub fn new(key: impl Into<String>) -> Self {
        RequireLabel { key: key.into() }
    }
}

impl Predicate for RequireLabel {
    fn evaluate(&self, kind: &str, resource: &Resource) -> Verdict {
        if resource.has_label(&self.key) {
            Verdict::Allow
        } else {
            Verdict::Deny(Denial::forbidden(format!(
                "{kind} rejected: missing '{}' label.",
                self.key
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireAnnotation {
    key: String,
}

impl RequireAnnotation {
    pub fn new(key: impl Into<String>) -> Self {
        RequireAnnotation { key: key.into() }
    }
}

impl Predicate for RequireAnnotation {
    fn evaluate(&self, kind: &str, resource: &Resource) -> Verdict {
        if resource.has_annotation(&self.key) {
            Verdict::Allow
        } else {
            Verdict::Deny(Denial::forbidden(format!(
                "{kind} rejected: missing '{}' annotation.",
                self.key
            )))
        }
    }
}

/// Selects the requests a rule applies to. The group is compared only when
/// it is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindMatcher {
    pub kind: String,
    pub group: Option<String>,
}

impl KindMatcher {
    pub fn kind(kind: impl Into<String>) -> Self {
        KindMatcher {
            kind: kind.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn matches(&self, gvk: &GroupVersionKind) -> bool {
        self.kind == gvk.kind
            && self
                .group
                .as_ref()
                .is_none_or(|group| *group == gvk.group)
    }
}

#[derive(Debug)]
pub struct PolicyRule {
    pub name: String,
    pub matcher: KindMatcher,
    predicate: Box<dyn Predicate>,
}

impl PolicyRule {
    pub fn new(
        name: impl Into<String>,
        matcher: KindMatcher,
        predicate: Box<dyn Predicate>,
    ) -> Self {
        PolicyRule {
            name: name.into(),
            matcher,
            predicate,
        }
    }

    pub fn evaluate(&self, resource: &Resource) -> Verdict {
        self.predicate.evaluate(&self.matcher.kind, resource)
    }
}

/// Ordered list of rules. The first rule matching the kind of the request
/// decides, requests matched by no rule are allowed.
#[derive(Debug)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
}

impl Default for PolicyTable {
    /// Pods must carry the `app` label, everything else is allowed.
    fn default() -> Self {
        PolicyTable {
            rules: vec![PolicyRule::new(
                DEFAULT_RULE_NAME,
                KindMatcher::kind(POD_KIND),
                Box::new(RequireLabel::new(APP_LABEL)),
            )],
        }
    }
}

impl PolicyTable {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        PolicyTable { rules }
    }

    pub fn from_config(configs: &[PolicyRuleConfig]) -> Result<Self, PolicyConfigError> {
        let mut names = HashSet::new();
        let mut rules = Vec::with_capacity(configs.len());

        for config in configs {
            if config.name.is_empty() {
                return Err(PolicyConfigError::EmptyRuleName);
            }
            if !names.insert(config.name.as_str()) {
                return Err(PolicyConfigError::DuplicateRuleName(config.name.clone()));
            }
            rules.push(config.build()?);
        }

        Ok(PolicyTable { rules })
    }

    pub fn rule_for(&self, gvk: &GroupVersionKind) -> Option<&PolicyRule> {
        self.rules.iter().find(|rule| rule.matcher.matches(gvk))
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A rule as written inside of the policies file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRuleConfig {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub predicate: PredicateConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PredicateConfig {
    RequireLabel { key: String },
    RequireAnnotation { key: String },
}

impl PolicyRuleConfig {
    fn build(&self) -> Result<PolicyRule, PolicyConfigError> {
        if self.kind.is_empty() {
            return Err(PolicyConfigError::EmptyKind(self.name.clone()));
        }

        let predicate: Box<dyn Predicate> = match &self.predicate {
            PredicateConfig::RequireLabel { key } | PredicateConfig::RequireAnnotation { key }
                if key.is_empty() =>
            {
                return Err(PolicyConfigError::EmptyKey(self.name.clone()));
            }
            PredicateConfig::RequireLabel { key } => Box::new(RequireLabel::new(key)),
            PredicateConfig::RequireAnnotation { key } => Box::new(RequireAnnotation::new(key)),
        };

        let mut matcher = KindMatcher::kind(&self.kind);
        if let Some(group) = &self.group {
            matcher = matcher.with_group(group);
        }

        Ok(PolicyRule::new(&self.name, matcher, predicate))
    }
}
