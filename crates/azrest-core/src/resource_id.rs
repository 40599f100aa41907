//! Azure Resource Manager resource IDs
//!
//! A resource ID has the shape
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`,
//! optionally followed by `{childType}/{childName}` pairs. Tenant-level resources
//! such as reservation orders start directly with `/providers/`.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ResourceIdError {
    #[error("resource ID is empty")]
    Empty,

    #[error("resource ID must start with '/': {0}")]
    NotAbsolute(String),

    #[error("resource ID segment '{0}' has no value")]
    MissingValue(String),

    #[error("unexpected segment '{segment}' in resource ID {id}")]
    UnexpectedSegment { segment: String, id: String },

    #[error("resource types and names are not paired in resource ID {0}")]
    Unpaired(String),
}

/// A parsed ARM resource ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    raw: String,
    subscription_id: Option<String>,
    resource_group: Option<String>,
    provider_namespace: Option<String>,
    /// `(type, name)` pairs below the provider namespace
    segments: Vec<(String, String)>,
}

impl ResourceId {
    /// Parse a resource ID. Segment keys are matched case-insensitively.
    pub fn parse(id: &str) -> Result<Self, ResourceIdError> {
        let trimmed = id.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ResourceIdError::Empty);
        }
        if !trimmed.starts_with('/') {
            return Err(ResourceIdError::NotAbsolute(id.to_string()));
        }

        let parts: Vec<&str> = trimmed[1..].split('/').collect();
        let mut parsed = ResourceId {
            raw: trimmed.to_string(),
            subscription_id: None,
            resource_group: None,
            provider_namespace: None,
            segments: Vec::new(),
        };

        let mut i = 0;
        while i < parts.len() {
            let key = parts[i];
            let value = parts
                .get(i + 1)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ResourceIdError::MissingValue(key.to_string()))?;

            if key.eq_ignore_ascii_case("subscriptions") && parsed.subscription_id.is_none() {
                parsed.subscription_id = Some(value.to_string());
                i += 2;
            } else if key.eq_ignore_ascii_case("resourceGroups") && parsed.resource_group.is_none()
            {
                parsed.resource_group = Some(value.to_string());
                i += 2;
            } else if key.eq_ignore_ascii_case("providers") {
                parsed.provider_namespace = Some(value.to_string());
                let rest = &parts[i + 2..];
                if rest.is_empty() || rest.len() % 2 != 0 {
                    return Err(ResourceIdError::Unpaired(id.to_string()));
                }
                parsed.segments = rest
                    .chunks(2)
                    .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                    .collect();
                break;
            } else {
                return Err(ResourceIdError::UnexpectedSegment {
                    segment: key.to_string(),
                    id: id.to_string(),
                });
            }
        }

        Ok(parsed)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription_id.as_deref()
    }

    pub fn resource_group(&self) -> Option<&str> {
        self.resource_group.as_deref()
    }

    pub fn provider_namespace(&self) -> Option<&str> {
        self.provider_namespace.as_deref()
    }

    /// Fully qualified resource type, e.g. `Microsoft.Compute/virtualMachines/extensions`.
    pub fn resource_type(&self) -> String {
        match &self.provider_namespace {
            Some(ns) => {
                let types: Vec<&str> = self.segments.iter().map(|(t, _)| t.as_str()).collect();
                format!("{ns}/{}", types.join("/"))
            }
            None if self.resource_group.is_some() => "Microsoft.Resources/resourceGroups".into(),
            None => "Microsoft.Resources/subscriptions".into(),
        }
    }

    /// Name of the innermost resource.
    pub fn name(&self) -> &str {
        if let Some((_, name)) = self.segments.last() {
            return name;
        }
        self.resource_group
            .as_deref()
            .or(self.subscription_id.as_deref())
            .unwrap_or_default()
    }

    /// The parent resource, or `None` for subscriptions and tenant-level roots.
    pub fn parent(&self) -> Option<ResourceId> {
        if self.segments.len() > 1 {
            let mut parent = self.clone();
            parent.segments.pop();
            parent.raw = parent.render();
            return Some(parent);
        }
        if !self.segments.is_empty() || self.resource_group.is_some() {
            let mut parent = self.clone();
            parent.segments.clear();
            parent.provider_namespace = None;
            if self.segments.is_empty() {
                parent.resource_group = None;
            }
            if parent.subscription_id.is_none() && parent.resource_group.is_none() {
                return None;
            }
            parent.raw = parent.render();
            return Some(parent);
        }
        None
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(sub) = &self.subscription_id {
            out.push_str(&format!("/subscriptions/{sub}"));
        }
        if let Some(rg) = &self.resource_group {
            out.push_str(&format!("/resourceGroups/{rg}"));
        }
        if let Some(ns) = &self.provider_namespace {
            out.push_str(&format!("/providers/{ns}"));
            for (t, n) in &self.segments {
                out.push_str(&format!("/{t}/{n}"));
            }
        }
        out
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
