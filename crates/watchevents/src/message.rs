//! Interval messages
//!
//! A message is the human-readable event text plus an ordered set of
//! annotations. Annotations render as `key/value` tokens ahead of the human
//! text, e.g. `reason/Pulled container/app image/busybox Pulled "busybox"`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Annotation keys attached to kube event intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKey {
    Count,
    Roles,
    Container,
    Duration,
    Image,
    Interesting,
    Pathological,
}

impl AnnotationKey {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Roles => "roles",
            Self::Container => "container",
            Self::Duration => "duration",
            Self::Image => "image",
            Self::Interesting => "interesting",
            Self::Pathological => "pathological",
        }
    }
}

impl fmt::Display for AnnotationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub key: AnnotationKey,
    pub value: String,
}

/// Annotated event message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub human: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl Message {
    #[must_use]
    pub fn new(human: impl Into<String>) -> Self {
        Self {
            human: human.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set an annotation. An existing key keeps its position and takes the
    /// new value.
    #[must_use]
    pub fn with_annotation(mut self, key: AnnotationKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: AnnotationKey, value: impl Into<String>) {
        let value = value.into();
        match self.annotations.iter_mut().find(|a| a.key == key) {
            Some(existing) => existing.value = value,
            None => self.annotations.push(Annotation { key, value }),
        }
    }

    #[must_use]
    pub fn annotation(&self, key: AnnotationKey) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    #[must_use]
    pub fn has_annotation(&self, key: AnnotationKey) -> bool {
        self.annotation(key).is_some()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(reason) = &self.reason {
            write!(f, "reason/{reason}")?;
            sep = " ";
        }
        for annotation in &self.annotations {
            write!(f, "{sep}{}/{}", annotation.key, annotation.value)?;
            sep = " ";
        }
        if !self.human.is_empty() {
            write!(f, "{sep}{}", self.human)?;
        }
        Ok(())
    }
}
