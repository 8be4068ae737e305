//! Canonical names: annotation tags and package names.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::FinderError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AnnotationTag(String);

impl AnnotationTag {
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self(canonical_name.into())
    }

    pub fn canonical_name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A validated, dot-separated package name such as `com.example.plugins`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: &str) -> Result<Self, FinderError> {
        if name.is_empty() {
            return Err(FinderError::invalid_input(name, "package name is empty"));
        }
        if name.contains(['/', '\\']) {
            return Err(FinderError::invalid_input(
                name,
                "package name must be dot-separated, not a path",
            ));
        }
        for segment in name.split('.') {
            if !is_java_identifier(segment) {
                return Err(FinderError::invalid_input(
                    name,
                    format!("{segment:?} is not a valid package segment"),
                ));
            }
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `class_name` belongs to this package, or to one of its
    /// sub-packages when `include_subpackages` is set.
    pub fn contains_class(&self, class_name: &str, include_subpackages: bool) -> bool {
        let Some(rest) = class_name
            .strip_prefix(self.0.as_str())
            .and_then(|r| r.strip_prefix('.'))
        else {
            return false;
        };
        !rest.is_empty() && (include_subpackages || !rest.contains('.'))
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = FinderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Anything that can name the package to scan: a dot-form string or an
/// already validated [`PackageName`].
pub trait IntoPackageName {
    fn into_package_name(self) -> Result<PackageName, FinderError>;
}

impl IntoPackageName for PackageName {
    fn into_package_name(self) -> Result<PackageName, FinderError> {
        Ok(self)
    }
}

impl IntoPackageName for &PackageName {
    fn into_package_name(self) -> Result<PackageName, FinderError> {
        Ok(self.clone())
    }
}

impl IntoPackageName for &str {
    fn into_package_name(self) -> Result<PackageName, FinderError> {
        PackageName::new(self)
    }
}

impl IntoPackageName for String {
    fn into_package_name(self) -> Result<PackageName, FinderError> {
        PackageName::new(&self)
    }
}

impl IntoPackageName for &String {
    fn into_package_name(self) -> Result<PackageName, FinderError> {
        PackageName::new(self)
    }
}

pub fn is_java_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// `com/example/Foo` -> `com.example.Foo`
pub fn internal_to_class_name(internal: &str) -> String {
    internal.replace('/', ".")
}

/// `com.example.Foo` -> `com/example/Foo.class`
pub fn class_name_to_resource_path(class_name: &str) -> String {
    format!("{}.class", class_name.replace('.', "/"))
}

/// `Lcom/example/Plugin;` -> `com.example.Plugin`
pub fn descriptor_to_class_name(descriptor: &str) -> Option<String> {
    let internal = descriptor.strip_prefix('L')?.strip_suffix(';')?;
    if internal.is_empty() {
        return None;
    }
    Some(internal_to_class_name(internal))
}

/// Canonical class name syntax check: dot-separated Java identifiers.
pub fn is_valid_class_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_java_identifier)
}
