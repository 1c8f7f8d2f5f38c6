use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// The tenant every generated query is scoped to.
///
/// There is no way to build one from an empty id, so holding a [TenantContext] means the query
/// can be scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantContext(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("A tenant is required: queries are never run without one")]
pub struct MissingTenantError;

/// The column every statement filters on. Only a plain identifier is accepted, since it is
/// written into the SQL as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantColumn(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid tenant column \"{0}\": use letters, digits and underscores, not starting with a digit")]
pub struct InvalidTenantColumnError(pub String);

impl TenantContext {
    pub fn new(id: &str) -> Result<Self, MissingTenantError> {
        let id = id.trim();

        if id.is_empty() {
            return Err(MissingTenantError);
        }

        Ok(TenantContext(id.to_string()))
    }

    pub fn from_optional(id: Option<&str>) -> Result<Self, MissingTenantError> {
        id.map_or(Err(MissingTenantError), Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantContext {
    type Error = MissingTenantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TenantContext::new(&value)
    }
}

impl From<TenantContext> for String {
    fn from(value: TenantContext) -> Self {
        value.0
    }
}

impl Display for TenantContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TenantColumn {
    pub fn new(column: &str) -> Result<Self, InvalidTenantColumnError> {
        let mut chars = column.chars();
        let starts_well = chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');

        if !starts_well || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InvalidTenantColumnError(column.to_string()));
        }

        Ok(TenantColumn(column.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TenantColumn {
    fn default() -> Self {
        TenantColumn("tenant_id".to_string())
    }
}

impl TryFrom<String> for TenantColumn {
    type Error = InvalidTenantColumnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TenantColumn::new(&value)
    }
}

impl From<TenantColumn> for String {
    fn from(value: TenantColumn) -> Self {
        value.0
    }
}

impl Display for TenantColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
