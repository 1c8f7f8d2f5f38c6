//! Contexts are named sets of rendering settings, so that `tql translate` doesn't need a pile of
//! flags on every call.
use crate::cache;
use crate::cache::SharedCacheKey;
use crate::engine::{RenderOptions, TenantContext};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: ContextName,
    /// Used when no tenant is given explicitly.
    pub tenant: Option<String>,
    #[serde(default)]
    pub options: RenderOptions,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContextName(String);

impl Context {
    /// The context currently in use, if one was ever selected.
    pub fn current() -> Result<Option<Context>, crate::Error> {
        let name = match ContextName::current() {
            Ok(name) => name,
            Err(error) if is_not_found(&error) => return Ok(None),
            Err(error) => return Err(error),
        };

        Ok(Some(cache::read(&name)?))
    }

    /// The tenant set up for this context. Empty tenants count as no tenant at all.
    pub fn tenant(&self) -> Option<TenantContext> {
        self.tenant
            .as_deref()
            .and_then(|tenant| TenantContext::new(tenant).ok())
    }
}

impl ContextName {
    pub fn current() -> Result<ContextName, crate::Error> {
        cache::read(&SharedCacheKey::of::<ContextName>())
    }
}

fn is_not_found(error: &crate::Error) -> bool {
    matches!(
        error.kind(),
        crate::ErrorKind::IoError(io_error) if io_error.kind() == std::io::ErrorKind::NotFound
    )
}

impl From<String> for ContextName {
    fn from(value: String) -> Self {
        ContextName(value)
    }
}

impl From<&str> for ContextName {
    fn from(value: &str) -> Self {
        ContextName(value.to_string())
    }
}

impl From<ContextName> for String {
    fn from(value: ContextName) -> Self {
        value.0
    }
}

impl Display for ContextName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_tenants_are_ignored() {
        let mut context = Context {
            name: "local".into(),
            tenant: Some("  ".to_string()),
            options: RenderOptions::default(),
        };
        assert_eq!(None, context.tenant());

        context.tenant = Some("acme".to_string());
        assert_eq!(Some("acme"), context.tenant().as_ref().map(TenantContext::as_str));
    }

    #[test]
    fn test_older_contexts_get_default_options() {
        let context: Context =
            serde_json::from_str(r#"{"name": "local", "tenant": "acme"}"#).unwrap();

        assert_eq!(RenderOptions::default(), context.options);
    }
}
