//! Key-derivation configuration.

use std::fmt;

use crate::error::{Error, Result};

/// Environment variable holding the key-derivation secret.
pub const SECRET_ENV: &str = "ROWMODEL_KEY_SECRET";

/// Environment variable overriding the derivation context.
pub const CONTEXT_ENV: &str = "ROWMODEL_KEY_CONTEXT";

/// Context used when none is configured.
pub const DEFAULT_CONTEXT: &str = "rowmodel cache keys v1";

/// Secret and context for [`KeyDeriver`](crate::key::KeyDeriver).
#[derive(Clone, PartialEq, Eq)]
pub struct KeyConfig {
    secret: Vec<u8>,
    context: String,
}

impl KeyConfig {
    /// Create a configuration with the default context.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(Error::Config("key secret must not be empty".into()));
        }
        Ok(Self {
            secret,
            context: DEFAULT_CONTEXT.to_string(),
        })
    }

    /// Set the derivation context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Read [`SECRET_ENV`] and, if set, [`CONTEXT_ENV`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(SECRET_ENV)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Config(format!("{} is not set", SECRET_ENV)))?;
        let config = Self::new(secret)?;
        Ok(match lookup(CONTEXT_ENV).filter(|c| !c.is_empty()) {
            Some(context) => config.with_context(context),
            None => config,
        })
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyConfig")
            .field("secret", &"<redacted>")
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(KeyConfig::new(""), Err(Error::Config(_))));
        assert!(matches!(KeyConfig::new(Vec::<u8>::new()), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup() {
        let config = KeyConfig::from_lookup(lookup(&[(SECRET_ENV, "s3cret")])).unwrap();
        assert_eq!(config.secret(), b"s3cret");
        assert_eq!(config.context(), DEFAULT_CONTEXT);

        let config = KeyConfig::from_lookup(lookup(&[
            (SECRET_ENV, "s3cret"),
            (CONTEXT_ENV, "sessions"),
        ]))
        .unwrap();
        assert_eq!(config.context(), "sessions");
    }

    #[test]
    fn test_from_lookup_missing_secret() {
        let err = KeyConfig::from_lookup(lookup(&[(CONTEXT_ENV, "x")])).unwrap_err();
        assert!(err.to_string().contains(SECRET_ENV));

        let err = KeyConfig::from_lookup(lookup(&[(SECRET_ENV, "")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = KeyConfig::new("hunter2").unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("redacted"));
    }
}
