use crate::error::{ExporterError, Result};
use std::ffi::OsString;
use std::fmt;
use url::form_urlencoded;

pub const LOGIN_ENV: &str = "STREAM_TELECOM_LOGIN";
pub const PASSWORD_ENV: &str = "STREAM_TELECOM_PASSWORD";

pub const LOGIN_PLACEHOLDER: &str = "<stream-telecom-login>";
pub const PASSWORD_PLACEHOLDER: &str = "<stream-telecom-password>";

/// Stream Telecom account credentials, loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }

    /// Load credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_os_lookup(|name| std::env::var_os(name))
    }

    /// Load credentials through `lookup`. A variable that is set to an empty
    /// string still counts as set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_os_lookup(|name| lookup(name).map(OsString::from))
    }

    /// Like [`from_lookup`](Self::from_lookup), but values that are not
    /// valid UTF-8 are reported separately from missing ones.
    pub fn from_os_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let read = |name: &'static str| -> Result<String> {
            lookup(name)
                .ok_or(ExporterError::Configuration(name))?
                .into_string()
                .map_err(|_| ExporterError::ConfigurationEncoding(name))
        };

        let login = read(LOGIN_ENV)?;
        let password = read(PASSWORD_ENV)?;

        Ok(Self { login, password })
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Replace every occurrence of the login and password in `message` with
    /// fixed placeholders.
    ///
    /// Besides the raw values, the percent-encoded and form-encoded spellings
    /// are replaced too, since the secrets travel in the request query string
    /// and show up that way in transport errors. The form spelling comes from
    /// the same encoder that builds the request URL. Matching is done in a single
    /// pass over the original text, longest pattern first, so placeholders
    /// are never rewritten by a later pattern.
    pub fn redact(&self, message: &str) -> String {
        let mut patterns: Vec<(String, &'static str)> = Vec::new();
        for (secret, placeholder) in [
            (&self.password, PASSWORD_PLACEHOLDER),
            (&self.login, LOGIN_PLACEHOLDER),
        ] {
            if secret.is_empty() {
                continue;
            }
            let percent = urlencoding::encode(secret).into_owned();
            let form: String = form_urlencoded::byte_serialize(secret.as_bytes()).collect();
            for variant in [secret.clone(), percent, form] {
                if !patterns.iter().any(|(p, _)| *p == variant) {
                    patterns.push((variant, placeholder));
                }
            }
        }

        if patterns.is_empty() {
            return message.to_string();
        }
        // Stable sort keeps the password ahead of an identical login.
        patterns.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut redacted = String::with_capacity(message.len());
        let mut rest = message;
        'scan: while let Some(c) = rest.chars().next() {
            for (pattern, placeholder) in &patterns {
                if rest.starts_with(pattern.as_str()) {
                    redacted.push_str(placeholder);
                    rest = &rest[pattern.len()..];
                    continue 'scan;
                }
            }
            redacted.push(c);
            rest = &rest[c.len_utf8()..];
        }

        redacted
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &PASSWORD_PLACEHOLDER)
            .finish()
    }
}
