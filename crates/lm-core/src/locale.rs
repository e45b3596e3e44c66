//! Locale identifiers and the locale resolver.

use crate::error::{CoreError, CoreResult};
use crate::newtype_string::define_newtype_string;

define_newtype_string! {
    /// A locale identifier such as `en_US` or `de-AT`.
    ///
    /// Locales become column suffixes (`Title_en_US`), so only ASCII
    /// alphanumerics, `_` and `-` are accepted.
    pub struct Locale;
    valid = |s: &str| {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    },
    expected = "a non-empty identifier of letters, digits, '_' or '-'";
}

/// Configured locales plus the default locale.
///
/// Both halves are checked lazily so a caller can ask for one without the
/// other, but every migration asks for both before touching the database.
#[derive(Debug, Clone, Default)]
pub struct LocaleSettings {
    locales: Vec<Locale>,
    default_locale: Option<Locale>,
}

impl LocaleSettings {
    /// Build settings from the configured list and default.
    ///
    /// Duplicate locales are collapsed, keeping the first occurrence.
    pub fn new(locales: Vec<Locale>, default_locale: Option<Locale>) -> Self {
        let mut unique: Vec<Locale> = Vec::with_capacity(locales.len());
        for locale in locales {
            if unique.contains(&locale) {
                log::warn!("Locale '{}' is configured more than once; ignoring duplicate", locale);
                continue;
            }
            unique.push(locale);
        }
        Self {
            locales: unique,
            default_locale,
        }
    }

    /// The configured locales in declaration order.
    pub fn locales(&self) -> CoreResult<&[Locale]> {
        if self.locales.is_empty() {
            return Err(CoreError::LocalesRequired);
        }
        Ok(&self.locales)
    }

    /// The locale every record is guaranteed a localised row in.
    pub fn default_locale(&self) -> CoreResult<&Locale> {
        self.default_locale
            .as_ref()
            .ok_or(CoreError::DefaultLocaleRequired)
    }

    /// Locales a migration iterates: the configured list, then the default
    /// locale when it is not listed.
    pub fn migration_locales(&self) -> CoreResult<Vec<Locale>> {
        let mut locales = self.locales()?.to_vec();
        let default_locale = self.default_locale()?;
        if !locales.contains(default_locale) {
            log::debug!(
                "Default locale '{}' is not configured; migrating it after the listed locales",
                default_locale
            );
            locales.push(default_locale.clone());
        }
        Ok(locales)
    }

    /// Whether `locale` is the default locale.
    pub fn is_default(&self, locale: &Locale) -> bool {
        self.default_locale.as_ref() == Some(locale)
    }
}

#[cfg(test)]
#[path = "locale_test.rs"]
mod tests;
