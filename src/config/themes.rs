use indexmap::IndexSet;

use crate::settings::{wrap_list_as_options, OptionPair};

const BUILTIN_THEMES: &[&str] = &["default", "light", "dark", "solarized-light", "solarized-dark"];

/// Ordered, de-duplicated theme names offered by the theme selects.
#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    names: Vec<String>,
}

impl ThemeRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: IndexSet<String> = names
            .into_iter()
            .map(Into::into)
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        Self {
            names: unique.into_iter().collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn options(&self) -> Vec<OptionPair> {
        wrap_list_as_options(self.names.iter().cloned())
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new(BUILTIN_THEMES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_trims_and_dedups_in_order() {
        let registry = ThemeRegistry::new([" night", "day", "night", ""]);
        assert_eq!(registry.names(), &["night".to_string(), "day".to_string()]);
        let values: Vec<_> = registry.options().into_iter().map(|o| o.value).collect();
        assert_eq!(values, vec!["night", "day"]);
    }
}
