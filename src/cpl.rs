//! `KEY=VALUE` string lists.
//!
//! Metadata domains are exposed as lists of `KEY=VALUE` strings, the way
//! subdataset names and descriptions are usually passed around.

use std::fmt::{Debug, Display, Formatter};

use crate::errors::{MiraMonError, Result};

/// An ordered list of `KEY=VALUE` strings with unique keys.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CslStringList {
    entries: Vec<(String, String)>,
}

impl CslStringList {
    /// Creates an empty string list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `name`.
    ///
    /// Overwrites duplicate `name`s, ignoring case.
    ///
    /// Returns `Err` if `name` has non alphanumeric characters, or `value`
    /// has newline characters.
    pub fn set_name_value(&mut self, name: &str, value: &str) -> Result<()> {
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(MiraMonError::BadArgument(format!(
                "Invalid characters in name: '{name}'"
            )));
        }
        if value.contains(['\n', '\r']) {
            return Err(MiraMonError::BadArgument(format!(
                "Invalid characters in value: '{value}'"
            )));
        }

        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Looks up the value corresponding to `key`, ignoring case.
    pub fn fetch_name_value(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Determine the number of entries in the list.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Determine if the list has any values
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the `(key, value)` pairs, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The entries formatted as `KEY=VALUE` strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

impl Debug for CslStringList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.to_strings()).finish()
    }
}

impl Display for CslStringList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> CslStringList {
        let mut l = CslStringList::new();
        l.set_name_value("ONE", "1").unwrap();
        l.set_name_value("TWO", "2").unwrap();
        l.set_name_value("THREE", "3").unwrap();
        l
    }

    #[test]
    fn basic_list() {
        let l = fixture();
        assert!(matches!(l.fetch_name_value("ONE"), Some("1")));
        assert!(matches!(l.fetch_name_value("three"), Some("3")));
        assert!(l.fetch_name_value("FOO").is_none());
        assert_eq!(l.len(), 3);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut l = fixture();
        l.set_name_value("two", "22").unwrap();
        assert_eq!(l.len(), 3);
        assert_eq!(l.to_strings(), vec!["ONE=1", "TWO=22", "THREE=3"]);
    }

    #[test]
    fn invalid_keys() {
        let mut l = fixture();
        assert!(l.set_name_value("l==t", "2").is_err());
        assert!(l.set_name_value("foo", "2\n4\r5").is_err());
    }

    #[test]
    fn debug_fmt() {
        let l = fixture();
        let s = format!("{l:?}");
        assert!(s.contains("ONE=1"));
        assert!(s.contains("TWO=2"));
        assert!(s.contains("THREE=3"));
    }
}
