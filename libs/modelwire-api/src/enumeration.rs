use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CodecError;

/// Sealed table of the member names of one enumeration.
///
/// Members are identified by name on the wire. The table is closed once
/// built; decoding a name that is not listed fails with
/// [`CodecError::UnknownEnumMember`].
#[derive(Debug, PartialEq, Eq)]
pub struct EnumRegistry {
    name: String,
    members: Vec<String>,
    index: HashMap<String, usize>,
}

impl EnumRegistry {
    pub fn builder(name: impl Into<String>) -> EnumRegistryBuilder {
        EnumRegistryBuilder {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Build a registry from members already known to be distinct, as
    /// `#[derive(Enumeration)]` guarantees at compile time.
    #[doc(hidden)]
    pub fn sealed(name: &str, members: &[&str]) -> Arc<Self> {
        let members: Vec<String> = members.iter().map(|m| (*m).to_owned()).collect();
        let index = members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.clone(), i))
            .collect();
        Arc::new(Self {
            name: name.to_owned(),
            members,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn contains(&self, member: &str) -> bool {
        self.index.contains_key(member)
    }

    pub fn index_of(&self, member: &str) -> Option<usize> {
        self.index.get(member).copied()
    }

    pub fn member(&self, index: usize) -> Option<&str> {
        self.members.get(index).map(String::as_str)
    }

    /// Check that `member` is registered.
    pub fn check(&self, member: &str) -> Result<(), CodecError> {
        if self.contains(member) {
            Ok(())
        } else {
            Err(CodecError::UnknownEnumMember {
                enumeration: self.name.clone(),
                name: member.to_owned(),
            })
        }
    }
}

pub struct EnumRegistryBuilder {
    name: String,
    members: Vec<String>,
}

impl EnumRegistryBuilder {
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.members.push(name.into());
        self
    }

    pub fn members<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(names.into_iter().map(Into::into));
        self
    }

    /// Seal the registry. Empty or repeated member names are rejected.
    pub fn finish(self) -> Result<Arc<EnumRegistry>, CodecError> {
        let mut index = HashMap::with_capacity(self.members.len());
        for (i, member) in self.members.iter().enumerate() {
            if member.is_empty() {
                return Err(CodecError::conflict(&self.name, "empty member name"));
            }
            if index.insert(member.clone(), i).is_some() {
                return Err(CodecError::conflict(
                    &self.name,
                    format!("member '{member}' registered twice"),
                ));
            }
        }
        Ok(Arc::new(EnumRegistry {
            name: self.name,
            members: self.members,
            index,
        }))
    }
}

/// Closed Rust enum whose members travel by their registered name.
///
/// Usually implemented with `#[derive(Enumeration)]`.
pub trait Enumeration: Sized + Copy + 'static {
    fn registry() -> Arc<EnumRegistry>;

    /// Registered name of this member.
    fn name(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_seals_members_in_order() {
        let colors = EnumRegistry::builder("Color")
            .members(["red", "green"])
            .member("blue")
            .finish()
            .unwrap();

        assert_eq!(colors.name(), "Color");
        assert_eq!(colors.index_of("blue"), Some(2));
        assert_eq!(colors.member(1), Some("green"));
        assert!(colors.check("red").is_ok());
    }

    #[test]
    fn unknown_member_is_rejected() {
        let colors = EnumRegistry::sealed("Color", &["red"]);
        assert_eq!(
            colors.check("purple"),
            Err(CodecError::UnknownEnumMember {
                enumeration: "Color".into(),
                name: "purple".into(),
            })
        );
    }

    #[test]
    fn duplicate_member_is_a_conflict() {
        let err = EnumRegistry::builder("Color")
            .members(["red", "red"])
            .finish()
            .unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn sealed_matches_builder() {
        let a = EnumRegistry::sealed("Size", &["s", "m"]);
        let b = EnumRegistry::builder("Size").members(["s", "m"]).finish().unwrap();
        assert_eq!(a, b);
    }
}
