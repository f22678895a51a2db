//! Presence of a link reference, as an explicit state.
//!
//! Stored documents express a link as an optional `{id, name}` object. An
//! absent or `null` object, an object without a usable `id`, and a populated
//! object mean different things, so they are parsed into distinct
//! [`LinkState`] variants at the serde boundary instead of being inspected by
//! truthiness later.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A populated reference to the record on the other side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkRef<I> {
    /// Id of the peer record.
    pub id: I,
    /// Display name of the peer (username for users, full name for admins).
    pub name: String,
}

impl<I> LinkRef<I> {
    /// Create a new reference.
    pub fn new(id: I, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Link state of one side of the admin/user relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkState<I> {
    /// No reference is stored.
    Unlinked,
    /// A reference object is stored but has no usable id.
    ///
    /// Treated as effectively unlinked.
    Dangling {
        /// Name found on the half-written reference, if any.
        name: Option<String>,
    },
    /// A complete reference to a peer record.
    Linked(LinkRef<I>),
}

impl<I> Default for LinkState<I> {
    fn default() -> Self {
        Self::Unlinked
    }
}

impl<I> LinkState<I> {
    /// Shorthand for `Linked(LinkRef::new(id, name))`.
    pub fn linked(id: I, name: impl Into<String>) -> Self {
        Self::Linked(LinkRef::new(id, name))
    }

    /// Whether nothing at all is stored.
    #[must_use]
    pub const fn is_unlinked(&self) -> bool {
        matches!(self, Self::Unlinked)
    }

    /// Whether a complete reference is stored.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        matches!(self, Self::Linked(_))
    }

    /// The complete reference, if any.
    #[must_use]
    pub const fn as_linked(&self) -> Option<&LinkRef<I>> {
        match self {
            Self::Linked(link) => Some(link),
            Self::Unlinked | Self::Dangling { .. } => None,
        }
    }

    /// The peer id, if a complete reference is stored.
    #[must_use]
    pub fn peer_id(&self) -> Option<&I> {
        self.as_linked().map(|link| &link.id)
    }
}

#[derive(Serialize)]
struct StoredRefOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Deserialize)]
struct StoredRefIn {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl<I: AsRef<str>> Serialize for LinkState<I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let stored = match self {
            Self::Unlinked => None,
            Self::Dangling { name } => Some(StoredRefOut {
                id: None,
                name: name.as_deref(),
            }),
            Self::Linked(link) => Some(StoredRefOut {
                id: Some(link.id.as_ref()),
                name: Some(&link.name),
            }),
        };
        stored.serialize(serializer)
    }
}

impl<'de, I: From<String>> Deserialize<'de> for LinkState<I> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = Option::<StoredRefIn>::deserialize(deserializer)?;

        Ok(match stored {
            None => Self::Unlinked,
            Some(StoredRefIn { id: Some(id), name }) if !id.trim().is_empty() => {
                Self::Linked(LinkRef::new(I::from(id), name.unwrap_or_default()))
            }
            Some(StoredRefIn { name, .. }) => Self::Dangling { name },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::UserId;

    fn parse(json: &str) -> LinkState<UserId> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_presence_variants() {
        assert_eq!(parse("null"), LinkState::Unlinked);
        assert_eq!(parse("{}"), LinkState::Dangling { name: None });
        assert_eq!(
            parse(r#"{"id":"","name":"ren"}"#),
            LinkState::Dangling {
                name: Some("ren".to_owned())
            }
        );
        assert_eq!(
            parse(r#"{"id":"535H0W35","name":"ren"}"#),
            LinkState::linked(UserId::new("535H0W35"), "ren")
        );
    }

    #[test]
    fn test_linked_without_name_defaults_to_empty() {
        assert_eq!(
            parse(r#"{"id":"535H0W35"}"#),
            LinkState::linked(UserId::new("535H0W35"), "")
        );
    }

    #[test]
    fn test_serialize_linked_and_unlinked() {
        let linked = LinkState::linked(UserId::new("535H0W35"), "ren");
        assert_eq!(
            serde_json::to_value(&linked).unwrap(),
            serde_json::json!({"id": "535H0W35", "name": "ren"})
        );

        let unlinked: LinkState<UserId> = LinkState::Unlinked;
        assert_eq!(serde_json::to_value(&unlinked).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_peer_id_only_for_complete_links() {
        let dangling: LinkState<UserId> = LinkState::Dangling { name: None };
        assert!(dangling.peer_id().is_none());
        assert!(!dangling.is_linked());
        assert!(!dangling.is_unlinked());

        let linked = LinkState::linked(UserId::new("535H0W35"), "ren");
        assert_eq!(linked.peer_id(), Some(&UserId::new("535H0W35")));
    }
}
