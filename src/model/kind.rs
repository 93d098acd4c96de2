use std::fmt;

/// The three record collections, each persisted under its own storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Institutions,
    Programs,
    Users,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 3] = [Self::Institutions, Self::Programs, Self::Users];

    /// Key the collection's JSON array lives under.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Institutions => "crm_escuelas_v1",
            Self::Programs => "crm_carreras_v1",
            Self::Users => "crm_users_v1",
        }
    }

    /// Field name used for the collection in snapshots.
    pub fn snapshot_field(self) -> &'static str {
        match self {
            Self::Institutions => "escuelas",
            Self::Programs => "carreras",
            Self::Users => "users",
        }
    }

    pub fn identity_field(self) -> &'static str {
        match self {
            Self::Users => "email",
            _ => "id",
        }
    }

    /// Prefix for generated identifiers; `None` when the identity is supplied by the caller.
    pub fn id_prefix(self) -> Option<&'static str> {
        match self {
            Self::Institutions => Some("esc"),
            Self::Programs => Some("car"),
            Self::Users => None,
        }
    }

    /// Fields shed first when the store runs out of room.
    pub fn large_fields(self) -> &'static [&'static str] {
        match self {
            Self::Institutions | Self::Programs => &["logo"],
            Self::Users => &[],
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "institutions" | "escuelas" | "schools" => Some(Self::Institutions),
            "programs" | "carreras" | "careers" => Some(Self::Programs),
            "users" => Some(Self::Users),
            _ => None,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Institutions => "institutions",
            Self::Programs => "programs",
            Self::Users => "users",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let keys: std::collections::HashSet<_> =
            CollectionKind::ALL.iter().map(|k| k.storage_key()).collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_parse_accepts_aliases() {
        assert_eq!(CollectionKind::parse("escuelas"), Some(CollectionKind::Institutions));
        assert_eq!(CollectionKind::parse("careers"), Some(CollectionKind::Programs));
        assert_eq!(CollectionKind::parse("users"), Some(CollectionKind::Users));
        assert_eq!(CollectionKind::parse("nope"), None);
    }
}
