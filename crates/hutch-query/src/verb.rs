/// The nine query verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Find,
    FindAll,
    Insert,
    Update,
    UpdateAll,
    Delete,
    DeleteAll,
    Create,
    CreateIfNotExists,
}

impl Verb {
    pub fn from_str(s: &str) -> Option<Verb> {
        Some(match s {
            "find" => Verb::Find,
            "find_all" => Verb::FindAll,
            "insert" => Verb::Insert,
            "update" => Verb::Update,
            "update_all" => Verb::UpdateAll,
            "delete" => Verb::Delete,
            "delete_all" => Verb::DeleteAll,
            "create" => Verb::Create,
            "create_if_not_exists" => Verb::CreateIfNotExists,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Find => "find",
            Verb::FindAll => "find_all",
            Verb::Insert => "insert",
            Verb::Update => "update",
            Verb::UpdateAll => "update_all",
            Verb::Delete => "delete",
            Verb::DeleteAll => "delete_all",
            Verb::Create => "create",
            Verb::CreateIfNotExists => "create_if_not_exists",
        }
    }

    /// Verbs that mutate collection contents or the collection set.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Verb::Find | Verb::FindAll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_mapping_roundtrips() {
        for verb in [
            Verb::Find,
            Verb::FindAll,
            Verb::Insert,
            Verb::Update,
            Verb::UpdateAll,
            Verb::Delete,
            Verb::DeleteAll,
            Verb::Create,
            Verb::CreateIfNotExists,
        ] {
            assert_eq!(Verb::from_str(verb.as_str()), Some(verb));
        }
    }

    #[test]
    fn unknown_verb_is_none() {
        assert_eq!(Verb::from_str("drop"), None);
    }
}
