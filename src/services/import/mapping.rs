//! Declarative header-to-field mapping.
//!
//! Each canonical field owns an ordered alias list. For a given column set
//! the aliases are tried in order and the first one present wins, so the
//! table doubles as a priority list ("Name" beats "Customer").

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    FullName,
    FirstName,
    LastName,
    Email,
    Phone,
    Goals,
    Injuries,
    Equipment,
    Notes,
    Membership,
    FitnessLevel,
    Age,
    Weight,
    Height,
}

pub struct FieldMapping {
    pub field: CanonicalField,
    pub aliases: &'static [&'static str],
}

/// Aliases are stored pre-normalized (see [`normalize_header`]).
pub const FIELD_MAPPINGS: &[FieldMapping] = &[
    FieldMapping {
        field: CanonicalField::FullName,
        aliases: &[
            "name",
            "full name",
            "fullname",
            "client name",
            "customer name",
            "client",
            "customer",
        ],
    },
    FieldMapping {
        field: CanonicalField::FirstName,
        aliases: &["first name", "firstname", "given name", "first"],
    },
    FieldMapping {
        field: CanonicalField::LastName,
        aliases: &["last name", "lastname", "surname", "family name", "last"],
    },
    FieldMapping {
        field: CanonicalField::Email,
        aliases: &["email", "e-mail", "email address", "e-mail address", "mail"],
    },
    FieldMapping {
        field: CanonicalField::Phone,
        aliases: &[
            "phone",
            "phone number",
            "mobile",
            "mobile number",
            "cell",
            "telephone",
            "tel",
        ],
    },
    FieldMapping {
        field: CanonicalField::Goals,
        aliases: &["goals", "goal", "fitness goals", "fitness goal", "objectives"],
    },
    FieldMapping {
        field: CanonicalField::Injuries,
        aliases: &[
            "injuries",
            "injury",
            "injuries/limitations",
            "limitations",
            "medical conditions",
            "health issues",
        ],
    },
    FieldMapping {
        field: CanonicalField::Equipment,
        aliases: &["equipment", "available equipment", "equipment available", "gear"],
    },
    FieldMapping {
        field: CanonicalField::Notes,
        aliases: &["notes", "note", "comments", "remarks"],
    },
    FieldMapping {
        field: CanonicalField::Membership,
        aliases: &["membership", "membership type", "plan", "package"],
    },
    FieldMapping {
        field: CanonicalField::FitnessLevel,
        aliases: &["fitness level", "level", "experience", "experience level"],
    },
    FieldMapping {
        field: CanonicalField::Age,
        aliases: &["age"],
    },
    FieldMapping {
        field: CanonicalField::Weight,
        aliases: &["weight", "weight (kg)", "weight kg", "weight (lbs)"],
    },
    FieldMapping {
        field: CanonicalField::Height,
        aliases: &["height", "height (cm)", "height cm", "height (in)"],
    },
];

/// Lowercases, turns underscores into spaces and collapses whitespace.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolved column positions for one header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    columns: HashMap<CanonicalField, usize>,
}

impl HeaderMap {
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        Self::resolve_with(headers, FIELD_MAPPINGS)
    }

    /// Resolves against an explicit mapping table. Each column backs at most
    /// one field; a field takes the first untaken column matching its
    /// earliest alias.
    pub fn resolve_with<S: AsRef<str>>(headers: &[S], mappings: &[FieldMapping]) -> Self {
        let normalized: Vec<String> = headers
            .iter()
            .map(|h| normalize_header(h.as_ref()))
            .collect();

        let mut columns: HashMap<CanonicalField, usize> = HashMap::new();
        for mapping in mappings {
            let position = mapping.aliases.iter().find_map(|alias| {
                normalized
                    .iter()
                    .enumerate()
                    .find(|(idx, header)| {
                        *header == alias && !columns.values().any(|taken| taken == idx)
                    })
                    .map(|(idx, _)| idx)
            });
            if let Some(idx) = position {
                columns.insert(mapping.field, idx);
            }
        }

        Self { columns }
    }

    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// True when a client name can be built from this header.
    pub fn has_name(&self) -> bool {
        self.columns.contains_key(&CanonicalField::FullName)
            || self.columns.contains_key(&CanonicalField::FirstName)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Cell for `field` in `row`, if mapped and present.
    pub fn value<'a, S: AsRef<str>>(&self, field: CanonicalField, row: &'a [S]) -> Option<&'a str> {
        self.column(field)
            .and_then(|idx| row.get(idx))
            .map(|cell| cell.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Full_Name "), "full name");
        assert_eq!(normalize_header("\u{feff}Client   Name"), "client name");
        assert_eq!(normalize_header("E-Mail"), "e-mail");
    }

    #[test]
    fn test_synonyms_map_to_full_name() {
        for header in ["Name", "Full Name", "Client Name", "Customer", "FULL_NAME"] {
            let map = HeaderMap::resolve(&[header, "Email"]);
            assert_eq!(map.column(CanonicalField::FullName), Some(0), "{}", header);
            assert_eq!(map.column(CanonicalField::Email), Some(1));
        }
    }

    #[test]
    fn test_first_alias_wins() {
        let map = HeaderMap::resolve(&["Customer", "Notes", "Name"]);
        assert_eq!(map.column(CanonicalField::FullName), Some(2));
    }

    #[test]
    fn test_duplicate_headers_take_first() {
        let map = HeaderMap::resolve(&["Name", "Goals", "Name"]);
        assert_eq!(map.column(CanonicalField::FullName), Some(0));
        assert_eq!(map.column(CanonicalField::Goals), Some(1));
    }

    #[test]
    fn test_shared_alias_moves_to_next_free_column() {
        const TABLE: &[FieldMapping] = &[
            FieldMapping {
                field: CanonicalField::Goals,
                aliases: &["target"],
            },
            FieldMapping {
                field: CanonicalField::Notes,
                aliases: &["target", "notes"],
            },
        ];

        let map = HeaderMap::resolve_with(&["Target", "Age", "Target"], TABLE);
        assert_eq!(map.column(CanonicalField::Goals), Some(0));
        assert_eq!(map.column(CanonicalField::Notes), Some(2));

        let map = HeaderMap::resolve_with(&["Target", "Notes"], TABLE);
        assert_eq!(map.column(CanonicalField::Notes), Some(1));
    }

    #[test]
    fn test_first_and_last_name_count_as_name() {
        let map = HeaderMap::resolve(&["First Name", "Last Name", "Phone"]);
        assert!(map.has_name());
        assert_eq!(map.column(CanonicalField::FullName), None);
        assert_eq!(map.column(CanonicalField::LastName), Some(1));
    }

    #[test]
    fn test_unknown_headers() {
        let map = HeaderMap::resolve(&["Foo", "Bar"]);
        assert!(map.is_empty());
        assert!(!map.has_name());
    }

    #[test]
    fn test_value_lookup() {
        let map = HeaderMap::resolve(&["Name", "Email", "Goals"]);
        let row = vec!["Ann".to_string(), "ann@example.com".to_string()];
        assert_eq!(map.value(CanonicalField::FullName, row.as_slice()), Some("Ann"));
        assert_eq!(map.value(CanonicalField::Goals, row.as_slice()), None);
    }
}
