//! Static schema of the relational model
//!
//! Every entity kind declares its fields, which of them are required or
//! unique, and which ones reference another kind. Stores consult this
//! schema to enforce constraints; nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The tables known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Profile,
    Post,
    Category,
}

/// Value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
}

/// Declaration of a single column
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub unique: bool,
    /// Foreign key target, if the column references another kind
    pub references: Option<EntityKind>,
}

impl FieldDef {
    const fn string(name: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::String,
            required: false,
            unique: false,
            references: None,
        }
    }

    const fn foreign_key(name: &'static str, target: EntityKind) -> Self {
        Self {
            name,
            ty: FieldType::Integer,
            required: true,
            unique: false,
            references: Some(target),
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

const USER_FIELDS: &[FieldDef] = &[
    FieldDef::string("email").required().unique(),
    FieldDef::string("name"),
];

const PROFILE_FIELDS: &[FieldDef] = &[
    FieldDef::string("bio"),
    FieldDef::foreign_key("userId", EntityKind::User).unique(),
];

const POST_FIELDS: &[FieldDef] = &[
    FieldDef::string("title").required(),
    FieldDef::string("content"),
    FieldDef::foreign_key("userId", EntityKind::User),
];

const CATEGORY_FIELDS: &[FieldDef] = &[FieldDef::string("name").required().unique()];

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::User,
        EntityKind::Profile,
        EntityKind::Post,
        EntityKind::Category,
    ];

    /// Lowercase table name ("user", "post", ...)
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Profile => "profile",
            EntityKind::Post => "post",
            EntityKind::Category => "category",
        }
    }

    /// Human-facing name used in error messages ("User", "Post", ...)
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Profile => "Profile",
            EntityKind::Post => "Post",
            EntityKind::Category => "Category",
        }
    }

    /// Column declarations, excluding the implicit `id`
    pub fn fields(&self) -> &'static [FieldDef] {
        match self {
            EntityKind::User => USER_FIELDS,
            EntityKind::Profile => PROFILE_FIELDS,
            EntityKind::Post => POST_FIELDS,
            EntityKind::Category => CATEGORY_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Columns of other kinds that reference this kind
    pub fn referenced_by(&self) -> impl Iterator<Item = (EntityKind, &'static FieldDef)> + '_ {
        EntityKind::ALL.into_iter().flat_map(move |kind| {
            kind.fields()
                .iter()
                .filter(move |f| f.references == Some(*self))
                .map(move |f| (kind, f))
        })
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Many-to-many join relations
///
/// A join relation holds bare `(left, right)` id pairs. Pairs have no
/// identity of their own and are never duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinRelation {
    PostCategories,
}

impl JoinRelation {
    pub fn left(&self) -> EntityKind {
        match self {
            JoinRelation::PostCategories => EntityKind::Post,
        }
    }

    pub fn right(&self) -> EntityKind {
        match self {
            JoinRelation::PostCategories => EntityKind::Category,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JoinRelation::PostCategories => "post_categories",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_columns() {
        assert!(EntityKind::User.field("email").unwrap().unique);
        assert!(EntityKind::Profile.field("userId").unwrap().unique);
        assert!(EntityKind::Category.field("name").unwrap().unique);
        assert!(!EntityKind::Post.field("userId").unwrap().unique);
    }

    #[test]
    fn test_user_is_referenced_by_profile_and_post() {
        let refs: Vec<_> = EntityKind::User
            .referenced_by()
            .map(|(kind, f)| (kind, f.name))
            .collect();
        assert_eq!(
            refs,
            vec![(EntityKind::Profile, "userId"), (EntityKind::Post, "userId")]
        );
        assert_eq!(EntityKind::Category.referenced_by().count(), 0);
    }

    #[test]
    fn test_join_endpoints() {
        assert_eq!(JoinRelation::PostCategories.left(), EntityKind::Post);
        assert_eq!(JoinRelation::PostCategories.right(), EntityKind::Category);
    }
}
