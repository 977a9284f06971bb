use std::fmt;

use rolemap_core::model::{PermissionId, RoleId, UserId};

/// What kind of object a permission guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionObjectType {
    Table,
    Process,
    App,
    Widget,
    Special,
}

impl PermissionObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Process => "Process",
            Self::App => "App",
            Self::Widget => "Widget",
            Self::Special => "Special",
        }
    }
}

impl fmt::Display for PermissionObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub description: Option<String>,
    pub object_type: Option<PermissionObjectType>,
    pub object_label: Option<String>,
}

/// A permission to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    pub name: String,
    pub description: Option<String>,
    pub object_type: Option<PermissionObjectType>,
    pub object_label: Option<String>,
}

impl NewPermission {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            object_type: None,
            object_label: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_object_type(mut self, object_type: PermissionObjectType) -> Self {
        self.object_type = Some(object_type);
        self
    }

    pub fn with_object_label(mut self, object_label: impl Into<String>) -> Self {
        self.object_label = Some(object_label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_displays_its_label() {
        assert_eq!(PermissionObjectType::Table.to_string(), "Table");
        assert_eq!(PermissionObjectType::Special.to_string(), "Special");
    }

    #[test]
    fn new_permission_builder_fills_optional_fields() {
        let draft = NewPermission::named("order.read")
            .with_description("read access to orders")
            .with_object_type(PermissionObjectType::Table)
            .with_object_label("Order");

        assert_eq!(draft.name, "order.read");
        assert_eq!(draft.description.as_deref(), Some("read access to orders"));
        assert_eq!(draft.object_type, Some(PermissionObjectType::Table));
        assert_eq!(draft.object_label.as_deref(), Some("Order"));
    }
}
