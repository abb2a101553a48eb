use serde::{Deserialize, Serialize};

use crate::types::data_type::DataType;

/// Column definition as declared in CREATE TABLE. A primary-key column is
/// implicitly unique and not-null; the flags here record what was declared
/// beyond that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub primary_key: bool,
    pub not_null: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: false,
            not_null: false,
            auto_increment: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Whether a value for this column must be present on insert.
    pub fn is_required(&self) -> bool {
        self.primary_key || self.not_null
    }

    /// Whether values in this column must be distinct.
    pub fn is_unique(&self) -> bool {
        self.primary_key || self.unique
    }

    /// Renders the column back to its DDL form, used by the backup writer.
    pub fn to_ddl(&self) -> String {
        let mut ddl = format!("{} {}", self.name, self.data_type);
        if self.auto_increment {
            ddl.push_str(" AUTO_INCREMENT");
        }
        if self.primary_key {
            ddl.push_str(" PRIMARY KEY");
        }
        if self.unique && !self.primary_key {
            ddl.push_str(" UNIQUE");
        }
        if self.not_null && !self.primary_key {
            ddl.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            ddl.push_str(&format!(" DEFAULT '{}'", default));
        }
        ddl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_implies_required_and_unique() {
        let column = ColumnDefinition::new("id", DataType::Integer).primary_key();
        assert!(column.is_required());
        assert!(column.is_unique());
    }

    #[test]
    fn test_ddl_rendering() {
        let column = ColumnDefinition::new("email", DataType::Varchar)
            .unique()
            .not_null();
        assert_eq!(column.to_ddl(), "email VARCHAR UNIQUE NOT NULL");

        let column = ColumnDefinition::new("status", DataType::Varchar).default_value("active");
        assert_eq!(column.to_ddl(), "status VARCHAR DEFAULT 'active'");
    }
}
