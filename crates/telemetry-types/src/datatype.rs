//! Translation of warehouse-native column types into portable descriptors.

use serde::{Deserialize, Serialize};

use crate::catalog::Column;
use crate::manifest::MetadataEntry;

/// Portable base type understood by the downstream platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BaseType {
    String,
    Integer,
    Numeric,
    Float,
    Boolean,
    Date,
    Timestamp,
}

impl BaseType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Integer => "INTEGER",
            Self::Numeric => "NUMERIC",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}

/// Result of translating one column's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatatypeDescriptor {
    /// The native type maps onto a known base type.
    Native {
        native_type: String,
        base_type: BaseType,
        length: Option<String>,
        nullable: bool,
    },
    /// No mapping exists; only the raw type and nullability are carried.
    Generic { native_type: String, nullable: bool },
}

fn base_type_of(native: &str) -> Option<BaseType> {
    let base = match native {
        "NUMBER" | "DECIMAL" | "NUMERIC" => BaseType::Numeric,
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "BYTEINT" => BaseType::Integer,
        "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" => BaseType::Float,
        "TEXT" | "VARCHAR" | "CHAR" | "CHARACTER" | "STRING" | "MEDIUMTEXT" | "LONGTEXT"
        | "BINARY" | "VARBINARY" | "TIME" => BaseType::String,
        "BOOLEAN" => BaseType::Boolean,
        "DATE" => BaseType::Date,
        "DATETIME" | "TIMESTAMP" | "TIMESTAMP_LTZ" | "TIMESTAMP_NTZ" | "TIMESTAMP_TZ" => {
            BaseType::Timestamp
        }
        _ => return None,
    };
    Some(base)
}

fn length_of(column: &Column, base: BaseType) -> Option<String> {
    let length = column.length()?;
    match base {
        BaseType::Numeric if length.numeric_precision > 0 => Some(format!(
            "{},{}",
            length.numeric_precision, length.numeric_scale
        )),
        BaseType::String if length.character_maximum > 0 => {
            Some(length.character_maximum.to_string())
        }
        _ => None,
    }
}

/// Translate a column's native type. Never fails: unmapped types fall back
/// to [`DatatypeDescriptor::Generic`].
#[must_use]
pub fn translate(column: &Column) -> DatatypeDescriptor {
    let native_type = column.data_type.trim().to_ascii_uppercase();
    match base_type_of(&native_type) {
        Some(base_type) => DatatypeDescriptor::Native {
            length: length_of(column, base_type),
            native_type,
            base_type,
            nullable: column.is_nullable,
        },
        None => DatatypeDescriptor::Generic {
            native_type: column.data_type.clone(),
            nullable: column.is_nullable,
        },
    }
}

impl DatatypeDescriptor {
    #[must_use]
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Generic { .. })
    }

    /// Column metadata entries in manifest form.
    #[must_use]
    pub fn to_metadata(&self) -> Vec<MetadataEntry> {
        match self {
            Self::Native {
                native_type,
                base_type,
                length,
                nullable,
            } => {
                let mut entries = vec![
                    MetadataEntry::new("KBC.datatype.type", native_type.as_str()),
                    MetadataEntry::new("KBC.datatype.nullable", nullable.to_string()),
                    MetadataEntry::new("KBC.datatype.basetype", base_type.as_str()),
                ];
                if let Some(length) = length {
                    entries.push(MetadataEntry::new("KBC.datatype.length", length.as_str()));
                }
                entries
            }
            Self::Generic {
                native_type,
                nullable,
            } => vec![
                MetadataEntry::new("KBC.datatype.type", native_type.as_str()),
                MetadataEntry::new("KBC.datatype.nullable", nullable.to_string()),
                MetadataEntry::new("KBC.datatype.basetype", BaseType::String.as_str()),
            ],
        }
    }
}
