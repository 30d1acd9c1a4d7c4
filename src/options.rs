// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use core::str::FromStr;

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised while loading [`CompilerOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("invalid value '{value}' for option '{option}'; expected one of: {expected}")]
    InvalidValue {
        option: &'static str,
        value: String,
        expected: String,
    },
    #[error("failed to parse compiler options: {0}")]
    Parse(String),
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $option:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = OptionsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(OptionsError::InvalidValue {
                        option: $option,
                        value: s.to_string(),
                        expected: [$($text),+].join(", "),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = OptionsError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(v: $name) -> Self {
                v.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Java type used for Avro strings in generated code.
    StringType, "string_type", {
        CharSequence => "CharSequence",
        String => "String",
        Utf8 => "Utf8",
    }
);

string_enum!(
    /// Visibility of generated record fields.
    FieldVisibility, "field_visibility", {
        Public => "PUBLIC",
        Private => "PRIVATE",
        PublicDeprecated => "PUBLIC_DEPRECATED",
    }
);

string_enum!(
    /// Date/time library backing the date and timestamp logical types.
    DateTimeLogicalType, "date_time_logical_type", {
        Joda => "JODA",
        Jsr310 => "JSR310",
    }
);

/// Settings for schema compilation.
///
/// These are for the code generators that consume the resolved types. Parsing and
/// resolution never read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerOptions {
    pub output_character_encoding: Option<String>,
    pub string_type: StringType,
    pub field_visibility: FieldVisibility,
    pub template_directory: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub create_setters: bool,
    #[serde(deserialize_with = "flag")]
    pub create_optional_getters: bool,
    #[serde(deserialize_with = "flag")]
    pub getters_return_optional: bool,
    #[serde(deserialize_with = "flag")]
    pub enable_decimal_logical_type: bool,
    pub date_time_logical_type: DateTimeLogicalType,
    /// Logical type name to factory class.
    pub logical_type_factories: IndexMap<String, String>,
    pub custom_conversions: Vec<String>,
}

/// Parse a boolean option given as text. Case is ignored.
fn parse_flag(option: &'static str, value: &str) -> Result<bool, OptionsError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(OptionsError::InvalidValue {
            option,
            value: value.to_string(),
            expected: "true, false".to_string(),
        })
    }
}

// Boolean options are accepted as booleans or as the strings "true" and "false".
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => parse_flag("boolean option", &text).map_err(de::Error::custom),
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            output_character_encoding: None,
            string_type: StringType::String,
            field_visibility: FieldVisibility::PublicDeprecated,
            template_directory: None,
            create_setters: true,
            create_optional_getters: false,
            getters_return_optional: false,
            enable_decimal_logical_type: true,
            date_time_logical_type: DateTimeLogicalType::Jsr310,
            logical_type_factories: IndexMap::new(),
            custom_conversions: vec![],
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        serde_json::from_str(json).map_err(|e| OptionsError::Parse(e.to_string()))
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self, OptionsError> {
        serde_yaml::from_str(yaml).map_err(|e| OptionsError::Parse(e.to_string()))
    }

    /// Register a factory for a custom logical type. A later registration for the same
    /// name replaces the factory but keeps its first position.
    pub fn logical_type_factory(
        &mut self,
        type_name: impl Into<String>,
        factory: impl Into<String>,
    ) -> &mut Self {
        self.logical_type_factories
            .insert(type_name.into(), factory.into());
        self
    }

    pub fn custom_conversion(&mut self, conversion: impl Into<String>) -> &mut Self {
        self.custom_conversions.push(conversion.into());
        self
    }

    pub fn is_custom_logical_type(&self, name: &str) -> bool {
        self.logical_type_factories.contains_key(name)
    }
}
