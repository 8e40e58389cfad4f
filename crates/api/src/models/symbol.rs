use crate::error::{ModelError, ModelResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Declared Java type of a symbol: a single id or a styleable id array.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    Int,
    IntArray,
}

impl ValueType {
    pub fn parse(tag: &str) -> ModelResult<Self> {
        match tag {
            "int" => Ok(ValueType::Int),
            "int[]" => Ok(ValueType::IntArray),
            other => Err(ModelError::UnsupportedValueType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::IntArray => "int[]",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(resource type, name)`, e.g. `("string", "app_name")`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub res_type: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(res_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            res_type: res_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.res_type, self.name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub value_type: ValueType,
    pub key: ResourceKey,
    /// Raw value text as it appears in the table, e.g. `0x7f020000` or `{ 0x7f010000 }`.
    pub value: String,
}

impl SymbolEntry {
    pub fn new(
        value_type: ValueType,
        res_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            value_type,
            key: ResourceKey::new(res_type, name),
            value: value.into(),
        }
    }

    pub fn res_type(&self) -> &str {
        &self.key.res_type
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Decodes an `int` value. Hex values above `i32::MAX` wrap the way the JVM stores them.
    pub fn int_value(&self) -> ModelResult<i32> {
        decode_int(&self.value)
    }

    /// Decodes an `int[]` value of the form `{ 0x1, 0x2 }`.
    pub fn array_values(&self) -> ModelResult<Vec<i32>> {
        let inner = self
            .value
            .trim()
            .strip_prefix('{')
            .and_then(|v| v.strip_suffix('}'))
            .ok_or_else(|| ModelError::MalformedValue(self.value.clone()))?;

        inner
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(decode_int)
            .collect()
    }
}

fn decode_int(raw: &str) -> ModelResult<i32> {
    let raw = raw.trim();
    let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map(|v| v as i32).ok()
    } else {
        raw.parse::<i32>().ok()
    };
    parsed.ok_or_else(|| ModelError::MalformedValue(raw.to_string()))
}

/// An ordered resource identifier table, as found in an `R.txt` file.
///
/// Each line has the form `<int|int[]> <resource type> <name> <value>`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: IndexMap<ResourceKey, SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> ModelResult<Self> {
        let mut table = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let malformed = || ModelError::MalformedLine {
                line_no: idx + 1,
                line: line.to_string(),
            };

            let mut parts = line.splitn(4, ' ');
            let (Some(tag), Some(res_type), Some(name), Some(value)) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                return Err(malformed());
            };
            if res_type.is_empty() || name.is_empty() {
                return Err(malformed());
            }

            table.insert(SymbolEntry::new(ValueType::parse(tag)?, res_type, name, value));
        }
        Ok(table)
    }

    /// Inserts or replaces the entry for its key. A replaced key keeps its original position.
    pub fn insert(&mut self, entry: SymbolEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&SymbolEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups entries by resource type, both levels sorted by name.
    pub fn by_type(&self) -> BTreeMap<&str, Vec<&SymbolEntry>> {
        let mut groups: BTreeMap<&str, Vec<&SymbolEntry>> = BTreeMap::new();
        for entry in self.entries.values() {
            groups.entry(entry.res_type()).or_default().push(entry);
        }
        for entries in groups.values_mut() {
            entries.sort_by(|a, b| a.name().cmp(b.name()));
        }
        groups
    }
}
