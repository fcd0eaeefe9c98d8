use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    ast::FieldPath,
    convert::{json_to_value, value_to_json},
    value::Value,
};

/// Key the store assigns to every inserted record; exported as `_id`.
pub const ID_KEY: &str = "_id";

/// Store-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One atomistic structure's properties: a map from attribute name to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub id: Option<RecordId>,
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// All values a dotted path addresses.
    ///
    /// Objects are entered by key. On an array a numeric segment indexes it,
    /// any other segment fans out over the array's object elements, which
    /// is how `info.config_type` reaches into a list of sub-documents.
    pub fn resolve(&self, path: &FieldPath) -> Vec<&Value> {
        resolve_in(&self.fields, path)
    }

    /// Sets the value at a dotted path, creating intermediate objects. Returns
    /// `false` when an intermediate value is not an object.
    pub fn set_path(&mut self, path: &FieldPath, value: Value) -> bool {
        let Some((last, parents)) = path.segments().split_last() else {
            return false;
        };
        let mut map = &mut self.fields;
        for segment in parents {
            let slot = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(BTreeMap::new()));
            match slot {
                Value::Object(inner) => map = inner,
                _ => return false,
            }
        }
        map.insert(last.clone(), value);
        true
    }

    /// Removes the value at a dotted path.
    pub fn remove_path(&mut self, path: &FieldPath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut map = &mut self.fields;
        for segment in parents {
            match map.get_mut(segment) {
                Some(Value::Object(inner)) => map = inner,
                _ => return None,
            }
        }
        map.remove(last)
    }

    /// Builds a record from a JSON object; a top-level `_id` is dropped since
    /// identifiers are assigned by the store.
    pub fn from_json(json: serde_json::Value) -> Option<Record> {
        match json_to_value(json) {
            Value::Object(mut fields) => {
                fields.remove(ID_KEY);
                Some(Record { id: None, fields })
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut object: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v.clone())))
            .collect();
        if let Some(id) = self.id {
            object.insert(ID_KEY.to_string(), serde_json::Value::from(id.0));
        }
        serde_json::Value::Object(object)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Record {
            id: None,
            fields: iter.into_iter().collect(),
        }
    }
}

/// [`Record::resolve`] over any string-keyed map, such as a nested object.
pub fn resolve_in<'a>(fields: &'a BTreeMap<String, Value>, path: &FieldPath) -> Vec<&'a Value> {
    let mut out = vec![];
    if let Some((root, rest)) = path.segments().split_first()
        && let Some(value) = fields.get(root)
    {
        resolve_into(value, rest, &mut out);
    }
    out
}

fn resolve_into<'a>(value: &'a Value, segments: &[String], out: &mut Vec<&'a Value>) {
    let Some((segment, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(inner) = map.get(segment) {
                resolve_into(inner, rest, out);
            }
        }
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => {
                if let Some(item) = items.get(index) {
                    resolve_into(item, rest, out);
                }
            }
            Err(_) => {
                for item in items.iter().filter(|item| matches!(item, Value::Object(_))) {
                    resolve_into(item, segments, out);
                }
            }
        },
        _ => {}
    }
}
