use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::CouchDaoError;

pub const END_SUFFIX: &str = "\u{ffff}";
const ID_FIELD: &str = "_id";
const REV_FIELD: &str = "_rev";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Revision marker returned when only the document metadata is needed.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Prefix shared by every document of a collection (`matches::`).
pub fn collection_prefix(collection: &str) -> String {
    format!("{collection}::")
}

pub fn doc_id(collection: &str, id: Uuid) -> String {
    format!("{}{}", collection_prefix(collection), id)
}

/// Wrap an entity body into a CouchDB document carrying `_id` and optionally `_rev`.
pub fn into_document(
    doc_id: &str,
    rev: Option<String>,
    body: Value,
) -> Result<Map<String, Value>, CouchDaoError> {
    let Value::Object(mut fields) = body else {
        return Err(CouchDaoError::MalformedDocument {
            doc_id: doc_id.to_string(),
        });
    };
    fields.insert(ID_FIELD.into(), Value::String(doc_id.to_string()));
    if let Some(rev) = rev {
        fields.insert(REV_FIELD.into(), Value::String(rev));
    }
    Ok(fields)
}

/// Strip CouchDB metadata so only the entity body remains.
pub fn into_body(document: Value) -> Value {
    match document {
        Value::Object(mut fields) => {
            fields.remove(ID_FIELD);
            fields.remove(REV_FIELD);
            Value::Object(fields)
        }
        other => other,
    }
}
