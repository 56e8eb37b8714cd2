//! DDL prompt block synthesized from remote table metadata.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub column_name: String,
    pub data_type: String,
    #[serde(default)]
    pub column_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Tables in the order the metadata service returned them.
    #[serde(
        serialize_with = "ordered_tables::serialize",
        deserialize_with = "ordered_tables::deserialize"
    )]
    pub table_metadata: Vec<(String, Vec<ColumnMeta>)>,
    #[serde(default)]
    pub glossary: Option<String>,
}

mod ordered_tables {
    use super::*;

    pub fn serialize<S: Serializer>(
        tables: &[(String, Vec<ColumnMeta>)],
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        ser.collect_map(tables.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Vec<(String, Vec<ColumnMeta>)>, D::Error> {
        struct InOrder;

        impl<'de> Visitor<'de> for InOrder {
            type Value = Vec<(String, Vec<ColumnMeta>)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of table name to column list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    out.push(entry);
                }
                Ok(out)
            }
        }

        de.deserialize_map(InOrder)
    }
}

pub fn render_table(name: &str, columns: &[ColumnMeta]) -> String {
    let mut out = format!("CREATE TABLE {name} (\n");
    for col in columns {
        out.push_str(&format!("  {} {},", col.column_name, col.data_type));
        if let Some(desc) = col.column_description.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(&format!(" --{desc}"));
        }
        out.push('\n');
    }
    out.push_str(");");
    out
}

pub fn render_ddl(meta: &TableMetadata) -> String {
    let mut blocks: Vec<String> = meta
        .table_metadata
        .iter()
        .map(|(name, cols)| render_table(name, cols))
        .collect();
    if let Some(glossary) = meta.glossary.as_deref().filter(|g| !g.trim().is_empty()) {
        blocks.push(glossary.trim_end().to_string());
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_tables_in_response_order_with_glossary() {
        let meta: TableMetadata = serde_json::from_str(
            r#"{
                "table_metadata": {
                    "users": [
                        {"column_name": "id", "data_type": "bigint", "column_description": "primary key"},
                        {"column_name": "email", "data_type": "text"}
                    ],
                    "orders": [{"column_name": "user_id", "data_type": "bigint"}]
                },
                "glossary": "active user: logged in within 30 days"
            }"#,
        )
        .unwrap();

        assert_eq!(
            render_ddl(&meta),
            "CREATE TABLE users (\n  id bigint, --primary key\n  email text,\n);\n\n\
             CREATE TABLE orders (\n  user_id bigint,\n);\n\n\
             active user: logged in within 30 days"
        );
    }

    #[test]
    fn empty_metadata_renders_nothing() {
        assert_eq!(render_ddl(&TableMetadata::default()), "");
    }
}
