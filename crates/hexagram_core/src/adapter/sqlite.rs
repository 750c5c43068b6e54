//! SQLite-backed adapter.
//!
//! # Responsibility
//! - Translate the six adapter operations into SQL over a caller-owned
//!   connection.
//! - Keep SQL text and value encoding inside the persistence boundary.
//!
//! # Invariants
//! - Every table must already exist with an `id INTEGER PRIMARY KEY` column
//!   and one column per declared field; this adapter never creates schema.
//! - Identifiers are quoted and values are always bound parameters.
//! - Booleans are stored as `0`/`1`.
//! - Read paths reject malformed stored values instead of masking them.

use super::{normalized_filter, writable_fields, Adapter, AdapterError, AdapterResult};
use crate::model::descriptor::{Descriptor, FieldKind, ID_FIELD};
use crate::model::entity::Entity;
use crate::model::filter::Filter;
use crate::model::record::{PersistenceRecord, RecordId};
use crate::model::value::{Attributes, FieldValue};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// Adapter over a borrowed SQLite connection.
pub struct SqliteAdapter<'conn> {
    conn: &'conn Connection,
    /// Column names per table, loaded on first use.
    table_columns: RefCell<BTreeMap<String, BTreeSet<String>>>,
}

impl<'conn> SqliteAdapter<'conn> {
    /// Wraps a connection after checking that it answers queries.
    pub fn try_new(conn: &'conn Connection) -> AdapterResult<Self> {
        conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))?;
        Ok(Self {
            conn,
            table_columns: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Checks that `descriptor`'s table and columns exist.
    ///
    /// Column sets are cached per table for the adapter's lifetime; every
    /// descriptor is still checked against the cached set.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when the table is absent.
    /// - `MissingRequiredColumn` for the first absent `id` or field column.
    pub fn ensure_ready(&self, descriptor: &Descriptor) -> AdapterResult<()> {
        let mut cache = self.table_columns.borrow_mut();
        let columns = match cache.entry(descriptor.table().to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.load_columns(descriptor.table())?),
        };

        let required = std::iter::once(ID_FIELD)
            .chain(descriptor.fields().iter().map(|field| field.name.as_str()));
        for column in required {
            if !columns.contains(column) {
                return Err(AdapterError::MissingRequiredColumn {
                    table: descriptor.table().to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    fn load_columns(&self, table: &str) -> AdapterResult<BTreeSet<String>> {
        let table_exists: bool = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if !table_exists {
            return Err(AdapterError::MissingRequiredTable(table.to_string()));
        }

        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({});", quote_identifier(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>("name"))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(columns)
    }

    fn query_records(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
        descriptor: &Descriptor,
    ) -> AdapterResult<Vec<PersistenceRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row, descriptor)?);
        }

        Ok(records)
    }

    fn record_exists(&self, id: RecordId, descriptor: &Descriptor) -> AdapterResult<bool> {
        let exists = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                quote_identifier(descriptor.table()),
                quote_identifier(ID_FIELD)
            ),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn update_record(
        &self,
        id: RecordId,
        fields: &Attributes,
        descriptor: &Descriptor,
    ) -> AdapterResult<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let assignments = fields
            .keys()
            .map(|name| format!("{} = ?", quote_identifier(name)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut bind_values = fields.values().map(to_sql_value).collect::<Vec<_>>();
        bind_values.push(Value::Integer(id));

        self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE {} = ?;",
                quote_identifier(descriptor.table()),
                assignments,
                quote_identifier(ID_FIELD)
            ),
            params_from_iter(bind_values),
        )?;
        Ok(())
    }

    fn insert_record(
        &self,
        id: Option<RecordId>,
        fields: &Attributes,
        descriptor: &Descriptor,
    ) -> AdapterResult<RecordId> {
        let table = quote_identifier(descriptor.table());
        let mut columns = Vec::new();
        let mut bind_values = Vec::new();

        if let Some(id) = id {
            columns.push(quote_identifier(ID_FIELD));
            bind_values.push(Value::Integer(id));
        }
        for (name, value) in fields {
            columns.push(quote_identifier(name));
            bind_values.push(to_sql_value(value));
        }

        if columns.is_empty() {
            self.conn
                .execute(&format!("INSERT INTO {table} DEFAULT VALUES;"), params![])?;
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            self.conn.execute(
                &format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders});",
                    columns.join(", ")
                ),
                params_from_iter(bind_values),
            )?;
        }

        Ok(id.unwrap_or_else(|| self.conn.last_insert_rowid()))
    }
}

impl Adapter for SqliteAdapter<'_> {
    fn find(&self, id: RecordId, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        self.ensure_ready(descriptor)?;

        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE {} = ?1;",
            select_sql(descriptor),
            quote_identifier(ID_FIELD)
        ))?;
        let record = stmt
            .query_row([id], |row| Ok(parse_record_row(row, descriptor)))
            .optional()?;

        match record {
            Some(record) => record,
            None => Err(AdapterError::NotFound {
                descriptor: descriptor.simple_name().to_string(),
                id,
            }),
        }
    }

    fn each(&self, descriptor: &Descriptor) -> AdapterResult<Vec<PersistenceRecord>> {
        self.ensure_ready(descriptor)?;

        let sql = format!(
            "{} ORDER BY {} ASC;",
            select_sql(descriptor),
            quote_identifier(ID_FIELD)
        );
        self.query_records(&sql, Vec::new(), descriptor)
    }

    fn build(&self, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        self.ensure_ready(descriptor)?;
        Ok(PersistenceRecord::empty(descriptor))
    }

    fn exists(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<bool> {
        self.ensure_ready(descriptor)?;
        match entity.id() {
            Some(id) => self.record_exists(id, descriptor),
            None => Ok(false),
        }
    }

    fn find_where(
        &self,
        filter: &Filter,
        descriptor: &Descriptor,
    ) -> AdapterResult<Vec<PersistenceRecord>> {
        let filter = normalized_filter(filter, descriptor)?;
        self.ensure_ready(descriptor)?;

        let mut sql = format!("{} WHERE 1 = 1", select_sql(descriptor));
        let mut bind_values = Vec::new();
        for (name, value) in &filter {
            if value.is_null() {
                sql.push_str(&format!(" AND {} IS NULL", quote_identifier(name)));
            } else {
                sql.push_str(&format!(" AND {} = ?", quote_identifier(name)));
                bind_values.push(to_sql_value(value));
            }
        }
        sql.push_str(&format!(" ORDER BY {} ASC;", quote_identifier(ID_FIELD)));

        let records = self.query_records(&sql, bind_values, descriptor)?;
        debug!(
            "event=adapter_where module=adapter backend=sqlite table={} filter_keys={} hits={}",
            descriptor.table(),
            filter.len(),
            records.len()
        );
        Ok(records)
    }

    fn save(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<RecordId> {
        let fields = writable_fields(entity.attributes(), descriptor)?;
        self.ensure_ready(descriptor)?;

        let id = match entity.id() {
            Some(id) if self.record_exists(id, descriptor)? => {
                self.update_record(id, &fields, descriptor)?;
                id
            }
            id => self.insert_record(id, &fields, descriptor)?,
        };

        debug!(
            "event=adapter_save module=adapter backend=sqlite table={} id={}",
            descriptor.table(),
            id
        );
        Ok(id)
    }
}

fn select_sql(descriptor: &Descriptor) -> String {
    let columns = std::iter::once(quote_identifier(ID_FIELD))
        .chain(
            descriptor
                .fields()
                .iter()
                .map(|field| quote_identifier(&field.name)),
        )
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {columns} FROM {}",
        quote_identifier(descriptor.table())
    )
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn parse_record_row(row: &Row<'_>, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
    let id = match row.get::<_, Value>(ID_FIELD)? {
        Value::Integer(id) => id,
        other => {
            return Err(AdapterError::InvalidData(format!(
                "invalid id value `{other:?}` in {}.id",
                descriptor.table()
            )));
        }
    };

    let mut fields = Attributes::new();
    for field in descriptor.fields() {
        let raw = row.get::<_, Value>(field.name.as_str())?;
        let value = from_sql_value(raw, field.kind).ok_or_else(|| {
            AdapterError::InvalidData(format!(
                "invalid {:?} value in {}.{} for record {id}",
                field.kind,
                descriptor.table(),
                field.name
            ))
        })?;
        fields.insert(field.name.clone(), value);
    }

    Ok(PersistenceRecord::new(Some(id), fields))
}

fn from_sql_value(value: Value, kind: FieldKind) -> Option<FieldValue> {
    match (kind, value) {
        (_, Value::Null) => Some(FieldValue::Null),
        (FieldKind::Integer, Value::Integer(value)) => Some(FieldValue::Integer(value)),
        (FieldKind::Real, Value::Real(value)) => Some(FieldValue::Real(value)),
        (FieldKind::Real, Value::Integer(value)) => Some(FieldValue::Real(value as f64)),
        (FieldKind::Text, Value::Text(value)) => Some(FieldValue::Text(value)),
        (FieldKind::Boolean, Value::Integer(0)) => Some(FieldValue::Bool(false)),
        (FieldKind::Boolean, Value::Integer(1)) => Some(FieldValue::Bool(true)),
        _ => None,
    }
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(value) => Value::Integer(i64::from(*value)),
        FieldValue::Integer(value) => Value::Integer(*value),
        FieldValue::Real(value) => Value::Real(*value),
        FieldValue::Text(value) => Value::Text(value.clone()),
    }
}
