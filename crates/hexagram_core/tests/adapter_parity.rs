mod support;

use hexagram_core::db::open_db_in_memory;
use hexagram_core::{
    Adapter, AdapterError, AdapterResult, Attributes, Descriptor, Entity, FieldKind, FieldValue,
    Filter, MappingError, MemoryAdapter, PersistenceRecord, RecordId, Repository, SqliteAdapter,
    ValidationContext, Violation,
};
use support::{campus_descriptor, Campus, CAMPUS_TABLE_SQL};

fn exercise_upsert_and_queries<A: Adapter>(adapter: &A) {
    let descriptor = campus_descriptor();

    let empty = adapter.build(&descriptor).unwrap();
    assert_eq!(empty, PersistenceRecord::empty(&descriptor));
    assert!(adapter.each(&descriptor).unwrap().is_empty());

    let mut tc = Campus::named("Twin Cities", "UMNTC");
    tc.active = Some(true);
    tc.id = Some(adapter.save(&tc, &descriptor).unwrap());
    let morris = Campus::named("Morris", "UMM");
    let morris_id = adapter.save(&morris, &descriptor).unwrap();
    assert_eq!(tc.id, Some(1));
    assert_eq!(morris_id, 2);

    tc.value = Some(4.0);
    assert_eq!(adapter.save(&tc, &descriptor).unwrap(), 1);
    assert!(adapter.exists(&tc, &descriptor).unwrap());

    let records = adapter.each(&descriptor).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("value"), Some(FieldValue::Real(4.0)));
    assert_eq!(records[1].get("active"), Some(FieldValue::Null));

    let hits = adapter
        .find_where(&Filter::single("abbreviation", "UMM"), &descriptor)
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, Some(2));

    let unset = adapter
        .find_where(&Filter::single("active", FieldValue::Null), &descriptor)
        .unwrap();
    assert_eq!(unset.len(), 1);
    assert_eq!(unset[0].get("name"), Some(FieldValue::from("Morris")));

    // Integer filter values widen into the real column.
    let widened = adapter
        .find_where(&Filter::single("value", 4), &descriptor)
        .unwrap();
    assert_eq!(widened.len(), 1);

    assert!(matches!(
        adapter.find(3, &descriptor),
        Err(AdapterError::NotFound { id: 3, .. })
    ));
    assert!(matches!(
        adapter.find_where(&Filter::single("missing", 1), &descriptor),
        Err(AdapterError::UnknownField { .. })
    ));
    assert!(matches!(
        adapter.find_where(&Filter::single("value", "high"), &descriptor),
        Err(AdapterError::InvalidData(_))
    ));
}

/// Reports only `value`, leaving every other campus column unreported.
struct CampusReading {
    id: Option<RecordId>,
    value: Option<f64>,
}

impl Entity for CampusReading {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("id".to_string(), self.id.into());
        attributes.insert("value".to_string(), self.value.into());
        attributes
    }

    fn assign(&mut self, name: &str, _value: FieldValue) -> Result<(), MappingError> {
        Err(MappingError::UnknownAttribute {
            entity: "CampusReading".to_string(),
            field: name.to_string(),
        })
    }

    fn validate(&self, _ctx: &dyn ValidationContext) -> AdapterResult<Vec<Violation>> {
        Ok(Vec::new())
    }
}

fn exercise_partial_attributes<A: Adapter>(adapter: &A) {
    let descriptor = campus_descriptor();

    let mut tc = Campus::named("Twin Cities", "UMNTC");
    tc.value = Some(1.0);
    tc.active = Some(true);
    let id = adapter.save(&tc, &descriptor).unwrap();

    let reading = CampusReading {
        id: Some(id),
        value: Some(2.5),
    };
    assert_eq!(adapter.save(&reading, &descriptor).unwrap(), id);
    let updated = adapter.find(id, &descriptor).unwrap();
    assert_eq!(updated.get("value"), Some(FieldValue::Real(2.5)));
    assert_eq!(updated.get("name"), Some(FieldValue::from("Twin Cities")));
    assert_eq!(updated.get("abbreviation"), Some(FieldValue::from("UMNTC")));
    assert_eq!(updated.get("active"), Some(FieldValue::Bool(true)));

    // A reported `Null` clears only that column.
    let cleared = CampusReading {
        id: Some(id),
        value: None,
    };
    adapter.save(&cleared, &descriptor).unwrap();
    let updated = adapter.find(id, &descriptor).unwrap();
    assert_eq!(updated.get("value"), Some(FieldValue::Null));
    assert_eq!(updated.get("name"), Some(FieldValue::from("Twin Cities")));

    let fresh = CampusReading {
        id: None,
        value: Some(7.0),
    };
    let fresh_id = adapter.save(&fresh, &descriptor).unwrap();
    assert_ne!(fresh_id, id);
    let inserted = adapter.find(fresh_id, &descriptor).unwrap();
    assert_eq!(inserted.get("value"), Some(FieldValue::Real(7.0)));
    assert_eq!(inserted.get("name"), Some(FieldValue::Null));
    assert_eq!(inserted.get("abbreviation"), Some(FieldValue::Null));
    assert_eq!(inserted.get("active"), Some(FieldValue::Null));
}

#[test]
fn memory_adapter_satisfies_contract() {
    let adapter = MemoryAdapter::new();
    exercise_upsert_and_queries(&adapter);
    assert_eq!(adapter.len(&campus_descriptor()), 2);
}

#[test]
fn sqlite_adapter_satisfies_contract() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(CAMPUS_TABLE_SQL).unwrap();
    let adapter = SqliteAdapter::try_new(&conn).unwrap();
    exercise_upsert_and_queries(&adapter);
}

#[test]
fn memory_adapter_writes_only_reported_attributes() {
    exercise_partial_attributes(&MemoryAdapter::new());
}

#[test]
fn sqlite_adapter_writes_only_reported_attributes() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(CAMPUS_TABLE_SQL).unwrap();
    let adapter = SqliteAdapter::try_new(&conn).unwrap();
    exercise_partial_attributes(&adapter);
}

#[test]
fn repositories_can_share_one_adapter() {
    let adapter = MemoryAdapter::new();
    let archived = Descriptor::builder("Persisters::ArchivedCampus", "archived")
        .field("name", FieldKind::Text)
        .field("abbreviation", FieldKind::Text)
        .field("value", FieldKind::Real)
        .field("active", FieldKind::Boolean)
        .build()
        .unwrap();
    let current = Repository::<Campus, _, _>::with_attribute_mapping(campus_descriptor(), &adapter);
    let past = Repository::<Campus, _, _>::with_attribute_mapping(archived, &adapter);

    assert!(past.save(&Campus::named("Waseca", "UMW")).unwrap().is_saved());
    // Uniqueness is scoped to each repository's own table.
    assert!(current
        .save(&Campus::named("Waseca", "UMW"))
        .unwrap()
        .is_saved());

    assert_eq!(adapter.len(current.descriptor()), 1);
    assert_eq!(adapter.len(past.descriptor()), 1);
}
