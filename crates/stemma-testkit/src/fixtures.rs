//! Record fixtures for session tests

use stemma_core::{
    DependentRow, EntityKind, EntityRef, FieldMap, FieldValue, Key, RootRecord, SortKey,
};

/// Fields of a plausible person record.
pub fn person_fields() -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("surname".to_string(), FieldValue::from("Janssen"));
    fields.insert("given".to_string(), FieldValue::from("Willem"));
    fields.insert("occupation".to_string(), FieldValue::from("carpenter"));
    fields
}

/// Fields of an event record with the conventional `type`/`date` tags.
pub fn event_fields(event_type: &str, date: i64) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("type".to_string(), FieldValue::from(event_type));
    fields.insert("date".to_string(), FieldValue::from(date));
    fields.insert("place".to_string(), FieldValue::from("Utrecht"));
    fields
}

/// An assigned event row owned by `owner_key`, positioned at `sort`.
pub fn event_row(owner_key: u64, key: u64, sort: i64) -> DependentRow {
    let owner = EntityRef::assigned(EntityKind::Person, Key::new(owner_key));
    let mut row = DependentRow::new(EntityKind::Event, owner, "Events");
    row.entity = EntityRef::assigned(EntityKind::Event, Key::new(key));
    row.sort_key = SortKey::new(sort);
    row.fields = event_fields("residence", sort);
    row.changed = false;
    row
}

/// A person loaded under `key` with two events at sort keys 10 and 30.
pub fn person_with_events(key: u64) -> RootRecord {
    let mut record = RootRecord::loaded(EntityKind::Person, Key::new(key));
    record.fields = person_fields();
    record
        .dependents_of_mut(EntityKind::Event)
        .extend([event_row(key, 11, 10), event_row(key, 12, 30)]);
    record
}
