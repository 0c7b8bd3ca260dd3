//! End-to-end flattening, partitioning and statement generation over bundle
//! files on disk. No database is needed.

use fhir_loader::sql::{create_table_sql, insert_batches};
use fhir_loader::{
    collect_directory, partition_table, Cell, ColumnType, Flattener, Loader, LoaderConfig,
    TypeMapping,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;

fn write_bundle(dir: &Path, name: &str, bundle: Value) {
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(&bundle).unwrap()).unwrap();
}

fn patient_encounter_bundle(patient_id: &str, encounter_id: &str) -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "transaction",
        "entry": [
            {
                "fullUrl": format!("urn:uuid:{}", patient_id),
                "resource": {
                    "resourceType": "Patient",
                    "id": patient_id,
                    "gender": "female",
                    "birthDate": "1970-01-01",
                    "deceasedBoolean": false,
                    "name": [{"family": "Doe", "given": ["Jane"]}]
                },
                "request": {"method": "POST", "url": "Patient"}
            },
            {
                "fullUrl": format!("urn:uuid:{}", encounter_id),
                "resource": {
                    "resourceType": "Encounter",
                    "id": encounter_id,
                    "status": "finished",
                    "class": {"system": "http://terminology.hl7.org/CodeSystem/v3-ActCode", "code": "AMB"},
                    "subject": {"reference": format!("urn:uuid:{}", patient_id)},
                    "period": {"start": "2020-01-01T10:00:00Z", "end": "2020-01-01T10:30:00Z"}
                },
                "request": {"method": "POST", "url": "Encounter"}
            }
        ]
    })
}

#[test]
fn two_bundles_yield_two_partitions_of_two_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), "one.json", patient_encounter_bundle("p1", "e1"));
    write_bundle(dir.path(), "two.json", patient_encounter_bundle("p2", "e2"));

    let table = collect_directory(dir.path(), &Flattener::default()).unwrap();
    assert_eq!(table.len(), 4);

    let partitioned = partition_table(table, "resource_resourceType").unwrap();
    assert_eq!(partitioned.partitions.len(), 2);
    assert_eq!(partitioned.unclassified, 0);

    let patient = partitioned.get("Patient").unwrap();
    let encounter = partitioned.get("Encounter").unwrap();
    assert_eq!(patient.len(), 2);
    assert_eq!(encounter.len(), 2);

    // Each partition keeps only the fields its own resources carry
    assert_eq!(
        patient.column_names(),
        vec![
            "fullUrl",
            "resource_resourceType",
            "resource_id",
            "resource_gender",
            "resource_birthDate",
            "resource_deceasedBoolean",
            "resource_name",
            "request_method",
            "request_url",
        ]
    );
    assert_eq!(
        encounter.column_names(),
        vec![
            "fullUrl",
            "resource_resourceType",
            "resource_id",
            "request_method",
            "request_url",
            "resource_status",
            "resource_class_system",
            "resource_class_code",
            "resource_subject_reference",
            "resource_period_start",
            "resource_period_end",
        ]
    );

    assert_eq!(
        patient.column("resource_deceasedBoolean").unwrap().column_type,
        ColumnType::Boolean
    );
    assert_eq!(
        patient.column("resource_name").unwrap().column_type,
        ColumnType::Opaque
    );
}

#[test]
fn statements_cover_every_partition_row() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), "one.json", patient_encounter_bundle("p1", "e1"));
    write_bundle(dir.path(), "two.json", patient_encounter_bundle("p2", "e2"));

    let loader = Loader::new(LoaderConfig {
        data_dir: dir.path().to_path_buf(),
        ..LoaderConfig::default()
    })
    .unwrap();
    let prepared = loader.prepare().unwrap();
    let mapping = TypeMapping::postgres();

    for partition in &prepared.tables {
        let ddl = create_table_sql(&partition.resource_type, &partition.columns, &mapping).unwrap();
        assert!(ddl.starts_with(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (",
            partition.resource_type
        )));

        let batches = insert_batches(&partition.resource_type, partition);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].rows, 2);
        let placeholders = partition.columns.len() * 2;
        assert!(batches[0].sql().ends_with(&format!("${})", placeholders)));
    }
}

#[test]
fn opaque_cells_hold_json_text() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), "one.json", patient_encounter_bundle("p1", "e1"));

    let table = collect_directory(dir.path(), &Flattener::default()).unwrap();
    let partitioned = partition_table(table, "resource_resourceType").unwrap();
    let patient = partitioned.get("Patient").unwrap();

    let idx = patient
        .column_names()
        .iter()
        .position(|c| *c == "resource_name")
        .unwrap();
    match &patient.rows[0][idx] {
        Cell::Opaque(text) => {
            let parsed: Value = serde_json::from_str(text).unwrap();
            assert_eq!(parsed, json!([{"family": "Doe", "given": ["Jane"]}]));
        }
        other => panic!("expected opaque cell, got {other:?}"),
    }
}

#[test]
fn row_count_matches_sum_of_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut expected = 0;
    for i in 0..5 {
        let entries: Vec<Value> = (0..i)
            .map(|j| json!({"resource": {"resourceType": "Observation", "id": format!("o{}-{}", i, j), "valueQuantity": {"value": j}}}))
            .collect();
        expected += entries.len();
        write_bundle(dir.path(), &format!("b{}.json", i), json!({"entry": entries}));
    }

    let table = collect_directory(dir.path(), &Flattener::default()).unwrap();
    assert_eq!(table.len(), expected);

    let partitioned = partition_table(table, "resource_resourceType").unwrap();
    let observation = partitioned.get("Observation").unwrap();
    assert_eq!(observation.len(), expected);
    assert_eq!(
        observation.column("resource_valueQuantity_value").unwrap().column_type,
        ColumnType::Int8
    );
}
