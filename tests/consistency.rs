use std::sync::Arc;

use insta::assert_snapshot;
use ontoforge::{
    consistency::{merged_document, store::segments, ConsistencyChecker, ConsistencyError, FactStore},
    data::FactBatch,
    ontology::OntologyModel,
    reasoner::NativeReasoner,
    schema::{compile, derive_ontology, SchemaDefinition},
};

const SCHEMA: &str = r"
id: https://example.org/people
name: people
prefixes:
  ex: https://example.org/people/
default_prefix: ex
classes:
  Person:
    attributes:
      id:
        identifier: true
      full_name:
        required: true
      age:
        range: integer
        minimum_value: 0
        maximum_value: 120
";

const CONCEPT: &str = r#"
<rdf:RDF xmlns="http://www.example.org/philosophical_implications#"
    xml:base="http://www.example.org/philosophical_implications#"
    xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:owl="http://www.w3.org/2002/07/owl#"
    xmlns:xml="http://www.w3.org/XML/1998/namespace"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema#"
    xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">
    <owl:Ontology rdf:about="http://www.example.org/philosophical_implications#"/>
    <owl:Class rdf:about="http://www.example.org/philosophical_implications#Concept"/>
</rdf:RDF>
"#;

const SELF_COMPLEMENT: &str = r#"
<rdf:RDF xmlns="http://www.example.org/philosophical_implications#"
    xml:base="http://www.example.org/philosophical_implications#"
    xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
    xmlns:owl="http://www.w3.org/2002/07/owl#"
    xmlns:xml="http://www.w3.org/XML/1998/namespace"
    xmlns:xsd="http://www.w3.org/2001/XMLSchema#"
    xmlns:rdfs="http://www.w3.org/2000/01/rdf-schema#">
    <owl:Ontology rdf:about="http://www.example.org/philosophical_implications#"/>
    <owl:Class rdf:about="http://www.example.org/philosophical_implications#Concept">
        <owl:equivalentClass>
            <owl:Class>
                <owl:complementOf rdf:resource="http://www.example.org/philosophical_implications#Concept"/>
            </owl:Class>
        </owl:equivalentClass>
    </owl:Class>
</rdf:RDF>
"#;

fn setup() -> (SchemaDefinition, OntologyModel, ConsistencyChecker) {
    let schema = compile(SCHEMA).expect("schema");
    let ontology = derive_ontology(&schema).expect("ontology");
    let checker = ConsistencyChecker::new(Arc::new(NativeReasoner::default()));
    (schema, ontology, checker)
}

fn person(schema: &SchemaDefinition, id: &str, name: &str, age: u32) -> String {
    FactBatch::new("@prefix ex: <https://example.org/people/> .")
        .with_instance(
            "Person",
            format!("ex:{id} a ex:Person ; ex:full_name \"{name}\" ; ex:age {age} ."),
        )
        .to_rdf_xml(schema)
        .expect("rdf/xml")
}

fn clark(schema: &SchemaDefinition, age: u32) -> String {
    person(schema, "clark", "Clark Kent", age)
}

#[tokio::test]
async fn first_commit_stores_the_new_facts() {
    let (_, ontology, checker) = setup();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FactStore::new(dir.path().join("output").join("data.xml"));

    let report = checker
        .merge_and_check(&ontology, &store, CONCEPT)
        .await
        .expect("consistent");
    assert!(report.valid);
    assert_eq!(
        store.read().await.expect("read").as_deref(),
        Some(CONCEPT.trim())
    );
}

#[tokio::test]
async fn commits_append_to_the_prior_facts() {
    let (schema, ontology, checker) = setup();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FactStore::new(dir.path().join("data.xml"));

    let first = clark(&schema, 30);
    checker
        .merge_and_check(&ontology, &store, &first)
        .await
        .expect("first commit");
    let prior = store.read().await.expect("read").expect("committed");

    checker
        .merge_and_check(&ontology, &store, CONCEPT)
        .await
        .expect("second commit");
    assert_eq!(
        store.read().await.expect("read").expect("committed"),
        merged_document(Some(&prior), CONCEPT.trim())
    );
    assert_eq!(
        merged_document(Some(&prior), "<b/>"),
        format!("{prior}\n\n<b/>")
    );
}

#[tokio::test]
async fn repeated_checks_give_the_same_verdict() {
    let (schema, ontology, checker) = setup();
    let prior = clark(&schema, 30);
    let new_facts = clark(&schema, 31);

    for _ in 0..2 {
        let err = checker
            .check(&ontology, Some(&prior), &new_facts)
            .expect_err("age is single valued");
        assert!(matches!(err, ConsistencyError::Inconsistent { .. }));
    }
    for _ in 0..2 {
        let report = checker
            .check(&ontology, Some(&prior), CONCEPT)
            .expect("consistent");
        assert!(report.valid);
    }
}

#[tokio::test]
async fn contradictions_across_commits_leave_the_store_untouched() {
    let (schema, ontology, checker) = setup();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FactStore::new(dir.path().join("data.xml"));

    checker
        .merge_and_check(&ontology, &store, &clark(&schema, 30))
        .await
        .expect("first commit");
    let before = store.read().await.expect("read");

    let err = checker
        .merge_and_check(&ontology, &store, &clark(&schema, 31))
        .await
        .expect_err("second age contradicts the first");
    assert!(err.is_retryable());
    assert!(err.to_string().starts_with("OWL ontology is logically inconsistent. Reasoner output: "));
    assert_eq!(store.read().await.expect("read"), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_commits_to_one_store_keep_both_facts() {
    let (schema, ontology, checker) = setup();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FactStore::new(dir.path().join("data.xml"));

    let clark = clark(&schema, 30);
    let lois = person(&schema, "lois", "Lois Lane", 28);
    let (first, second) = tokio::join!(
        checker.merge_and_check(&ontology, &store, &clark),
        checker.merge_and_check(&ontology, &store, &lois),
    );
    first.expect("clark committed");
    second.expect("lois committed");

    let stored = store.read().await.expect("read").expect("committed");
    assert!(stored.contains("Clark Kent"));
    assert!(stored.contains("Lois Lane"));
    assert_eq!(segments(&stored).len(), 2);
}

#[tokio::test]
async fn self_complementary_class_is_inconsistent() {
    let (_, ontology, checker) = setup();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FactStore::new(dir.path().join("data.xml"));

    let err = checker
        .merge_and_check(&ontology, &store, SELF_COMPLEMENT)
        .await
        .expect_err("inconsistent");
    let ConsistencyError::Inconsistent { explanation } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(explanation.contains("Concept EquivalentTo not Concept"), "{explanation}");
    assert!(store.read().await.expect("read").is_none());
}

#[tokio::test]
async fn malformed_documents_fail_before_reasoning() {
    let (_, ontology, checker) = setup();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FactStore::new(dir.path().join("data.xml"));

    let truncated = CONCEPT.trim().trim_end_matches('>');
    let err = checker
        .merge_and_check(&ontology, &store, truncated)
        .await
        .expect_err("malformed");
    assert!(matches!(err, ConsistencyError::Parse(_)));
    assert!(err.is_retryable());
    assert!(err.to_string().starts_with("Error parsing OWL content (new facts): "));
    assert!(store.read().await.expect("read").is_none());
}

#[tokio::test]
async fn fenced_content_is_accepted() {
    let (_, ontology, checker) = setup();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FactStore::new(dir.path().join("data.xml"));

    let fenced = format!("Here is the ontology:\n```xml\n{}\n```\n", CONCEPT.trim());
    checker
        .merge_and_check(&ontology, &store, &fenced)
        .await
        .expect("consistent");
    let stored = store.read().await.expect("read").expect("committed");
    assert!(!stored.contains("```"));
    assert_eq!(stored, CONCEPT.trim());
}

#[test]
fn empty_new_facts_are_a_parse_error() {
    let (_, ontology, checker) = setup();
    let err = checker.check(&ontology, None, "```xml\n```").expect_err("empty");
    assert_snapshot!(err.to_string(), @"Error parsing OWL content (new facts): the document is empty");
}
