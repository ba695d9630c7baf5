use insta::assert_snapshot;
use ontoforge::{
    data::{self, FactBatch},
    schema::{compile, compile_and_save, derive_ontology, validate_schema, SchemaSyntaxError},
    workdir::WorkingStore,
};
use rstest::rstest;

const PERSONINFO: &str = r#"
id: https://w3id.org/linkml/examples/personinfo
name: personinfo
prefixes:
  linkml: https://w3id.org/linkml/
  personinfo: https://w3id.org/linkml/examples/personinfo/
  ORCID: https://orcid.org/
imports:
  - linkml:types
default_prefix: personinfo
default_range: string

classes:
  Person:
    attributes:
      id:
        identifier: true
      full_name:
        required: true
        description:
          name of the person
      age:
        range: integer
        minimum_value: 0
        maximum_value: 120
  Organization:
    attributes:
      id:
        identifier: true
      org_name: {}
"#;

const PREFIXES: &str = r"
    @prefix ORCID: <https://orcid.org/> .
    @prefix personinfo: <https://w3id.org/linkml/examples/personinfo/> .
    @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
";

fn person(age: u32) -> FactBatch {
    FactBatch::new(PREFIXES).with_instance(
        "Person",
        format!(
            r#"
            ORCID:1234 a personinfo:Person ;
                personinfo:age {age} ;
                personinfo:full_name "Clark Kent" .
            "#
        ),
    )
}

#[test]
fn derives_one_owl_class_per_schema_class() {
    let schema = compile(PERSONINFO).expect("schema");
    let ontology = derive_ontology(&schema).expect("ontology");
    let mut classes: Vec<&str> = ontology
        .classes()
        .keys()
        .map(ontoforge::ontology::Iri::as_str)
        .collect();
    classes.sort_unstable();
    assert_eq!(
        classes,
        vec![
            "https://w3id.org/linkml/examples/personinfo/Organization",
            "https://w3id.org/linkml/examples/personinfo/Person",
        ]
    );
    let owl = ontology.to_rdf_xml().expect("rdf/xml");
    assert!(owl.contains("https://w3id.org/linkml/examples/personinfo/full_name"));
}

#[rstest]
#[case("name: s\nclasses: {}\n", &["Schema does not have a top level id"])]
#[case("id: https://example.org/s\n", &["Schema does not have a top level name"])]
#[case(
    "classes:\n  Person:\n    attributes:\n      name:\n        range: string\n",
    &["Schema does not have a top level id", "Schema does not have a top level name"]
)]
fn enumerates_every_missing_field(#[case] text: &str, #[case] expected: &[&str]) {
    let err = compile(text).expect_err("missing fields");
    assert!(matches!(err, SchemaSyntaxError::MissingFields { .. }));
    assert_eq!(err.messages(), expected);
}

#[test]
fn rejects_text_that_is_not_yaml() {
    let result = validate_schema("id: http://example.com/test_schema\n  name: test_schema\n");
    assert!(!result.valid);
    assert!(result.messages[0].starts_with("Schema is not valid yaml"));
}

#[test]
fn names_the_unknown_class() {
    let schema = compile(PERSONINFO).expect("schema");
    let batch = person(30).with_instance("Superhero", "ORCID:1 a personinfo:Superhero .");
    let err = data::validate(&schema, &batch).expect_err("unknown class");
    assert_snapshot!(err.to_string(), @"Class not in schema: Superhero");
}

#[test]
fn bounds_are_enforced() {
    let schema = compile(PERSONINFO).expect("schema");

    let result = data::validate(&schema, &person(330)).expect("validated");
    assert!(!result.valid);
    assert_snapshot!(result.feedback(), @"ORCID:1234: `age` value 330 is greater than the maximum 120");

    let result = data::validate(&schema, &person(30)).expect("validated");
    assert!(result.valid, "{:?}", result.messages);
}

#[tokio::test]
async fn saves_only_valid_schemas() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = WorkingStore::at_dir(dir.path()).expect("store");

    let schema = compile_and_save(PERSONINFO, &store, "schema.yaml")
        .await
        .expect("saved");
    assert_eq!(schema.name, "personinfo");
    assert_eq!(store.read("schema.yaml").await.expect("read"), PERSONINFO);

    let err = compile_and_save("name: broken", &store, "broken.yaml")
        .await
        .expect_err("rejected");
    assert!(!err.is_retryable());
    assert!(!store.exists("broken.yaml").await.expect("exists"));
}
