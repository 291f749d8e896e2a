use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use swag_from_source::{
    cli::{self, CliArgs},
    loader::{RustSourceLoader, SourceLoader},
    openapi_builder::{Document, DocumentBuilder, HttpMethod},
    serializer::{load_document, serialize_json, serialize_yaml},
    walker::PackageWalker,
};
use tempfile::TempDir;

/// Helper function to create a temporary test project
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn petstore() -> TempDir {
    create_test_project(vec![
        ("lib.rs", include_str!("fixtures/petstore/lib.rs")),
        ("handlers.rs", include_str!("fixtures/petstore/handlers.rs")),
        ("models/mod.rs", include_str!("fixtures/petstore/models/mod.rs")),
        // never imported, so never parsed
        ("scratch/broken.rs", "pub struct Broken {"),
    ])
}

fn generate(root: &Path, patterns: &[&str], input: Option<Document>) -> Document {
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
    let model = RustSourceLoader::new(root.to_path_buf())
        .load(&patterns)
        .expect("Failed to load project");
    let registry = PackageWalker::walk(&model);
    DocumentBuilder::new(&model, input).build(&registry)
}

fn pet_schema(parent_ref: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "bornAt": {"type": "string", "format": "date-time"},
            "id": {"type": "integer", "format": "uint64"},
            "parent": {"$ref": parent_ref},
            "petName": {"type": "string", "description": "Display name"},
            "tags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

#[test]
fn test_petstore_end_to_end_generation() {
    let project = petstore();
    let document = generate(project.path(), &["."], None);
    let actual = serde_json::to_value(&document).unwrap();

    let expected = json!({
        "swagger": "2.0",
        "info": {
            "title": "Petstore",
            "version": "1.0.0",
            "description": "Sample store used by the integration tests"
        },
        "host": "petstore.example.com",
        "basePath": "/v1",
        "schemes": ["http", "https"],
        "produces": ["application/json"],
        "paths": {
            "/pets": {
                "get": {
                    "tags": ["pets"],
                    "summary": "List pets",
                    "description": "Returns every pet in the store.",
                    "operationId": "listPets",
                    "parameters": [
                        {
                            "name": "limit",
                            "in": "query",
                            "description": "Maximum number of results",
                            "type": "integer",
                            "format": "uint32"
                        },
                        {"name": "tag", "in": "query", "type": "string"}
                    ],
                    "responses": {
                        "200": {
                            "description": "All pets",
                            "schema": {"$ref": "#/definitions/listPets-200"}
                        }
                    }
                },
                "post": {
                    "tags": ["pets"],
                    "summary": "Add a pet",
                    "operationId": "createPet",
                    "parameters": [
                        {
                            "name": "Body",
                            "in": "body",
                            "description": "The pet to add",
                            "schema": {"$ref": "#/definitions/createPet"}
                        }
                    ]
                }
            },
            "/pets/{id}": {
                "get": {
                    "tags": ["pets"],
                    "summary": "Find a pet by ID",
                    "operationId": "getPet",
                    "responses": {
                        "200": {
                            "description": "A pet in the store",
                            "schema": {"$ref": "#/definitions/getPet-200"}
                        },
                        "404": {
                            "description": " ",
                            "schema": {"$ref": "#/definitions/getPet-404"}
                        }
                    }
                }
            },
            "/pets/:id": {
                "delete": {
                    "tags": ["pets", "admin"],
                    "operationId": "deletePet",
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "type": "string"},
                        {
                            "name": "Body",
                            "in": "body",
                            "description": "Why the pet is removed",
                            "schema": {"$ref": "#/definitions/deletePet"}
                        }
                    ]
                }
            }
        },
        "definitions": {
            "Pet": pet_schema("#/definitions/Pet"),
            "createPet": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            },
            "deletePet": {
                "type": "object",
                "properties": {"reason": {"type": "string"}}
            },
            "getPet-200": pet_schema("#/definitions/getPet-200"),
            "getPet-404": {
                "type": "object",
                "properties": {
                    "code": {"type": "integer", "format": "int32"},
                    "message": {"type": "string"}
                }
            },
            "listPets-200": {
                "type": "array",
                "items": pet_schema("#/definitions/Pet")
            }
        }
    });

    assert_eq!(actual, expected);
}

#[test]
fn test_output_is_deterministic() {
    let project = petstore();

    let first = serialize_yaml(&generate(project.path(), &["."], None)).unwrap();
    let second = serialize_yaml(&generate(project.path(), &["."], None)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_yaml_and_json_describe_the_same_document() {
    let project = petstore();
    let document = generate(project.path(), &["."], None);

    let from_yaml: Document = serde_yaml::from_str(&serialize_yaml(&document).unwrap()).unwrap();
    let from_json: Document = serde_json::from_str(&serialize_json(&document).unwrap()).unwrap();

    assert_eq!(from_yaml, document);
    assert_eq!(from_json, document);
}

#[test]
fn test_model_package_alone_has_no_operations() {
    let project = petstore();
    let document = generate(project.path(), &["./models"], None);

    // the routes live in the root package, which is not loaded
    assert!(document.paths.is_empty());
    assert!(document.definitions.is_empty());
    assert_eq!(document.swagger, "2.0");
}

#[test]
fn test_recursive_pattern_fails_on_broken_file() {
    let project = petstore();

    let err = RustSourceLoader::new(project.path().to_path_buf())
        .load(&["./...".to_string()])
        .unwrap_err();

    assert!(format!("{:#}", err).contains("broken.rs"));
}

#[test]
fn test_merge_into_input_document() {
    let project = petstore();
    let input_path = project.path().join("base.json");
    fs::write(
        &input_path,
        json!({
            "swagger": "2.0",
            "info": {"title": "Old title", "contact": {"name": "Pet team"}},
            "securityDefinitions": {"key": {"type": "apiKey", "name": "X-Key", "in": "header"}},
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "summary": "Old summary",
                        "x-rate-limit": 10,
                        "responses": {"500": {"description": "Server error"}}
                    },
                    "put": {"operationId": "replacePets"}
                },
                "/health": {"get": {"operationId": "health"}}
            },
            "definitions": {
                "createPet": {
                    "type": "object",
                    "example": {"name": "Rex"},
                    "properties": {"legacy": {"type": "boolean"}}
                }
            }
        })
        .to_string(),
    )
    .unwrap();

    let input = load_document(Some(&input_path));
    assert!(input.is_some());
    let document = generate(project.path(), &["."], input);

    let info = document.info.as_ref().unwrap();
    assert_eq!(info.title, "Petstore");
    assert_eq!(info.extra["contact"], json!({"name": "Pet team"}));
    assert!(document.extra.contains_key("securityDefinitions"));

    let list = document.operation("/pets", HttpMethod::Get).unwrap();
    assert_eq!(list.summary.as_deref(), Some("List pets"));
    assert_eq!(list.extra["x-rate-limit"], json!(10));
    let codes: Vec<&str> = list.responses.keys().map(String::as_str).collect();
    assert_eq!(codes, vec!["200", "500"]);

    assert!(document.operation("/pets", HttpMethod::Put).is_some());
    assert!(document.operation("/health", HttpMethod::Get).is_some());

    let create_pet = serde_json::to_value(&document.definitions["createPet"]).unwrap();
    assert_eq!(
        create_pet,
        json!({
            "type": "object",
            "example": {"name": "Rex"},
            "properties": {
                "legacy": {"type": "boolean"},
                "name": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "string"}}
            }
        })
    );
}

#[test]
fn test_cli_run_writes_output_by_extension() {
    let project = petstore();
    let dir = project.path().to_str().unwrap();

    for name in ["out/swagger.json", "out/swagger.yaml"] {
        let output = project.path().join(name);
        let args = CliArgs::try_parse_from([
            "swag-from-source",
            "-C",
            dir,
            "-m",
            ".",
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap();

        cli::run(cli::parse_args_from_parsed(args).unwrap()).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(content.trim_start().starts_with('{'), name.ends_with(".json"));
        let written = load_document(Some(&output)).unwrap();
        assert_eq!(written.paths.len(), 3);
        assert_eq!(written.definitions.len(), 6);
    }
}

#[test]
fn test_cli_run_fails_on_missing_pattern_directory() {
    let project = petstore();
    let args = CliArgs::try_parse_from([
        "swag-from-source",
        "-C",
        project.path().to_str().unwrap(),
        "-m",
        "./missing/...",
        "-o",
        "-",
    ])
    .unwrap();

    let err = cli::run(args).unwrap_err();
    assert!(format!("{:#}", err).contains("./missing/..."));
}
