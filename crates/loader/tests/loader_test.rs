use apispec_builder_common::{BuilderConfig, EventBinding, ParamLocation};
use apispec_builder_loader::{load_registry, walk, DeclarativeSource, SpecLoader};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PET_POST: &str = r#"
apiSpec:
  category: Pet
  desc: Create a pet
  event:
    - type: REST
      method: Post
  parameters:
    name:
      type: String
      required: true
    age:
      type: Number
"#;

const PET_GET: &str = r#"{
  "apiSpec": {
    "category": "Pet",
    "desc": "List pets",
    "event": [{ "type": "REST", "method": "Get" }],
    "parameters": {
      "page": { "type": "Integer", "in": "query" },
      "limit": { "type": "Integer" }
    }
  }
}"#;

const LEGACY_WS: &str = r#"
apiSpec:
  category: Chat
  type: websocket
  event:
    route: sendMessage
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let lambda = dir.path().join("src/lambda");
    write(&lambda, "pet/post.yml", PET_POST);
    write(&lambda, "pet/get.json", PET_GET);
    write(&lambda, "chat/send.yaml", LEGACY_WS);
    write(&lambda, "pet/post.js", "exports.handler = async () => {};");
    write(&lambda, "shared/config.yml", "region: us-east-1\n");
    dir
}

#[test]
fn test_walk_then_load() {
    let dir = project();
    let files = walk(dir.path().join("src/lambda")).unwrap();
    assert_eq!(files.len(), 5);

    let report = SpecLoader::new(DeclarativeSource::default(), "lambda")
        .load(&files)
        .unwrap();

    assert_eq!(report.registry.len(), 3);
    assert_eq!(report.skipped, 2);
    assert!(report.failures.is_empty());

    // Walk order is sorted by file name, so get precedes post
    let pets: Vec<&str> = report
        .registry
        .category("Pet")
        .iter()
        .map(|e| e.item.name.as_str())
        .collect();
    assert_eq!(pets, vec!["pet/get", "pet/post"]);

    let get = &report.registry.category("Pet")[0].item;
    assert_eq!(get.uri, "pet");
    assert_eq!(get.parameters["page"].location, Some(ParamLocation::Query));
    assert_eq!(get.parameters["limit"].location, None);
}

#[test]
fn test_legacy_websocket_declaration() {
    let dir = project();
    let config = BuilderConfig {
        source_dir: dir.path().join("src/lambda"),
        ..Default::default()
    };

    let report = load_registry(&config).unwrap();
    let chat = &report.registry.category("Chat")[0].item;
    assert_eq!(chat.name, "chat/send");
    assert_eq!(
        chat.event,
        vec![EventBinding::Websocket {
            route: "sendMessage".to_string()
        }]
    );
}

#[test]
fn test_legacy_top_level_binding_without_event() {
    let dir = project();
    write(
        &dir.path().join("src/lambda"),
        "queue/consume.yml",
        "apiSpec:\n  category: Queue\n  type: sqs\n  sqs: MyQueue\n  batchSize: 10\n",
    );

    let config = BuilderConfig {
        source_dir: dir.path().join("src/lambda"),
        ..Default::default()
    };
    let report = load_registry(&config).unwrap();

    let queue = &report.registry.category("Queue")[0].item;
    assert_eq!(queue.event.len(), 1);
    assert!(matches!(
        &queue.event[0],
        EventBinding::Sqs { sqs, batch_size, .. }
            if sqs.as_deref() == Some("MyQueue") && batch_size == &Some(serde_json::json!(10))
    ));
}

#[test]
fn test_malformed_file_does_not_abort() {
    let dir = project();
    write(&dir.path().join("src/lambda"), "broken/put.yml", "apiSpec: [unclosed");

    let config = BuilderConfig {
        source_dir: dir.path().join("src/lambda"),
        ..Default::default()
    };
    let report = load_registry(&config).unwrap();

    assert_eq!(report.registry.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("broken/put.yml"));
}

#[test]
fn test_missing_source_dir() {
    let dir = TempDir::new().unwrap();
    let config = BuilderConfig {
        source_dir: dir.path().join("src/lambda"),
        ..Default::default()
    };
    assert!(load_registry(&config).is_err());
}
