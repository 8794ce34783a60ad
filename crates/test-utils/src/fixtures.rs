//! Common test fixtures for http-bench tests.
//!
//! Scenario files mirror the YAML format accepted by `http-bench run`.

use std::io::Write;

use tempfile::NamedTempFile;

/// A minimal valid scenario against a local target.
pub const MINIMAL_SCENARIO: &str = r#"
name: minimal
description: Five requests over one connection
uri: http://127.0.0.1:8080/
concurrency: 1
requests: 5
"#;

/// A scenario exercising every optional field.
pub const FULL_SCENARIO: &str = r#"
name: full
description: Keep-alive HTTP/1.0 with custom timeouts
uri: http://127.0.0.1:8080/bytes/512
concurrency: 8
requests: 1000
keep_alive: true
protocol_version: 1.0
request_timeout_secs: 5
connect_timeout_secs: 1
"#;

/// Zero concurrency; fails validation.
pub const INVALID_SCENARIO: &str = r#"
name: invalid
description: No workers
uri: http://127.0.0.1:8080/
concurrency: 0
requests: 5
"#;

/// Render a scenario for `uri` with the given sizing.
pub fn scenario_yaml(name: &str, uri: &str, concurrency: usize, requests: usize) -> String {
    format!(
        "name: {name}\ndescription: generated scenario\nuri: {uri}\nconcurrency: {concurrency}\nrequests: {requests}\n"
    )
}

/// Write `contents` to a temporary `.yaml` file that is deleted on drop.
pub fn temp_scenario(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("scenario_")
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temporary scenario file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temporary scenario file");
    file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_yaml_contains_fields() {
        let yaml = scenario_yaml("gen", "http://localhost/", 3, 30);
        assert!(yaml.contains("name: gen"));
        assert!(yaml.contains("uri: http://localhost/"));
        assert!(yaml.contains("concurrency: 3"));
        assert!(yaml.contains("requests: 30"));
    }

    #[test]
    fn test_temp_scenario_is_yaml_file() {
        let file = temp_scenario(MINIMAL_SCENARIO);
        let path = file.path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("yaml"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), MINIMAL_SCENARIO);
    }
}
