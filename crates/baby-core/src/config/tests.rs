//! Tests for configuration parsing, overrides and validation

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::PlaygroundError;
    use serial_test::serial;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn clear_env() {
        for key in [
            ENV_COMPILER,
            ENV_WORKSPACE_ROOT,
            ENV_COMPILE_TIMEOUT_MS,
            ENV_RUN_TIMEOUT_MS,
            ENV_BIND_ADDR,
            ENV_LOG_LEVEL,
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_empty_document_uses_defaults() {
        clear_env();
        let config = ConfigLoader::from_str("").unwrap();

        assert_eq!(config.compiler.path, PathBuf::from("baby"));
        assert_eq!(config.compiler.source_file, "main.by");
        assert_eq!(config.compiler.assembly_file, "out.asm");
        assert_eq!(config.compiler.executable_file, "out");
        assert_eq!(config.compiler.timeout_ms, 10_000);
        assert_eq!(config.runner.timeout_ms, 5_000);
        assert!(!config.runner.inherit_env);
        assert!(config.runner.env.contains_key("PATH"));
        assert_eq!(config.workspace.prefix, "baby-");
        assert_eq!(config.limits.max_concurrent_jobs, 32);
        assert_eq!(config.server.bind_addr, "127.0.0.1:3001");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    #[serial]
    fn test_partial_yaml_keeps_other_defaults() {
        clear_env();
        let yaml = r#"
compiler:
  path: /opt/baby/bin/baby
  args: ["--quiet"]
  timeout_ms: 2500
runner:
  timeout_ms: 750
limits:
  max_output_bytes: 1024
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();

        assert_eq!(config.compiler.path, PathBuf::from("/opt/baby/bin/baby"));
        assert_eq!(config.compiler.args, vec!["--quiet".to_string()]);
        assert_eq!(config.compiler.timeout().as_millis(), 2500);
        assert_eq!(config.compiler.assembly_file, "out.asm");
        assert_eq!(config.runner.timeout().as_millis(), 750);
        assert_eq!(config.limits.max_output_bytes, 1024);
        assert_eq!(config.limits.max_source_bytes, 256 * 1024);
    }

    #[tokio::test]
    #[serial]
    async fn test_load_from_file() {
        clear_env();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "workspace:\n  prefix: play-\n  io_timeout_ms: 1200").unwrap();

        let config = load_config(file.path()).await.unwrap();
        assert_eq!(config.workspace.prefix, "play-");
        assert_eq!(config.workspace.io_timeout().as_millis(), 1200);
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_file_is_config_error() {
        clear_env();
        let result = load_config("/definitely/not/here/baby.yaml").await;
        assert!(matches!(result, Err(PlaygroundError::ConfigError(_))));
    }

    #[test]
    #[serial]
    fn test_invalid_yaml_is_rejected() {
        clear_env();
        let result = ConfigLoader::from_str("compiler: [not, a, map");
        assert!(matches!(result, Err(PlaygroundError::ConfigError(_))));
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply_after_yaml() {
        clear_env();
        std::env::set_var(ENV_COMPILER, "/usr/local/bin/baby");
        std::env::set_var(ENV_RUN_TIMEOUT_MS, "1500");
        std::env::set_var(ENV_WORKSPACE_ROOT, "/var/tmp/playground");

        let config = ConfigLoader::from_str("runner:\n  timeout_ms: 9000\n").unwrap();
        clear_env();

        assert_eq!(config.compiler.path, PathBuf::from("/usr/local/bin/baby"));
        assert_eq!(config.runner.timeout_ms, 1500);
        assert_eq!(
            config.workspace.resolved_root(),
            PathBuf::from("/var/tmp/playground")
        );
    }

    #[test]
    #[serial]
    fn test_non_numeric_timeout_override_is_rejected() {
        clear_env();
        std::env::set_var(ENV_COMPILE_TIMEOUT_MS, "soon");
        let result = ConfigLoader::from_str("");
        clear_env();

        assert!(matches!(result, Err(PlaygroundError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_deadlines() {
        let mut config = PlaygroundConfig::default();
        config.runner.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = PlaygroundConfig::default();
        config.compiler.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_artifact_names() {
        let mut config = PlaygroundConfig::default();
        config.compiler.assembly_file = "../out.asm".to_string();
        assert!(config.validate().is_err());

        let mut config = PlaygroundConfig::default();
        config.compiler.executable_file = config.compiler.assembly_file.clone();
        assert!(config.validate().is_err());

        let mut config = PlaygroundConfig::default();
        config.compiler.source_file = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut config = PlaygroundConfig::default();
        config.limits.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());

        let mut config = PlaygroundConfig::default();
        config.limits.max_output_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_compiler_path_leaves_bare_names() {
        assert_eq!(
            resolve_compiler_path(&PathBuf::from("baby")),
            PathBuf::from("baby")
        );
        assert_eq!(
            resolve_compiler_path(&PathBuf::from("/bin/sh")),
            PathBuf::from("/bin/sh")
        );
        assert!(resolve_compiler_path(&PathBuf::from("build/baby")).is_absolute());
    }
}
