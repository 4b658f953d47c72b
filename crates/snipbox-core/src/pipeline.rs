//! Language pipelines and the registry that maps language ids to them.

use crate::error::{ConfigError, ExecError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder in a pipeline command that is replaced by the entry file path.
pub const ENTRY_PLACEHOLDER: &str = "{entry}";

/// Default template project for TypeScript.
pub const DEFAULT_TS_TEMPLATE: &str = "/tmp/dummy-pkg-ts";

/// Default budget for JavaScript runs.
pub const DEFAULT_JS_TIMEOUT: Duration = Duration::from_secs(60);

/// Default budget for TypeScript runs (ts-node startup included).
pub const DEFAULT_TS_TIMEOUT: Duration = Duration::from_secs(30);

/// How one language's code is staged and executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePipeline {
    id: String,
    file_extension: String,
    template: Option<PathBuf>,
    command: Vec<String>,
    timeout: Duration,
}

impl LanguagePipeline {
    /// Create a pipeline with no template project.
    ///
    /// `command` is an argv template; every `{entry}` is replaced with the
    /// staged entry file when the process is spawned.
    pub fn new<I, S>(
        id: impl Into<String>,
        file_extension: impl Into<String>,
        command: I,
        timeout: Duration,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            file_extension: file_extension.into(),
            template: None,
            command: command.into_iter().map(Into::into).collect(),
            timeout,
        }
    }

    /// Seed every workspace of this pipeline from a template project.
    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(path.into());
        self
    }

    /// Built-in `javascript` pipeline: `node <entry>`.
    pub fn javascript(timeout: Duration) -> Self {
        Self::new("javascript", ".js", ["node", ENTRY_PLACEHOLDER], timeout)
    }

    /// Built-in `typescript` pipeline: `ts-node index.ts` inside a copy of
    /// the template project.
    pub fn typescript(template: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self::new("typescript", ".ts", ["ts-node", ENTRY_PLACEHOLDER], timeout)
            .with_template(template)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    pub fn needs_template_project(&self) -> bool {
        self.template.is_some()
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Canonical entry file name inside a workspace.
    ///
    /// Template projects expect `index<ext>`; plain pipelines use a name
    /// scoped to the request.
    pub fn entry_file_name(&self, request_token: &str) -> String {
        if self.needs_template_project() {
            format!("index{}", self.file_extension)
        } else {
            format!("{}{}", request_token, self.file_extension)
        }
    }

    /// Resolve the argv for a concrete entry file.
    pub fn argv(&self, entry: &Path) -> Vec<String> {
        let entry = entry.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace(ENTRY_PLACEHOLDER, &entry))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.command.is_empty() || self.command[0].is_empty() {
            return Err(ConfigError::EmptyCommand(self.id.clone()));
        }
        if !self.command.iter().any(|a| a.contains(ENTRY_PLACEHOLDER)) {
            return Err(ConfigError::MissingEntryPlaceholder(self.id.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout(self.id.clone()));
        }
        Ok(())
    }
}

/// Immutable map from language id to pipeline.
///
/// Built once at startup and shared read-only; there is no way to mutate a
/// registry after `build`.
#[derive(Debug, Clone, Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<String, LanguagePipeline>,
}

impl PipelineRegistry {
    /// Create a new registry builder.
    pub fn builder() -> PipelineRegistryBuilder {
        PipelineRegistryBuilder::default()
    }

    /// The default `{javascript, typescript}` registry.
    pub fn builtin(
        ts_template: impl Into<PathBuf>,
        js_timeout: Duration,
        ts_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Self::builder()
            .pipeline(LanguagePipeline::javascript(js_timeout))
            .pipeline(LanguagePipeline::typescript(ts_template, ts_timeout))
            .build()
    }

    /// Find the pipeline for a language id.
    pub fn lookup(&self, language: &str) -> Result<&LanguagePipeline, ExecError> {
        self.pipelines
            .get(language)
            .ok_or_else(|| ExecError::NotSupported(language.to_string()))
    }

    /// Registered language ids, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Check that every template project exists on disk.
    pub fn check_templates(&self) -> Result<(), ConfigError> {
        for pipeline in self.pipelines.values() {
            if let Some(template) = pipeline.template() {
                if !template.is_dir() {
                    return Err(ConfigError::MissingTemplate(template.to_path_buf()));
                }
            }
        }
        Ok(())
    }
}

/// Builder for PipelineRegistry.
#[derive(Debug, Default)]
pub struct PipelineRegistryBuilder {
    pipelines: Vec<LanguagePipeline>,
}

impl PipelineRegistryBuilder {
    /// Add a pipeline.
    pub fn pipeline(mut self, pipeline: LanguagePipeline) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    /// Build the registry, validating every pipeline.
    pub fn build(self) -> Result<PipelineRegistry, ConfigError> {
        let mut pipelines = HashMap::with_capacity(self.pipelines.len());
        for pipeline in self.pipelines {
            pipeline.validate()?;
            let id = pipeline.id.clone();
            if pipelines.insert(id.clone(), pipeline).is_some() {
                return Err(ConfigError::DuplicatePipeline(id));
            }
        }
        Ok(PipelineRegistry { pipelines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> PipelineRegistry {
        PipelineRegistry::builtin(DEFAULT_TS_TEMPLATE, DEFAULT_JS_TIMEOUT, DEFAULT_TS_TIMEOUT)
            .expect("builtin registry is valid")
    }

    #[test]
    fn test_builtin_languages() {
        assert_eq!(builtin().languages(), vec!["javascript", "typescript"]);
    }

    #[test]
    fn test_lookup_unknown_language() {
        let registry = builtin();
        match registry.lookup("python") {
            Err(ExecError::NotSupported(lang)) => assert_eq!(lang, "python"),
            other => panic!("expected NotSupported, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(builtin().lookup("JavaScript").is_err());
    }

    #[test]
    fn test_typescript_pipeline() {
        let registry = builtin();
        let ts = registry.lookup("typescript").unwrap();
        assert!(ts.needs_template_project());
        assert_eq!(ts.template(), Some(Path::new(DEFAULT_TS_TEMPLATE)));
        assert_eq!(ts.timeout(), Duration::from_secs(30));
        assert_eq!(ts.entry_file_name("ignored"), "index.ts");
    }

    #[test]
    fn test_javascript_pipeline() {
        let registry = builtin();
        let js = registry.lookup("javascript").unwrap();
        assert!(!js.needs_template_project());
        assert_eq!(js.timeout(), Duration::from_secs(60));
        assert_eq!(js.entry_file_name("abc"), "abc.js");
    }

    #[test]
    fn test_argv_substitutes_entry() {
        let js = LanguagePipeline::javascript(DEFAULT_JS_TIMEOUT);
        let argv = js.argv(Path::new("/scratch/w1/abc.js"));
        assert_eq!(argv, vec!["node", "/scratch/w1/abc.js"]);
    }

    #[test]
    fn test_builder_rejects_duplicate() {
        let result = PipelineRegistry::builder()
            .pipeline(LanguagePipeline::javascript(DEFAULT_JS_TIMEOUT))
            .pipeline(LanguagePipeline::javascript(DEFAULT_JS_TIMEOUT))
            .build();
        assert!(matches!(result, Err(ConfigError::DuplicatePipeline(id)) if id == "javascript"));
    }

    #[test]
    fn test_builder_rejects_empty_command() {
        let pipeline = LanguagePipeline::new("empty", ".x", Vec::<String>::new(), DEFAULT_JS_TIMEOUT);
        let result = PipelineRegistry::builder().pipeline(pipeline).build();
        assert!(matches!(result, Err(ConfigError::EmptyCommand(_))));
    }

    #[test]
    fn test_builder_rejects_missing_placeholder() {
        let pipeline = LanguagePipeline::new("sh", ".sh", ["sh", "-c", "true"], DEFAULT_JS_TIMEOUT);
        let result = PipelineRegistry::builder().pipeline(pipeline).build();
        assert!(matches!(result, Err(ConfigError::MissingEntryPlaceholder(_))));
    }

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let pipeline = LanguagePipeline::new("sh", ".sh", ["sh", ENTRY_PLACEHOLDER], Duration::ZERO);
        let result = PipelineRegistry::builder().pipeline(pipeline).build();
        assert!(matches!(result, Err(ConfigError::ZeroTimeout(_))));
    }

    #[test]
    fn test_check_templates_missing() {
        let registry = PipelineRegistry::builtin(
            "/nonexistent/snipbox-template",
            DEFAULT_JS_TIMEOUT,
            DEFAULT_TS_TIMEOUT,
        )
        .unwrap();
        assert!(matches!(
            registry.check_templates(),
            Err(ConfigError::MissingTemplate(_))
        ));
    }
}
