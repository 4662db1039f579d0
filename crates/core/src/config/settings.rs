use crate::{
    command::Launcher,
    error::{Error, Result},
    orchestrator::{DEFAULT_PARALLEL_MAX, OrchestratorOptions},
    report::SeverityPolicy,
    types::{PathConfig, WorkItem},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAMES: [&str; 2] = [".rascal-build.json", "rascal-build.json"];

fn yes() -> bool {
    true
}

fn default_srcs() -> Vec<PathBuf> {
    vec![PathBuf::from("src/main/rascal")]
}

fn default_main_module() -> String {
    "GenerateSources".to_string()
}

fn default_parallel_max() -> usize {
    DEFAULT_PARALLEL_MAX
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub launcher: LauncherConfig,
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub tutor: TutorConfig,
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub generate: GenerateConfig,
    #[serde(default)]
    pub verbose: bool,

    // Directory the config was loaded from (internal, not exposed in JSON)
    #[serde(skip)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathsConfig {
    #[serde(default = "default_srcs")]
    pub srcs: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignores: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libs: Vec<PathBuf>,
    /// Resolved dependency artifacts; only Rascal libraries among them are used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_sources: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            srcs: default_srcs(),
            ignores: Vec::new(),
            libs: Vec::new(),
            dependencies: Vec::new(),
            bin: None,
            generated_sources: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProjectConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basedir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LauncherConfig {
    /// Java executable; defaults to `$JAVA_HOME/bin/java`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<PathBuf>,
    /// Jar holding the language runtime and its main classes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_jar: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_classpath: Vec<PathBuf>,
    /// Native tool started instead of a JVM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub system_properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompileConfig {
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_parallel_max")]
    pub parallel_max: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel_pre_checks: Vec<PathBuf>,
    #[serde(default)]
    pub log_path_config: bool,
    #[serde(default)]
    pub log_imports: bool,
    #[serde(default)]
    pub log_written_files: bool,
    #[serde(default = "yes")]
    pub warn_unused: bool,
    #[serde(default = "yes")]
    pub warn_unused_variables: bool,
    #[serde(default = "yes")]
    pub warn_unused_formals: bool,
    #[serde(default = "yes")]
    pub warn_unused_pattern_formals: bool,
    #[serde(default)]
    pub errors_as_warnings: bool,
    #[serde(default)]
    pub warnings_as_errors: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            parallel_max: DEFAULT_PARALLEL_MAX,
            parallel_pre_checks: Vec::new(),
            log_path_config: false,
            log_imports: false,
            log_written_files: false,
            warn_unused: true,
            warn_unused_variables: true,
            warn_unused_formals: true,
            warn_unused_pattern_formals: true,
            errors_as_warnings: false,
            warnings_as_errors: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TutorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<String>,
    #[serde(default = "yes")]
    pub is_package_course: bool,
    /// Jar with the screenshot feature, added to the classpath when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshotter: Option<PathBuf>,
    #[serde(default)]
    pub errors_as_warnings: bool,
    #[serde(default)]
    pub warnings_as_errors: bool,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            license: None,
            citation: None,
            funding: None,
            release_notes: None,
            sources: None,
            issues: None,
            is_package_course: true,
            screenshotter: None,
            errors_as_warnings: false,
            warnings_as_errors: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PackageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_lookup: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerateConfig {
    #[serde(default = "default_main_module")]
    pub main_module: String,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            main_module: default_main_module(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.root = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
        let mut current = start_path;

        loop {
            for name in CONFIG_FILE_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            current = current.parent()?;
        }
    }

    /// The nearest config file above `start_path`, or defaults rooted there
    pub fn discover(start_path: &Path) -> Result<Self> {
        match Self::find_config_file(start_path) {
            Some(path) => {
                tracing::debug!("Using config file {}", path.display());
                Self::load_from_file(&path)
            }
            None => Ok(Self {
                root: Some(start_path.to_path_buf()),
                ..Default::default()
            }),
        }
    }

    /// Directory every relative path is resolved against
    pub fn base_dir(&self) -> PathBuf {
        let root = self.root.clone().unwrap_or_else(|| PathBuf::from("."));
        match &self.project.basedir {
            Some(basedir) => root.join(basedir),
            None => root,
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    fn resolve_all(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths.iter().map(|p| self.resolve(p)).collect()
    }

    pub fn bin(&self) -> PathBuf {
        match &self.paths.bin {
            Some(bin) => self.resolve(bin),
            None => self.base_dir().join("target").join("classes"),
        }
    }

    pub fn generated_sources(&self) -> PathBuf {
        match &self.paths.generated_sources {
            Some(generated) => self.resolve(generated),
            None => self.base_dir().join("target").join("generatedSources"),
        }
    }

    pub fn path_config(&self) -> PathConfig {
        PathConfig::new(
            self.resolve_all(&self.paths.srcs),
            self.bin(),
            self.generated_sources(),
        )
        .with_ignores(self.resolve_all(&self.paths.ignores))
        .with_libs(self.resolve_all(&self.paths.libs))
    }

    pub fn dependencies(&self) -> Vec<PathBuf> {
        self.resolve_all(&self.paths.dependencies)
    }

    pub fn pre_checks(&self) -> Vec<WorkItem> {
        self.compile
            .parallel_pre_checks
            .iter()
            .map(|p| WorkItem::new(self.resolve(p)))
            .collect()
    }

    /// How the tool is started: a native executable when one is configured,
    /// otherwise `main_class` from the runtime jar.
    pub fn launcher(&self, main_class: &str) -> Result<Launcher> {
        if let Some(executable) = &self.launcher.executable {
            return Ok(Launcher::native(self.resolve(executable)));
        }

        let runtime = self.launcher.runtime_jar.as_ref().ok_or_else(|| {
            Error::ConfigError(
                "No launcher configured: set launcher.runtime_jar or launcher.executable".to_string(),
            )
        })?;

        let mut classpath = vec![self.resolve(runtime)];
        classpath.extend(self.resolve_all(&self.launcher.extra_classpath));

        let java = self
            .launcher
            .java
            .clone()
            .unwrap_or_else(Launcher::default_java);
        let mut launcher = Launcher::jvm(java, classpath, main_class);
        if let Launcher::Jvm {
            system_properties, ..
        } = &mut launcher
        {
            system_properties.extend(self.launcher.system_properties.clone());
        }
        Ok(launcher)
    }

    /// Flags of the compiler's main function, next to the module list
    pub fn compiler_parameters(&self) -> BTreeMap<String, String> {
        let compile = &self.compile;
        [
            ("logPathConfig", compile.log_path_config),
            ("logImports", compile.log_imports),
            ("verbose", self.verbose),
            ("logWrittenFiles", compile.log_written_files),
            ("warnUnused", compile.warn_unused),
            ("warnUnusedVariables", compile.warn_unused_variables),
            ("warnUnusedFormals", compile.warn_unused_formals),
            ("warnUnusedPatternFormals", compile.warn_unused_pattern_formals),
            ("warningsAsErrors", compile.warnings_as_errors),
            ("errorsAsWarnings", compile.errors_as_warnings),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }

    pub fn severity_policy(&self) -> SeverityPolicy {
        SeverityPolicy {
            warnings_as_errors: self.compile.warnings_as_errors,
            errors_as_warnings: self.compile.errors_as_warnings,
        }
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            parallel: self.compile.parallel,
            parallel_max: self.compile.parallel_max,
            policy: self.severity_policy(),
        }
    }

    /// Project name, falling back to the name of the base directory
    pub fn project_name(&self) -> String {
        self.project.name.clone().unwrap_or_else(|| {
            self.base_dir()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        })
    }

    /// Where packaged sources are looked up: `|mvn://<group>--<name>--<version>/|`
    pub fn source_lookup(&self) -> String {
        if let Some(lookup) = &self.package.source_lookup {
            return lookup.clone();
        }
        format!(
            "|mvn://{}--{}--{}/|",
            self.project.group.as_deref().unwrap_or("unknown"),
            self.project_name(),
            self.project.version.as_deref().unwrap_or("0.0.0"),
        )
    }

    /// Parameters of the documentation compiler
    pub fn tutor_parameters(&self) -> BTreeMap<String, String> {
        let tutor = &self.tutor;
        let document = |configured: &Option<PathBuf>, default: &str| {
            let path = match configured {
                Some(path) => self.resolve(path),
                None => self.base_dir().join(default),
            };
            path.display().to_string()
        };
        let name = self.project_name();

        let mut parameters = BTreeMap::from([
            ("license".to_string(), document(&tutor.license, "LICENSE.md")),
            ("citation".to_string(), document(&tutor.citation, "CITATION.md")),
            ("funding".to_string(), document(&tutor.funding, "FUNDING.md")),
            (
                "releaseNotes".to_string(),
                document(&tutor.release_notes, "RELEASE-NOTES.md"),
            ),
            (
                "sources".to_string(),
                tutor
                    .sources
                    .clone()
                    .unwrap_or_else(|| format!("http://github.com/usethesource/{name}/blob/main")),
            ),
            (
                "issues".to_string(),
                tutor
                    .issues
                    .clone()
                    .unwrap_or_else(|| format!("http://github.com/usethesource/{name}/issues")),
            ),
            ("isPackageCourse".to_string(), tutor.is_package_course.to_string()),
            ("errorsAsWarnings".to_string(), tutor.errors_as_warnings.to_string()),
            ("warningsAsErrors".to_string(), tutor.warnings_as_errors.to_string()),
        ]);

        if tutor.is_package_course {
            parameters.insert("packageName".to_string(), name);
        }
        parameters
    }
}
