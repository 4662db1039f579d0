use std::collections::BTreeMap;
use std::path::PathBuf;

/// Main class suffix of the interactive shell, which takes no path flags
const SHELL_MAIN_CLASS: &str = "RascalShell";

/// How the language tool is started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// A main class run by a Java virtual machine
    Jvm {
        java: PathBuf,
        classpath: Vec<PathBuf>,
        main_class: String,
        system_properties: BTreeMap<String, String>,
    },
    /// A standalone executable
    Native { executable: PathBuf },
}

impl Launcher {
    pub fn jvm(java: impl Into<PathBuf>, classpath: Vec<PathBuf>, main_class: impl Into<String>) -> Self {
        Launcher::Jvm {
            java: java.into(),
            classpath,
            main_class: main_class.into(),
            system_properties: BTreeMap::new(),
        }
    }

    pub fn native(executable: impl Into<PathBuf>) -> Self {
        Launcher::Native {
            executable: executable.into(),
        }
    }

    /// The java executable under `JAVA_HOME`, or `java` from the search path
    pub fn default_java() -> PathBuf {
        match std::env::var_os("JAVA_HOME") {
            Some(home) => PathBuf::from(home).join("bin").join("java"),
            None => PathBuf::from("java"),
        }
    }

    pub fn program(&self) -> &PathBuf {
        match self {
            Launcher::Jvm { java, .. } => java,
            Launcher::Native { executable } => executable,
        }
    }

    /// Same launcher with a different main class; native launchers are unchanged
    pub fn with_main_class(&self, class: &str) -> Self {
        match self {
            Launcher::Jvm {
                java,
                classpath,
                system_properties,
                ..
            } => Launcher::Jvm {
                java: java.clone(),
                classpath: classpath.clone(),
                main_class: class.to_string(),
                system_properties: system_properties.clone(),
            },
            native => native.clone(),
        }
    }

    /// Same launcher with `extra` appended to the classpath
    pub fn with_extra_classpath(&self, extra: &[PathBuf]) -> Self {
        match self {
            Launcher::Jvm {
                java,
                classpath,
                main_class,
                system_properties,
            } => {
                let mut classpath = classpath.clone();
                classpath.extend(extra.iter().cloned());
                Launcher::Jvm {
                    java: java.clone(),
                    classpath,
                    main_class: main_class.clone(),
                    system_properties: system_properties.clone(),
                }
            }
            native => native.clone(),
        }
    }

    /// Whether this launches the interactive shell instead of a batch tool
    pub fn is_shell(&self) -> bool {
        matches!(self, Launcher::Jvm { main_class, .. } if main_class.ends_with(SHELL_MAIN_CLASS))
    }
}
