//! Deployable project detection

use redeploy_core::project_name;
use redeploy_deployer::ComposeCommands;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_FILE_NAME: &str = ".env";

/// Recognized compose descriptor file names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeVariant {
    Yml,
    Yaml,
}

impl ComposeVariant {
    pub const ALL: [ComposeVariant; 2] = [ComposeVariant::Yml, ComposeVariant::Yaml];

    pub fn file_name(&self) -> &'static str {
        match self {
            ComposeVariant::Yml => "docker-compose.yml",
            ComposeVariant::Yaml => "docker-compose.yaml",
        }
    }
}

impl fmt::Display for ComposeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("No docker-compose.yml or docker-compose.yaml in {}", .0.display())]
    MissingDescriptor(PathBuf),

    #[error("Both docker-compose.yml and docker-compose.yaml exist in {}", .0.display())]
    AmbiguousDescriptor(PathBuf),

    #[error("{} is not valid YAML: {message}", .path.display())]
    InvalidYaml { path: PathBuf, message: String },

    #[error("{} has no top-level services declaration", .0.display())]
    MissingServices(PathBuf),

    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A directory that passed inspection. Built fresh on every inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub path: PathBuf,
    pub name: String,
    pub compose_variant: ComposeVariant,
    pub has_env_file: bool,
}

impl ProjectDescriptor {
    pub fn compose_file(&self) -> PathBuf {
        self.path.join(self.compose_variant.file_name())
    }

    /// Files worth snapshotting before an update, relative to the project
    pub fn config_files(&self) -> Vec<PathBuf> {
        let mut files = vec![PathBuf::from(self.compose_variant.file_name())];
        if self.has_env_file {
            files.push(PathBuf::from(ENV_FILE_NAME));
        }
        files
    }

    pub fn compose_commands(&self) -> ComposeCommands {
        ComposeCommands::new(self.compose_variant.file_name())
    }
}

pub struct ProjectInspector;

impl ProjectInspector {
    /// Validate `path` as a compose project: exactly one descriptor variant,
    /// whose YAML declares top-level `services`.
    pub async fn inspect(path: &Path) -> Result<ProjectDescriptor, InspectError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| InspectError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(InspectError::NotADirectory(path.to_path_buf()));
        }

        let present: Vec<ComposeVariant> = ComposeVariant::ALL
            .into_iter()
            .filter(|variant| path.join(variant.file_name()).is_file())
            .collect();

        let compose_variant = match present.as_slice() {
            [] => return Err(InspectError::MissingDescriptor(path.to_path_buf())),
            [variant] => *variant,
            _ => return Err(InspectError::AmbiguousDescriptor(path.to_path_buf())),
        };

        let compose_file = path.join(compose_variant.file_name());
        let contents = tokio::fs::read_to_string(&compose_file)
            .await
            .map_err(|source| InspectError::Io {
                path: compose_file.clone(),
                source,
            })?;
        if !declares_services(&contents).map_err(|message| InspectError::InvalidYaml {
            path: compose_file.clone(),
            message,
        })? {
            return Err(InspectError::MissingServices(compose_file));
        }

        Ok(ProjectDescriptor {
            path: path.to_path_buf(),
            name: project_name(path),
            compose_variant,
            has_env_file: path.join(ENV_FILE_NAME).is_file(),
        })
    }
}

fn declares_services(contents: &str) -> Result<bool, String> {
    let document: serde_yaml::Value = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
    Ok(document
        .as_mapping()
        .is_some_and(|mapping| mapping.contains_key("services")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares_services() {
        assert_eq!(
            declares_services("services:\n  web:\n    image: nginx\n"),
            Ok(true)
        );
        assert_eq!(
            declares_services("version: '3'\nservices:\n  db: {}\n"),
            Ok(true)
        );
        assert_eq!(declares_services("volumes:\n  data: {}\n"), Ok(false));
        // nested services key does not count
        assert_eq!(
            declares_services("x-meta:\n  services: []\n"),
            Ok(false)
        );
        assert_eq!(declares_services("- services\n"), Ok(false));
        assert!(declares_services("services: [unclosed").is_err());
    }

    #[test]
    fn test_config_files() {
        let descriptor = ProjectDescriptor {
            path: PathBuf::from("/srv/shop"),
            name: "shop".to_string(),
            compose_variant: ComposeVariant::Yaml,
            has_env_file: true,
        };
        assert_eq!(
            descriptor.config_files(),
            vec![PathBuf::from("docker-compose.yaml"), PathBuf::from(".env")]
        );
        assert_eq!(
            descriptor.compose_file(),
            PathBuf::from("/srv/shop/docker-compose.yaml")
        );
    }
}
