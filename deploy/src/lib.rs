//! Сборка и публикация образа Smart Confidant, деплой в облака или локальный запуск.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

pub const DOCKER_USER: &str = "heffnt";
pub const DOCKER_IMAGE: &str = "smart_confidant";
pub const DOCKER_TAG: &str = "latest";
pub const LOCAL_PORT: u16 = 8080;
pub const CONTAINER_PORT: u16 = 8080;
/// Пункт меню по умолчанию (без `--interactive`).
pub const DEFAULT_CHOICE: u8 = 5;

pub const SERVICE_NAME: &str = "smart-confidant";
pub const REGION_GCP: &str = "us-central1";
pub const REGION_AZURE: &str = "eastus";
pub const REGION_AWS: &str = "us-east-1";

const SERVER_BIN: &str = "smart_confidant";
/// Dockerfile в корне workspace; `docker build` запускается оттуда.
pub const DOCKERFILE: &str = "Dockerfile";

pub fn full_image_name() -> String {
    format!("{}/{}:{}", DOCKER_USER, DOCKER_IMAGE, DOCKER_TAG)
}

pub fn registry_image() -> String {
    format!("docker.io/{}", full_image_name())
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Invalid choice: {0:?}")]
    InvalidChoice(String),
    #[error("{tool} not installed. Install: {install_url}")]
    ToolMissing {
        tool: &'static str,
        install_url: &'static str,
    },
    #[error("command `{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },
}

/// Пункт меню деплоя.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Gcp,
    Azure,
    Aws,
    Skip,
    RunLocal,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 5] = [
        MenuChoice::Gcp,
        MenuChoice::Azure,
        MenuChoice::Aws,
        MenuChoice::Skip,
        MenuChoice::RunLocal,
    ];

    pub fn parse(input: &str) -> Result<Self, DeployError> {
        match input.trim() {
            "1" => Ok(Self::Gcp),
            "2" => Ok(Self::Azure),
            "3" => Ok(Self::Aws),
            "4" => Ok(Self::Skip),
            "5" => Ok(Self::RunLocal),
            other => Err(DeployError::InvalidChoice(other.to_string())),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Gcp => 1,
            Self::Azure => 2,
            Self::Aws => 3,
            Self::Skip => 4,
            Self::RunLocal => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gcp => "GCP Cloud Run",
            Self::Azure => "Azure Container Apps",
            Self::Aws => "AWS App Runner (manual)",
            Self::Skip => "Skip deployment (image pushed to Docker Hub)",
            Self::RunLocal => "Run locally (smart_confidant server)",
        }
    }
}

/// Внешняя команда: программа, аргументы, дополнительные переменные окружения.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.envs {
            cmd.env(k, v);
        }
        cmd
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.envs {
            write!(f, "{}={} ", k, v)?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

pub fn build_command() -> ShellCommand {
    ShellCommand::new("docker")
        .arg("build")
        .arg("-t")
        .arg(full_image_name())
        .arg("-f")
        .arg(DOCKERFILE)
        .arg(".")
}

pub fn push_command() -> ShellCommand {
    ShellCommand::new("docker").arg("push").arg(full_image_name())
}

pub fn gcp_command() -> ShellCommand {
    ShellCommand::new("gcloud")
        .arg("run")
        .arg("deploy")
        .arg(SERVICE_NAME)
        .arg("--image")
        .arg(registry_image())
        .arg("--region")
        .arg(REGION_GCP)
        .arg("--platform")
        .arg("managed")
        .arg("--allow-unauthenticated")
        .arg("--port")
        .arg(CONTAINER_PORT.to_string())
}

pub fn azure_command() -> ShellCommand {
    ShellCommand::new("az")
        .arg("containerapp")
        .arg("up")
        .arg("--name")
        .arg(SERVICE_NAME)
        .arg("--image")
        .arg(registry_image())
        .arg("--ingress")
        .arg("external")
        .arg("--target-port")
        .arg(CONTAINER_PORT.to_string())
        .arg("--location")
        .arg(REGION_AZURE)
}

/// Ручные шаги для AWS App Runner (одной командой не разворачивается).
pub fn aws_manual_steps() -> Vec<String> {
    vec![
        "1. Go to: https://console.aws.amazon.com/apprunner".to_string(),
        format!(
            "2. Create a new service from 'Container registry' -> 'Docker Hub' (region {})",
            REGION_AWS
        ),
        format!("3. Use image: {}", registry_image()),
        format!("4. Set port to {}", CONTAINER_PORT),
    ]
}

/// Локальный запуск сервера: бинарь рядом с текущим, иначе `cargo run`.
pub fn local_run_command(current_exe: Option<&Path>) -> ShellCommand {
    let sibling = current_exe
        .and_then(Path::parent)
        .map(|dir| dir.join(format!("{}{}", SERVER_BIN, std::env::consts::EXE_SUFFIX)))
        .filter(|p| p.is_file());

    let cmd = match sibling {
        Some(path) => ShellCommand::new(path.display().to_string()),
        None => ShellCommand::new("cargo")
            .arg("run")
            .arg("--release")
            .arg("-p")
            .arg(SERVER_BIN),
    };
    cmd.env("PORT", LOCAL_PORT.to_string())
}

/// Проверка наличия CLI-инструмента через `<tool> --version`.
pub fn check_tool(tool: &str) -> bool {
    let status = Command::new(tool)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(s) => s.success(),
        Err(e) => {
            debug!("{} --version: {}", tool, e);
            false
        }
    }
}

/// Запускает команду с наследованием stdio.
pub fn run_cmd(command: &ShellCommand) -> Result<(), DeployError> {
    println!("  Running: {}", command);
    let failed = |reason: String| DeployError::CommandFailed {
        command: command.to_string(),
        reason,
    };
    let status = command
        .to_command()
        .status()
        .map_err(|e| failed(e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        let reason = match status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        warn!("{}: {}", command.program, reason);
        Err(failed(reason))
    }
}

fn require_tool(tool: &'static str, install_url: &'static str) -> Result<(), DeployError> {
    if check_tool(tool) {
        Ok(())
    } else {
        Err(DeployError::ToolMissing { tool, install_url })
    }
}

pub fn build_image() -> Result<(), DeployError> {
    println!("\n[1/2] Building Docker image...");
    run_cmd(&build_command())
}

pub fn push_image() -> Result<(), DeployError> {
    println!("\n[2/2] Pushing to Docker Hub...");
    println!("  Image: {}", full_image_name());
    run_cmd(&push_command())
}

pub fn deploy_gcp() -> Result<(), DeployError> {
    println!("\n--- Deploying to GCP Cloud Run ---");
    require_tool("gcloud", "https://cloud.google.com/sdk/docs/install")?;
    run_cmd(&gcp_command())
}

pub fn deploy_azure() -> Result<(), DeployError> {
    println!("\n--- Deploying to Azure Container Apps ---");
    require_tool(
        "az",
        "https://docs.microsoft.com/en-us/cli/azure/install-azure-cli",
    )?;
    run_cmd(&azure_command())
}

pub fn deploy_aws() -> Result<(), DeployError> {
    println!("\n--- Deploying to AWS App Runner ---");
    require_tool(
        "aws",
        "https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html",
    )?;
    println!("  AWS App Runner requires more setup than a single command.");
    println!("  Recommended: Use the AWS Console for first-time setup.");
    for step in aws_manual_steps() {
        println!("  {}", step);
    }
    Ok(())
}

pub fn run_local() -> Result<(), DeployError> {
    println!("\n--- Running locally ---");
    let exe: Option<PathBuf> = std::env::current_exe().ok();
    let cmd = local_run_command(exe.as_deref());
    println!("  PORT set to {}", LOCAL_PORT);
    println!("  Press Ctrl+C to stop the app\n");
    run_cmd(&cmd)
}

/// Выполняет выбранный пункт меню.
pub fn execute(choice: MenuChoice) -> Result<(), DeployError> {
    match choice {
        MenuChoice::Gcp => deploy_gcp(),
        MenuChoice::Azure => deploy_azure(),
        MenuChoice::Aws => deploy_aws(),
        MenuChoice::Skip => {
            println!("\nDone. Image available at:");
            println!("  {}", registry_image());
            Ok(())
        }
        MenuChoice::RunLocal => run_local(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_parsing() {
        assert_eq!(MenuChoice::parse("1").unwrap(), MenuChoice::Gcp);
        assert_eq!(MenuChoice::parse(" 5\n").unwrap(), MenuChoice::RunLocal);
        for choice in MenuChoice::ALL {
            assert_eq!(MenuChoice::parse(&choice.number().to_string()).unwrap(), choice);
        }
        assert!(matches!(
            MenuChoice::parse("6"),
            Err(DeployError::InvalidChoice(ref c)) if c == "6"
        ));
        assert!(MenuChoice::parse("").is_err());
        assert_eq!(
            MenuChoice::parse(&DEFAULT_CHOICE.to_string()).unwrap(),
            MenuChoice::RunLocal
        );
    }

    #[test]
    fn test_image_commands() {
        assert_eq!(full_image_name(), "heffnt/smart_confidant:latest");
        assert_eq!(
            build_command().to_string(),
            "docker build -t heffnt/smart_confidant:latest -f Dockerfile ."
        );
        assert_eq!(
            push_command().to_string(),
            "docker push heffnt/smart_confidant:latest"
        );
    }

    #[test]
    fn test_dockerfile_matches_deploy_targets() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join(DOCKERFILE);
        let dockerfile = std::fs::read_to_string(&path).expect("Dockerfile at workspace root");
        assert!(dockerfile.contains(&format!("cargo build --release -p {}", SERVER_BIN)));
        assert!(dockerfile.contains(&format!("EXPOSE {}", CONTAINER_PORT)));
        assert!(dockerfile.contains(&format!("PORT={}", CONTAINER_PORT)));
        assert!(dockerfile.contains("CONFIDANT_ASSETS_DIR=/app/assets"));
        assert!(dockerfile.contains("COPY server/assets /app/assets"));
    }

    #[test]
    fn test_cloud_commands() {
        assert_eq!(
            gcp_command().to_string(),
            "gcloud run deploy smart-confidant --image docker.io/heffnt/smart_confidant:latest \
             --region us-central1 --platform managed --allow-unauthenticated --port 8080"
        );
        assert_eq!(
            azure_command().to_string(),
            "az containerapp up --name smart-confidant --image docker.io/heffnt/smart_confidant:latest \
             --ingress external --target-port 8080 --location eastus"
        );
        let steps = aws_manual_steps();
        assert_eq!(steps.len(), 4);
        assert!(steps[2].ends_with("docker.io/heffnt/smart_confidant:latest"));
    }

    #[test]
    fn test_local_run_command() {
        let cmd = local_run_command(None);
        assert_eq!(cmd.to_string(), "PORT=8080 cargo run --release -p smart_confidant");

        let tmp = tempfile::tempdir().expect("tempdir");
        let server = tmp
            .path()
            .join(format!("smart_confidant{}", std::env::consts::EXE_SUFFIX));
        std::fs::write(&server, b"").expect("write");
        let cmd = local_run_command(Some(&tmp.path().join("deploy")));
        assert_eq!(cmd.program, server.display().to_string());
        assert_eq!(cmd.envs, vec![("PORT".to_string(), "8080".to_string())]);
    }

    #[test]
    fn test_check_tool_missing() {
        assert!(!check_tool("confidant-no-such-tool"));
    }
}
