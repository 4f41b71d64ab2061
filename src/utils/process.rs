//! Запуск внешних утилит
//!
//! Команды собираются из явного списка аргументов и запускаются без
//! оболочки. Код возврата и stderr переводятся в `SubVoiceError::ExternalTool`.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use crate::error::{Result, SubVoiceError};

/// Найти исполняемый файл: явно указанный путь или поиск в PATH
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(SubVoiceError::Configuration(format!(
            "{} not found at {}",
            name,
            path.display()
        ))),
        None => which::which(name).map_err(|e| {
            SubVoiceError::Configuration(format!("{} is not installed or not in PATH: {}", name, e))
        }),
    }
}

/// Команда внешней утилиты
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Аргументы команды
    pub fn get_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    /// Имя программы для сообщений об ошибках
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .to_string()
    }

    /// Запустить команду и вернуть stdout.
    ///
    /// Процесс завершается, если ожидающая его задача отменена.
    pub async fn run(&self) -> Result<String> {
        log::debug!("Running {} {}", self.program.display(), self.get_args().join(" "));

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            log::debug!("{} failed: {}", self.program_name(), stderr.trim());
            return Err(SubVoiceError::ExternalTool {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
