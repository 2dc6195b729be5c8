//! Contract compilation
//!
//! Drives an external compiler and turns its output into a named artifact
//! (byte code plus interface description) or a diagnostic report.

use crate::contract::abi::Interface;
use crate::storage::save_json;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub const MSG_SUCCESS: &str = "Compilation successful.";
pub const MSG_WRONG_NAME: &str = "Wrong contract name.";
pub const MSG_FAILED: &str = "Compilation failed with errors.";

/// Matches "Warning: ..." and "file.sol:3:5: Warning: ..."
fn warning_marker() -> &'static Regex {
    static WARNING: OnceLock<Regex> = OnceLock::new();
    WARNING.get_or_init(|| Regex::new(r"(^|:\s*)Warning:").expect("warning pattern must compile"))
}

/// Compiler infrastructure errors
///
/// A source that fails to compile is not an error here: it yields an
/// unsuccessful `CompilationResult` carrying the diagnostics.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Compiler unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid compiler output: {0}")]
    InvalidOutput(String),
}

/// One compiled contract as emitted by the compiler
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledContract {
    pub byte_code: String,
    pub interface: Interface,
}

/// Raw compiler output: artifacts by contract name plus diagnostics
#[derive(Debug, Clone, Default)]
pub struct CompilerOutput {
    pub contracts: BTreeMap<String, CompiledContract>,
    pub diagnostics: Vec<String>,
}

/// Source text in, artifacts and diagnostics out
#[async_trait]
pub trait ContractCompiler: Send + Sync {
    async fn compile(&self, source: &str) -> Result<CompilerOutput, CompilerError>;
}

/// `solc` invoked with `--combined-json abi,bin`, source on stdin
pub struct SolcCompiler {
    program: PathBuf,
}

impl SolcCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self::new("solc")
    }
}

#[async_trait]
impl ContractCompiler for SolcCompiler {
    async fn compile(&self, source: &str) -> Result<CompilerOutput, CompilerError> {
        let mut child = Command::new(&self.program)
            .args(["--combined-json", "abi,bin", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CompilerError::Unavailable(format!("{}: {}", self.program.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(source.as_bytes())
                .await
                .map_err(|e| CompilerError::Unavailable(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CompilerError::Unavailable(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let contracts = if stdout.trim().is_empty() {
            BTreeMap::new()
        } else {
            parse_combined_json(&stdout)?
        };

        Ok(CompilerOutput {
            contracts,
            diagnostics: split_diagnostics(&stderr),
        })
    }
}

/// Parse `--combined-json` output, keyed by bare contract name
pub fn parse_combined_json(text: &str) -> Result<BTreeMap<String, CompiledContract>, CompilerError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| CompilerError::InvalidOutput(e.to_string()))?;
    let contracts = root
        .get("contracts")
        .and_then(Value::as_object)
        .ok_or_else(|| CompilerError::InvalidOutput("missing contracts".to_string()))?;

    let mut parsed = BTreeMap::new();
    for (key, entry) in contracts {
        let name = key.rsplit(':').next().unwrap_or(key).to_string();

        // Older compilers emit the interface as an embedded JSON string
        let interface = match entry.get("abi") {
            Some(Value::String(s)) => Interface::from_json(s),
            Some(v) => Interface::from_value(v.clone()),
            None => Ok(Interface::default()),
        }
        .map_err(|e| CompilerError::InvalidOutput(format!("{}: {}", name, e)))?;

        let byte_code = entry
            .get("bin")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        parsed.insert(
            name,
            CompiledContract {
                byte_code,
                interface,
            },
        );
    }
    Ok(parsed)
}

/// Diagnostics are separated by blank lines
fn split_diagnostics(stderr: &str) -> Vec<String> {
    stderr
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// Only the first line of a diagnostic carries its severity
fn is_warning(diagnostic: &str) -> bool {
    let first_line = diagnostic.lines().next().unwrap_or_default();
    warning_marker().is_match(first_line)
}

/// Outcome of one compile call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationResult {
    #[serde(default)]
    pub name: Option<String>,
    pub successful: bool,
    pub message: String,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub byte_code: String,
    pub interface_description: Interface,
}

/// Compiles sources and keeps a record of successful artifacts
pub struct CompilationService {
    compiler: Arc<dyn ContractCompiler>,
    output_dir: Option<PathBuf>,
}

impl CompilationService {
    pub fn new(compiler: Arc<dyn ContractCompiler>) -> Self {
        Self {
            compiler,
            output_dir: None,
        }
    }

    /// Write each successful artifact as `<dir>/<name>.json`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Compile source text. Without a name the first artifact is selected.
    pub async fn compile(
        &self,
        source: &str,
        name: Option<&str>,
    ) -> Result<CompilationResult, CompilerError> {
        let output = self.compiler.compile(source).await?;

        let (warnings, errors): (Vec<String>, Vec<String>) = output
            .diagnostics
            .into_iter()
            .partition(|d| is_warning(d));

        let resolved = match name {
            Some(n) => Some(n.to_string()),
            None => output.contracts.keys().next().cloned(),
        };
        let artifact = resolved
            .as_ref()
            .and_then(|n| output.contracts.get(n))
            .cloned();

        let result = match artifact {
            Some(contract) => CompilationResult {
                name: resolved,
                successful: true,
                message: MSG_SUCCESS.to_string(),
                warnings,
                errors,
                byte_code: contract.byte_code,
                interface_description: contract.interface,
            },
            None => CompilationResult {
                name: resolved,
                successful: false,
                message: if errors.is_empty() {
                    MSG_WRONG_NAME
                } else {
                    MSG_FAILED
                }
                .to_string(),
                warnings,
                errors,
                byte_code: String::new(),
                interface_description: Interface::default(),
            },
        };

        for warning in &result.warnings {
            log::warn!("{}", warning);
        }

        if result.successful {
            log::info!(
                "Compiled {} ({} bytes of code)",
                result.name.as_deref().unwrap_or_default(),
                result.byte_code.len() / 2
            );
            self.persist(&result).await;
        } else {
            log::info!("{}", result.message);
        }

        Ok(result)
    }

    /// Read a source file and compile it
    pub async fn compile_file(
        &self,
        path: &Path,
        name: Option<&str>,
    ) -> Result<CompilationResult, CompilerError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CompilerError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        self.compile(&source, name).await
    }

    async fn persist(&self, result: &CompilationResult) {
        let (Some(dir), Some(name)) = (&self.output_dir, &result.name) else {
            return;
        };
        let path = dir.join(format!("{}.json", name));
        match save_json(&path, result).await {
            Ok(()) => log::info!("Artifact written to {}", path.display()),
            Err(e) => log::warn!("Failed to write artifact {}: {}", path.display(), e),
        }
    }
}
