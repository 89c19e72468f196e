//! `# @embed <resource> AS <name>`: inline a file or directory into the
//! generated script as a base64 payload with its md5 checksum.

use std::collections::HashMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::{Captures, Regex};
use serde_json::json;

use super::{required_template, AnnotationProcessor};
use crate::archive;
use crate::error::{CompileError, Result};
use crate::session::CompileSession;

static EMBED_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*@embed\s+(?P<resource>.+?)\s+(?i:as)\s+(?P<name>.+)$")
        .expect("embed pattern is valid")
});

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)\}|\$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)")
        .expect("env var pattern is valid")
});

#[derive(Debug, Default)]
pub struct EmbedProcessor {
    file_template: String,
    dir_template: String,
    /// `AS` names seen in the current pass, with their line number.
    used_names: HashMap<String, usize>,
}

/// Payload of an embedded resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPayload {
    pub base64: String,
    pub md5sum: String,
}

impl EmbeddedPayload {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        EmbeddedPayload {
            base64: BASE64.encode(bytes),
            md5sum: md5_hex(bytes),
        }
    }
}

/// Compute MD5 of bytes and return lowercase hex string.
fn md5_hex(bytes: &[u8]) -> String {
    use md5::Digest as _;
    let digest = md5::Md5::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Expand `$VAR` and `${VAR}` from the process environment; unset
/// variables expand to the empty string.
pub fn expand_env(value: &str) -> String {
    ENV_VAR
        .replace_all(value, |caps: &Captures<'_>| {
            let name = caps
                .name("braced")
                .or_else(|| caps.name("bare"))
                .map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(unix)]
fn file_mode(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:o}", metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() {
        "444".to_string()
    } else {
        "644".to_string()
    }
}

/// Payload for a directory: a reproducible tar.gz of its files, built in a
/// temporary file that is removed when this function returns.
pub fn directory_payload(dir: &Path) -> std::io::Result<EmbeddedPayload> {
    let files = archive::collect_files(dir)?;
    let mut archive_file = tempfile::NamedTempFile::new()?;
    archive::write_tar_gz(
        archive_file.as_file_mut(),
        dir,
        &files,
        archive::anonymize_header,
    )?;
    let bytes = std::fs::read(archive_file.path())?;
    Ok(EmbeddedPayload::from_bytes(&bytes))
}

impl EmbedProcessor {
    fn embed(
        &self,
        session: &CompileSession<'_>,
        resource: &Path,
        as_name: &str,
        line: usize,
    ) -> Result<String> {
        let unsupported = |source: std::io::Error| CompileError::UnsupportedEmbeddedResource {
            as_name: as_name.to_string(),
            resource: resource.to_path_buf(),
            line,
            source,
        };

        let metadata = std::fs::metadata(resource).map_err(unsupported)?;
        if metadata.is_file() {
            let bytes = std::fs::read(resource).map_err(|e| CompileError::io(resource, e))?;
            let payload = EmbeddedPayload::from_bytes(&bytes);
            tracing::debug!(resource = %resource.display(), as_name, md5 = %payload.md5sum, "embedding file");
            session.renderer.render(
                &self.file_template,
                &json!({
                    "asName": as_name,
                    "fileMode": file_mode(&metadata),
                    "base64": payload.base64,
                    "md5sum": payload.md5sum,
                }),
            )
        } else if metadata.is_dir() {
            let payload = directory_payload(resource).map_err(|source| CompileError::Archive {
                resource: resource.to_path_buf(),
                source,
            })?;
            tracing::debug!(resource = %resource.display(), as_name, md5 = %payload.md5sum, "embedding directory");
            session.renderer.render(
                &self.dir_template,
                &json!({
                    "asName": as_name,
                    "base64": payload.base64,
                    "md5sum": payload.md5sum,
                }),
            )
        } else {
            Err(unsupported(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "neither a regular file nor a directory",
            )))
        }
    }
}

impl AnnotationProcessor for EmbedProcessor {
    fn name(&self) -> &'static str {
        "embed"
    }

    fn init(&mut self, session: &CompileSession<'_>) -> Result<()> {
        let annotations = &session.config.annotations;
        self.file_template = required_template(
            "embed",
            "embed_file_template",
            annotations.embed_file_template.as_ref(),
        )?;
        self.dir_template = required_template(
            "embed",
            "embed_dir_template",
            annotations.embed_dir_template.as_ref(),
        )?;
        Ok(())
    }

    fn reset(&mut self) {
        self.used_names.clear();
    }

    fn parse_function(&mut self, _session: &mut CompileSession<'_>, _name: &str) -> Result<()> {
        Ok(())
    }

    fn process(&mut self, _session: &mut CompileSession<'_>) -> Result<()> {
        Ok(())
    }

    fn post_process(&mut self, session: &CompileSession<'_>, code: String) -> Result<String> {
        let mut out = String::with_capacity(code.len());
        for (index, line) in code.lines().enumerate() {
            let line_number = index + 1;
            let Some(caps) = EMBED_DIRECTIVE.captures(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };

            let resource_text = caps["resource"].trim().to_string();
            let as_name = caps["name"].trim().to_string();
            let resource = PathBuf::from(expand_env(&resource_text));

            if let Some(&first_line) = self.used_names.get(&as_name) {
                return Err(CompileError::DuplicatedAsName {
                    as_name,
                    resource: resource_text,
                    line: line_number,
                    first_line,
                });
            }
            self.used_names.insert(as_name.clone(), line_number);

            let rendered = self.embed(session, &resource, &as_name, line_number)?;
            out.push_str(&rendered);
            if !rendered.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }
}
