use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use bash_compiler_core::{
    CompileError, Compiler, ConfigFile, MiniJinjaRenderer, Result, TemplateRenderer,
};

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_compile(config_path: &Path, out: Option<&Path>, output: OutputFormat, quiet: bool) {
    match compile(config_path, out) {
        Ok(Some(path)) => {
            if quiet {
                return;
            }
            match output {
                OutputFormat::Text => println!("wrote {}", path.display()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "output": path.display().to_string() })
                ),
            }
        }
        Ok(None) => {}
        Err(e) => {
            report_error(&e, output, quiet);
            process::exit(1);
        }
    }
}

/// Run a full compile. Returns the file written, or `None` when the script
/// went to stdout.
fn compile(config_path: &Path, out: Option<&Path>) -> Result<Option<PathBuf>> {
    let file = ConfigFile::load(config_path)?;
    let config = &file.compiler;
    let context = file.template_context();

    let renderer = MiniJinjaRenderer::from_dirs(&config.template_dirs)?;
    let skeleton_path = config
        .skeleton
        .as_deref()
        .ok_or_else(|| CompileError::config(config_path, "compiler.skeleton is required"))?;
    let skeleton =
        fs::read_to_string(skeleton_path).map_err(|e| CompileError::io(skeleton_path, e))?;
    let host_code = renderer
        .render_content(&skeleton, &context)
        .map_err(|e| match e {
            CompileError::Template { message, .. } => {
                CompileError::template(skeleton_path.display().to_string(), message)
            }
            other => other,
        })?;

    let code = Compiler::new(config, &renderer).compile(&host_code, &context)?;

    match out.or(config.output.as_deref()) {
        Some(path) => {
            write_executable(path, &code)?;
            tracing::debug!(path = %path.display(), bytes = code.len(), "wrote compiled script");
            Ok(Some(path.to_path_buf()))
        }
        None => {
            print!("{}", code);
            Ok(None)
        }
    }
}

fn write_executable(path: &Path, code: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
    }
    fs::write(path, code).map_err(|e| CompileError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))
            .map_err(|e| CompileError::io(path, e))?;
    }
    Ok(())
}
