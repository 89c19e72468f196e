use std::path::{Path, PathBuf};
use std::process;

use bash_compiler_core::resolver::{IgnoreList, Resolver};
use bash_compiler_core::{ConfigFile, Result};

use crate::{report_error, OutputFormat};

enum Resolution {
    Ignored,
    File(PathBuf),
}

pub(crate) fn cmd_resolve(config_path: &Path, names: &[String], output: OutputFormat, quiet: bool) {
    let resolved = match resolve_all(config_path, names) {
        Ok(r) => r,
        Err(e) => {
            report_error(&e, output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Text => {
            for (name, resolution) in &resolved {
                match resolution {
                    Resolution::Ignored => println!("{} ignored", name),
                    Resolution::File(path) => println!("{} {}", name, path.display()),
                }
            }
        }
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = resolved
                .iter()
                .map(|(name, resolution)| match resolution {
                    Resolution::Ignored => serde_json::json!({ "name": name, "ignored": true }),
                    Resolution::File(path) => serde_json::json!({
                        "name": name,
                        "ignored": false,
                        "path": path.display().to_string(),
                    }),
                })
                .collect();
            println!("{}", serde_json::Value::Array(entries));
        }
    }
}

fn resolve_all<'n>(config_path: &Path, names: &'n [String]) -> Result<Vec<(&'n str, Resolution)>> {
    let file = ConfigFile::load(config_path)?;
    let resolver = Resolver::new(file.compiler.search_dirs.clone());
    let ignore = IgnoreList::new(&file.compiler.ignore)?;

    names
        .iter()
        .map(|name| -> Result<(&'n str, Resolution)> {
            let resolution = if ignore.is_ignored(name) {
                Resolution::Ignored
            } else {
                Resolution::File(resolver.resolve_or_fail(name)?)
            };
            Ok((name.as_str(), resolution))
        })
        .collect()
}
