use crate::core::models::CompiledModule;
use crate::core::session::BuildSession;
use crate::core::sourcemap::{count_newlines, SourceMapConcatenator};
use crate::utils::{Result, TabaError, Timer};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Wrap the compiled file set into one self-executing bundle with the
/// runtime module loader, streaming every emitted chunk through the source
/// map concatenator, and append the composite map reference comment.
///
/// Ids are assigned densely in the file set's order before any dependency
/// reference is resolved; a reference to a file without an id is a logic
/// bug, not bad input.
pub(crate) async fn assemble(
    session: &BuildSession,
    files: &[PathBuf],
    entry: &Path,
) -> Result<String> {
    let _timer = Timer::start("bundle assembly");

    let mut file_ids: HashMap<&Path, usize> = HashMap::with_capacity(files.len());
    for (id, file) in files.iter().enumerate() {
        file_ids.insert(file.as_path(), id);
    }

    let compiled: Vec<CompiledModule> =
        try_join_all(files.iter().map(|file| session.compile(file))).await?;

    let map_file = entry
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle.js".to_string());
    let mut concatenator = SourceMapConcatenator::new(session.options.map_mode, map_file);

    let preamble = "(function() {\nvar modules = {\n";
    concatenator.skip_lines(count_newlines(preamble));

    let mut bundle = String::from(preamble);
    for unit in &compiled {
        let edges = session.dependencies(&unit.file).await?;

        // The runtime lookup from raw specifier to module id.
        let mut dep_map = String::from("{");
        for (index, edge) in edges.iter().enumerate() {
            let id = file_ids.get(edge.path.as_path()).ok_or_else(|| {
                TabaError::integrity(format!(
                    "file imported that was never assigned an id: {}",
                    edge.path.display()
                ))
            })?;
            if index > 0 {
                dep_map.push(',');
            }
            dep_map.push_str(&serde_json::to_string(&edge.specifier)?);
            dep_map.push(':');
            dep_map.push_str(&id.to_string());
        }
        dep_map.push('}');

        let id = file_ids.get(unit.file.as_path()).ok_or_else(|| {
            TabaError::integrity(format!(
                "file compiled that has no id: {}",
                unit.file.display()
            ))
        })?;

        let dir = unit.file.parent().unwrap_or_else(|| Path::new(""));
        let dirname = dir
            .strip_prefix(&session.options.bundle_root)
            .unwrap_or(dir)
            .to_string_lossy()
            .into_owned();

        let prefix = format!(
            "{}: [function(require, module, exports) {{\nvar __dirname = {};\n",
            id,
            serde_json::to_string(&dirname)?
        );
        let suffix = format!("\n}}, {}],\n", dep_map);

        concatenator.add_source(&prefix, None)?;
        concatenator.add_source(&unit.code, unit.map.clone())?;
        concatenator.add_source(&suffix, None)?;

        bundle.push_str(&prefix);
        bundle.push_str(&unit.code);
        bundle.push_str(&suffix);
    }

    let entry_id = file_ids.get(entry).ok_or_else(|| {
        TabaError::integrity(format!("entry has no id: {}", entry.display()))
    })?;

    bundle.push_str("};\n");
    bundle.push_str(concat!(
        "var cache = {};\n",
        "function requireWith(mapping) {\n",
        "return function(name) {\n",
        "return loadModule(mapping[name]);\n",
        "};\n",
        "}\n",
        "function loadModule(id) {\n",
        "if (cache[id]) {\n",
        "return cache[id].exports;\n",
        "}\n",
        "var record = modules[id];\n",
        "var module = { exports: {} };\n",
        // Register the module before executing its body so circular
        // requires observe the partially-built exports object.
        "cache[id] = module;\n",
        "record[0].call(module.exports, requireWith(record[1]), module, module.exports);\n",
        "return cache[id].exports;\n",
        "}\n",
    ));
    bundle.push_str(&format!("loadModule({});\n}}());\n", entry_id));

    let comment = concatenator.into_map().to_comment()?;
    bundle.push_str(&comment);
    bundle.push('\n');

    Ok(bundle)
}
