//! Minimal CLI: mapping → type definition forest (JSON), and a date format probe.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

use es_typegen::compiler::{self, CompilerConfig};
use es_typegen::date_format;
use es_typegen::mapping::Mapping;
use es_typegen::naming::OverlapPolicy;
use es_typegen::option::{GlobalOption, MapOption};
use es_typegen::path_de;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile document-store mappings into paired (plain, wire) type definitions
#[derive(Parser, Debug)]
#[command(name = "es-typegen")]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile mappings and print the type definition forest as JSON
    Compile(CompileOut),
    /// compile a `||`-delimited date format and optionally round-trip values through it
    Date(DateProbe),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more mapping files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// JSON file with the global option (flags plus `type_option`)
    #[arg(long)]
    global_option: Option<PathBuf>,

    /// JSON file with per-field overrides, keyed by top-level field name
    #[arg(long)]
    map_option: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// root type name (defaults to the index name, else `Root`)
    #[arg(long)]
    root_type: Option<String>,

    /// prefix the root type name with the index name of the mapping
    #[arg(long, default_value_t = false)]
    prefix_with_index_name: bool,

    /// fail instead of suffixing when two fields would get the same type name
    #[arg(long, default_value_t = false)]
    fail_on_overlap: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DateProbe {
    /// e.g. `strict_date_optional_time||epoch_millis`
    #[arg(long)]
    format: String,

    /// marshal layout; must be one of the compiled layouts
    #[arg(long)]
    prefer: Option<String>,

    /// marshal as epoch numbers
    #[arg(long, default_value_t = false)]
    epoch: bool,

    /// raw wire values to unmarshal and re-marshal (quote strings: '"2024-01-01"')
    #[arg(long, num_args = 1..)]
    value: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn config(&self) -> anyhow::Result<CompilerConfig> {
        let mut config = CompilerConfig::default();
        if let Some(path) = self.global_option.as_ref() {
            config.global = path_de::from_file_with_path::<GlobalOption>(path)?;
        }
        if let Some(path) = self.map_option.as_ref() {
            config.fields = path_de::from_file_with_path::<MapOption>(path)?;
        }
        Ok(config)
    }

    fn load_process(&self, mut apply: impl FnMut(&Path, Mapping) -> anyhow::Result<()>) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {}", source_path.display()))?;
            let mapping = Mapping::from_json(&source)
                .with_context(|| format!("invalid mapping in {}", source_path.display()))?;
            apply(&source_path, mapping)?;
        }
        Ok(())
    }
}

impl CompileOut {
    fn root_name(&self, mapping: &Mapping) -> Option<String> {
        match (&self.root_type, mapping.index_name.as_deref(), self.prefix_with_index_name) {
            (Some(root), Some(index), true) => Some(format!("{index}_{root}")),
            (Some(root), _, _) => Some(root.clone()),
            (None, _, _) => None,
        }
    }

    fn run(&self) -> anyhow::Result<()> {
        let mut config = self.input_settings.config()?;
        if self.fail_on_overlap {
            config.naming.on_overlap = OverlapPolicy::Fail;
        }

        let mut forests = Vec::new();
        self.input_settings.load_process(|path, mapping| {
            let root = self.root_name(&mapping);
            let forest = compiler::compile_mapping(&mapping, root.as_deref(), &config)
                .with_context(|| format!("failed to compile {}", path.display()))?;
            tracing::info!(path = %path.display(), root = %forest.root, types = forest.len(), "compiled");
            forests.push(forest);
            Ok(())
        })?;

        let output = match forests.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            many => serde_json::to_string_pretty(many)?,
        };
        write_output(self.out.as_deref(), &output)
    }
}

impl DateProbe {
    fn run(&self) -> anyhow::Result<()> {
        let format = date_format::compile(&self.format, self.prefer.as_deref(), self.epoch)
            .with_context(|| format!("invalid date format `{}`", self.format))?;

        let mut values = Vec::with_capacity(self.value.len());
        for raw in &self.value {
            let entry = match format.unmarshal(raw) {
                Ok(dt) => json!({
                    "raw": raw,
                    "parsed": dt.to_rfc3339(),
                    "marshaled": format.marshal(&dt).context("failed to format date")?,
                }),
                Err(error) => json!({ "raw": raw, "error": error.to_string() }),
            };
            values.push(entry);
        }

        let report = json!({
            "format": format.source(),
            "layouts": format.layouts().collect::<Vec<_>>(),
            "epoch": format.epoch(),
            "marshal_layout": format.marshal_layout(),
            "prefer_epoch": format.prefers_epoch(),
            "values": Value::Array(values),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Compile(target) => target.run(),
            Command::Date(target) => target.run(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, contents).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
