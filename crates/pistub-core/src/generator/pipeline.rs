//! Module-by-module stub generation.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::{default_module_list, load_module_list, GeneratorConfig, ModuleSpec};
use crate::defs::parser::{DefsParser, ParseCache};
use crate::errors::PistubResult;
use crate::generator::builder::NamespaceBuilder;
use crate::generator::emitter::write_module;
use crate::generator::enums::{augment, ModuleIntrospector, NullIntrospector, PythonIntrospector};
use crate::generator::overrides::{override_path_for, OverrideFile};
use crate::generator::resolver::apply_overrides;
use crate::models::{ModuleReport, Namespace};

/// State shared by every module of one run. The parse cache lives here so
/// defs files included from several modules are only read once.
pub struct Generator<'a> {
    config: GeneratorConfig,
    introspector: &'a dyn ModuleIntrospector,
    cache: ParseCache,
}

impl<'a> Generator<'a> {
    pub fn new(config: GeneratorConfig, introspector: &'a dyn ModuleIntrospector) -> Self {
        Self {
            config,
            introspector,
            cache: ParseCache::new(),
        }
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    /// Parse the defs files of `spec` and apply their override files.
    pub fn build_namespace(&mut self, spec: &ModuleSpec) -> PistubResult<Namespace> {
        let mut ns = Namespace::new();
        for defs in &spec.defs_files {
            if defs.is_file() {
                let records = DefsParser::new(&mut self.cache).parse_file(defs)?;
                NamespaceBuilder::new(&mut ns, self.config.doc_style).apply_all(&records)?;
            } else {
                debug!(module = %spec.module, "Skipping missing defs file {}", defs.display());
            }

            // Checked even when the defs file itself is missing.
            let override_path = override_path_for(defs);
            if override_path.is_file() {
                let overrides = OverrideFile::read(&override_path)?;
                let matched = apply_overrides(&mut ns, &overrides);
                debug!(module = %spec.module, matched, "Applied overrides");
            }
        }
        Ok(ns)
    }

    /// Generate one module. Constants from the live module are added even
    /// when no defs file was found; a namespace that is still empty writes
    /// nothing.
    pub fn generate_module(
        &mut self,
        spec: &ModuleSpec,
        output_dir: &Path,
    ) -> PistubResult<ModuleReport> {
        let mut ns = self.build_namespace(spec)?;
        let mut report = ModuleReport {
            module: spec.module.clone(),
            ..Default::default()
        };
        if self.config.introspect {
            augment(&mut ns, &spec.module, self.introspector)?;
        }
        if ns.is_empty() {
            debug!(module = %spec.module, "Nothing to write");
            return Ok(report);
        }

        let path = write_module(&ns, output_dir, &spec.module)?;

        report.output_path = Some(path.to_string_lossy().into_owned());
        report.classes = ns.classes().count();
        report.functions = ns.functions().count();
        report.constants = ns.constants().count();
        Ok(report)
    }

    /// Generate every module; a failing module is logged and reported but
    /// does not stop the others.
    pub fn generate_all(&mut self, specs: &[ModuleSpec], output_dir: &Path) -> Vec<ModuleReport> {
        specs
            .iter()
            .map(|spec| match self.generate_module(spec, output_dir) {
                Ok(report) => report,
                Err(e) => {
                    error!(module = %spec.module, "Generation failed: {e}");
                    ModuleReport {
                        module: spec.module.clone(),
                        error: Some(e.to_string()),
                        ..Default::default()
                    }
                }
            })
            .collect()
    }
}

/// The first source directory holding a `codegen` package.
pub fn find_codegen_dir(source_dirs: &[PathBuf]) -> Option<PathBuf> {
    source_dirs
        .iter()
        .find(|dir| dir.join("codegen").join("__init__.py").is_file())
        .cloned()
}

/// Inputs of one command-line or Python-level run.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub source_dirs: Vec<PathBuf>,
    /// Defaults to each source directory.
    pub output_dir: Option<PathBuf>,
    pub codegen_dir: Option<PathBuf>,
    /// JSON module list replacing the built-in one.
    pub modules_file: Option<PathBuf>,
    pub introspect: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            source_dirs: Vec::new(),
            output_dir: None,
            codegen_dir: None,
            modules_file: None,
            introspect: true,
        }
    }
}

/// Generate stubs for every module under every source directory.
pub fn run(options: &RunOptions) -> PistubResult<Vec<ModuleReport>> {
    let mut config = GeneratorConfig::from_env();
    config.introspect = options.introspect;
    let codegen_dir = options
        .codegen_dir
        .clone()
        .or_else(|| find_codegen_dir(&options.source_dirs));
    if let Some(dir) = codegen_dir {
        info!("Using codegen directory {}", dir.display());
        config.search_paths.push(dir);
    }

    let python = PythonIntrospector::new(config.search_paths.clone());
    let introspector: &dyn ModuleIntrospector = if config.introspect {
        &python
    } else {
        &NullIntrospector
    };

    let mut generator = Generator::new(config, introspector);
    let mut reports = Vec::new();
    for source_dir in &options.source_dirs {
        let modules = match &options.modules_file {
            Some(list) => load_module_list(list, source_dir)?,
            None => default_module_list(source_dir),
        };
        let output_dir = options.output_dir.as_deref().unwrap_or(source_dir);
        info!(
            "Generating {} modules from {} into {}",
            modules.len(),
            source_dir.display(),
            output_dir.display()
        );
        reports.extend(generator.generate_all(&modules, output_dir));
    }
    Ok(reports)
}
