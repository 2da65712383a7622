//! Template and filename resolution
//!
//! Templates live in one directory and use Jinja syntax:
//!
//!   <material>.<suffix>.template   material specific, e.g. PLA.ini.template
//!   default.<suffix>.template      fallback for the suffix (required)
//!   filename.template              output file name (optional)
//!
//! Every render sees the filament record plus an `sm2s` object carrying
//! program metadata and the suffix being produced.

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde_json::{json, Value};
use spoolsync_core::{Error, Filament, Result, Suffix};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_TEMPLATE_STEM: &str = "default";
pub const FILENAME_TEMPLATE: &str = "filename.template";

const BUILTIN_FILENAME: &str = "{{vendor.name}}-{{name}}.{{sm2s.slicer_suffix}}";

/// Program name and version exposed to templates as `sm2s.name` / `sm2s.version`.
#[derive(Clone, Debug)]
pub struct ProgramInfo {
    pub name: String,
    pub version: String,
}

impl ProgramInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

pub fn material_template_name(material: &str, suffix: &Suffix) -> String {
    format!("{}.{}.template", material, suffix)
}

pub fn default_template_name(suffix: &Suffix) -> String {
    format!("{}.{}.template", DEFAULT_TEMPLATE_STEM, suffix)
}

pub struct TemplateSet {
    env: Environment<'static>,
    program: ProgramInfo,
}

impl TemplateSet {
    pub fn from_dir(dir: impl AsRef<Path>, program: ProgramInfo) -> Self {
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.as_ref().to_path_buf()));
        env.set_keep_trailing_newline(true);
        // Filaments without a vendor still get a filename instead of an error.
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        Self { env, program }
    }

    /// Look a template up by name. A missing template is `Ok(None)`;
    /// a template that exists but does not compile is an error.
    pub fn lookup(&self, name: String) -> Result<Option<String>> {
        match self.env.get_template(&name) {
            Ok(_) => Ok(Some(name)),
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => Ok(None),
            Err(e) => Err(Error::template_error(name, e)),
        }
    }

    /// Name of the template `filament` renders with for `suffix`: the
    /// material template when there is one, else the suffix default.
    pub fn template_name_for(&self, filament: &Filament, suffix: &Suffix) -> Result<String> {
        if let Some(material) = filament.material.as_deref() {
            if let Some(name) = self.lookup(material_template_name(material, suffix))? {
                return Ok(name);
            }
        }
        let name = default_template_name(suffix);
        match self.lookup(name.clone())? {
            Some(name) => Ok(name),
            None => Err(Error::template_missing(suffix.as_str(), name)),
        }
    }

    /// Render the config text for `filament`. The result ends in a newline.
    pub fn render(&self, filament: &Filament, suffix: &Suffix) -> Result<String> {
        let name = self.template_name_for(filament, suffix)?;
        debug!("Using {} as template for {}", name, filament.label());

        let context = self.context(filament, suffix)?;
        debug!("Fields for the template: {}", context);

        let mut text = self.render_named(&name, &context)?;
        text.push('\n');
        Ok(text)
    }

    fn render_named(&self, name: &str, context: &Value) -> Result<String> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(context))
            .map_err(|e| Error::template_error(name, e))
    }

    /// Render the bare output file name for `filament` (no directory).
    pub fn filename(&self, filament: &Filament, suffix: &Suffix) -> Result<String> {
        let context = self.context(filament, suffix)?;
        let rendered = match self.lookup(FILENAME_TEMPLATE.to_string())? {
            Some(name) => self.render_named(&name, &context)?,
            None => self
                .env
                .render_str(BUILTIN_FILENAME, &context)
                .map_err(|e| Error::template_error(FILENAME_TEMPLATE, e))?,
        };

        let name = sanitize_filename(rendered.trim());
        if name.is_empty() {
            return Err(Error::template_error(
                FILENAME_TEMPLATE,
                format!("empty filename for {}", filament.label()),
            ));
        }
        Ok(name)
    }

    fn context(&self, filament: &Filament, suffix: &Suffix) -> Result<Value> {
        let now = chrono::Local::now();
        let mut context = serde_json::to_value(filament)?;
        if let Value::Object(fields) = &mut context {
            fields.insert(
                "sm2s".to_string(),
                json!({
                    "name": self.program.name,
                    "version": self.program.version,
                    "now": now.format("%a %b %e %H:%M:%S %Y").to_string(),
                    "now_int": now.timestamp(),
                    "slicer_suffix": suffix.as_str(),
                }),
            );
        }
        Ok(context)
    }
}

/// Path separators in a rendered name would escape the output directory.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
