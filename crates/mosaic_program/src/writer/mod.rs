//! Source Writers
//!
//! Turns a [`Program`] into source text for a [`TargetLanguage`]. The
//! structure of each language lives in a minijinja template embedded in the
//! binary; this module only prepares the template context (declarations,
//! interface bindings and the ordered statement list).
//!
//! Every input and output parameter becomes a local of `main`. The prologue
//! copies the stage interface into those locals and the epilogue copies the
//! outputs back, so library functions can always take parameters by `inout`.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{AutoEscape, Environment, Error, ErrorKind, syntax::SyntaxConfig};
use mosaic_core::{CapabilityFlags, Result, ShaderError, ShaderStage, TargetLanguage};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::invocation::FunctionInvocation;
use crate::parameter::{Content, DataType, Parameter, ParameterKind, Semantic};
use crate::program::Program;

static WRITER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/writer/templates"]
struct WriterTemplates;

fn get_env() -> &'static Environment<'static> {
    WRITER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        match SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
        {
            Ok(syntax) => env.set_syntax(syntax),
            Err(e) => log::error!("Failed to configure writer template syntax: {e}"),
        }
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.set_loader(template_loader);

        env
    })
}

fn template_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if name.ends_with(".jinja") {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.jinja"))
    };

    match WriterTemplates::get(&filename) {
        Some(file) => match std::str::from_utf8(file.data.as_ref()) {
            Ok(source) => Ok(Some(source.to_owned())),
            Err(e) => Err(Error::new(
                ErrorKind::TemplateNotFound,
                format!("template '{filename}' is not valid UTF-8: {e}"),
            )),
        },
        None => Ok(None),
    }
}

// ============================================================================
// Template Context
// ============================================================================

#[derive(Debug, Serialize)]
struct UniformDecl {
    ty: &'static str,
    name: String,
    array: String,
    register: String,
}

#[derive(Debug, Serialize)]
struct InterfaceVar {
    ty: &'static str,
    /// Local the body works on.
    name: String,
    /// Attribute / varying / builtin the local is copied from or to.
    interface: String,
    /// `false` for builtins (`gl_Position`, `gl_FragColor`).
    declare: bool,
    /// HLSL semantic, empty for GLSL.
    semantic: String,
}

#[derive(Debug, Serialize)]
struct LocalDecl {
    ty: &'static str,
    name: String,
}

#[derive(Debug, Serialize)]
struct ProgramContext {
    header: String,
    version: Option<&'static str>,
    precision: Option<&'static str>,
    input_qualifier: &'static str,
    output_qualifier: &'static str,
    includes: Vec<String>,
    uniforms: Vec<UniformDecl>,
    inputs: Vec<InterfaceVar>,
    outputs: Vec<InterfaceVar>,
    locals: Vec<LocalDecl>,
    body: Vec<String>,
}

// ============================================================================
// ProgramWriter
// ============================================================================

/// Emits source for one target language.
#[derive(Debug, Clone, Copy)]
pub struct ProgramWriter {
    language: TargetLanguage,
}

impl ProgramWriter {
    #[must_use]
    pub fn new(language: TargetLanguage) -> Self {
        Self { language }
    }

    #[inline]
    #[must_use]
    pub fn language(&self) -> TargetLanguage {
        self.language
    }

    /// Renders `program` to source text. Output is a pure function of the
    /// program contents.
    pub fn write(&self, program: &Program) -> Result<String> {
        let context = self.build_context(program)?;
        let template_name = if self.language.is_glsl_family() { "glsl" } else { "hlsl" };

        let template = get_env()
            .get_template(template_name)
            .map_err(|e| ShaderError::Template(e.to_string()))?;
        template
            .render(&context)
            .map_err(|e| ShaderError::Template(format!("{e:#}")))
    }

    fn build_context(&self, program: &Program) -> Result<ProgramContext> {
        let stage = program.stage();
        let lang = self.language;
        let es = lang == TargetLanguage::GlslEs;

        let (version, precision) = match lang {
            TargetLanguage::Glsl => (Some("150"), None),
            TargetLanguage::GlslEs => {
                let high = stage == ShaderStage::Vertex
                    || program.capabilities().supports(CapabilityFlags::HIGH_PRECISION_FRAGMENT);
                (Some("100"), Some(if high { "highp" } else { "mediump" }))
            }
            TargetLanguage::Hlsl => (None, None),
        };

        let (input_qualifier, output_qualifier) = match (es, stage) {
            (true, ShaderStage::Vertex) => ("attribute", "varying"),
            (true, ShaderStage::Fragment) => ("varying", ""),
            (false, _) => ("in", "out"),
        };

        let includes = program
            .dependencies()
            .map(|d| format!("{d}.{}", lang.include_extension()))
            .collect();

        let uniforms = program
            .uniforms()
            .map(|p| UniformDecl {
                ty: type_name(lang, p.data_type()),
                name: p.name().to_owned(),
                array: p.array_size().map(|n| format!("[{n}]")).unwrap_or_default(),
                register: if lang == TargetLanguage::Hlsl && p.data_type() == DataType::Sampler2D {
                    format!(" : register(s{})", p.index())
                } else {
                    String::new()
                },
            })
            .collect();

        let inputs = program
            .inputs()
            .map(|p| self.interface_var(stage, p))
            .collect::<Result<Vec<_>>>()?;
        let outputs = program
            .outputs()
            .map(|p| self.interface_var(stage, p))
            .collect::<Result<Vec<_>>>()?;

        let locals = program
            .locals()
            .map(|p| LocalDecl {
                ty: type_name(lang, p.data_type()),
                name: p.name().to_owned(),
            })
            .collect();

        let body = program
            .entry_point()
            .sorted_invocations()
            .into_iter()
            .map(|inv| self.statement(program, inv))
            .collect::<Result<Vec<_>>>()?;

        Ok(ProgramContext {
            header: format!("{} program generated by mosaic ({lang})", stage.name()),
            version,
            precision,
            input_qualifier,
            output_qualifier,
            includes,
            uniforms,
            inputs,
            outputs,
            locals,
            body,
        })
    }

    fn interface_var(&self, stage: ShaderStage, p: &Parameter) -> Result<InterfaceVar> {
        let lang = self.language;
        let ty = type_name(lang, p.data_type());
        let is_input = p.kind() == ParameterKind::Input;

        if lang == TargetLanguage::Hlsl {
            let semantic = match (stage, p.semantic()) {
                (ShaderStage::Vertex, Semantic::Position) if !is_input => "POSITION".to_owned(),
                (ShaderStage::Vertex, _) if is_input => hlsl_semantic(p.semantic(), p.index()),
                (_, Semantic::Color) if !is_input => format!("COLOR{}", p.index()),
                _ => format!("TEXCOORD{}", p.index()),
            };
            let prefix = if is_input { "in" } else { "out" };
            return Ok(InterfaceVar {
                ty,
                name: p.name().to_owned(),
                interface: format!("{prefix}_{}", p.name()),
                declare: true,
                semantic: format!(" : {semantic}"),
            });
        }

        let (interface, declare) = match (stage, is_input) {
            (ShaderStage::Vertex, true) => (glsl_attribute_name(p), true),
            (ShaderStage::Vertex, false) if p.content() == Content::PositionProjectiveSpace => {
                ("gl_Position".to_owned(), false)
            }
            (ShaderStage::Fragment, false) => {
                if p.semantic() != Semantic::Color {
                    return Err(ShaderError::Template(format!(
                        "fragment output '{}' has no colour binding",
                        p.name()
                    )));
                }
                match (lang, p.index()) {
                    (TargetLanguage::GlslEs, 0) => ("gl_FragColor".to_owned(), false),
                    (TargetLanguage::GlslEs, i) => (format!("gl_FragData[{i}]"), false),
                    (_, 0) => ("fragColour".to_owned(), true),
                    (_, i) => (format!("fragColour{i}"), true),
                }
            }
            _ => (format!("v{}_{}", p.semantic().short_name(), p.index()), true),
        };

        Ok(InterfaceVar {
            ty,
            name: p.name().to_owned(),
            interface,
            declare,
            semantic: String::new(),
        })
    }

    fn statement(&self, program: &Program, inv: &FunctionInvocation) -> Result<String> {
        let mut args: Vec<String> = Vec::with_capacity(inv.operands().len());
        for operand in inv.operands() {
            let Some(param) = program.parameter(operand.parameter) else {
                return Err(ShaderError::UnresolvedOperand {
                    function: inv.function_name().to_owned(),
                    stage: program.stage(),
                    index: operand.parameter.raw(),
                });
            };
            let expr = if param.kind() == ParameterKind::Constant {
                self.literal(param)
            } else {
                format!("{}{}", param.name(), operand.mask.swizzle())
            };
            match args.last_mut() {
                Some(prev) if operand.is_index() => {
                    prev.push_str(&format!("[int({expr})]"));
                }
                _ => args.push(expr),
            }
        }
        Ok(format!("{}({});", inv.function_name(), args.join(", ")))
    }

    fn literal(&self, param: &Parameter) -> String {
        let value = param.value().unwrap_or_default();
        let n = param.data_type().component_count().clamp(1, 4);
        if n == 1 {
            return format_float(value[0]);
        }
        let parts: Vec<_> = value[..n].iter().map(|v| format_float(*v)).collect();
        format!("{}({})", type_name(self.language, param.data_type()), parts.join(", "))
    }
}

/// Shader float literal. Non-finite values have no literal form and become `0.0`.
fn format_float(v: f32) -> String {
    if !v.is_finite() {
        return "0.0".to_owned();
    }
    let s = v.to_string();
    if s.contains('.') { s } else { format!("{s}.0") }
}

fn type_name(lang: TargetLanguage, ty: DataType) -> &'static str {
    if lang == TargetLanguage::Hlsl {
        match ty {
            DataType::Float => "float",
            DataType::Float2 => "float2",
            DataType::Float3 => "float3",
            DataType::Float4 => "float4",
            DataType::Mat2x4 => "float2x4",
            DataType::Mat3x3 => "float3x3",
            DataType::Mat3x4 => "float3x4",
            DataType::Mat4x4 => "float4x4",
            DataType::Sampler2D => "sampler2D",
        }
    } else {
        match ty {
            DataType::Float => "float",
            DataType::Float2 => "vec2",
            DataType::Float3 => "vec3",
            DataType::Float4 => "vec4",
            DataType::Mat2x4 => "mat2x4",
            DataType::Mat3x3 => "mat3",
            DataType::Mat3x4 => "mat3x4",
            DataType::Mat4x4 => "mat4",
            DataType::Sampler2D => "sampler2D",
        }
    }
}

fn glsl_attribute_name(p: &Parameter) -> String {
    match p.semantic() {
        Semantic::Position => "vertex".to_owned(),
        Semantic::Normal => "normal".to_owned(),
        Semantic::Tangent => "tangent".to_owned(),
        Semantic::Binormal => "binormal".to_owned(),
        Semantic::BlendIndices => "blendIndices".to_owned(),
        Semantic::BlendWeights => "blendWeights".to_owned(),
        Semantic::Color if p.index() == 0 => "colour".to_owned(),
        Semantic::Color => "secondary_colour".to_owned(),
        Semantic::TextureCoordinates => format!("uv{}", p.index()),
        Semantic::Unknown => format!("attr_{}", p.name()),
    }
}

fn hlsl_semantic(semantic: Semantic, index: u8) -> String {
    match semantic {
        Semantic::Position => "POSITION".to_owned(),
        Semantic::Normal => "NORMAL".to_owned(),
        Semantic::Tangent => "TANGENT".to_owned(),
        Semantic::Binormal => "BINORMAL".to_owned(),
        Semantic::BlendIndices => "BLENDINDICES".to_owned(),
        Semantic::BlendWeights => "BLENDWEIGHT".to_owned(),
        Semantic::Color => format!("COLOR{index}"),
        Semantic::TextureCoordinates | Semantic::Unknown => format!("TEXCOORD{index}"),
    }
}
