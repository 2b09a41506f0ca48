//! A single-stage program under construction.
//!
//! Parameters are stored in an arena owned by the program and handed out as
//! [`ParameterId`]s. Every `resolve_*` call is idempotent: asking twice for
//! the same `(semantic, index, content, type)` returns the same id, while a
//! request that conflicts with an existing declaration fails with
//! [`ShaderError::ParameterResolution`] instead of creating a duplicate.

use mosaic_core::interner::{self, Symbol};
use mosaic_core::{Capabilities, CapabilityFlags, Result, ShaderError, ShaderStage};
use rustc_hash::FxHashSet;

use crate::binding::{UniformBinding, UniformSource};
use crate::function::Function;
use crate::invocation::FunctionInvocation;
use crate::parameter::{AutoConstant, Content, DataType, Parameter, ParameterId, ParameterKind, Semantic};

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    stage: ShaderStage,
    capabilities: Capabilities,
    parameters: Vec<Parameter>,
    names: FxHashSet<String>,
    dependencies: Vec<Symbol>,
    entry_point: Function,
    skeletal_animation: bool,
}

impl Program {
    #[must_use]
    pub fn new(stage: ShaderStage, capabilities: Capabilities) -> Self {
        Self {
            stage,
            capabilities,
            parameters: Vec::new(),
            names: FxHashSet::default(),
            dependencies: Vec::new(),
            entry_point: Function::new("main"),
            skeletal_animation: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// All parameters in resolution order.
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    #[must_use]
    pub fn parameter(&self, id: ParameterId) -> Option<&Parameter> {
        if id.stage() != self.stage {
            return None;
        }
        self.parameters.get(id.index())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.kind == ParameterKind::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.kind == ParameterKind::Output)
    }

    pub fn locals(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.kind == ParameterKind::Local)
    }

    /// Feature uniforms and auto-constants.
    pub fn uniforms(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.kind.is_uniform())
    }

    #[inline]
    #[must_use]
    pub fn entry_point(&self) -> &Function {
        &self.entry_point
    }

    /// Library include names, deduplicated, in first-request order.
    pub fn dependencies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.dependencies.iter().map(|s| interner::resolve(*s))
    }

    #[inline]
    #[must_use]
    pub fn has_skeletal_animation(&self) -> bool {
        self.skeletal_animation
    }

    pub fn set_skeletal_animation(&mut self, enabled: bool) {
        self.skeletal_animation = enabled;
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[must_use]
    pub fn find_input(&self, semantic: Semantic, index: u8) -> Option<ParameterId> {
        self.find_interface(ParameterKind::Input, semantic, index).map(|p| p.id)
    }

    #[must_use]
    pub fn find_output(&self, semantic: Semantic, index: u8) -> Option<ParameterId> {
        self.find_interface(ParameterKind::Output, semantic, index).map(|p| p.id)
    }

    #[must_use]
    pub fn find_output_by_content(&self, content: Content) -> Option<ParameterId> {
        self.outputs().find(|p| p.content == content).map(|p| p.id)
    }

    #[must_use]
    pub fn find_local_named(&self, name: &str) -> Option<ParameterId> {
        self.locals().find(|p| p.name == name).map(|p| p.id)
    }

    #[must_use]
    pub fn find_auto_constant(&self, auto: AutoConstant) -> Option<ParameterId> {
        self.parameters
            .iter()
            .find(|p| p.kind == ParameterKind::AutoConstant(auto))
            .map(|p| p.id)
    }

    #[must_use]
    pub fn find_uniform(&self, name: &str) -> Option<ParameterId> {
        self.uniforms().find(|p| p.name == name).map(|p| p.id)
    }

    fn find_interface(&self, kind: ParameterKind, semantic: Semantic, index: u8) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.kind == kind && p.semantic == semantic && p.index == index)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolves a stage input (vertex attribute or interpolated varying).
    pub fn resolve_input(
        &mut self,
        semantic: Semantic,
        index: u8,
        content: Content,
        data_type: DataType,
    ) -> Result<ParameterId> {
        self.resolve_interface(ParameterKind::Input, semantic, index, content, data_type)
    }

    /// Resolves a stage output.
    pub fn resolve_output(
        &mut self,
        semantic: Semantic,
        index: u8,
        content: Content,
        data_type: DataType,
    ) -> Result<ParameterId> {
        self.resolve_interface(ParameterKind::Output, semantic, index, content, data_type)
    }

    /// Resolves a local variable of the entry function keyed by its content.
    pub fn resolve_local(
        &mut self,
        semantic: Semantic,
        index: u8,
        content: Content,
        data_type: DataType,
    ) -> Result<ParameterId> {
        self.check_type_supported(data_type)?;
        if let Some(existing) = self.parameters.iter().find(|p| {
            p.kind == ParameterKind::Local && p.semantic == semantic && p.index == index && p.content == content
        }) {
            return self.reuse(existing, data_type);
        }
        let name = content.local_name();
        Ok(self.push(name, semantic, index, content, data_type, ParameterKind::Local, None, None))
    }

    /// Resolves a local variable keyed by name.
    pub fn resolve_local_named(&mut self, name: &str, data_type: DataType) -> Result<ParameterId> {
        self.check_type_supported(data_type)?;
        if let Some(existing) = self.locals().find(|p| p.name == name) {
            return self.reuse(existing, data_type);
        }
        if self.names.contains(name) {
            return Err(ShaderError::resolution(
                self.stage,
                format!("local '{name}' clashes with an existing parameter"),
            ));
        }
        Ok(self.push(
            name.to_owned(),
            Semantic::Unknown,
            0,
            Content::Unknown,
            data_type,
            ParameterKind::Local,
            None,
            None,
        ))
    }

    /// Resolves an engine-supplied uniform. Arrays need `array_size`.
    pub fn resolve_auto_constant(&mut self, auto: AutoConstant, array_size: Option<u16>) -> Result<ParameterId> {
        let data_type = auto.data_type();
        self.check_type_supported(data_type)?;
        match (auto.is_array(), array_size) {
            (true, None | Some(0)) => {
                return Err(ShaderError::resolution(
                    self.stage,
                    format!("auto constant '{}' needs a non-zero array size", auto.name()),
                ));
            }
            (false, Some(_)) => {
                return Err(ShaderError::resolution(
                    self.stage,
                    format!("auto constant '{}' is not an array", auto.name()),
                ));
            }
            _ => {}
        }

        if let Some(existing) = self
            .parameters
            .iter()
            .find(|p| p.kind == ParameterKind::AutoConstant(auto))
        {
            if existing.array_size != array_size {
                return Err(ShaderError::resolution(
                    self.stage,
                    format!(
                        "auto constant '{}' already declared with array size {:?}, requested {:?}",
                        existing.name, existing.array_size, array_size
                    ),
                ));
            }
            return Ok(existing.id);
        }

        Ok(self.push(
            auto.name(),
            Semantic::Unknown,
            0,
            Content::Unknown,
            data_type,
            ParameterKind::AutoConstant(auto),
            array_size,
            None,
        ))
    }

    /// Resolves a feature-owned uniform with an optional initial value.
    pub fn resolve_uniform(&mut self, name: &str, data_type: DataType, value: Option<[f32; 4]>) -> Result<ParameterId> {
        self.check_type_supported(data_type)?;
        if let Some(existing) = self
            .parameters
            .iter()
            .find(|p| p.kind == ParameterKind::Uniform && p.name == name)
        {
            return self.reuse(existing, data_type);
        }
        if self.names.contains(name) {
            return Err(ShaderError::resolution(
                self.stage,
                format!("uniform '{name}' clashes with an existing parameter"),
            ));
        }
        Ok(self.push(
            name.to_owned(),
            Semantic::Unknown,
            0,
            Content::Unknown,
            data_type,
            ParameterKind::Uniform,
            None,
            value,
        ))
    }

    /// Resolves the sampler bound to texture `unit`.
    pub fn resolve_sampler(&mut self, unit: u8) -> Result<ParameterId> {
        let max = self.capabilities.max_texture_units;
        if unit >= max {
            return Err(ShaderError::resolution(
                self.stage,
                format!("texture unit {unit} exceeds the {max} available samplers"),
            ));
        }
        let name = format!("gTextureSampler{unit}");
        if let Some(existing) = self
            .parameters
            .iter()
            .find(|p| p.kind == ParameterKind::Uniform && p.data_type == DataType::Sampler2D && p.index == unit)
        {
            return Ok(existing.id);
        }
        Ok(self.push(
            name,
            Semantic::Unknown,
            unit,
            Content::Unknown,
            DataType::Sampler2D,
            ParameterKind::Uniform,
            None,
            None,
        ))
    }

    /// Resolves an inline literal. Unused components of `value` are ignored.
    pub fn resolve_constant(&mut self, data_type: DataType, value: [f32; 4]) -> Result<ParameterId> {
        if !matches!(
            data_type,
            DataType::Float | DataType::Float2 | DataType::Float3 | DataType::Float4
        ) {
            return Err(ShaderError::resolution(
                self.stage,
                format!("constants of type {data_type:?} are not supported"),
            ));
        }
        let bits = value.map(f32::to_bits);
        if let Some(existing) = self.parameters.iter().find(|p| {
            p.kind == ParameterKind::Constant
                && p.data_type == data_type
                && p.value.map(|v| v.map(f32::to_bits)) == Some(bits)
        }) {
            return Ok(existing.id);
        }
        let name = format!("c{}", self.parameters.len());
        Ok(self.push(
            name,
            Semantic::Unknown,
            0,
            Content::Unknown,
            data_type,
            ParameterKind::Constant,
            None,
            Some(value),
        ))
    }

    /// Adds a library include; repeated names are ignored.
    pub fn add_dependency(&mut self, name: &str) {
        let sym = interner::intern(name);
        if !self.dependencies.contains(&sym) {
            self.dependencies.push(sym);
        }
    }

    /// Appends an invocation to the entry point after validating its operands.
    pub fn add_invocation(&mut self, invocation: FunctionInvocation) -> Result<()> {
        for operand in invocation.operands() {
            let id = operand.parameter;
            let Some(param) = self.parameter(id) else {
                return Err(ShaderError::UnresolvedOperand {
                    function: invocation.function_name().to_owned(),
                    stage: self.stage,
                    index: id.raw(),
                });
            };
            if operand.direction.writes() && param.kind.is_read_only() {
                return Err(ShaderError::resolution(
                    self.stage,
                    format!(
                        "'{}' writes to read-only parameter '{}'",
                        invocation.function_name(),
                        param.name
                    ),
                ));
            }
        }
        self.entry_point.push(invocation);
        Ok(())
    }

    /// Uniforms the parameter-update collaborator must feed, in declaration order.
    #[must_use]
    pub fn uniform_bindings(&self) -> Vec<UniformBinding> {
        self.uniforms()
            .map(|p| UniformBinding {
                name: p.name.clone(),
                data_type: p.data_type,
                array_size: p.array_size,
                source: match p.kind {
                    ParameterKind::AutoConstant(auto) => UniformSource::Auto(auto),
                    _ if p.data_type == DataType::Sampler2D => UniformSource::Sampler { unit: p.index },
                    _ => UniformSource::Custom { initial: p.value },
                },
            })
            .collect()
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn resolve_interface(
        &mut self,
        kind: ParameterKind,
        semantic: Semantic,
        index: u8,
        content: Content,
        data_type: DataType,
    ) -> Result<ParameterId> {
        self.check_type_supported(data_type)?;
        if let Some(existing) = self.find_interface(kind, semantic, index) {
            if existing.content != content {
                return Err(ShaderError::resolution(
                    self.stage,
                    format!(
                        "{:?} {:?}{} already holds {:?}, requested {:?}",
                        kind, semantic, index, existing.content, content
                    ),
                ));
            }
            return self.reuse(existing, data_type);
        }
        let prefix = if kind == ParameterKind::Input { 'i' } else { 'o' };
        let name = format!("{prefix}{}_{index}", semantic.short_name());
        Ok(self.push(name, semantic, index, content, data_type, kind, None, None))
    }

    fn reuse(&self, existing: &Parameter, data_type: DataType) -> Result<ParameterId> {
        if existing.data_type != data_type {
            return Err(ShaderError::resolution(
                self.stage,
                format!(
                    "parameter '{}' already declared as {:?}, requested {:?}",
                    existing.name, existing.data_type, data_type
                ),
            ));
        }
        Ok(existing.id)
    }

    fn check_type_supported(&self, data_type: DataType) -> Result<()> {
        if data_type.is_non_square() && !self.capabilities.supports(CapabilityFlags::NON_SQUARE_MATRICES) {
            return Err(ShaderError::resolution(
                self.stage,
                format!("{data_type:?} requires non-square matrix support"),
            ));
        }
        Ok(())
    }

    fn unique_name(&mut self, base: String) -> String {
        let mut name = base.clone();
        let mut n = 1;
        while self.names.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        self.names.insert(name.clone());
        name
    }

    fn push(
        &mut self,
        name: String,
        semantic: Semantic,
        index: u8,
        content: Content,
        data_type: DataType,
        kind: ParameterKind,
        array_size: Option<u16>,
        value: Option<[f32; 4]>,
    ) -> ParameterId {
        let id = ParameterId::new(self.stage, self.parameters.len() as u32);
        let name = self.unique_name(name);
        self.parameters.push(Parameter {
            id,
            name,
            semantic,
            index,
            content,
            data_type,
            kind,
            array_size,
            value,
        });
        id
    }
}
