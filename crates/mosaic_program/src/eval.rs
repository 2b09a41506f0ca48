//! CPU reference evaluator.
//!
//! Executes a program's invocations in emission order over concrete values,
//! implementing the subset of the built-in libraries the stock features call.
//! It exists so composition laws (fog ordering, blend-weight accumulation,
//! ...) can be checked without a GPU.
//!
//! Quaternions follow the library layout: component `x` is the scalar part and
//! `yzw` the vector part. Dual quaternions are stored as `[real, dual]`.

use glam::{Mat4, Vec3, Vec4};
use mosaic_core::{Result, ShaderError};
use rustc_hash::FxHashMap;

use crate::invocation::FunctionInvocation;
use crate::library;
use crate::operand::{Operand, OperandMask};
use crate::parameter::{DataType, Parameter, ParameterId, ParameterKind};
use crate::program::Program;

/// A concrete value bound to a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f32),
    Vector(Vec4),
    /// Any matrix type. 3x4 affine transforms are stored with an implicit
    /// `(0, 0, 0, 1)` last row.
    Matrix(Mat4),
    DualQuaternion([Vec4; 2]),
    Array(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Vector(v) => Some(v.x),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<Vec4> {
        match self {
            Self::Scalar(s) => Some(Vec4::splat(*s)),
            Self::Vector(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dual_quaternion(&self) -> Option<[Vec4; 2]> {
        match self {
            Self::DualQuaternion(dq) => Some(*dq),
            _ => None,
        }
    }

    fn scale(&self, s: f32) -> Option<Self> {
        Some(match self {
            Self::Scalar(v) => Self::Scalar(v * s),
            Self::Vector(v) => Self::Vector(*v * s),
            Self::Matrix(m) => Self::Matrix(*m * s),
            Self::DualQuaternion([r, d]) => Self::DualQuaternion([*r * s, *d * s]),
            Self::Array(_) => return None,
        })
    }
}

fn add(a: &Value, b: &Value) -> Option<Value> {
    Some(match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(x + y),
        (Value::Matrix(x), Value::Matrix(y)) => Value::Matrix(*x + *y),
        (Value::DualQuaternion([r0, d0]), Value::DualQuaternion([r1, d1])) => {
            Value::DualQuaternion([*r0 + *r1, *d0 + *d1])
        }
        _ => Value::Vector(a.as_vector()? + b.as_vector()?),
    })
}

fn modulate(a: &Value, b: &Value) -> Option<Value> {
    Some(match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(x * y),
        (Value::Scalar(s), other) | (other, Value::Scalar(s)) if !matches!(other, Value::Vector(_)) => {
            other.scale(*s)?
        }
        _ => Value::Vector(a.as_vector()? * b.as_vector()?),
    })
}

/// Rotates `v` by the unit quaternion `q` (`x` = scalar part).
fn rotate(q: Vec4, v: Vec3) -> Vec3 {
    let axis = Vec3::new(q.y, q.z, q.w);
    v + 2.0 * axis.cross(axis.cross(v) + q.x * v)
}

fn translation(dq: [Vec4; 2]) -> Vec3 {
    let [r, d] = dq;
    let r_axis = Vec3::new(r.y, r.z, r.w);
    let d_axis = Vec3::new(d.y, d.z, d.w);
    2.0 * (r.x * d_axis - d.x * r_axis + r_axis.cross(d_axis))
}

/// Executes a [`Program`] on the CPU.
pub struct Evaluator<'a> {
    program: &'a Program,
    values: FxHashMap<ParameterId, Value>,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator with constants pre-bound.
    #[must_use]
    pub fn new(program: &'a Program) -> Self {
        let mut values = FxHashMap::default();
        for p in program.parameters() {
            if p.kind() == ParameterKind::Constant || (p.kind() == ParameterKind::Uniform && p.value().is_some()) {
                let v = Vec4::from_array(p.value().unwrap_or_default());
                let value = if p.data_type() == DataType::Float { Value::Scalar(v.x) } else { Value::Vector(v) };
                values.insert(p.id(), value);
            }
        }
        Self { program, values }
    }

    pub fn set(&mut self, id: ParameterId, value: Value) -> &mut Self {
        self.values.insert(id, value);
        self
    }

    pub fn set_array(&mut self, id: ParameterId, values: Vec<Value>) -> &mut Self {
        self.values.insert(id, Value::Array(values));
        self
    }

    #[must_use]
    pub fn get(&self, id: ParameterId) -> Option<&Value> {
        self.values.get(&id)
    }

    /// Runs every invocation.
    pub fn run(&mut self) -> Result<()> {
        self.run_until(|_| false)
    }

    /// Runs invocations in emission order, stopping right after the first one
    /// for which `stop` returns `true`.
    pub fn run_until(&mut self, mut stop: impl FnMut(&FunctionInvocation) -> bool) -> Result<()> {
        let program = self.program;
        for inv in program.entry_point().sorted_invocations() {
            self.execute(inv)?;
            if stop(inv) {
                break;
            }
        }
        Ok(())
    }

    fn execute(&mut self, inv: &FunctionInvocation) -> Result<()> {
        let args = group_arguments(inv.operands());
        let name = inv.function_name();
        let arity = |n: usize| -> Result<()> {
            if args.len() == n {
                Ok(())
            } else {
                Err(ShaderError::Evaluation(format!(
                    "'{name}' expects {n} arguments, got {}",
                    args.len()
                )))
            }
        };

        match name {
            library::FFP_ASSIGN => {
                arity(2)?;
                let v = self.read(&args[0])?;
                self.write(&args[1], v)
            }
            library::FFP_ADD | library::FFP_MODULATE => {
                arity(3)?;
                let a = self.read(&args[0])?;
                let b = self.read(&args[1])?;
                let r = if name == library::FFP_ADD { add(&a, &b) } else { modulate(&a, &b) };
                let r = r.ok_or_else(|| type_error(name))?;
                self.write(&args[2], r)
            }
            library::FFP_LERP => {
                arity(4)?;
                let a = self.read_vector(&args[0], name)?;
                let b = self.read_vector(&args[1], name)?;
                let t = self.read_scalar(&args[2], name)?;
                self.write(&args[3], Value::Vector(a.lerp(b, t)))
            }
            library::FFP_TRANSFORM => {
                arity(3)?;
                let m = self.read_matrix(&args[0], name)?;
                let v = self.read_vector(&args[1], name)?;
                let out_type = self.param(args[2].value.parameter)?.data_type();
                let r = if out_type == DataType::Float3 {
                    m.transform_vector3(v.truncate()).extend(0.0)
                } else {
                    m * v
                };
                self.write(&args[2], Value::Vector(r))
            }
            library::SGX_BLEND_WEIGHT => {
                arity(3)?;
                let w = self.read_scalar(&args[0], name)?;
                let dq = self.read(&args[1])?;
                let r = dq.scale(w).ok_or_else(|| type_error(name))?;
                self.write(&args[2], r)
            }
            library::SGX_ANTIPODALITY_ADJUSTMENT => {
                arity(3)?;
                let first = self.read_dual_quaternion(&args[0], name)?;
                let current = self.read_dual_quaternion(&args[1], name)?;
                let r = if first[0].dot(current[0]) < 0.0 {
                    [-current[0], -current[1]]
                } else {
                    current
                };
                self.write(&args[2], Value::DualQuaternion(r))
            }
            library::SGX_NORMALIZE_DUAL_QUATERNION => {
                arity(1)?;
                let [r, d] = self.read_dual_quaternion(&args[0], name)?;
                let len = r.length();
                if len <= f32::EPSILON {
                    return Err(ShaderError::Evaluation(
                        "cannot normalize a zero dual quaternion".to_owned(),
                    ));
                }
                self.write(&args[0], Value::DualQuaternion([r / len, d / len]))
            }
            library::SGX_CALCULATE_BLEND_POSITION => {
                arity(3)?;
                let p = self.read_vector(&args[0], name)?.truncate();
                let dq = self.read_dual_quaternion(&args[1], name)?;
                let r = rotate(dq[0], p) + translation(dq);
                self.write(&args[2], Value::Vector(r.extend(1.0)))
            }
            library::SGX_CALCULATE_BLEND_NORMAL => {
                arity(3)?;
                let n = self.read_vector(&args[0], name)?.truncate();
                let dq = self.read_dual_quaternion(&args[1], name)?;
                self.write(&args[2], Value::Vector(rotate(dq[0], n).extend(0.0)))
            }
            library::FFP_VERTEX_FOG_LINEAR | library::FFP_VERTEX_FOG_EXP | library::FFP_VERTEX_FOG_EXP2 => {
                arity(4)?;
                let m = self.read_matrix(&args[0], name)?;
                let pos = self.read_vector(&args[1], name)?;
                let params = self.read_vector(&args[2], name)?;
                let distance = (m * pos).w.abs();
                self.write(&args[3], Value::Scalar(fog_factor(name, distance, params)))
            }
            library::FFP_PIXEL_FOG_DEPTH => {
                arity(3)?;
                let m = self.read_matrix(&args[0], name)?;
                let pos = self.read_vector(&args[1], name)?;
                self.write(&args[2], Value::Scalar((m * pos).w))
            }
            library::FFP_PIXEL_FOG_LINEAR | library::FFP_PIXEL_FOG_EXP | library::FFP_PIXEL_FOG_EXP2 => {
                arity(5)?;
                let depth = self.read_scalar(&args[0], name)?;
                let params = self.read_vector(&args[1], name)?;
                let fog_colour = self.read_vector(&args[2], name)?;
                let base = self.read_vector(&args[3], name)?;
                let f = fog_factor(name, depth.abs(), params);
                self.write(&args[4], Value::Vector(fog_colour.lerp(base, f)))
            }
            other => Err(ShaderError::UnsupportedFunction(other.to_owned())),
        }
    }

    fn param(&self, id: ParameterId) -> Result<&'a Parameter> {
        self.program
            .parameter(id)
            .ok_or_else(|| ShaderError::Evaluation(format!("parameter #{} is not part of the program", id.raw())))
    }

    fn read(&self, arg: &Argument) -> Result<Value> {
        let param = self.param(arg.value.parameter)?;
        let mut value = self
            .values
            .get(&param.id())
            .cloned()
            .ok_or_else(|| ShaderError::Evaluation(format!("parameter '{}' has no value", param.name())))?;

        if let Some(index) = &arg.index {
            let i = self.read(&Argument { value: *index, index: None })?;
            let i = i.as_scalar().ok_or_else(|| type_error("array index"))?.max(0.0) as usize;
            value = match value {
                Value::Array(items) => items.get(i).cloned().ok_or_else(|| {
                    ShaderError::Evaluation(format!("index {i} out of range for '{}'", param.name()))
                })?,
                _ => return Err(type_error(param.name())),
            };
        }

        Ok(apply_read_mask(value, arg.value.mask))
    }

    fn read_scalar(&self, arg: &Argument, function: &str) -> Result<f32> {
        self.read(arg)?.as_scalar().ok_or_else(|| type_error(function))
    }

    fn read_vector(&self, arg: &Argument, function: &str) -> Result<Vec4> {
        self.read(arg)?.as_vector().ok_or_else(|| type_error(function))
    }

    fn read_matrix(&self, arg: &Argument, function: &str) -> Result<Mat4> {
        match self.read(arg)? {
            Value::Matrix(m) => Ok(m),
            _ => Err(type_error(function)),
        }
    }

    fn read_dual_quaternion(&self, arg: &Argument, function: &str) -> Result<[Vec4; 2]> {
        self.read(arg)?.as_dual_quaternion().ok_or_else(|| type_error(function))
    }

    fn write(&mut self, arg: &Argument, value: Value) -> Result<()> {
        let id = arg.value.parameter;
        let param = self.param(id)?;
        if param.kind().is_read_only() {
            return Err(ShaderError::Evaluation(format!(
                "write to read-only parameter '{}'",
                param.name()
            )));
        }
        let mask = arg.value.mask;
        if mask.is_empty() {
            let value = match (param.data_type(), value) {
                (DataType::Float, Value::Vector(v)) => Value::Scalar(v.x),
                (_, v) => v,
            };
            self.values.insert(id, value);
            return Ok(());
        }

        let src = value.as_vector().ok_or_else(|| type_error(param.name()))?;
        let mut dst = self
            .values
            .get(&id)
            .and_then(Value::as_vector)
            .unwrap_or(Vec4::ZERO);
        for (k, c) in mask.components().into_iter().enumerate() {
            dst[c] = src[k];
        }
        self.values.insert(id, Value::Vector(dst));
        Ok(())
    }
}

struct Argument {
    value: Operand,
    index: Option<Operand>,
}

fn group_arguments(operands: &[Operand]) -> Vec<Argument> {
    let mut args: Vec<Argument> = Vec::with_capacity(operands.len());
    for op in operands {
        match args.last_mut() {
            Some(prev) if op.is_index() => prev.index = Some(*op),
            _ => args.push(Argument { value: *op, index: None }),
        }
    }
    args
}

fn apply_read_mask(value: Value, mask: OperandMask) -> Value {
    if mask.is_empty() {
        return value;
    }
    let Some(v) = value.as_vector() else {
        return value;
    };
    let comps = mask.components();
    if comps.len() == 1 {
        return Value::Scalar(v[comps[0]]);
    }
    let mut out = Vec4::ZERO;
    for (k, c) in comps.into_iter().enumerate() {
        out[k] = v[c];
    }
    Value::Vector(out)
}

/// Fog factor from `(density, start, end, 1 / (end - start))` parameters.
fn fog_factor(function: &str, distance: f32, params: Vec4) -> f32 {
    let f = if function.ends_with("Exp2") {
        let e = distance * params.x;
        1.0 / (e * e).exp()
    } else if function.ends_with("Exp") {
        1.0 / (distance * params.x).exp()
    } else {
        (params.z - distance) * params.w
    };
    f.clamp(0.0, 1.0)
}

fn type_error(what: &str) -> ShaderError {
    ShaderError::Evaluation(format!("operand type mismatch in '{what}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::FunctionInvocation;
    use crate::parameter::{Content, Semantic};
    use mosaic_core::{Capabilities, ShaderStage};

    #[test]
    fn test_masked_assign() {
        let mut p = Program::new(ShaderStage::Vertex, Capabilities::default());
        let src = p.resolve_local_named("src", DataType::Float4).unwrap();
        let dst = p.resolve_local_named("dst", DataType::Float4).unwrap();
        p.add_invocation(
            FunctionInvocation::new(library::FFP_ASSIGN, 0, 0)
                .input_masked(src, OperandMask::X)
                .output_masked(dst, OperandMask::W),
        )
        .unwrap();

        let mut e = Evaluator::new(&p);
        e.set(src, Value::Vector(Vec4::new(3.0, 4.0, 5.0, 6.0)));
        e.set(dst, Value::Vector(Vec4::ONE));
        e.run().unwrap();
        assert_eq!(e.get(dst), Some(&Value::Vector(Vec4::new(1.0, 1.0, 1.0, 3.0))));
    }

    #[test]
    fn test_transform_normal_ignores_translation() {
        let mut p = Program::new(ShaderStage::Vertex, Capabilities::default());
        let m = p
            .resolve_auto_constant(crate::parameter::AutoConstant::WorldMatrix, None)
            .unwrap();
        let n = p
            .resolve_input(Semantic::Normal, 0, Content::NormalObjectSpace, DataType::Float3)
            .unwrap();
        let out = p
            .resolve_local(Semantic::Normal, 0, Content::NormalWorldSpace, DataType::Float3)
            .unwrap();
        p.add_invocation(FunctionInvocation::new(library::FFP_TRANSFORM, 0, 0).input(m).input(n).output(out))
            .unwrap();

        let mut e = Evaluator::new(&p);
        e.set(m, Value::Matrix(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0))));
        e.set(n, Value::Vector(Vec4::new(0.0, 1.0, 0.0, 0.0)));
        e.run().unwrap();
        assert_eq!(e.get(out), Some(&Value::Vector(Vec4::new(0.0, 1.0, 0.0, 0.0))));
    }

    #[test]
    fn test_unknown_function() {
        let mut p = Program::new(ShaderStage::Fragment, Capabilities::default());
        p.add_invocation(FunctionInvocation::new("Custom_Func", 0, 0)).unwrap();
        assert!(matches!(
            Evaluator::new(&p).run(),
            Err(ShaderError::UnsupportedFunction(_))
        ));
    }

    #[test]
    fn test_linear_fog_factor() {
        // start 10, end 20: halfway is 0.5
        let params = Vec4::new(0.0, 10.0, 20.0, 0.1);
        assert!((fog_factor(library::FFP_VERTEX_FOG_LINEAR, 15.0, params) - 0.5).abs() < 1e-6);
        assert_eq!(fog_factor(library::FFP_VERTEX_FOG_LINEAR, 30.0, params), 0.0);
    }
}
