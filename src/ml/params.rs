// ============================================================
// Layer 5 — Named Parameters
// ============================================================
// Burn modules expose parameters through visitors keyed by
// ParamId only. The initializer needs names ("...weight",
// "...bias", "norm...") and the gradient clipper needs the full
// list of ids, so every module of the model implements this
// small trait and reports its parameters under a dotted path:
//
//   attention.global.queries.0.weight
//   attention.global.out.weight
//   linear_1.bias
//   norm_y.weight
//
// Only matrices and vectors occur in the model.

use burn::{
    module::{Param, ParamId},
    nn::{LayerNorm, Linear},
    prelude::*,
};

/// Shared view of one parameter.
pub enum ParamRef<'a, B: Backend> {
    Matrix(&'a Param<Tensor<B, 2>>),
    Vector(&'a Param<Tensor<B, 1>>),
}

/// Mutable view of one parameter; assigning a new `Param` replaces it.
pub enum ParamMut<'a, B: Backend> {
    Matrix(&'a mut Param<Tensor<B, 2>>),
    Vector(&'a mut Param<Tensor<B, 1>>),
}

impl<B: Backend> ParamRef<'_, B> {
    pub fn id(&self) -> ParamId {
        match self {
            ParamRef::Matrix(p) => p.id.clone(),
            ParamRef::Vector(p) => p.id.clone(),
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        match self {
            ParamRef::Matrix(p) => p.val().dims().to_vec(),
            ParamRef::Vector(p) => p.val().dims().to_vec(),
        }
    }
}

/// Name, id and shape of a parameter, detached from the module.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub id:   ParamId,
    pub dims: Vec<usize>,
}

pub trait NamedParameters<B: Backend> {
    fn visit_named(&self, prefix: &str, f: &mut dyn FnMut(&str, ParamRef<'_, B>));

    fn visit_named_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, ParamMut<'_, B>));

    /// Flat list of every parameter in visiting order.
    fn named_parameters(&self) -> Vec<ParamInfo> {
        let mut out = Vec::new();
        self.visit_named("", &mut |name, p| {
            out.push(ParamInfo { name: name.to_string(), id: p.id(), dims: p.dims() });
        });
        out
    }
}

/// `prefix.name`, or just `name` at the root.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

impl<B: Backend> NamedParameters<B> for Linear<B> {
    fn visit_named(&self, prefix: &str, f: &mut dyn FnMut(&str, ParamRef<'_, B>)) {
        f(&join(prefix, "weight"), ParamRef::Matrix(&self.weight));
        if let Some(bias) = &self.bias {
            f(&join(prefix, "bias"), ParamRef::Vector(bias));
        }
    }

    fn visit_named_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, ParamMut<'_, B>)) {
        f(&join(prefix, "weight"), ParamMut::Matrix(&mut self.weight));
        if let Some(bias) = &mut self.bias {
            f(&join(prefix, "bias"), ParamMut::Vector(bias));
        }
    }
}

/// Scale and shift are reported as `weight` and `bias`.
impl<B: Backend> NamedParameters<B> for LayerNorm<B> {
    fn visit_named(&self, prefix: &str, f: &mut dyn FnMut(&str, ParamRef<'_, B>)) {
        f(&join(prefix, "weight"), ParamRef::Vector(&self.gamma));
        if let Some(beta) = &self.beta {
            f(&join(prefix, "bias"), ParamRef::Vector(beta));
        }
    }

    fn visit_named_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, ParamMut<'_, B>)) {
        f(&join(prefix, "weight"), ParamMut::Vector(&mut self.gamma));
        if let Some(beta) = &mut self.beta {
            f(&join(prefix, "bias"), ParamMut::Vector(beta));
        }
    }
}

impl<B: Backend, M: NamedParameters<B>> NamedParameters<B> for Vec<M> {
    fn visit_named(&self, prefix: &str, f: &mut dyn FnMut(&str, ParamRef<'_, B>)) {
        for (i, m) in self.iter().enumerate() {
            m.visit_named(&join(prefix, &i.to_string()), f);
        }
    }

    fn visit_named_mut(&mut self, prefix: &str, f: &mut dyn FnMut(&str, ParamMut<'_, B>)) {
        for (i, m) in self.iter_mut().enumerate() {
            m.visit_named_mut(&join(prefix, &i.to_string()), f);
        }
    }
}
