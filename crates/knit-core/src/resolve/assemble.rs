//! Argument assembly: wired values -> positional argument list.
//!
//! Each argument link names a parameter by spot (its name, or its decimal
//! position) and, for vector parameters, an element index. Unwired slots get
//! the parameter type's zero value unless the parameter is required.
//! Vector indexes are bounded by `ResolveOptions::max_vector_len`.

use crate::domain::{BlockId, Connector, ResolveErrorKind, Spot, Value};
use crate::typed::{Args, FactoryKey, ParamKind, ParamSpec};

/// Position of the parameter a target spot addresses.
pub fn param_position(params: &[ParamSpec], spot: &Spot) -> Option<usize> {
    let Spot::Named(name) = spot else {
        return None;
    };
    params
        .iter()
        .position(|p| &p.name == name)
        .or_else(|| name.parse::<usize>().ok().filter(|&i| i < params.len()))
}

enum Slot {
    Scalar(Option<Value>),
    Vector(Vec<Option<Value>>),
}

pub fn assemble(
    block: BlockId,
    factory: &FactoryKey,
    params: &[ParamSpec],
    wired: Vec<(&Connector, Value)>,
    max_vector_len: usize,
) -> Result<Args, ResolveErrorKind> {
    let mut slots: Vec<Slot> = params
        .iter()
        .map(|p| match p.kind {
            ParamKind::Scalar => Slot::Scalar(None),
            ParamKind::Vector => Slot::Vector(Vec::new()),
        })
        .collect();

    for (target, value) in wired {
        let position = param_position(params, &target.spot).ok_or_else(|| {
            ResolveErrorKind::UnknownParameter {
                factory: factory.clone(),
                spot: target.spot.to_string(),
            }
        })?;
        let param = &params[position];

        match (&mut slots[position], target.index) {
            (Slot::Scalar(slot), None) => {
                if slot.is_some() {
                    return Err(ResolveErrorKind::DuplicateWiring {
                        param: param.name.clone(),
                        slot: "*".into(),
                    });
                }
                *slot = Some(value);
            }
            (Slot::Scalar(_), Some(index)) => {
                return Err(ResolveErrorKind::SlotMismatch {
                    param: param.name.clone(),
                    reason: format!("scalar parameter addressed with index {index}"),
                });
            }
            (Slot::Vector(_), Some(index)) if index >= max_vector_len => {
                return Err(ResolveErrorKind::SlotMismatch {
                    param: param.name.clone(),
                    reason: format!("index {index} exceeds the vector limit of {max_vector_len}"),
                });
            }
            (Slot::Vector(elements), Some(index)) => {
                if index >= elements.len() {
                    elements.resize_with(index + 1, || None);
                }
                if elements[index].is_some() {
                    return Err(ResolveErrorKind::DuplicateWiring {
                        param: param.name.clone(),
                        slot: index.to_string(),
                    });
                }
                elements[index] = Some(value);
            }
            (Slot::Vector(_), None) => {
                return Err(ResolveErrorKind::SlotMismatch {
                    param: param.name.clone(),
                    reason: "vector parameter addressed without an index".into(),
                });
            }
        }
    }

    let mut values = Vec::with_capacity(params.len());
    for (param, slot) in params.iter().zip(slots) {
        let value = match slot {
            Slot::Scalar(Some(value)) => value,
            Slot::Vector(elements) if !elements.is_empty() => Value::Vector(
                elements
                    .into_iter()
                    .map(|e| e.unwrap_or_else(|| param.ty.zero()))
                    .collect(),
            ),
            _ if param.required => {
                return Err(ResolveErrorKind::UnwiredParameter {
                    param: param.name.clone(),
                });
            }
            Slot::Scalar(None) => param.ty.zero(),
            Slot::Vector(_) => Value::Vector(Vec::new()),
        };
        values.push(value);
    }

    Ok(Args::new(block, values))
}
